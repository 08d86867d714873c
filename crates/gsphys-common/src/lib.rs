#![allow(clippy::too_many_arguments, clippy::collapsible_if, clippy::collapsible_else_if,
         clippy::field_reassign_with_default, clippy::manual_range_contains,
         clippy::float_cmp, clippy::needless_range_loop)]
// Shared code: math, collision models, studio models, console variables,
// logging and errors.

pub mod shared;
pub mod common;
pub mod cvar;
pub mod cmodel;
pub mod studio;
