#![allow(clippy::too_many_arguments, clippy::collapsible_if, clippy::collapsible_else_if,
         clippy::field_reassign_with_default, clippy::manual_range_contains,
         clippy::float_cmp, clippy::needless_range_loop, clippy::nonminimal_bool)]
// Game side of the simulator: entities and their movement.

pub mod dispatch;
pub mod game_import;
pub mod g_local;
pub mod g_phys;

pub use g_local::{Edict, EntityFlags, EntityList, MoveType, Solid};
pub use g_phys::{GameMovement, SoundEvent};
pub use game_import::PhysicsImport;
