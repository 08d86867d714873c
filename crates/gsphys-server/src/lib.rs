#![allow(clippy::too_many_arguments, clippy::collapsible_if, clippy::collapsible_else_if,
         clippy::field_reassign_with_default, clippy::float_cmp, clippy::needless_range_loop)]
// Server side of the simulator: the collision world, studio hitbox hulls
// and the frame driver.

pub mod server;
pub mod server_game_import;
pub mod sv_move;
pub mod sv_studio;
pub mod sv_world;

pub use server::Server;
pub use server_game_import::ServerPhysicsImport;
pub use sv_studio::{StudioCache, StudioPose};
pub use sv_world::{AreaType, GamePhysics};
