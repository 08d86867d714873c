//! Physics import interface: the collision services the movement code calls.
//!
//! The server owns the area tree, the hulls and the studio cache and hands
//! movement an implementation of this trait for the duration of a frame.
//! Entity storage is passed in explicitly so the implementation never holds
//! on to it between calls.

use gsphys_common::common::PhysicsResult;
use gsphys_common::shared::{Contents, EntityHandle, Trace, TraceFlags, TraceType, Vec3};

use crate::g_local::EntityList;

pub trait PhysicsImport {
    /// Sweep a box from `start` to `end` against the world and every
    /// eligible solid entity. `pass` is never hit.
    #[allow(clippy::too_many_arguments)]
    fn move_trace(
        &mut self,
        ents: &EntityList,
        start: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        end: &Vec3,
        trace_type: TraceType,
        pass: Option<EntityHandle>,
        ignore_transparent: bool,
        monster_clip_brush: bool,
        flags: TraceFlags,
    ) -> PhysicsResult<Trace>;

    /// Contents at a point, with brush entities whose group info passes
    /// `group_mask` overriding the world. Currents read as Water.
    fn point_contents(&mut self, ents: &EntityList, p: &Vec3, group_mask: u32) -> PhysicsResult<Contents>;

    /// World contents at a point without any conversion.
    fn true_point_contents(&mut self, p: &Vec3) -> PhysicsResult<Contents>;

    fn link_edict(&mut self, ents: &mut EntityList, ent: EntityHandle, touch_triggers: bool) -> PhysicsResult<()>;

    fn unlink_edict(&mut self, ents: &mut EntityList, ent: EntityHandle);

    fn test_group_operation(&self, lhs: u32, rhs: u32) -> bool;
}

/// Plain sweep with no flags, the form almost every movement call uses.
#[allow(clippy::too_many_arguments)]
pub fn pi_move(
    physics: &mut dyn PhysicsImport,
    ents: &EntityList,
    start: &Vec3,
    mins: &Vec3,
    maxs: &Vec3,
    end: &Vec3,
    trace_type: TraceType,
    pass: Option<EntityHandle>,
    monster_clip_brush: bool,
) -> PhysicsResult<Trace> {
    physics.move_trace(
        ents,
        start,
        mins,
        maxs,
        end,
        trace_type,
        pass,
        false,
        monster_clip_brush,
        TraceFlags::empty(),
    )
}
