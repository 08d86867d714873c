// server_game_import.rs -- PhysicsImport implementation backed by server state.
//
// The game crate reaches collision services only through the PhysicsImport
// trait. This struct borrows the server's GamePhysics and cvars for one
// frame and forwards every call.

use gsphys_common::common::PhysicsResult;
use gsphys_common::cvar::CvarContext;
use gsphys_common::shared::{Contents, EntityHandle, Trace, TraceFlags, TraceType, Vec3};
use gsphys_game::g_local::EntityList;
use gsphys_game::game_import::PhysicsImport;

use crate::sv_world::GamePhysics;

pub struct ServerPhysicsImport<'a> {
    pub physics: &'a mut GamePhysics,
    pub cvars: &'a CvarContext,
}

impl<'a> ServerPhysicsImport<'a> {
    pub fn new(physics: &'a mut GamePhysics, cvars: &'a CvarContext) -> Self {
        Self { physics, cvars }
    }
}

impl PhysicsImport for ServerPhysicsImport<'_> {
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
    ) -> PhysicsResult<Trace> {
        self.physics.move_trace(
            ents,
            start,
            mins,
            maxs,
            end,
            trace_type,
            pass,
            ignore_transparent,
            monster_clip_brush,
            flags,
            self.cvars,
        )
    }

    fn point_contents(&mut self, ents: &EntityList, p: &Vec3, group_mask: u32) -> PhysicsResult<Contents> {
        self.physics.point_contents(ents, p, group_mask)
    }

    fn true_point_contents(&mut self, p: &Vec3) -> PhysicsResult<Contents> {
        self.physics.true_point_contents(p)
    }

    fn link_edict(&mut self, ents: &mut EntityList, ent: EntityHandle, touch_triggers: bool) -> PhysicsResult<()> {
        self.physics.link_edict(ents, ent, touch_triggers)
    }

    fn unlink_edict(&mut self, ents: &mut EntityList, ent: EntityHandle) {
        self.physics.unlink_edict(ents, ent)
    }

    fn test_group_operation(&self, lhs: u32, rhs: u32) -> bool {
        self.physics.test_group_operation(lhs, rhs)
    }
}
