// server.rs -- per-level server state and the physics frame driver

use std::rc::Rc;

use gsphys_common::cmodel::BrushModel;
use gsphys_common::common::{com_dprintf, PhysicsResult};
use gsphys_common::cvar::{register_physics_cvars, CvarContext};
use gsphys_common::shared::EntityHandle;
use gsphys_game::g_local::{Edict, EntityList, Model, MoveType, Solid};
use gsphys_game::g_phys::{GameMovement, SoundEvent};

use crate::server_game_import::ServerPhysicsImport;
use crate::sv_world::GamePhysics;

// ============================================================
// Server (per-level state)
// ============================================================

pub struct Server {
    ents: EntityList,
    physics: GamePhysics,
    movement: GameMovement,
    cvars: CvarContext,
    time: f32,
}

impl Server {
    /// Loads a level: the world entity takes slot 0 and every physics
    /// variable is registered with its default.
    pub fn new(world_model: Rc<BrushModel>, max_clients: usize) -> PhysicsResult<Self> {
        Self::with_movement(world_model, max_clients, GameMovement::new())
    }

    /// Like `new`, with movement state supplied by the caller (a seeded
    /// one for reproducible runs).
    pub fn with_movement(world_model: Rc<BrushModel>, max_clients: usize, movement: GameMovement) -> PhysicsResult<Self> {
        let mut cvars = CvarContext::new();
        register_physics_cvars(&mut cvars);

        let mut world = Edict::new("worldspawn");
        world.solid = Solid::BSP;
        world.movetype = MoveType::Push;
        world.mins = world_model.mins;
        world.maxs = world_model.maxs;
        world.model = Model::Brush(Rc::clone(&world_model));

        let mut ents = EntityList::new(max_clients);
        ents.spawn(world)?;

        com_dprintf(&format!("loaded {} for {} clients\n", world_model.name, max_clients));

        Ok(Self {
            ents,
            physics: GamePhysics::new(world_model),
            movement,
            cvars,
            time: 0.0,
        })
    }

    pub fn spawn_entity(&mut self, edict: Edict) -> PhysicsResult<EntityHandle> {
        self.ents.spawn(edict)
    }

    pub fn link_entity(&mut self, ent: EntityHandle, touch_triggers: bool) -> PhysicsResult<()> {
        self.physics.link_edict(&mut self.ents, ent, touch_triggers)
    }

    pub fn unlink_entity(&mut self, ent: EntityHandle) {
        self.physics.unlink_edict(&mut self.ents, ent)
    }

    /// Unlinks and frees an entity.
    pub fn remove_entity(&mut self, ent: EntityHandle) -> Option<Edict> {
        self.physics.unlink_edict(&mut self.ents, ent);
        self.ents.destroy(ent)
    }

    /// Runs one physics tick and advances server time. An error aborts the
    /// tick where it happened and is handed back to the caller.
    pub fn run_frame(&mut self, frametime: f32) -> PhysicsResult<()> {
        let mut import = ServerPhysicsImport::new(&mut self.physics, &self.cvars);
        let result = self
            .movement
            .run_physics(&mut import, &mut self.ents, &self.cvars, self.time, frametime);

        if let Err(err) = &result {
            tracing::warn!(time = self.time, "physics frame aborted: {}", err);
            return result;
        }

        self.time += frametime;
        Ok(())
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn entities(&self) -> &EntityList {
        &self.ents
    }

    pub fn entities_mut(&mut self) -> &mut EntityList {
        &mut self.ents
    }

    pub fn physics(&self) -> &GamePhysics {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut GamePhysics {
        &mut self.physics
    }

    pub fn cvars(&self) -> &CvarContext {
        &self.cvars
    }

    pub fn cvars_mut(&mut self) -> &mut CvarContext {
        &mut self.cvars
    }

    pub fn movement_mut(&mut self) -> &mut GameMovement {
        &mut self.movement
    }

    pub fn take_sound_events(&mut self) -> Vec<SoundEvent> {
        self.movement.take_sound_events()
    }
}

// ============================================================
// Tests
// ============================================================
