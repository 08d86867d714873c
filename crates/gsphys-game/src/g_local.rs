// g_local.rs -- entity model shared by movement and collision

use std::rc::Rc;

use gsphys_common::cmodel::BrushModel;
use gsphys_common::common::{PhysicsError, PhysicsResult};
use gsphys_common::shared::*;
use gsphys_common::studio::{StudioModel, MAX_BLENDERS, MAX_CONTROLLERS};

use crate::dispatch::{BlockedFn, ShouldCollideFn, ThinkFn, TouchFn};

pub const MAX_EDICTS: usize = 1024;
pub const MAX_ENT_LEAFS: usize = 48;

// ============================================================
// Flags and enums
// ============================================================

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EntityFlags: u32 {
        /// Removed at the end of the current physics step.
        const PENDING_DESTRUCTION = 1 << 0;
        const CLIENT              = 1 << 1;
        const MONSTER             = 1 << 2;
        /// Blocked by monster clip brushes.
        const MONSTERCLIP         = 1 << 3;
        /// Part of the static world, never transparent to traces.
        const WORLDBRUSH          = 1 << 4;
        const ONGROUND            = 1 << 5;
        /// Pusher thinks every frame, not only once its move completes.
        const ALWAYSTHINK         = 1 << 6;
        const FLOAT               = 1 << 7;
        const FLY                 = 1 << 8;
        const SWIM                = 1 << 9;
        /// Moves whatever stands on it along move_dir at speed.
        const CONVEYOR            = 1 << 10;
        /// base_velocity was set this frame and is kept.
        const BASEVELOCITY        = 1 << 11;
        const IMMUNE_WATER        = 1 << 12;
        const GODMODE             = 1 << 13;
        const INWATER             = 1 << 14;
        const IMMUNE_LAVA         = 1 << 15;
        const IMMUNE_SLIME        = 1 << 16;
        const WATERJUMP           = 1 << 17;
    }
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveType {
    #[default]
    None = 0,
    /// Player controlled.
    Walk = 3,
    /// Gravity, friction and slide moves, no client input.
    Step = 4,
    Fly = 5,
    Toss = 6,
    Push = 7,
    Noclip = 8,
    FlyMissile = 9,
    Bounce = 10,
    BounceMissile = 11,
    Follow = 12,
    PushStep = 13,
}

impl MoveType {
    pub fn value(self) -> i32 {
        self as i32
    }
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Solid {
    #[default]
    Not = 0,
    Trigger = 1,
    BBox = 2,
    SlideBox = 3,
    BSP = 4,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WaterLevel {
    #[default]
    Dry = 0,
    Feet = 1,
    Waist = 2,
    Head = 3,
}

impl WaterLevel {
    pub fn as_f32(self) -> f32 {
        self as i32 as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Normal,
    TransColor,
    TransTexture,
    Glow,
    TransAlpha,
    TransAdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixAngleMode {
    #[default]
    None,
    Absolute,
    /// Client adds avelocity to its view angles.
    AddAVelocity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeadFlag {
    #[default]
    No,
    Dying,
    Dead,
    Respawnable,
    DiscardBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoundChannel {
    #[default]
    Auto,
    Weapon,
    Voice,
    Item,
    Body,
}

#[derive(Debug, Clone, Default)]
pub enum Model {
    #[default]
    None,
    Brush(Rc<BrushModel>),
    Studio(Rc<StudioModel>),
}

impl Model {
    pub fn is_none(&self) -> bool {
        matches!(self, Model::None)
    }

    pub fn brush(&self) -> Option<&Rc<BrushModel>> {
        match self {
            Model::Brush(m) => Some(m),
            _ => None,
        }
    }

    pub fn studio(&self) -> Option<&Rc<StudioModel>> {
        match self {
            Model::Studio(m) => Some(m),
            _ => None,
        }
    }
}

// ============================================================
// PhysicsState
// ============================================================

/// Spatial bookkeeping owned by the collision code.
#[derive(Debug, Clone)]
pub struct PhysicsState {
    leafnums: [i16; MAX_ENT_LEAFS],
    pub leaf_count: usize,
    /// Topmost straddled render node once the leaf list overflowed, -1
    /// otherwise.
    pub head_node: i32,
    pub group_info: u32,
    /// Area node holding the entity, if linked.
    pub area: Option<usize>,
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self {
            leafnums: [0; MAX_ENT_LEAFS],
            leaf_count: 0,
            head_node: -1,
            group_info: 0,
            area: None,
        }
    }
}

impl PhysicsState {
    pub fn leaf_number(&self, index: usize) -> i16 {
        self.leafnums[index]
    }

    pub fn leaf_numbers(&self) -> &[i16] {
        &self.leafnums[..self.leaf_count.min(MAX_ENT_LEAFS)]
    }

    pub fn add_leaf_number(&mut self, number: i16) {
        if self.leaf_count < MAX_ENT_LEAFS {
            self.leafnums[self.leaf_count] = number;
            self.leaf_count += 1;
        } else {
            self.leaf_count = MAX_ENT_LEAFS + 1;
        }
    }

    pub fn clear_node_state(&mut self) {
        self.leaf_count = 0;
        self.head_node = -1;
    }

    pub fn mark_leaf_count_overflowed(&mut self, top_node: i32) {
        self.leaf_count = 0;
        self.head_node = top_node;
        self.leafnums = [255; MAX_ENT_LEAFS];
    }

    pub fn copy_node_state_from(&mut self, other: &PhysicsState) {
        self.head_node = other.head_node;
        self.leaf_count = other.leaf_count;
        self.leafnums = other.leafnums;
    }
}

// ============================================================
// Edict
// ============================================================

#[derive(Debug, Clone)]
pub struct Edict {
    pub classname: String,

    pub origin: Vec3,
    pub angles: Vec3,
    pub velocity: Vec3,
    pub avelocity: Vec3,
    /// Velocity imparted by conveyors and currents.
    pub base_velocity: Vec3,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub size: Vec3,
    pub absmin: Vec3,
    pub absmax: Vec3,
    pub view_ofs: Vec3,
    /// Offset from the aim entity while following.
    pub v_angle: Vec3,

    pub movetype: MoveType,
    pub solid: Solid,
    pub flags: EntityFlags,
    /// Contents a brush entity imposes on the space it occupies.
    pub contents: Contents,
    pub model: Model,

    pub owner: Option<EntityHandle>,
    pub ground_entity: Option<EntityHandle>,
    pub aim_entity: Option<EntityHandle>,

    pub friction: f32,
    pub gravity: f32,
    pub buoyancy: f32,
    pub health: f32,
    pub dead_flag: DeadFlag,

    pub water_level: WaterLevel,
    pub water_type: Contents,
    pub air_finished: f32,
    pub pain_finished: f32,
    pub dmg: f32,
    pub dmg_time: f32,
    pub rad_suit_finished: f32,

    pub next_think: f32,
    /// Local time of pushers.
    pub ltime: f32,
    pub fix_angle: FixAngleMode,
    pub render_mode: RenderMode,

    // conveyors
    pub speed: f32,
    pub move_dir: Vec3,

    // animation state
    pub sequence: usize,
    pub frame: f32,
    pub controllers: [u8; MAX_CONTROLLERS],
    pub blenders: [u8; MAX_BLENDERS],
    pub has_shield: bool,

    pub physics: PhysicsState,

    pub think: Option<ThinkFn>,
    pub touch: Option<TouchFn>,
    pub blocked: Option<BlockedFn>,
    pub should_collide: Option<ShouldCollideFn>,
}

impl Default for Edict {
    fn default() -> Self {
        Self {
            classname: String::new(),
            origin: [0.0; 3],
            angles: [0.0; 3],
            velocity: [0.0; 3],
            avelocity: [0.0; 3],
            base_velocity: [0.0; 3],
            mins: [0.0; 3],
            maxs: [0.0; 3],
            size: [0.0; 3],
            absmin: [0.0; 3],
            absmax: [0.0; 3],
            view_ofs: [0.0; 3],
            v_angle: [0.0; 3],
            movetype: MoveType::None,
            solid: Solid::Not,
            flags: EntityFlags::empty(),
            contents: Contents::Empty,
            model: Model::None,
            owner: None,
            ground_entity: None,
            aim_entity: None,
            friction: 1.0,
            gravity: 1.0,
            buoyancy: 0.0,
            health: 0.0,
            dead_flag: DeadFlag::No,
            water_level: WaterLevel::Dry,
            water_type: Contents::Node,
            air_finished: 0.0,
            pain_finished: 0.0,
            dmg: 0.0,
            dmg_time: 0.0,
            rad_suit_finished: 0.0,
            next_think: 0.0,
            ltime: 0.0,
            fix_angle: FixAngleMode::None,
            render_mode: RenderMode::Normal,
            speed: 0.0,
            move_dir: [0.0; 3],
            sequence: 0,
            frame: 0.0,
            controllers: [0; MAX_CONTROLLERS],
            blenders: [0; MAX_BLENDERS],
            has_shield: false,
            physics: PhysicsState::default(),
            think: None,
            touch: None,
            blocked: None,
            should_collide: None,
        }
    }
}

impl Edict {
    pub fn new(classname: &str) -> Self {
        Self {
            classname: classname.to_string(),
            ..Default::default()
        }
    }

    pub fn set_size(&mut self, mins: &Vec3, maxs: &Vec3) {
        self.mins = *mins;
        self.maxs = *maxs;
        self.size = vector_subtract(maxs, mins);
    }

    #[inline]
    pub fn pending_destruction(&self) -> bool {
        self.flags.contains(EntityFlags::PENDING_DESTRUCTION)
    }

    #[inline]
    pub fn is_client(&self) -> bool {
        self.flags.contains(EntityFlags::CLIENT)
    }

    /// Absolute bounds, one unit larger on every side because moves stop
    /// an epsilon short of surfaces.
    pub fn set_abs_box(&mut self) {
        if self.solid == Solid::BSP && !vector_is_zero(&self.angles) {
            let max = radius_from_bounds(&self.mins, &self.maxs);
            for i in 0..3 {
                self.absmin[i] = self.origin[i] - max;
                self.absmax[i] = self.origin[i] + max;
            }
        } else {
            self.absmin = vector_add(&self.origin, &self.mins);
            self.absmax = vector_add(&self.origin, &self.maxs);
        }

        for i in 0..3 {
            self.absmin[i] -= 1.0;
            self.absmax[i] += 1.0;
        }
    }
}

// ============================================================
// EntityList
// ============================================================

#[derive(Debug, Clone, Default)]
struct EntitySlot {
    serial: u32,
    edict: Option<Edict>,
}

/// Generational arena of entities. Index 0 is the world, indices
/// 1..=max_clients are kept for players.
#[derive(Debug, Clone, Default)]
pub struct EntityList {
    slots: Vec<EntitySlot>,
    max_clients: usize,
}

impl EntityList {
    pub fn new(max_clients: usize) -> Self {
        Self {
            slots: Vec::new(),
            max_clients,
        }
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    /// Number of slots ever allocated, free or not.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.edict.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The first entity spawned becomes the world.
    pub fn spawn(&mut self, edict: Edict) -> PhysicsResult<EntityHandle> {
        if self.slots.is_empty() {
            self.slots.push(EntitySlot { serial: 0, edict: Some(edict) });
            for _ in 0..self.max_clients {
                self.slots.push(EntitySlot::default());
            }
            return Ok(EntityHandle::new(0, 0));
        }

        let first_free = (self.max_clients + 1..self.slots.len()).find(|&i| self.slots[i].edict.is_none());

        let index = match first_free {
            Some(i) => i,
            None => {
                if self.slots.len() >= MAX_EDICTS {
                    return Err(PhysicsError::OutOfEdicts);
                }
                self.slots.push(EntitySlot::default());
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[index];
        slot.edict = Some(edict);
        Ok(EntityHandle::new(index as u32, slot.serial))
    }

    /// Places a player in its reserved slot.
    pub fn spawn_client(&mut self, client: usize, edict: Edict) -> Option<EntityHandle> {
        if client == 0 || client > self.max_clients {
            return None;
        }
        let slot = self.slots.get_mut(client)?;
        if slot.edict.is_some() {
            return None;
        }
        slot.edict = Some(edict);
        Some(EntityHandle::new(client as u32, slot.serial))
    }

    pub fn get(&self, h: EntityHandle) -> Option<&Edict> {
        let slot = self.slots.get(h.index())?;
        if slot.serial != h.serial {
            return None;
        }
        slot.edict.as_ref()
    }

    pub fn get_mut(&mut self, h: EntityHandle) -> Option<&mut Edict> {
        let slot = self.slots.get_mut(h.index())?;
        if slot.serial != h.serial {
            return None;
        }
        slot.edict.as_mut()
    }

    /// Resolves an optional handle, treating stale handles as absent.
    pub fn lookup(&self, h: Option<EntityHandle>) -> Option<&Edict> {
        h.and_then(|h| self.get(h))
    }

    pub fn contains(&self, h: EntityHandle) -> bool {
        self.get(h).is_some()
    }

    /// Frees the slot. Outstanding handles to it go stale.
    pub fn destroy(&mut self, h: EntityHandle) -> Option<Edict> {
        let slot = self.slots.get_mut(h.index())?;
        if slot.serial != h.serial || slot.edict.is_none() {
            return None;
        }
        slot.serial = slot.serial.wrapping_add(1);
        slot.edict.take()
    }

    pub fn world(&self) -> EntityHandle {
        EntityHandle::new(0, self.slots.first().map_or(0, |s| s.serial))
    }

    pub fn handle_at(&self, index: usize) -> Option<EntityHandle> {
        let slot = self.slots.get(index)?;
        slot.edict.as_ref()?;
        Some(EntityHandle::new(index as u32, slot.serial))
    }

    pub fn first_entity(&self) -> Option<EntityHandle> {
        (0..self.slots.len()).find_map(|i| self.handle_at(i))
    }

    /// Next live entity after `h` in index order. Works even if `h` has
    /// been destroyed in the meantime.
    pub fn next_entity(&self, h: EntityHandle) -> Option<EntityHandle> {
        (h.index() + 1..self.slots.len()).find_map(|i| self.handle_at(i))
    }

    /// Snapshot of all live handles in index order.
    pub fn handles(&self) -> Vec<EntityHandle> {
        (0..self.slots.len()).filter_map(|i| self.handle_at(i)).collect()
    }
}

// ============================================================
// Tests
// ============================================================
