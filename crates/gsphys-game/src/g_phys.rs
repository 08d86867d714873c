// g_phys.rs -- entity movement

/*
pushmove objects do not obey gravity, and do not interact with each other or trigger fields,
but block normal movement and push normal objects when they move.

onground is set for toss objects when they come to a complete rest. it is set for stepping
objects when they touch a walkable surface.

doors, plats, etc are SOLID_BSP, and MOVETYPE_PUSH
bonus items are SOLID_TRIGGER touch, and MOVETYPE_TOSS
corpses are SOLID_NOT and MOVETYPE_TOSS
crates are SOLID_BBOX and MOVETYPE_TOSS
walking monsters are SOLID_SLIDEBOX and MOVETYPE_STEP
flying/floating monsters are SOLID_SLIDEBOX and MOVETYPE_FLY
*/

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gsphys_common::common::{com_dprintf, com_printf, PhysicsError, PhysicsResult};
use gsphys_common::cvar::{CvarContext, SV_BOUNCE, SV_FRICTION, SV_GRAVITY, SV_MAXVELOCITY, SV_STEPSIZE, SV_STOPSPEED};
use gsphys_common::shared::*;

use crate::dispatch::{call_blocked, call_think, call_touch};
use crate::g_local::*;
use crate::game_import::{pi_move, PhysicsImport};

// ============================================================
// Constants
// ============================================================

const MAX_CLIP_PLANES: usize = 5;

/// Seconds a submerged entity can hold its breath.
const AIR_TIME: f32 = 12.0;

const WADE_SAMPLES: [&str; 4] = [
    "player/pl_wade1.wav",
    "player/pl_wade2.wav",
    "player/pl_wade3.wav",
    "player/pl_wade4.wav",
];

// ============================================================
// Movement state
// ============================================================

/// A sound requested by movement. The host decides how to play it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundEvent {
    pub entity: EntityHandle,
    pub channel: SoundChannel,
    pub sample: &'static str,
}

/// State of an entity before a pusher moved it.
#[derive(Debug, Clone, Copy)]
struct MovedEntity {
    ent: EntityHandle,
    origin: Vec3,
    angles: Vec3,
    avelocity: Vec3,
    fix_angle: FixAngleMode,
}

/// Per-server movement state that survives between frames.
#[derive(Debug)]
pub struct GameMovement {
    /// While nonzero, every entity is relinked with trigger touching. Counts
    /// down once per frame.
    pub force_retouch: i32,
    time: f32,
    frametime: f32,
    move_cache: Vec<MovedEntity>,
    rng: StdRng,
    sound_events: Vec<SoundEvent>,
}

impl Default for GameMovement {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMovement {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic splash sound selection.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            force_retouch: 0,
            time: 0.0,
            frametime: 0.0,
            move_cache: Vec::new(),
            rng,
            sound_events: Vec::new(),
        }
    }

    /// Server time of the frame being simulated.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn frametime(&self) -> f32 {
        self.frametime
    }

    pub fn take_sound_events(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.sound_events)
    }

    /// Runs one frame of physics for every non-player entity, in index
    /// order. Entities flagged for destruction are removed as they are
    /// reached.
    pub fn run_physics(
        &mut self,
        physics: &mut dyn PhysicsImport,
        ents: &mut EntityList,
        cvars: &CvarContext,
        time: f32,
        frametime: f32,
    ) -> PhysicsResult<()> {
        self.time = time;
        self.frametime = frametime;

        let mut ctx = MoveContext { mv: self, physics, ents, cvars };
        ctx.run_physics()
    }
}

// ============================================================
// ClipVelocity
// ============================================================

/// Slide off of the impacting object.
/// Returns the blocked flags:
/// - 1 = floor
/// - 2 = step / wall
pub fn clip_velocity(in_vel: &Vec3, normal: &Vec3, out: &mut Vec3, overbounce: f32) -> i32 {
    let mut blocked = 0;

    if normal[2] > 0.0 {
        blocked |= 1; // floor
    }
    if normal[2] == 0.0 {
        blocked |= 2; // step
    }

    let backoff = dot_product(in_vel, normal) * overbounce;

    for i in 0..3 {
        let change = normal[i] * backoff;
        out[i] = in_vel[i] - change;
        if out[i] > -STOP_EPSILON && out[i] < STOP_EPSILON {
            out[i] = 0.0;
        }
    }

    blocked
}

// ============================================================
// SV_CheckVelocity
// ============================================================

/// Zeroes NaN components and bounds velocity to `max_velocity` per axis.
pub fn check_velocity(ent: &mut Edict, max_velocity: f32) {
    for i in 0..3 {
        if ent.velocity[i].is_nan() {
            com_printf(&format!("Got a NaN velocity on {}\n", ent.classname));
            ent.velocity[i] = 0.0;
        }
        if ent.origin[i].is_nan() {
            com_printf(&format!("Got a NaN origin on {}\n", ent.classname));
            ent.origin[i] = 0.0;
        }

        if ent.velocity[i] > max_velocity {
            com_dprintf(&format!("Got a velocity too high on {}\n", ent.classname));
            ent.velocity[i] = max_velocity;
        } else if ent.velocity[i] < -max_velocity {
            com_dprintf(&format!("Got a velocity too low on {}\n", ent.classname));
            ent.velocity[i] = -max_velocity;
        }
    }
}

// ============================================================
// Frame context
// ============================================================

/// Everything one physics frame works with.
struct MoveContext<'a> {
    mv: &'a mut GameMovement,
    physics: &'a mut dyn PhysicsImport,
    ents: &'a mut EntityList,
    cvars: &'a CvarContext,
}

impl<'a> MoveContext<'a> {
    fn cvar(&self, name: &str) -> f32 {
        self.cvars.variable_value(name)
    }

    fn start_sound(&mut self, ent: EntityHandle, channel: SoundChannel, sample: &'static str) {
        self.mv.sound_events.push(SoundEvent { entity: ent, channel, sample });
    }

    #[allow(clippy::too_many_arguments)]
    fn sweep(
        &mut self,
        start: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        end: &Vec3,
        trace_type: TraceType,
        pass: EntityHandle,
        monster_clip: bool,
    ) -> PhysicsResult<Trace> {
        pi_move(self.physics, self.ents, start, mins, maxs, end, trace_type, Some(pass), monster_clip)
    }

    fn link(&mut self, ent: EntityHandle, touch_triggers: bool) -> PhysicsResult<()> {
        if !self.ents.contains(ent) {
            return Ok(());
        }
        self.physics.link_edict(self.ents, ent, touch_triggers)
    }

    fn destroy(&mut self, ent: EntityHandle) {
        if self.ents.contains(ent) {
            self.physics.unlink_edict(self.ents, ent);
            self.ents.destroy(ent);
        }
    }

    fn check_velocity(&mut self, ent: EntityHandle) {
        let max_velocity = self.cvar(SV_MAXVELOCITY);
        if let Some(e) = self.ents.get_mut(ent) {
            check_velocity(e, max_velocity);
        }
    }

    fn add_gravity(&mut self, ent: EntityHandle) {
        let gravity = self.cvar(SV_GRAVITY);
        let frametime = self.mv.frametime;

        if let Some(e) = self.ents.get_mut(ent) {
            let ent_gravity = if e.gravity != 0.0 { e.gravity } else { 1.0 };
            e.velocity[2] -= ent_gravity * gravity * frametime;
            e.velocity[2] += e.base_velocity[2] * frametime;
            e.base_velocity[2] = 0.0;
        }

        self.check_velocity(ent);
    }

    // ============================================================
    // SV_RunThink
    // ============================================================

    /// Runs thinking code if it comes due this frame. Returns false if the
    /// entity is gone afterwards.
    fn run_think(&mut self, ent: EntityHandle) -> bool {
        let (time, frametime) = (self.mv.time, self.mv.frametime);

        let Some(e) = self.ents.get_mut(ent) else {
            return false;
        };

        if !e.pending_destruction() {
            let mut think_time = e.next_think;
            if think_time > 0.0 && think_time < time + frametime {
                // don't let things stay in the past
                if think_time < time {
                    think_time = time;
                }
                e.next_think = 0.0;
                call_think(ent, self.ents, think_time);
            }
        }

        let pending = self.ents.get(ent).map_or(true, |e| e.pending_destruction());
        if pending {
            self.destroy(ent);
        }
        !pending
    }

    // ============================================================
    // SV_Impact
    // ============================================================

    /// Two entities have touched, so run their touch functions.
    fn impact(&mut self, e1: EntityHandle, e2: EntityHandle, trace: &Trace) {
        let (Some(a), Some(b)) = (self.ents.get(e1), self.ents.get(e2)) else {
            return;
        };
        if a.pending_destruction() || b.pending_destruction() {
            return;
        }

        let (g1, g2) = (a.physics.group_info, b.physics.group_info);
        if g1 != 0 && g2 != 0 && !self.physics.test_group_operation(g1, g2) {
            return;
        }

        if a.solid != Solid::Not {
            call_touch(e1, e2, self.ents, Some(trace));
        }

        if self.ents.get(e2).is_some_and(|e| e.solid != Solid::Not) {
            call_touch(e2, e1, self.ents, Some(trace));
        }
    }

    // ============================================================
    // SV_TestEntityPosition
    // ============================================================

    /// The entity the given entity is stuck in, if any.
    fn test_entity_position(&mut self, ent: EntityHandle) -> PhysicsResult<Option<EntityHandle>> {
        let Some(e) = self.ents.get(ent) else {
            return Ok(None);
        };
        let (origin, mins, maxs) = (e.origin, e.mins, e.maxs);
        let monster_clip = e.flags.contains(EntityFlags::MONSTERCLIP);

        let trace = self.sweep(&origin, &mins, &maxs, &origin, TraceType::None, ent, monster_clip)?;

        if trace.startsolid {
            return Ok(Some(trace.ent.unwrap_or_else(|| self.ents.world())));
        }
        Ok(None)
    }

    // ============================================================
    // SV_PushEntity
    // ============================================================

    /// Moves the entity by `push` without changing its velocity.
    fn push_entity(&mut self, ent: EntityHandle, push: &Vec3) -> PhysicsResult<Trace> {
        let Some(e) = self.ents.get(ent) else {
            return Ok(Trace::default());
        };

        let start = e.origin;
        let end = vector_add(&start, push);
        let (mins, maxs) = (e.mins, e.maxs);
        let monster_clip = e.flags.contains(EntityFlags::MONSTERCLIP);

        let trace_type = if e.movetype == MoveType::FlyMissile {
            TraceType::Missile
        } else if e.solid <= Solid::Trigger {
            TraceType::IgnoreMonsters
        } else {
            TraceType::None
        };

        let trace = self.sweep(&start, &mins, &maxs, &end, trace_type, ent, monster_clip)?;

        if trace.fraction != 0.0 {
            if let Some(e) = self.ents.get_mut(ent) {
                e.origin = trace.endpos;
            }
        }

        self.link(ent, true)?;

        if let Some(other) = trace.ent {
            self.impact(ent, other, &trace);
        }

        Ok(trace)
    }

    // ============================================================
    // SV_FlyMove
    // ============================================================

    /// The basic solid body movement clip that slides along multiple planes.
    /// Returns the clipflags if the velocity was modified (hit something solid):
    /// - 1 = floor
    /// - 2 = wall / step
    /// - 4 = dead stop
    fn fly_move(&mut self, ent: EntityHandle, time: f32) -> PhysicsResult<i32> {
        let Some(e) = self.ents.get(ent) else {
            return Ok(0);
        };

        let monster_clip = e.flags.contains(EntityFlags::MONSTERCLIP);
        let (mins, maxs) = (e.mins, e.maxs);
        let primal_velocity = e.velocity;
        let mut original_velocity = e.velocity;
        let mut new_velocity = [0.0; 3];
        let mut planes = [[0.0f32; 3]; MAX_CLIP_PLANES];
        let mut numplanes = 0;
        let mut blocked = 0;
        let mut time_left = time;
        let bounce = self.cvar(SV_BOUNCE);

        for _bumpcount in 0..4 {
            let Some(e) = self.ents.get(ent) else {
                break;
            };
            if vector_is_zero(&e.velocity) {
                break;
            }

            let origin = e.origin;
            let end = vector_ma(&origin, time_left, &e.velocity);

            let trace = self.sweep(&origin, &mins, &maxs, &end, TraceType::None, ent, monster_clip)?;

            if trace.allsolid {
                // entity is trapped in another solid
                if let Some(e) = self.ents.get_mut(ent) {
                    e.velocity = VEC3_ORIGIN;
                }
                return Ok(4);
            }

            if trace.fraction > 0.0 {
                // actually covered some distance
                let test = self.sweep(&trace.endpos, &mins, &maxs, &trace.endpos, TraceType::None, ent, monster_clip)?;
                if !test.allsolid {
                    if let Some(e) = self.ents.get_mut(ent) {
                        e.origin = trace.endpos;
                        original_velocity = e.velocity;
                    }
                    numplanes = 0;
                }
            }

            if trace.fraction == 1.0 {
                break; // moved the entire distance
            }

            let hit = trace.ent.ok_or(PhysicsError::NullTraceEntity)?;

            if trace.plane.normal[2] > 0.7 {
                blocked |= 1; // floor

                let walkable = self
                    .ents
                    .get(hit)
                    .is_some_and(|h| h.solid == Solid::BSP || h.solid == Solid::SlideBox || h.movetype == MoveType::PushStep);
                if let Some(e) = self.ents.get_mut(ent) {
                    if walkable || e.is_client() {
                        e.flags |= EntityFlags::ONGROUND;
                        e.ground_entity = Some(hit);
                    }
                }
            }
            if trace.plane.normal[2] == 0.0 {
                blocked |= 2; // step
            }

            // run the impact function
            self.impact(ent, hit, &trace);
            let Some(e) = self.ents.get(ent) else {
                break;
            };
            if e.pending_destruction() {
                break; // removed by the impact function
            }
            let (movetype, friction, on_ground) = (e.movetype, e.friction, e.flags.contains(EntityFlags::ONGROUND));

            time_left -= time_left * trace.fraction;

            // cliped to another plane
            if numplanes >= MAX_CLIP_PLANES {
                if let Some(e) = self.ents.get_mut(ent) {
                    e.velocity = VEC3_ORIGIN;
                }
                break;
            }

            planes[numplanes] = trace.plane.normal;
            numplanes += 1;

            // walkers bounce off walls unless they stand still on normal ground
            if numplanes == 1 && movetype == MoveType::Walk && (!on_ground || friction != 1.0) {
                let overbounce = if planes[0][2] > 0.7 { 1.0 } else { 1.0 + bounce * (1.0 - friction) };
                clip_velocity(&original_velocity, &planes[0], &mut new_velocity, overbounce);

                original_velocity = new_velocity;
                if let Some(e) = self.ents.get_mut(ent) {
                    e.velocity = new_velocity;
                }
                continue;
            }

            // modify original_velocity so it parallels all of the clip planes
            let mut i = 0;
            while i < numplanes {
                clip_velocity(&original_velocity, &planes[i], &mut new_velocity, 1.0);

                let mut j = 0;
                while j < numplanes {
                    if j != i && dot_product(&new_velocity, &planes[j]) < 0.0 {
                        break; // not ok
                    }
                    j += 1;
                }
                if j == numplanes {
                    break;
                }
                i += 1;
            }

            let Some(e) = self.ents.get_mut(ent) else {
                break;
            };

            if i != numplanes {
                // go along this plane
                e.velocity = new_velocity;
            } else {
                // go along the crease
                if numplanes != 2 {
                    e.velocity = VEC3_ORIGIN;
                    break;
                }
                let dir = cross_product(&planes[0], &planes[1]);
                let d = dot_product(&dir, &e.velocity);
                e.velocity = vector_scale(&dir, d);
            }

            // if velocity is against the original velocity, stop dead
            // to avoid tiny occilations in sloping corners
            if dot_product(&e.velocity, &primal_velocity) <= 0.0 {
                e.velocity = VEC3_ORIGIN;
                break;
            }
        }

        Ok(blocked)
    }

    // ============================================================
    // Water
    // ============================================================

    /// Samples the contents at the feet, middle and eyes of the entity and
    /// records its water level. Currents push through base velocity.
    /// Returns true if deeper than the feet.
    fn check_water(&mut self, ent: EntityHandle) -> PhysicsResult<bool> {
        let Some(e) = self.ents.get_mut(ent) else {
            return Ok(false);
        };
        e.water_level = WaterLevel::Dry;
        e.water_type = Contents::Empty;

        let group = e.physics.group_info;
        let (absmin, absmax, view_ofs) = (e.absmin, e.absmax, e.view_ofs);

        let mut point = [
            0.5 * (absmin[0] + absmax[0]),
            0.5 * (absmin[1] + absmax[1]),
            absmin[2] + 1.0,
        ];

        let contents = self.physics.point_contents(self.ents, &point, group)?;
        if !contents.is_liquid() {
            return Ok(false);
        }

        let true_contents = self.physics.true_point_contents(&point)?;
        let level = self.water_depth(&mut point, &absmin, &absmax, &view_ofs, group)?;

        if let Some(e) = self.ents.get_mut(ent) {
            e.water_type = contents;
            e.water_level = level;

            if let Some(dir) = current_direction(true_contents) {
                e.base_velocity = vector_ma(&e.base_velocity, level.as_f32() * 50.0, &dir);
            }
        }

        Ok(level > WaterLevel::Feet)
    }

    /// Water level of a box whose feet are already known to be in liquid.
    /// `point` enters at the feet sample.
    fn water_depth(
        &mut self,
        point: &mut Vec3,
        absmin: &Vec3,
        absmax: &Vec3,
        view_ofs: &Vec3,
        group: u32,
    ) -> PhysicsResult<WaterLevel> {
        if absmin[2] == absmax[2] {
            return Ok(WaterLevel::Head);
        }

        point[2] = (absmin[2] + absmax[2]) * 0.5;
        if !self.physics.point_contents(self.ents, point, group)?.is_liquid() {
            return Ok(WaterLevel::Feet);
        }

        *point = vector_add(point, view_ofs);
        if !self.physics.point_contents(self.ents, point, group)?.is_liquid() {
            return Ok(WaterLevel::Waist);
        }

        Ok(WaterLevel::Head)
    }

    /// Like `check_water`, but plays splash sounds when the entity enters
    /// or leaves liquid.
    fn check_water_transition(&mut self, ent: EntityHandle) -> PhysicsResult<()> {
        let Some(e) = self.ents.get(ent) else {
            return Ok(());
        };

        let group = e.physics.group_info;
        let (absmin, absmax, view_ofs, water_type) = (e.absmin, e.absmax, e.view_ofs, e.water_type);

        let mut point = [
            0.5 * (absmin[0] + absmax[0]),
            0.5 * (absmin[1] + absmax[1]),
            absmin[2] + 1.0,
        ];
        let contents = self.physics.point_contents(self.ents, &point, group)?;

        if water_type == Contents::Node {
            // just spawned here
            if let Some(e) = self.ents.get_mut(ent) {
                e.water_type = contents;
                e.water_level = WaterLevel::Feet;
            }
            return Ok(());
        }

        if contents.is_liquid() {
            if water_type == Contents::Empty {
                // just crossed into water
                self.start_sound(ent, SoundChannel::Auto, WADE_SAMPLES[0]);
                if let Some(e) = self.ents.get_mut(ent) {
                    e.velocity[2] *= 0.5;
                }
            }

            let level = self.water_depth(&mut point, &absmin, &absmax, &view_ofs, group)?;
            if let Some(e) = self.ents.get_mut(ent) {
                e.water_type = contents;
                e.water_level = level;
            }
        } else {
            if water_type != Contents::Empty {
                // just crossed into open
                self.start_sound(ent, SoundChannel::Auto, WADE_SAMPLES[1]);
            }
            if let Some(e) = self.ents.get_mut(ent) {
                e.water_type = Contents::Empty;
                e.water_level = WaterLevel::Dry;
            }
        }

        Ok(())
    }

    /// Binary search for the water surface between `input` and `output`
    /// heights relative to `center`.
    fn recursive_water_level(&mut self, center: &Vec3, output: f32, input: f32, count: u32, group: u32) -> PhysicsResult<f32> {
        let offset = (output - input) * 0.5 + input;
        if count > 4 {
            return Ok(offset);
        }

        let mut test = *center;
        test[2] += offset;

        if self.physics.point_contents(self.ents, &test, group)? == Contents::Water {
            self.recursive_water_level(center, output, offset, count + 1, group)
        } else {
            self.recursive_water_level(center, offset, input, count + 1, group)
        }
    }

    /// Height of the part of the entity below the water surface.
    fn submerged(&mut self, ent: EntityHandle) -> PhysicsResult<f32> {
        let Some(e) = self.ents.get(ent) else {
            return Ok(0.0);
        };

        let group = e.physics.group_info;
        let (absmin, absmax, height, level) = (e.absmin, e.absmax, e.maxs[2] - e.mins[2], e.water_level);

        let center = vector_scale(&vector_add(&absmin, &absmax), 0.5);
        let bottom = absmin[2] - center[2];

        match level {
            WaterLevel::Dry => return Ok(0.0),
            WaterLevel::Feet => {
                return Ok(self.recursive_water_level(&center, 0.0, bottom, 0, group)? - bottom);
            }
            WaterLevel::Head => {
                let test = [center[0], center[1], absmax[2]];
                if self.physics.point_contents(self.ents, &test, group)? == Contents::Water {
                    return Ok(height);
                }
            }
            WaterLevel::Waist => {}
        }

        let top = absmax[2] - center[2];
        let half_top = top * 0.5;
        let point = [center[0], center[1], center[2] + half_top];

        let water_level = if self.physics.point_contents(self.ents, &point, group)? == Contents::Water {
            self.recursive_water_level(&center, top, half_top, 1, group)?
        } else {
            self.recursive_water_level(&center, half_top, 0.0, 1, group)?
        };

        Ok(water_level - bottom)
    }

    /// Breath and liquid damage timers, water entry and exit sounds, and
    /// water drag.
    fn water_move(&mut self, ent: EntityHandle) {
        let time = self.mv.time;
        let frametime = self.mv.frametime;

        let Some(e) = self.ents.get_mut(ent) else {
            return;
        };

        if e.movetype == MoveType::Noclip {
            e.air_finished = time + AIR_TIME;
            return;
        }

        if e.health < 0.0 {
            return;
        }

        let head_height = if e.dead_flag != DeadFlag::No { WaterLevel::Feet } else { WaterLevel::Head };

        if !e.flags.intersects(EntityFlags::IMMUNE_WATER | EntityFlags::GODMODE) {
            if e.flags.contains(EntityFlags::SWIM) || e.water_level >= head_height {
                if time > e.air_finished && time > e.pain_finished {
                    // drowning
                    e.dmg += 2.0;
                    if e.dmg > 15.0 {
                        e.dmg = 10.0;
                    }
                    e.pain_finished = time + 1.0;
                }
            } else {
                e.air_finished = time + AIR_TIME;
                e.dmg = 2.0;
            }
        }

        if e.water_level == WaterLevel::Dry {
            let was_in_water = e.flags.contains(EntityFlags::INWATER);
            e.flags.remove(EntityFlags::INWATER);
            e.air_finished = time + AIR_TIME;

            if was_in_water {
                let sample = WADE_SAMPLES[self.mv.rng.gen_range(0..=3)];
                self.start_sound(ent, SoundChannel::Body, sample);
            }
            return;
        }

        match e.water_type {
            Contents::Lava => {
                if !e.flags.intersects(EntityFlags::IMMUNE_LAVA | EntityFlags::GODMODE) && time > e.dmg_time {
                    e.dmg_time = if time < e.rad_suit_finished { time + 0.2 } else { time + 1.0 };
                }
            }
            Contents::Slime => {
                if !e.flags.intersects(EntityFlags::IMMUNE_SLIME | EntityFlags::GODMODE)
                    && time > e.dmg_time
                    && time < e.rad_suit_finished
                {
                    e.dmg_time = time + 1.0;
                }
            }
            _ => {}
        }

        let mut splash = false;
        if !e.flags.contains(EntityFlags::INWATER) {
            splash = e.water_type == Contents::Water;
            e.flags |= EntityFlags::INWATER;
            e.dmg_time = 0.0;
        }

        if !e.flags.contains(EntityFlags::WATERJUMP) {
            let drag = e.water_level.as_f32() * -0.8 * frametime;
            e.velocity = vector_ma(&e.velocity, drag, &e.velocity);
        }

        if splash {
            let sample = WADE_SAMPLES[self.mv.rng.gen_range(0..=3)];
            self.start_sound(ent, SoundChannel::Body, sample);
        }
    }

    // ============================================================
    // Ground tests
    // ============================================================

    /// True if any bottom corner of the box is in solid.
    fn is_on_ground(&mut self, ent: EntityHandle) -> PhysicsResult<bool> {
        let Some(e) = self.ents.get(ent) else {
            return Ok(false);
        };

        let group = e.physics.group_info;
        let mins = vector_add(&e.origin, &e.mins);
        let maxs = vector_add(&e.origin, &e.maxs);

        for x in 0..=1 {
            for y in 0..=1 {
                let point = [
                    if x != 0 { maxs[0] } else { mins[0] },
                    if y != 0 { maxs[1] } else { mins[1] },
                    mins[2] - 1.0,
                ];
                if self.physics.point_contents(self.ents, &point, group)? == Contents::Solid {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Returns false if any part of the bottom of the entity is off an edge
    /// that is not a staircase.
    fn check_bottom(&mut self, ent: EntityHandle) -> PhysicsResult<bool> {
        let Some(e) = self.ents.get(ent) else {
            return Ok(false);
        };

        let group = e.physics.group_info;
        let mins = vector_add(&e.origin, &e.mins);
        let maxs = vector_add(&e.origin, &e.maxs);

        // if all of the points under the corners are solid world, don't bother
        // with the tougher checks
        for x in 0..=1 {
            for y in 0..=1 {
                let start = [
                    if x != 0 { maxs[0] } else { mins[0] },
                    if y != 0 { maxs[1] } else { mins[1] },
                    mins[2] - 1.0,
                ];
                if self.physics.point_contents(self.ents, &start, group)? != Contents::Solid {
                    return self.internal_check_bottom(ent, &mins, &maxs);
                }
            }
        }

        Ok(true)
    }

    /// Traces down from the center and the corners. The corners may not
    /// drop further than a step below the center.
    fn internal_check_bottom(&mut self, ent: EntityHandle, mins: &Vec3, maxs: &Vec3) -> PhysicsResult<bool> {
        let monster_clip = self.ents.get(ent).is_some_and(|e| e.flags.contains(EntityFlags::MONSTERCLIP));
        let stepsize = self.cvar(SV_STEPSIZE);

        let mut start = [
            (mins[0] + maxs[0]) * 0.5,
            (mins[1] + maxs[1]) * 0.5,
            mins[2] + stepsize,
        ];
        let mut stop = [start[0], start[1], start[2] - 2.0 * stepsize];

        let trace = self.sweep(&start, &VEC3_ORIGIN, &VEC3_ORIGIN, &stop, TraceType::IgnoreMonsters, ent, monster_clip)?;
        if trace.fraction == 1.0 {
            return Ok(false);
        }
        let middle = trace.endpos[2];

        for x in 0..=1 {
            for y in 0..=1 {
                start[0] = if x != 0 { maxs[0] } else { mins[0] };
                start[1] = if y != 0 { maxs[1] } else { mins[1] };
                stop[0] = start[0];
                stop[1] = start[1];

                let trace = self.sweep(&start, &VEC3_ORIGIN, &VEC3_ORIGIN, &stop, TraceType::IgnoreMonsters, ent, monster_clip)?;
                if trace.fraction == 1.0 || middle - trace.endpos[2] > stepsize {
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }

    // ============================================================
    // PUSHMOVE
    // ============================================================

    /// Whether `check` has to move along with a pusher occupying
    /// `mins`..`maxs`: it rides on the pusher, or the pusher's new position
    /// overlaps it.
    fn is_push_candidate(&mut self, check: EntityHandle, pusher: EntityHandle, mins: &Vec3, maxs: &Vec3) -> PhysicsResult<bool> {
        let Some(c) = self.ents.get(check) else {
            return Ok(false);
        };

        if matches!(c.movetype, MoveType::None | MoveType::Push | MoveType::Follow | MoveType::Noclip) {
            return Ok(false);
        }

        // an entity standing on the pusher always moves
        if c.flags.contains(EntityFlags::ONGROUND) && c.ground_entity == Some(pusher) {
            return Ok(true);
        }

        if c.absmin[0] >= maxs[0]
            || c.absmin[1] >= maxs[1]
            || c.absmin[2] >= maxs[2]
            || mins[0] >= c.absmax[0]
            || mins[1] >= c.absmax[1]
            || mins[2] >= c.absmax[2]
        {
            return Ok(false);
        }

        // see if the ent's bbox is inside the pusher's final position
        Ok(self.test_entity_position(check)?.is_some())
    }

    /// Records `check` as moved and pushes it by `push` with the pusher
    /// made non-solid.
    fn push_rider(&mut self, check: EntityHandle, pusher: EntityHandle, push: &Vec3) -> PhysicsResult<Vec3> {
        let Some(c) = self.ents.get_mut(check) else {
            return Ok(VEC3_ORIGIN);
        };
        if c.movetype != MoveType::Walk {
            c.flags.remove(EntityFlags::ONGROUND);
        }
        let saved = c.origin;
        let moved = MovedEntity {
            ent: check,
            origin: c.origin,
            angles: c.angles,
            avelocity: c.avelocity,
            fix_angle: c.fix_angle,
        };

        if self.mv.move_cache.len() >= MAX_EDICTS {
            return Err(PhysicsError::OutOfEdicts);
        }
        self.mv.move_cache.push(moved);

        let pusher_solid = self.ents.get(pusher).map_or(Solid::BSP, |p| p.solid);
        if let Some(p) = self.ents.get_mut(pusher) {
            p.solid = Solid::Not;
        }
        let result = self.push_entity(check, push);
        if let Some(p) = self.ents.get_mut(pusher) {
            p.solid = pusher_solid;
        }
        result?;

        Ok(saved)
    }

    /// Whether a pushed entity ended up somewhere it cannot stay. Non-solid
    /// entities stuck that way are squashed instead.
    fn rider_blocks(&mut self, check: EntityHandle, squash_height: bool) -> PhysicsResult<bool> {
        if self.test_entity_position(check)?.is_none() {
            return Ok(false);
        }

        let Some(c) = self.ents.get_mut(check) else {
            return Ok(false);
        };

        // point entities can't be blocked
        if c.mins[0] == c.maxs[0] {
            return Ok(false);
        }

        if c.solid != Solid::Not && c.solid != Solid::Trigger {
            return Ok(true);
        }

        // corpses and triggers get squashed
        c.mins[0] = 0.0;
        c.mins[1] = 0.0;
        c.maxs[0] = 0.0;
        c.maxs[1] = 0.0;
        if squash_height {
            c.maxs[2] = c.mins[2];
        }
        Ok(false)
    }

    /// Puts everything in the move cache back the way it was before the
    /// push.
    fn restore_moved(&mut self) -> PhysicsResult<()> {
        let mut moved = std::mem::take(&mut self.mv.move_cache);

        for m in &moved {
            let Some(e) = self.ents.get_mut(m.ent) else {
                continue;
            };
            e.origin = m.origin;
            e.angles = m.angles;
            e.avelocity = m.avelocity;
            e.fix_angle = m.fix_angle;

            self.link(m.ent, false)?;
        }

        moved.clear();
        self.mv.move_cache = moved;
        Ok(())
    }

    /// Objects need to be moved back on a failed push, otherwise riders
    /// would continue to slide. Returns false if the move was blocked.
    fn push_move(&mut self, pusher: EntityHandle, movetime: f32) -> PhysicsResult<bool> {
        let Some(p) = self.ents.get_mut(pusher) else {
            return Ok(true);
        };

        if vector_is_zero(&p.velocity) {
            p.ltime += movetime;
            return Ok(true);
        }

        let saved_origin = p.origin;
        let saved_ltime = p.ltime;
        let push = vector_scale(&p.velocity, movetime);
        let mins = vector_add(&p.absmin, &push);
        let maxs = vector_add(&p.absmax, &push);

        // move the pusher to its final position
        p.origin = vector_add(&saved_origin, &push);
        p.ltime += movetime;
        let pusher_solid = p.solid;
        self.link(pusher, false)?;

        if pusher_solid == Solid::Not {
            return Ok(true);
        }

        self.mv.move_cache.clear();

        // see if any solid entities are inside the final position
        for check in self.ents.handles().into_iter().skip(1) {
            if !self.is_push_candidate(check, pusher, &mins, &maxs)? {
                continue;
            }

            let saved = self.push_rider(check, pusher, &push)?;

            if !self.rider_blocks(check, true)? {
                continue;
            }

            // fail the move
            if let Some(c) = self.ents.get_mut(check) {
                c.origin = saved;
            }
            self.link(check, true)?;

            if let Some(p) = self.ents.get_mut(pusher) {
                p.origin = saved_origin;
            }
            self.link(pusher, false)?;
            if let Some(p) = self.ents.get_mut(pusher) {
                p.ltime = saved_ltime;
            }

            call_blocked(pusher, check, self.ents);

            self.restore_moved()?;
            return Ok(false);
        }

        self.mv.move_cache.clear();
        Ok(true)
    }

    /// Rotating counterpart of `push_move`. Riders are carried around the
    /// pusher origin and turned with it.
    fn push_rotate(&mut self, pusher: EntityHandle, movetime: f32) -> PhysicsResult<bool> {
        let Some(p) = self.ents.get_mut(pusher) else {
            return Ok(true);
        };

        if vector_is_zero(&p.avelocity) {
            p.ltime += movetime;
            return Ok(true);
        }

        let amove = vector_scale(&p.avelocity, movetime);
        let (forward, right, up) = angle_vectors_tuple(&p.angles);

        let saved_angles = p.angles;
        let saved_ltime = p.ltime;
        p.angles = vector_add(&p.angles, &amove);
        let (forward_now, right_now, up_now) = angle_vectors_transpose(&p.angles);

        p.ltime += movetime;
        let pusher_solid = p.solid;
        self.link(pusher, false)?;

        if pusher_solid == Solid::Not {
            return Ok(true);
        }

        let Some(p) = self.ents.get(pusher) else {
            return Ok(true);
        };
        let (pusher_origin, pusher_absmin, pusher_absmax) = (p.origin, p.absmin, p.absmax);

        self.mv.move_cache.clear();

        for check in self.ents.handles().into_iter().skip(1) {
            if !self.is_push_candidate(check, pusher, &pusher_absmin, &pusher_absmax)? {
                continue;
            }

            let Some(c) = self.ents.get(check) else {
                continue;
            };

            // distance from the rotation axis, measured from the box center
            // for monsters that push others
            let distance = if c.movetype == MoveType::PushStep {
                vector_subtract(&vector_scale(&vector_add(&c.absmin, &c.absmax), 0.5), &pusher_origin)
            } else {
                vector_subtract(&c.origin, &pusher_origin)
            };

            let local = [
                dot_product(&forward, &distance),
                -dot_product(&right, &distance),
                dot_product(&up, &distance),
            ];
            let push = [
                dot_product(&local, &forward_now) - distance[0],
                dot_product(&local, &right_now) - distance[1],
                dot_product(&local, &up_now) - distance[2],
            ];

            let saved = self.push_rider(check, pusher, &push)?;

            if let Some(c) = self.ents.get_mut(check) {
                if c.movetype != MoveType::PushStep {
                    if c.is_client() {
                        c.fix_angle = FixAngleMode::AddAVelocity;
                        c.avelocity[YAW] += amove[YAW];
                    } else {
                        c.angles[YAW] += amove[YAW];
                    }
                }
            }

            if !self.rider_blocks(check, false)? {
                continue;
            }

            // fail the rotation
            if let Some(c) = self.ents.get_mut(check) {
                c.origin = saved;
            }
            self.link(check, true)?;

            if let Some(p) = self.ents.get_mut(pusher) {
                p.angles = saved_angles;
            }
            self.link(pusher, false)?;
            if let Some(p) = self.ents.get_mut(pusher) {
                p.ltime = saved_ltime;
            }

            call_blocked(pusher, check, self.ents);

            self.restore_moved()?;
            return Ok(false);
        }

        self.mv.move_cache.clear();
        Ok(true)
    }

    // ============================================================
    // Movetype handlers
    // ============================================================

    /// Bmodel objects don't interact with each other, but push all box
    /// objects.
    fn physics_pusher(&mut self, ent: EntityHandle) -> PhysicsResult<()> {
        let frametime = self.mv.frametime;
        let Some(e) = self.ents.get(ent) else {
            return Ok(());
        };

        let old_ltime = e.ltime;
        let think_time = e.next_think;

        let movetime = if think_time < old_ltime + frametime {
            (think_time - old_ltime).max(0.0)
        } else {
            frametime
        };

        if movetime > 0.0 {
            let (rotating, moving) = (!vector_is_zero(&e.avelocity), !vector_is_zero(&e.velocity));

            if rotating && moving {
                if self.push_rotate(ent, movetime)? {
                    let new_ltime = self.ents.get(ent).map_or(old_ltime, |e| e.ltime);
                    if let Some(e) = self.ents.get_mut(ent) {
                        e.ltime = old_ltime;
                    }
                    self.push_move(ent, movetime)?;
                    if let Some(e) = self.ents.get_mut(ent) {
                        if new_ltime > e.ltime {
                            e.ltime = new_ltime;
                        }
                    }
                }
            } else if rotating {
                self.push_rotate(ent, movetime)?;
            } else {
                self.push_move(ent, movetime)?;
            }
        }

        let Some(e) = self.ents.get_mut(ent) else {
            return Ok(());
        };

        for angle in e.angles.iter_mut() {
            if *angle < -3600.0 || *angle > 3600.0 {
                *angle %= 3600.0;
            }
        }

        if think_time > old_ltime && (e.flags.contains(EntityFlags::ALWAYSTHINK) || e.ltime >= think_time) {
            e.next_think = 0.0;
            call_think(ent, self.ents, self.mv.time);
        }

        Ok(())
    }

    /// Non moving objects can only think.
    fn physics_none(&mut self, ent: EntityHandle) {
        self.run_think(ent);
    }

    /// Entities that are attached to another entity's origin.
    fn physics_follow(&mut self, ent: EntityHandle) -> PhysicsResult<()> {
        if !self.run_think(ent) {
            return Ok(());
        }

        let Some(e) = self.ents.get(ent) else {
            return Ok(());
        };

        let aim = self.ents.lookup(e.aim_entity).map(|a| (a.origin, a.angles));

        match aim {
            Some((origin, angles)) => {
                if let Some(e) = self.ents.get_mut(ent) {
                    e.origin = vector_add(&origin, &e.v_angle);
                    e.angles = angles;
                }
                self.link(ent, true)
            }
            None => {
                tracing::debug!(classname = %e.classname, "MOVETYPE_FOLLOW with NULL aiment");
                if let Some(e) = self.ents.get_mut(ent) {
                    e.movetype = MoveType::None;
                }
                Ok(())
            }
        }
    }

    /// A moving object that doesn't obey physics.
    fn physics_noclip(&mut self, ent: EntityHandle) -> PhysicsResult<()> {
        if !self.run_think(ent) {
            return Ok(());
        }

        let frametime = self.mv.frametime;
        if let Some(e) = self.ents.get_mut(ent) {
            e.angles = vector_ma(&e.angles, frametime, &e.avelocity);
            e.origin = vector_ma(&e.origin, frametime, &e.velocity);
        }

        self.link(ent, false)
    }

    /// Toss, bounce, and fly movement. When onground, do nothing.
    fn physics_toss(&mut self, ent: EntityHandle) -> PhysicsResult<()> {
        self.check_water(ent)?;

        if !self.run_think(ent) {
            return Ok(());
        }

        let frametime = self.mv.frametime;
        let gravity = self.cvar(SV_GRAVITY);

        let Some(e) = self.ents.get(ent) else {
            return Ok(());
        };
        let ground_ok = self
            .ents
            .lookup(e.ground_entity)
            .is_some_and(|g| !g.flags.intersects(EntityFlags::MONSTER | EntityFlags::CLIENT));

        let Some(e) = self.ents.get_mut(ent) else {
            return Ok(());
        };
        let movetype = e.movetype;

        if e.velocity[2] > 0.0 || !ground_ok {
            e.flags.remove(EntityFlags::ONGROUND);
        }

        // if onground, return without moving
        if e.flags.contains(EntityFlags::ONGROUND) && vector_is_zero(&e.velocity) {
            e.avelocity = VEC3_ORIGIN;
            if vector_is_zero(&e.base_velocity) {
                return Ok(());
            }
        }

        self.check_velocity(ent);

        // add gravity
        if !matches!(movetype, MoveType::Fly | MoveType::FlyMissile | MoveType::BounceMissile) {
            self.add_gravity(ent);
        }

        // move angles
        if let Some(e) = self.ents.get_mut(ent) {
            e.angles = vector_ma(&e.angles, frametime, &e.avelocity);
            e.velocity = vector_add(&e.velocity, &e.base_velocity);
        }
        self.check_velocity(ent);

        // move origin
        let Some(e) = self.ents.get_mut(ent) else {
            return Ok(());
        };
        let push = vector_scale(&e.velocity, frametime);
        e.velocity = vector_subtract(&e.velocity, &e.base_velocity);

        let trace = self.push_entity(ent, &push)?;
        self.check_velocity(ent);

        let Some(e) = self.ents.get_mut(ent) else {
            return Ok(());
        };

        if trace.allsolid {
            // entity is trapped in another solid
            e.velocity = VEC3_ORIGIN;
            e.avelocity = VEC3_ORIGIN;
            return Ok(());
        }

        if trace.fraction == 1.0 {
            return self.check_water_transition(ent);
        }

        if e.pending_destruction() {
            return Ok(());
        }

        let backoff = match movetype {
            MoveType::Bounce => 2.0 - e.friction,
            MoveType::BounceMissile => 2.0,
            _ => 1.0,
        };

        let velocity = e.velocity;
        clip_velocity(&velocity, &trace.plane.normal, &mut e.velocity, backoff);

        // stop if on ground
        if trace.plane.normal[2] > 0.7 {
            let mv = vector_add(&e.velocity, &e.base_velocity);

            if mv[2] < gravity * frametime {
                // we're rolling on the ground, add static friction
                e.ground_entity = trace.ent;
                e.flags |= EntityFlags::ONGROUND;
                e.velocity[2] = 0.0;
            }

            if dot_product(&mv, &mv) < 900.0 || !matches!(movetype, MoveType::Bounce | MoveType::BounceMissile) {
                e.flags |= EntityFlags::ONGROUND;
                e.ground_entity = trace.ent;
                e.velocity = VEC3_ORIGIN;
                e.avelocity = VEC3_ORIGIN;
            } else {
                let scale = (1.0 - trace.fraction) * frametime * 0.9;
                let push = vector_ma(&vector_scale(&e.velocity, scale), scale, &e.base_velocity);

                self.push_entity(ent, &push)?;
                if self.ents.get(ent).map_or(true, |e| e.pending_destruction()) {
                    return Ok(());
                }
            }
        }

        // check for in water
        self.check_water_transition(ent)
    }

    /// Monsters freefall when they don't have a ground entity, otherwise
    /// all movement is done with discrete steps.
    fn physics_step(&mut self, ent: EntityHandle) -> PhysicsResult<()> {
        self.water_move(ent);
        self.check_velocity(ent);

        let frametime = self.mv.frametime;

        let Some(e) = self.ents.get(ent) else {
            return Ok(());
        };
        let was_on_ground = e.flags.contains(EntityFlags::ONGROUND);

        let in_water = self.check_water(ent)?;

        let Some(e) = self.ents.get(ent) else {
            return Ok(());
        };
        let flags = e.flags;
        let water_level = e.water_level;

        if flags.contains(EntityFlags::FLOAT) && water_level > WaterLevel::Dry {
            let buoyancy = self.submerged(ent)? * self.ents.get(ent).map_or(0.0, |e| e.buoyancy) * frametime;
            self.add_gravity(ent);
            if let Some(e) = self.ents.get_mut(ent) {
                e.velocity[2] += buoyancy;
            }
        }

        // add gravity except:
        //   flying monsters
        //   swimming monsters who are in the water
        if !was_on_ground
            && !flags.contains(EntityFlags::FLY)
            && !(flags.contains(EntityFlags::SWIM) && water_level > WaterLevel::Dry)
            && !in_water
        {
            self.add_gravity(ent);
        }

        let Some(e) = self.ents.get_mut(ent) else {
            return Ok(());
        };

        if !vector_is_zero(&e.velocity) || !vector_is_zero(&e.base_velocity) {
            e.flags.remove(EntityFlags::ONGROUND);
            let health = e.health;

            // apply friction, let dead monsters who aren't completely onground
            // slide
            if was_on_ground && (health > 0.0 || self.check_bottom(ent)?) {
                let friction_cvar = self.cvar(SV_FRICTION);
                let stopspeed = self.cvar(SV_STOPSPEED);

                if let Some(e) = self.ents.get_mut(ent) {
                    let speed = (e.velocity[0] * e.velocity[0] + e.velocity[1] * e.velocity[1]).sqrt();
                    if speed != 0.0 {
                        let friction = friction_cvar * e.friction;
                        e.friction = 1.0; // reset the friction modifier

                        let control = speed.max(stopspeed);
                        let newspeed = (speed - frametime * control * friction).max(0.0) / speed;

                        e.velocity[0] *= newspeed;
                        e.velocity[1] *= newspeed;
                    }
                }
            }

            if let Some(e) = self.ents.get_mut(ent) {
                e.velocity = vector_add(&e.velocity, &e.base_velocity);
            }
            self.check_velocity(ent);
            self.fly_move(ent, frametime)?;
            self.check_velocity(ent);
            if let Some(e) = self.ents.get_mut(ent) {
                e.velocity = vector_subtract(&e.velocity, &e.base_velocity);
            }
            self.check_velocity(ent);

            // determine if it's on solid ground at all
            if self.is_on_ground(ent)? {
                if let Some(e) = self.ents.get_mut(ent) {
                    e.flags |= EntityFlags::ONGROUND;
                }
            }

            self.link(ent, true)?;
        } else if self.mv.force_retouch != 0 {
            let (origin, mins, maxs) = (e.origin, e.mins, e.maxs);
            let monster_clip = e.flags.contains(EntityFlags::MONSTERCLIP);

            let trace = self.sweep(&origin, &mins, &maxs, &origin, TraceType::None, ent, monster_clip)?;

            if trace.fraction < 1.0 || trace.startsolid {
                if let Some(other) = trace.ent {
                    self.impact(ent, other, &trace);
                }
            }
        }

        if !self.run_think(ent) {
            return Ok(());
        }
        self.check_water_transition(ent)
    }

    // ============================================================
    // SV_Physics
    // ============================================================

    fn run_physics(&mut self) -> PhysicsResult<()> {
        // iterate by handle so removal mid-frame is safe
        let mut cur = self.ents.first_entity();
        while let Some(ent) = cur {
            self.run_entity(ent)?;
            cur = self.ents.next_entity(ent);
        }

        if self.mv.force_retouch != 0 {
            self.mv.force_retouch -= 1;
        }

        Ok(())
    }

    fn run_entity(&mut self, ent: EntityHandle) -> PhysicsResult<()> {
        if self.mv.force_retouch != 0 {
            self.link(ent, true)?;
        }

        // players are moved by their own commands
        let index = ent.index();
        if index != 0 && index <= self.ents.max_clients() {
            return Ok(());
        }

        let Some(e) = self.ents.get(ent) else {
            return Ok(());
        };

        let conveyor = if e.flags.contains(EntityFlags::ONGROUND) {
            self.ents
                .lookup(e.ground_entity)
                .filter(|g| g.flags.contains(EntityFlags::CONVEYOR))
                .map(|g| vector_scale(&g.move_dir, g.speed))
        } else {
            None
        };

        let frametime = self.mv.frametime;
        let Some(e) = self.ents.get_mut(ent) else {
            return Ok(());
        };

        if let Some(belt) = conveyor {
            e.base_velocity = if e.flags.contains(EntityFlags::BASEVELOCITY) {
                vector_add(&e.base_velocity, &belt)
            } else {
                belt
            };
            e.flags |= EntityFlags::BASEVELOCITY;
        }

        // base velocity that wasn't renewed this frame becomes momentum
        if !e.flags.contains(EntityFlags::BASEVELOCITY) {
            e.velocity = vector_ma(&e.velocity, 0.5 * frametime + 1.0, &e.base_velocity);
            e.base_velocity = VEC3_ORIGIN;
        }
        e.flags.remove(EntityFlags::BASEVELOCITY);

        let movetype = e.movetype;
        match movetype {
            MoveType::None => self.physics_none(ent),
            MoveType::Follow => self.physics_follow(ent)?,
            MoveType::Noclip => self.physics_noclip(ent)?,
            MoveType::Push => self.physics_pusher(ent)?,
            MoveType::Step | MoveType::PushStep => self.physics_step(ent)?,
            MoveType::Bounce | MoveType::Toss | MoveType::BounceMissile | MoveType::Fly | MoveType::FlyMissile => {
                self.physics_toss(ent)?
            }
            MoveType::Walk => {
                let classname = self.ents.get(ent).map(|e| e.classname.clone()).unwrap_or_default();
                return Err(PhysicsError::BadMoveType {
                    classname,
                    movetype: movetype.value(),
                });
            }
        }

        if self.ents.get(ent).is_some_and(|e| e.pending_destruction()) {
            self.destroy(ent);
        }

        Ok(())
    }
}

// ============================================================
// Tests
// ============================================================
