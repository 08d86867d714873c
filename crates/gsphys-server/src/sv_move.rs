// sv_move.rs -- sweeping boxes through the world and the linked entities
//
// A move is clipped against the world first. Whatever is left of it is then
// clipped against every solid entity whose box the sweep could reach,
// keeping the closest hit.

use std::rc::Rc;

use gsphys_common::cmodel::{recursive_hull_check, BrushModel, Hull};
use gsphys_common::common::{PhysicsError, PhysicsResult};
use gsphys_common::cvar::{CvarContext, R_CACHESTUDIO, SV_CLIENTTRACE};
use gsphys_common::shared::*;
use gsphys_common::studio::{StudioFlags, StudioModel, StudioSequence, MAX_BLENDERS, MAX_CONTROLLERS};
use gsphys_game::dispatch::should_collide;
use gsphys_game::g_local::{Edict, EntityFlags, EntityList, Model, MoveType, RenderMode, Solid};

use crate::sv_studio::StudioPose;
use crate::sv_world::GamePhysics;

/// Box monsters are clipped with on missile traces.
const MISSILE_HULL_SIZE: f32 = 15.0;

// ============================================================
// Hull selection
// ============================================================

/// Hull set an entity is clipped against.
enum ClipHull {
    Brush(Rc<BrushModel>, usize),
    Box,
    /// Hitbox hulls left in the studio cache by the last build.
    Studio(usize),
}

/// Picks the hull size class that fits a mover of `mins`/`maxs` and the
/// offset that moves the mover's origin onto the hull's clip origin.
pub fn select_brush_hull(model: &BrushModel, mins: &Vec3, maxs: &Vec3) -> (usize, Vec3) {
    let size = vector_subtract(maxs, mins);
    if size[0] <= 8.0 {
        return (0, model.hulls[0].clip_mins);
    }

    let index = if size[0] <= 36.0 {
        if size[2] <= 36.0 {
            3
        } else {
            1
        }
    } else {
        2
    };

    // calculate an offset value to center the origin
    (index, vector_subtract(&model.hulls[index].clip_mins, mins))
}

/// Blend byte for a player's aim pitch. Returns the blend and the pitch
/// left over for the body once the blend has absorbed what it can.
pub fn studio_player_blend(seq: &StudioSequence, pitch: f32) -> (u8, f32) {
    let start = seq.blends[0].start;
    let end = seq.blends[0].end;
    let blend = ((pitch * 3.0) as i32) as f32;

    if blend < start {
        (0, pitch - start / 3.0)
    } else if blend > end {
        (255, pitch - end / 3.0)
    } else if end - start < 0.1 {
        (127, 0.0)
    } else {
        ((255.0 * (blend - start) / (end - start)) as u8, 0.0)
    }
}

/// Line against sphere, true when the line passes through the sphere.
pub fn does_sphere_intersect(center: &Vec3, radius_squared: f32, line_point: &Vec3, line_dir: &Vec3) -> bool {
    let p = vector_subtract(line_point, center);
    let a = dot_product(line_dir, line_dir);
    let b = 2.0 * dot_product(&p, line_dir);
    let c = dot_product(&p, &p) - radius_squared;
    b * b - 4.0 * a * c > 0.000001
}

/// Players only collide with sweeps that reach the bounding sphere of
/// their current sequence.
pub fn check_sphere_intersection(ent: &Edict, start: &Vec3, end: &Vec3) -> PhysicsResult<bool> {
    if !ent.is_client() {
        return Ok(true);
    }
    let Some(model) = ent.model.studio() else {
        return Ok(true);
    };

    let seq = sequence_for(model, ent.sequence)?;
    let mut radius_squared = 0.0;
    for i in 0..3 {
        let max_dim = seq.bb_min[i].abs().max(seq.bb_max[i].abs());
        radius_squared += max_dim * max_dim;
    }

    let dir = vector_subtract(end, start);
    Ok(does_sphere_intersect(&ent.origin, radius_squared, start, &dir))
}

fn sequence_for(model: &StudioModel, sequence: usize) -> PhysicsResult<&StudioSequence> {
    model.sequences.get(sequence).ok_or(PhysicsError::StudioSequenceOutOfRange {
        sequence,
        count: model.sequences.len(),
    })
}

/// Bounding box of a whole move, padded by one unit.
pub fn move_bounds(start: &Vec3, mins: &Vec3, maxs: &Vec3, end: &Vec3) -> (Vec3, Vec3) {
    let mut boxmins = [0.0; 3];
    let mut boxmaxs = [0.0; 3];
    for i in 0..3 {
        if end[i] > start[i] {
            boxmins[i] = start[i] + mins[i] - 1.0;
            boxmaxs[i] = end[i] + maxs[i] + 1.0;
        } else {
            boxmins[i] = end[i] + mins[i] - 1.0;
            boxmaxs[i] = start[i] + maxs[i] + 1.0;
        }
    }
    (boxmins, boxmaxs)
}

// ============================================================
// MoveClip
// ============================================================

struct MoveClip {
    boxmins: Vec3, // enclose the test object along entire move
    boxmaxs: Vec3,
    mins: Vec3, // size of the moving object
    maxs: Vec3,
    mins2: Vec3, // size when clipping against monsters
    maxs2: Vec3,
    start: Vec3,
    end: Vec3,
    trace: Trace,
    trace_type: TraceType,
    pass: Option<EntityHandle>,
    ignore_transparent: bool,
    monster_clip: bool,
    flags: TraceFlags,
}

impl GamePhysics {
    // ================================================================
    // SV_HullForBsp
    // ================================================================
    pub(crate) fn hull_for_bsp(&self, ent: &Edict, mins: &Vec3, maxs: &Vec3) -> PhysicsResult<(Rc<BrushModel>, usize, Vec3)> {
        let model = match &ent.model {
            Model::Brush(model) => model,
            Model::None => {
                return Err(PhysicsError::NoModel { classname: ent.classname.clone() });
            }
            Model::Studio(_) => {
                return Err(PhysicsError::WrongModelType { classname: ent.classname.clone() });
            }
        };

        let (index, offset) = select_brush_hull(model, mins, maxs);
        Ok((Rc::clone(model), index, vector_add(&offset, &ent.origin)))
    }

    // ================================================================
    // SV_HullForEntity
    //
    // Returns a hull that can be used for testing or clipping an object
    // of mins/maxs size, and the offset to subtract from the mover's
    // origin to get a position in hull space.
    // ================================================================
    fn hull_for_entity(&mut self, ent: &Edict, mins: &Vec3, maxs: &Vec3) -> PhysicsResult<(ClipHull, Vec3)> {
        // decide which clipping hull to use, based on the size
        if ent.solid == Solid::BSP {
            // explicit hulls in the BSP model
            if ent.movetype != MoveType::Push && ent.movetype != MoveType::PushStep {
                return Err(PhysicsError::BspWithoutPush { classname: ent.classname.clone() });
            }
            let (model, index, offset) = self.hull_for_bsp(ent, mins, maxs)?;
            return Ok((ClipHull::Brush(model, index), offset));
        }

        // create a temp hull from bounding box sizes
        self.box_hull.set_bounds(&ent.mins, &ent.maxs, mins, maxs);
        Ok((ClipHull::Box, ent.origin))
    }

    // ================================================================
    // SV_HullForStudioModel
    // ================================================================
    fn hull_for_studio_model(
        &mut self,
        ent: &Edict,
        model: &Rc<StudioModel>,
        mins: &Vec3,
        maxs: &Vec3,
        flags: TraceFlags,
        cvars: &CvarContext,
    ) -> PhysicsResult<(ClipHull, Vec3)> {
        if flags.contains(TraceFlags::SIMPLE_BOX) {
            return self.hull_for_entity(ent, mins, maxs);
        }

        let mut size = vector_subtract(maxs, mins);
        let mut factor = 0.5;
        let mut use_complex_hull = false;

        if vector_is_zero(&size) {
            use_complex_hull = true;
            if ent.is_client() {
                let client_trace = cvars.variable_value(SV_CLIENTTRACE);
                if client_trace == 0.0 {
                    use_complex_hull = false;
                } else {
                    size = [1.0; 3];
                    factor = client_trace * 0.5;
                }
            }
        }

        if !use_complex_hull && !model.flags.contains(StudioFlags::TRACE_HITBOX) {
            return self.hull_for_entity(ent, mins, maxs);
        }

        let mut pose = StudioPose {
            sequence: ent.sequence,
            frame: ent.frame,
            angles: ent.angles,
            origin: ent.origin,
            size: vector_scale(&size, factor),
            controllers: ent.controllers,
            blenders: ent.blenders,
        };

        if ent.is_client() {
            let (blend, pitch) = studio_player_blend(sequence_for(model, ent.sequence)?, ent.angles[PITCH]);
            pose.angles[PITCH] = pitch;
            pose.controllers = [0x7f; MAX_CONTROLLERS];
            pose.blenders = [0; MAX_BLENDERS];
            pose.blenders[0] = blend;
        }

        let use_cache = cvars.variable_value(R_CACHESTUDIO) != 0.0;
        let skip_shield = self.skip_shield_hitbox && !ent.has_shield;
        let count = self.studio_cache.studio_hull(model, &pose, skip_shield, use_cache)?;

        Ok((ClipHull::Studio(count), VEC3_ORIGIN))
    }

    fn clip_hull<'a>(&'a self, choice: &'a ClipHull, index: usize) -> Hull<'a> {
        match choice {
            ClipHull::Brush(model, hull) => model.hull(*hull),
            ClipHull::Box => self.box_hull.hull(),
            ClipHull::Studio(_) => self.studio_cache.hull(index),
        }
    }

    // ================================================================
    // SV_SingleClipMoveToEntity
    //
    // Handles selection or creation of a clipping hull, and offsetting
    // (and eventually rotation) of the end points.
    // ================================================================
    pub fn single_clip_move_to_entity(
        &mut self,
        ent: &Edict,
        h: EntityHandle,
        start: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        end: &Vec3,
        flags: TraceFlags,
        cvars: &CvarContext,
    ) -> PhysicsResult<Trace> {
        // fill in a default trace
        let mut trace = Trace::begin(end);

        // get the clipping hull
        let (choice, offset) = match ent.model.studio() {
            Some(model) => self.hull_for_studio_model(ent, model, mins, maxs, flags, cvars)?,
            None => self.hull_for_entity(ent, mins, maxs)?,
        };

        let mut start_l = vector_subtract(start, &offset);
        let mut end_l = vector_subtract(end, &offset);

        // rotate start and end into the model's frame of reference
        let rotated = ent.solid == Solid::BSP && !vector_is_zero(&ent.angles);
        if rotated {
            let (forward, right, up) = angle_vectors_tuple(&ent.angles);

            let temp = start_l;
            start_l = [dot_product(&temp, &forward), -dot_product(&temp, &right), dot_product(&temp, &up)];

            let temp = end_l;
            end_l = [dot_product(&temp, &forward), -dot_product(&temp, &right), dot_product(&temp, &up)];
        }

        // trace a line through the appropriate clipping hull
        match &choice {
            ClipHull::Studio(count) => {
                let count = *count;
                let mut closest = 0;
                for i in 0..count {
                    let hull = self.clip_hull(&choice, i);
                    let mut test = Trace::begin(end);
                    recursive_hull_check(&hull, hull.head_node(), 0.0, 1.0, &start_l, &end_l, &mut test)?;

                    if i == 0 || test.allsolid || test.startsolid || test.fraction < trace.fraction {
                        let was_startsolid = trace.startsolid;
                        trace = test;
                        if was_startsolid {
                            trace.startsolid = true;
                        }
                        closest = i;
                    }
                }

                if count == 0 {
                    trace.allsolid = false;
                } else {
                    trace.hitgroup = self.studio_cache.hitgroup(closest);
                }
            }
            _ => {
                let hull = self.clip_hull(&choice, 0);
                recursive_hull_check(&hull, hull.head_node(), 0.0, 1.0, &start_l, &end_l, &mut trace)?;
            }
        }

        if trace.fraction != 1.0 {
            // rotate the plane normal back into world space
            if rotated {
                let (forward, right, up) = angle_vectors_transpose(&ent.angles);
                let temp = trace.plane.normal;
                trace.plane.normal = [
                    dot_product(&temp, &forward),
                    dot_product(&temp, &right),
                    dot_product(&temp, &up),
                ];
            }

            // fix trace up by the offset
            let delta = vector_subtract(end, start);
            trace.endpos = vector_ma(start, trace.fraction, &delta);
        }

        // did we clip the move?
        if trace.fraction < 1.0 || trace.startsolid {
            trace.ent = Some(h);
        }

        Ok(trace)
    }

    /// The world is always a brush model at the origin, so it is clipped
    /// directly against its own hulls.
    fn clip_move_to_world(&self, ents: &EntityList, start: &Vec3, mins: &Vec3, maxs: &Vec3, end: &Vec3) -> PhysicsResult<Trace> {
        let mut trace = Trace::begin(end);

        let (index, offset) = select_brush_hull(&self.world_model, mins, maxs);
        let hull = self.world_model.hull(index);
        let start_l = vector_subtract(start, &offset);
        let end_l = vector_subtract(end, &offset);

        recursive_hull_check(&hull, hull.head_node(), 0.0, 1.0, &start_l, &end_l, &mut trace)?;

        if trace.fraction != 1.0 {
            let delta = vector_subtract(end, start);
            trace.endpos = vector_ma(start, trace.fraction, &delta);
        }
        if trace.fraction < 1.0 || trace.startsolid {
            trace.ent = Some(ents.world());
        }
        Ok(trace)
    }

    // ================================================================
    // SV_ClipToLinks
    //
    // Mins and maxs enclose the entire area swept by the move.
    // ================================================================
    fn clip_to_links(&mut self, node_idx: usize, ents: &EntityList, clip: &mut MoveClip, cvars: &CvarContext) -> PhysicsResult<()> {
        let pass = ents.lookup(clip.pass);

        // touch linked edicts; the list is not relinked during a trace
        for i in 0..self.area_nodes[node_idx].solid_edicts.len() {
            let h = self.area_nodes[node_idx].solid_edicts[i];
            let Some(touch) = ents.get(h) else {
                continue;
            };

            if let Some(pass) = pass {
                if self.groups_excluded(touch.physics.group_info, pass.physics.group_info) {
                    continue;
                }
            }

            if touch.solid == Solid::Not || clip.pass == Some(h) {
                continue;
            }

            if touch.solid == Solid::Trigger {
                return Err(PhysicsError::TriggerInClipList { classname: touch.classname.clone() });
            }

            if !should_collide(touch, pass) {
                continue;
            }

            // monster clip brushes
            if touch.solid == Solid::BSP {
                if touch.flags.contains(EntityFlags::MONSTERCLIP) && !clip.monster_clip {
                    continue;
                }
            } else if clip.trace_type == TraceType::IgnoreMonsters && touch.movetype != MoveType::PushStep {
                continue; // only clip against bmodels
            }

            if clip.ignore_transparent
                && touch.render_mode != RenderMode::Normal
                && !touch.flags.contains(EntityFlags::WORLDBRUSH)
            {
                continue;
            }

            if !boxes_overlap(&clip.boxmins, &clip.boxmaxs, &touch.absmin, &touch.absmax) {
                continue;
            }

            if touch.solid != Solid::SlideBox && !check_sphere_intersection(touch, &clip.start, &clip.end)? {
                continue;
            }

            // points never interact
            if let Some(pass) = pass {
                if pass.size[0] != 0.0 && touch.size[0] == 0.0 {
                    continue;
                }
            }

            // might intersect, so do an exact clip
            if clip.trace.allsolid {
                return Ok(());
            }

            if let Some(pass) = pass {
                if touch.owner == clip.pass {
                    continue; // don't clip against own missiles
                }
                if pass.owner == Some(h) {
                    continue; // don't clip against owner
                }
            }

            let (mins, maxs) = if touch.flags.contains(EntityFlags::MONSTER) {
                (clip.mins2, clip.maxs2)
            } else {
                (clip.mins, clip.maxs)
            };
            let (start, end, flags) = (clip.start, clip.end, clip.flags);
            let trace = self.single_clip_move_to_entity(touch, h, &start, &mins, &maxs, &end, flags, cvars)?;

            if trace.allsolid || trace.startsolid || trace.fraction < clip.trace.fraction {
                let was_startsolid = clip.trace.startsolid;
                clip.trace = trace;
                clip.trace.ent = Some(h);
                if was_startsolid {
                    clip.trace.startsolid = true;
                }
            }
        }

        // recurse down both sides
        let node = &self.area_nodes[node_idx];
        if node.axis == -1 {
            return Ok(());
        }
        let axis = node.axis as usize;
        let (dist, children) = (node.dist, node.children);

        if clip.boxmaxs[axis] > dist {
            self.clip_to_links(children[0], ents, clip, cvars)?;
        }
        if clip.boxmins[axis] < dist {
            self.clip_to_links(children[1], ents, clip, cvars)?;
        }
        Ok(())
    }

    // ================================================================
    // SV_Move
    //
    // Sweeps mins/maxs from start to end through the world and every
    // solid entity. `pass` and the entities it owns or is owned by are
    // never hit.
    // ================================================================
    pub fn move_trace(
        &mut self,
        ents: &EntityList,
        start: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        end: &Vec3,
        trace_type: TraceType,
        pass: Option<EntityHandle>,
        ignore_transparent: bool,
        monster_clip: bool,
        flags: TraceFlags,
        cvars: &CvarContext,
    ) -> PhysicsResult<Trace> {
        // clip to world
        let world = self.clip_move_to_world(ents, start, mins, maxs, end)?;
        if world.fraction == 0.0 {
            return Ok(world); // blocked by the world
        }

        let world_fraction = world.fraction;
        let world_end = world.endpos;

        let (mins2, maxs2) = if trace_type == TraceType::Missile {
            ([-MISSILE_HULL_SIZE; 3], [MISSILE_HULL_SIZE; 3])
        } else {
            (*mins, *maxs)
        };

        // create the bounding box of the entire move
        let (boxmins, boxmaxs) = move_bounds(start, &mins2, &maxs2, &world_end);

        let mut clip = MoveClip {
            boxmins,
            boxmaxs,
            mins: *mins,
            maxs: *maxs,
            mins2,
            maxs2,
            start: *start,
            end: world_end,
            trace: Trace { fraction: 1.0, ..world },
            trace_type,
            pass,
            ignore_transparent,
            monster_clip,
            flags,
        };

        // clip to entities
        self.clip_to_links(0, ents, &mut clip, cvars)?;

        clip.trace.fraction *= world_fraction;
        Ok(clip.trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsphys_common::cvar::register_physics_cvars;
    use gsphys_common::studio::{StudioAnimBlend, StudioBlend, StudioBone, StudioHitbox};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn room() -> Rc<BrushModel> {
        Rc::new(BrushModel::aabb(
            "maps/room.bsp",
            [-512.0, -512.0, 0.0],
            [512.0, 512.0, 512.0],
            Contents::Empty,
            Contents::Solid,
        ))
    }

    fn make_world() -> (GamePhysics, EntityList, CvarContext) {
        let world = room();
        let mut ents = EntityList::new(2);
        let mut e = Edict::new("worldspawn");
        e.solid = Solid::BSP;
        e.movetype = MoveType::Push;
        e.model = Model::Brush(Rc::clone(&world));
        ents.spawn(e).unwrap();

        let mut cvars = CvarContext::new();
        register_physics_cvars(&mut cvars);
        (GamePhysics::new(world), ents, cvars)
    }

    fn spawn_box(physics: &mut GamePhysics, ents: &mut EntityList, origin: Vec3, half: f32, solid: Solid) -> EntityHandle {
        let mut e = Edict::new("box");
        e.origin = origin;
        e.set_size(&[-half; 3], &[half; 3]);
        e.solid = solid;
        let h = ents.spawn(e).unwrap();
        physics.link_edict(ents, h, false).unwrap();
        h
    }

    fn boxed_model() -> Rc<StudioModel> {
        Rc::new(StudioModel {
            name: "models/player.mdl".into(),
            bones: vec![StudioBone {
                name: "root".into(),
                scales: [1.0; 6],
                ..Default::default()
            }],
            sequences: vec![StudioSequence {
                label: "idle".into(),
                num_frames: 1,
                bb_min: [-16.0, -16.0, 0.0],
                bb_max: [16.0, 16.0, 72.0],
                anim_blends: vec![StudioAnimBlend::default()],
                ..Default::default()
            }],
            hitboxes: vec![
                StudioHitbox { bone: 0, group: 0, bb_min: [-4.0, -4.0, 0.0], bb_max: [4.0, 4.0, 2.0] },
                StudioHitbox { bone: 0, group: 1, bb_min: [-4.0, -4.0, 2.0], bb_max: [4.0, 4.0, 4.0] },
            ],
            ..Default::default()
        })
    }

    fn sweep(physics: &mut GamePhysics, ents: &EntityList, cvars: &CvarContext, start: Vec3, end: Vec3, pass: Option<EntityHandle>) -> Trace {
        physics
            .move_trace(ents, &start, &VEC3_ORIGIN, &VEC3_ORIGIN, &end, TraceType::None, pass, false, false, TraceFlags::empty(), cvars)
            .unwrap()
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.05
    }

    // =========================================================================
    // Hull selection
    // =========================================================================

    #[test]
    fn test_select_brush_hull_by_size() {
        let world = room();

        let (index, offset) = select_brush_hull(&world, &[-2.0; 3], &[2.0; 3]);
        assert_eq!((index, offset), (0, [0.0; 3]));

        let (index, offset) = select_brush_hull(&world, &[-16.0, -16.0, -36.0], &[16.0, 16.0, 36.0]);
        assert_eq!((index, offset), (1, [0.0; 3]));

        let (index, offset) = select_brush_hull(&world, &[-16.0, -16.0, 0.0], &[16.0, 16.0, 36.0]);
        assert_eq!(index, 3);
        assert_eq!(offset, [0.0, 0.0, -18.0], "origin at the feet moves to the hull center");

        let (index, _) = select_brush_hull(&world, &[-32.0; 3], &[32.0; 3]);
        assert_eq!(index, 2);
    }

    #[test]
    fn test_hull_for_bsp_errors() {
        let (physics, _, _) = make_world();
        let mut e = Edict::new("func_door");
        e.solid = Solid::BSP;

        let err = physics.hull_for_bsp(&e, &VEC3_ORIGIN, &VEC3_ORIGIN).unwrap_err();
        assert_eq!(err, PhysicsError::NoModel { classname: "func_door".into() });

        e.model = Model::Studio(boxed_model());
        let err = physics.hull_for_bsp(&e, &VEC3_ORIGIN, &VEC3_ORIGIN).unwrap_err();
        assert_eq!(err, PhysicsError::WrongModelType { classname: "func_door".into() });
    }

    #[test]
    fn test_bsp_solid_needs_pusher_movetype() {
        let (mut physics, mut ents, cvars) = make_world();
        let mut e = Edict::new("func_wall");
        e.solid = Solid::BSP;
        e.movetype = MoveType::Toss;
        e.origin = [100.0, 0.0, 64.0];
        let model = Rc::new(BrushModel::aabb("*1", [-16.0; 3], [16.0; 3], Contents::Solid, Contents::Empty));
        e.set_size(&model.mins, &model.maxs);
        e.model = Model::Brush(model);
        let h = ents.spawn(e).unwrap();
        physics.link_edict(&mut ents, h, false).unwrap();

        let result = physics.move_trace(
            &ents,
            &[0.0, 0.0, 64.0],
            &VEC3_ORIGIN,
            &VEC3_ORIGIN,
            &[200.0, 0.0, 64.0],
            TraceType::None,
            None,
            false,
            false,
            TraceFlags::empty(),
            &cvars,
        );
        assert!(matches!(result, Err(PhysicsError::BspWithoutPush { .. })));
    }

    #[test]
    fn test_move_bounds_orders_each_axis() {
        let (mins, maxs) = move_bounds(&[10.0, 0.0, 0.0], &[-1.0; 3], &[1.0; 3], &[-10.0, 5.0, 0.0]);
        assert_eq!(mins, [-12.0, -2.0, -2.0]);
        assert_eq!(maxs, [12.0, 7.0, 2.0]);
    }

    #[test]
    fn test_studio_player_blend() {
        let mut seq = StudioSequence::default();
        seq.blends[0] = StudioBlend { start: -90.0, end: 90.0, ..Default::default() };

        let (blend, pitch) = studio_player_blend(&seq, 10.0);
        assert_eq!((blend, pitch), (170, 0.0));

        let (blend, pitch) = studio_player_blend(&seq, 40.0);
        assert_eq!(blend, 255);
        assert!(approx(pitch, 10.0));

        let (blend, pitch) = studio_player_blend(&seq, -40.0);
        assert_eq!(blend, 0);
        assert!(approx(pitch, -10.0));

        let flat = StudioSequence::default();
        assert_eq!(studio_player_blend(&flat, 0.0), (127, 0.0));
    }

    #[test]
    fn test_sphere_intersection() {
        let center = [0.0, 0.0, 0.0];
        assert!(does_sphere_intersect(&center, 100.0, &[-50.0, 5.0, 0.0], &[100.0, 0.0, 0.0]));
        assert!(!does_sphere_intersect(&center, 100.0, &[-50.0, 20.0, 0.0], &[100.0, 0.0, 0.0]));
    }

    #[test]
    fn test_client_sphere_check_uses_sequence_box() {
        let mut e = Edict::new("player");
        e.flags |= EntityFlags::CLIENT;
        e.origin = [0.0, 0.0, 0.0];
        e.model = Model::Studio(boxed_model());

        // radius is |(16, 16, 72)|, about 75.5
        assert!(check_sphere_intersection(&e, &[-200.0, 70.0, 0.0], &[200.0, 70.0, 0.0]).unwrap());
        assert!(!check_sphere_intersection(&e, &[-200.0, 80.0, 0.0], &[200.0, 80.0, 0.0]).unwrap());

        e.sequence = 3;
        assert!(check_sphere_intersection(&e, &[-200.0, 0.0, 0.0], &[200.0, 0.0, 0.0]).is_err());

        // everything else always passes
        e.flags = EntityFlags::empty();
        assert!(check_sphere_intersection(&e, &[-200.0, 80.0, 0.0], &[200.0, 80.0, 0.0]).unwrap());
    }

    // =========================================================================
    // SV_Move
    // =========================================================================

    #[test]
    fn test_unobstructed_move_reaches_end() {
        let (mut physics, ents, cvars) = make_world();
        let end = [123.25, -40.5, 300.125];

        let trace = sweep(&mut physics, &ents, &cvars, [0.0, 0.0, 64.0], end, None);

        assert_eq!(trace.fraction, 1.0);
        assert_eq!(trace.endpos, end);
        assert!(!trace.allsolid && !trace.startsolid);
        assert_eq!(trace.ent, None);
    }

    #[test]
    fn test_move_hits_world_floor() {
        let (mut physics, ents, cvars) = make_world();

        let trace = sweep(&mut physics, &ents, &cvars, [0.0, 0.0, 64.0], [0.0, 0.0, -64.0], None);

        assert!(approx(trace.fraction, 0.5), "fraction {}", trace.fraction);
        assert!(trace.endpos[2] > 0.0 && trace.endpos[2] < 0.1);
        assert_eq!(trace.plane.normal, [0.0, 0.0, 1.0]);
        assert_eq!(trace.ent, Some(ents.world()));
    }

    #[test]
    fn test_random_sweeps_stay_in_room() {
        let (mut physics, ents, cvars) = make_world();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let sizes: [(Vec3, Vec3); 3] = [
            (VEC3_ORIGIN, VEC3_ORIGIN),
            ([-16.0, -16.0, -36.0], [16.0, 16.0, 36.0]),
            ([-32.0; 3], [32.0; 3]),
        ];

        for _ in 0..200 {
            let (mins, maxs) = sizes[rng.gen_range(0..sizes.len())];
            let start = [
                rng.gen_range(-400.0..400.0),
                rng.gen_range(-400.0..400.0),
                rng.gen_range(80.0..400.0),
            ];
            let end = [
                rng.gen_range(-2000.0..2000.0),
                rng.gen_range(-2000.0..2000.0),
                rng.gen_range(-2000.0..2000.0),
            ];

            let trace = physics
                .move_trace(&ents, &start, &mins, &maxs, &end, TraceType::None, None, false, false, TraceFlags::empty(), &cvars)
                .unwrap();

            assert!(!trace.startsolid, "started inside at {:?}", start);
            assert!((0.0..=1.0).contains(&trace.fraction));
            for i in 0..3 {
                let lo = if i == 2 { 0.0 } else { -512.0 };
                assert!(trace.endpos[i] + mins[i] >= lo - 0.01, "{:?} left the room", trace.endpos);
                assert!(trace.endpos[i] + maxs[i] <= 512.0 + 0.01, "{:?} left the room", trace.endpos);
            }
            if trace.fraction < 1.0 {
                assert_eq!(trace.ent, Some(ents.world()));
            }
        }
    }

    #[test]
    fn test_move_hits_closest_entity() {
        let (mut physics, mut ents, cvars) = make_world();
        let near = spawn_box(&mut physics, &mut ents, [100.0, 0.0, 64.0], 16.0, Solid::BBox);
        spawn_box(&mut physics, &mut ents, [300.0, 0.0, 64.0], 16.0, Solid::BBox);

        let trace = sweep(&mut physics, &ents, &cvars, [0.0, 0.0, 64.0], [400.0, 0.0, 64.0], None);

        assert_eq!(trace.ent, Some(near));
        assert!(approx(trace.fraction, 84.0 / 400.0), "fraction {}", trace.fraction);
        assert_eq!(trace.plane.normal, [-1.0, 0.0, 0.0]);
        assert!(approx(trace.endpos[0], 84.0));
    }

    #[test]
    fn test_entity_fraction_scaled_by_world_fraction() {
        let (mut physics, mut ents, cvars) = make_world();
        let h = spawn_box(&mut physics, &mut ents, [400.0, 0.0, 64.0], 16.0, Solid::BBox);

        // the wall at 512 cuts the move to 512 / 1024 of its length
        let trace = sweep(&mut physics, &ents, &cvars, [0.0, 0.0, 64.0], [1024.0, 0.0, 64.0], None);

        assert_eq!(trace.ent, Some(h));
        assert!(approx(trace.fraction, 384.0 / 1024.0), "fraction {}", trace.fraction);
        assert!(approx(trace.endpos[0], 384.0));
    }

    #[test]
    fn test_missile_ignores_its_owner() {
        let (mut physics, mut ents, cvars) = make_world();
        let shooter = spawn_box(&mut physics, &mut ents, [0.0, 0.0, 64.0], 32.0, Solid::SlideBox);
        let rocket = spawn_box(&mut physics, &mut ents, [0.0, 0.0, 64.0], 1.0, Solid::BBox);
        ents.get_mut(rocket).unwrap().owner = Some(shooter);

        let trace = sweep(&mut physics, &ents, &cvars, [0.0, 0.0, 64.0], [100.0, 0.0, 64.0], Some(rocket));
        assert_eq!(trace.fraction, 1.0);
        assert!(!trace.startsolid);
        assert_eq!(trace.ent, None);

        // the shooter never hits its own missile either
        let trace = sweep(&mut physics, &ents, &cvars, [0.0, 0.0, 64.0], [0.0, 0.0, 200.0], Some(shooter));
        assert!(!trace.startsolid);
        assert_eq!(trace.ent, None);

        // once disowned, the shooter is hit from inside
        ents.get_mut(rocket).unwrap().owner = None;
        let trace = sweep(&mut physics, &ents, &cvars, [0.0, 0.0, 64.0], [100.0, 0.0, 64.0], Some(rocket));
        assert!(trace.startsolid);
        assert_eq!(trace.ent, Some(shooter));
    }

    #[test]
    fn test_ignore_monsters_only_clips_pushers() {
        let (mut physics, mut ents, cvars) = make_world();
        let monster = spawn_box(&mut physics, &mut ents, [100.0, 0.0, 64.0], 16.0, Solid::SlideBox);

        let trace = physics
            .move_trace(
                &ents,
                &[0.0, 0.0, 64.0],
                &VEC3_ORIGIN,
                &VEC3_ORIGIN,
                &[200.0, 0.0, 64.0],
                TraceType::IgnoreMonsters,
                None,
                false,
                false,
                TraceFlags::empty(),
                &cvars,
            )
            .unwrap();
        assert_eq!(trace.fraction, 1.0);

        ents.get_mut(monster).unwrap().movetype = MoveType::PushStep;
        let trace = physics
            .move_trace(
                &ents,
                &[0.0, 0.0, 64.0],
                &VEC3_ORIGIN,
                &VEC3_ORIGIN,
                &[200.0, 0.0, 64.0],
                TraceType::IgnoreMonsters,
                None,
                false,
                false,
                TraceFlags::empty(),
                &cvars,
            )
            .unwrap();
        assert_eq!(trace.ent, Some(monster));
    }

    #[test]
    fn test_monster_clip_and_transparency() {
        let (mut physics, mut ents, cvars) = make_world();
        let mut e = Edict::new("func_monsterclip");
        e.solid = Solid::BSP;
        e.movetype = MoveType::Push;
        e.origin = [100.0, 0.0, 64.0];
        e.flags |= EntityFlags::MONSTERCLIP;
        let model = Rc::new(BrushModel::aabb("*1", [-16.0; 3], [16.0; 3], Contents::Solid, Contents::Empty));
        e.set_size(&model.mins, &model.maxs);
        e.model = Model::Brush(model);
        let clip_brush = ents.spawn(e).unwrap();
        physics.link_edict(&mut ents, clip_brush, false).unwrap();

        let run = |physics: &mut GamePhysics, ents: &EntityList, ignore_transparent: bool, monster_clip: bool| {
            physics
                .move_trace(
                    ents,
                    &[0.0, 0.0, 64.0],
                    &VEC3_ORIGIN,
                    &VEC3_ORIGIN,
                    &[200.0, 0.0, 64.0],
                    TraceType::None,
                    None,
                    ignore_transparent,
                    monster_clip,
                    TraceFlags::empty(),
                    &cvars,
                )
                .unwrap()
        };

        assert_eq!(run(&mut physics, &ents, false, false).fraction, 1.0);
        assert_eq!(run(&mut physics, &ents, false, true).ent, Some(clip_brush));

        ents.get_mut(clip_brush).unwrap().render_mode = RenderMode::TransAlpha;
        assert_eq!(run(&mut physics, &ents, true, true).fraction, 1.0);

        ents.get_mut(clip_brush).unwrap().flags |= EntityFlags::WORLDBRUSH;
        assert_eq!(run(&mut physics, &ents, true, true).ent, Some(clip_brush));
    }

    #[test]
    fn test_groups_and_should_collide_filter_entities() {
        fn never(_ent: &Edict, _other: Option<&Edict>) -> bool {
            false
        }

        let (mut physics, mut ents, cvars) = make_world();
        let target = spawn_box(&mut physics, &mut ents, [100.0, 0.0, 64.0], 16.0, Solid::BBox);
        let mover = spawn_box(&mut physics, &mut ents, [0.0, 0.0, 300.0], 0.0, Solid::BBox);
        ents.get_mut(target).unwrap().physics.group_info = 1;
        ents.get_mut(mover).unwrap().physics.group_info = 2;

        let trace = sweep(&mut physics, &ents, &cvars, [0.0, 0.0, 64.0], [200.0, 0.0, 64.0], Some(mover));
        assert_eq!(trace.fraction, 1.0, "group masks keep them apart");

        ents.get_mut(mover).unwrap().physics.group_info = 3;
        let trace = sweep(&mut physics, &ents, &cvars, [0.0, 0.0, 64.0], [200.0, 0.0, 64.0], Some(mover));
        assert_eq!(trace.ent, Some(target));

        ents.get_mut(target).unwrap().should_collide = Some(never);
        let trace = sweep(&mut physics, &ents, &cvars, [0.0, 0.0, 64.0], [200.0, 0.0, 64.0], Some(mover));
        assert_eq!(trace.fraction, 1.0, "vetoed");
    }

    #[test]
    fn test_trigger_in_clip_list_is_an_error() {
        let (mut physics, mut ents, cvars) = make_world();
        let h = spawn_box(&mut physics, &mut ents, [100.0, 0.0, 64.0], 16.0, Solid::Trigger);
        physics.area_nodes[0].solid_edicts.push(h);

        let result = physics.move_trace(
            &ents,
            &[0.0, 0.0, 64.0],
            &VEC3_ORIGIN,
            &VEC3_ORIGIN,
            &[200.0, 0.0, 64.0],
            TraceType::None,
            None,
            false,
            false,
            TraceFlags::empty(),
            &cvars,
        );
        assert!(matches!(result, Err(PhysicsError::TriggerInClipList { .. })));
    }

    #[test]
    fn test_rotated_brush_entity() {
        let (mut physics, mut ents, cvars) = make_world();
        let mut e = Edict::new("func_rotating");
        e.solid = Solid::BSP;
        e.movetype = MoveType::Push;
        e.origin = [0.0, 0.0, 64.0];
        e.angles = [0.0, 90.0, 0.0];
        // long along x before the rotation
        let model = Rc::new(BrushModel::aabb(
            "*2",
            [-64.0, -8.0, -8.0],
            [64.0, 8.0, 8.0],
            Contents::Solid,
            Contents::Empty,
        ));
        e.set_size(&model.mins, &model.maxs);
        e.model = Model::Brush(model);
        let h = ents.spawn(e).unwrap();
        physics.link_edict(&mut ents, h, false).unwrap();

        let trace = sweep(&mut physics, &ents, &cvars, [-100.0, 40.0, 64.0], [100.0, 40.0, 64.0], None);

        assert_eq!(trace.ent, Some(h));
        assert!(approx(trace.fraction, 92.0 / 200.0), "fraction {}", trace.fraction);
        assert!(approx(trace.plane.normal[0], -1.0), "normal {:?}", trace.plane.normal);
        assert!(approx(trace.plane.normal[1], 0.0));
    }

    #[test]
    fn test_point_trace_uses_hitboxes() {
        let (mut physics, mut ents, cvars) = make_world();
        let mut e = Edict::new("monster_scientist");
        e.solid = Solid::SlideBox;
        e.origin = [100.0, 0.0, 0.0];
        e.set_size(&[-16.0, -16.0, 0.0], &[16.0, 16.0, 72.0]);
        e.model = Model::Studio(boxed_model());
        let h = ents.spawn(e).unwrap();
        physics.link_edict(&mut ents, h, false).unwrap();

        // passes over hitbox 0 and into hitbox 1
        let trace = sweep(&mut physics, &ents, &cvars, [0.0, 0.0, 3.0], [200.0, 0.0, 3.0], None);
        assert_eq!(trace.ent, Some(h));
        assert_eq!(trace.hitgroup, 1);
        assert!(approx(trace.fraction, 96.0 / 200.0), "fraction {}", trace.fraction);
        assert!(physics.studio_cache().len() == 1, "pose cached");

        // the simple box flag clips against the bounding box instead
        let trace = physics
            .move_trace(
                &ents,
                &[0.0, 0.0, 3.0],
                &VEC3_ORIGIN,
                &VEC3_ORIGIN,
                &[200.0, 0.0, 3.0],
                TraceType::None,
                None,
                false,
                false,
                TraceFlags::SIMPLE_BOX,
                &cvars,
            )
            .unwrap();
        assert_eq!(trace.ent, Some(h));
        assert_eq!(trace.hitgroup, 0);
        assert!(approx(trace.fraction, 84.0 / 200.0), "fraction {}", trace.fraction);

        // above every hitbox but inside the bounding box
        let trace = sweep(&mut physics, &ents, &cvars, [0.0, 0.0, 40.0], [200.0, 0.0, 40.0], None);
        assert_eq!(trace.fraction, 1.0);
    }

    #[test]
    fn test_sized_mover_uses_box_hull_for_studio_model() {
        let (mut physics, mut ents, cvars) = make_world();
        let mut e = Edict::new("monster_scientist");
        e.solid = Solid::SlideBox;
        e.origin = [100.0, 0.0, 0.0];
        e.set_size(&[-16.0, -16.0, 0.0], &[16.0, 16.0, 72.0]);
        e.model = Model::Studio(boxed_model());
        let h = ents.spawn(e).unwrap();
        physics.link_edict(&mut ents, h, false).unwrap();

        let trace = physics
            .move_trace(
                &ents,
                &[0.0, 0.0, 40.0],
                &[-8.0; 3],
                &[8.0; 3],
                &[200.0, 0.0, 40.0],
                TraceType::None,
                None,
                false,
                false,
                TraceFlags::empty(),
                &cvars,
            )
            .unwrap();
        assert_eq!(trace.ent, Some(h));
        assert!(approx(trace.fraction, 76.0 / 200.0), "fraction {}", trace.fraction);
        assert!(physics.studio_cache().is_empty());
    }
}
