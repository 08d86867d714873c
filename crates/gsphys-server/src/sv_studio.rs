// sv_studio.rs -- per-pose hitbox hulls for studio models
//
// Every hitbox of a posed studio model becomes a six plane box hull in
// world space. Building them means evaluating the whole skeleton, so
// recent poses are kept in a small ring of cache entries whose planes live
// in one contiguous store. The store is never compacted: when a new entry
// does not fit behind the last one, the ring and the store are flushed
// together.

use std::collections::VecDeque;
use std::rc::Rc;

use gsphys_common::cmodel::{Hull, BOX_CLIPNODES, MAX_BOX_SIDES};
use gsphys_common::common::{com_dprintf, PhysicsResult};
use gsphys_common::shared::{dot_product, Plane, Vec3, PITCH};
use gsphys_common::studio::{BoneCalculator, StudioModel, MAX_BLENDERS, MAX_BONES, MAX_CONTROLLERS};

pub const MAX_STUDIO_CACHE: usize = 16;

/// Hitbox that belongs to a carried shield. Left out of the hull set when
/// the entity has no shield equipped.
pub const SHIELD_HITBOX: usize = 21;

/// Everything that decides where the hitboxes of a model end up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StudioPose {
    pub sequence: usize,
    pub frame: f32,
    pub angles: Vec3,
    pub origin: Vec3,
    /// Half extents of the moving box, added as slack to every plane.
    pub size: Vec3,
    pub controllers: [u8; MAX_CONTROLLERS],
    pub blenders: [u8; MAX_BLENDERS],
}

#[derive(Debug, Clone)]
struct StudioCacheEntry {
    model: Rc<StudioModel>,
    pose: StudioPose,
    start_hull: usize,
    num_hulls: usize,
}

#[derive(Debug, Clone)]
pub struct StudioCache {
    bones: BoneCalculator,

    // result of the last studio_hull call
    planes: Vec<Plane>,
    hitgroups: Vec<i32>,

    entries: VecDeque<StudioCacheEntry>,
    cache_planes: Vec<Plane>,
    cache_hitgroups: Vec<i32>,
    current_hull: usize,
}

impl Default for StudioCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StudioCache {
    pub fn new() -> Self {
        Self {
            bones: BoneCalculator::new(),
            planes: Vec::with_capacity(MAX_BONES * MAX_BOX_SIDES),
            hitgroups: Vec::with_capacity(MAX_BONES),
            entries: VecDeque::with_capacity(MAX_STUDIO_CACHE),
            cache_planes: vec![Plane::default(); MAX_BONES * MAX_BOX_SIDES],
            cache_hitgroups: vec![0; MAX_BONES],
            current_hull: 0,
        }
    }

    /// Drops every cached pose.
    pub fn flush(&mut self) {
        self.entries.clear();
        self.current_hull = 0;
    }

    /// Number of cached poses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_cached(&self, model: &Rc<StudioModel>, pose: &StudioPose) -> bool {
        self.find(model, pose).is_some()
    }

    fn find(&self, model: &Rc<StudioModel>, pose: &StudioPose) -> Option<&StudioCacheEntry> {
        self.entries
            .iter()
            .find(|entry| Rc::ptr_eq(&entry.model, model) && entry.pose == *pose)
    }

    /// Builds the hitbox hulls of `model` in `pose` and returns how many
    /// there are. The hulls stay readable through `hull` and `hitgroup`
    /// until the next call.
    pub fn studio_hull(
        &mut self,
        model: &Rc<StudioModel>,
        pose: &StudioPose,
        skip_shield: bool,
        use_cache: bool,
    ) -> PhysicsResult<usize> {
        if use_cache {
            if let Some((start, count)) = self.find(model, pose).map(|e| (e.start_hull, e.num_hulls)) {
                self.planes.clear();
                self.planes
                    .extend_from_slice(&self.cache_planes[start * MAX_BOX_SIDES..(start + count) * MAX_BOX_SIDES]);
                self.hitgroups.clear();
                self.hitgroups
                    .extend_from_slice(&self.cache_hitgroups[start..start + count]);
                return Ok(count);
            }
        }

        // the skeleton is set up with pitch flipped
        let mut angles = pose.angles;
        angles[PITCH] = -angles[PITCH];

        let bones = self.bones.set_up_bones(
            model,
            pose.sequence,
            pose.frame,
            &pose.controllers,
            &pose.blenders,
            &angles,
            &pose.origin,
        )?;

        self.planes.clear();
        self.hitgroups.clear();

        for (i, hitbox) in model.hitboxes.iter().enumerate().take(MAX_BONES) {
            if skip_shield && i == SHIELD_HITBOX {
                continue;
            }

            let Some(m) = bones.get(hitbox.bone) else {
                com_dprintf(&format!(
                    "StudioHull: {} hitbox {} uses missing bone {}\n",
                    model.name, i, hitbox.bone
                ));
                continue;
            };

            let bone_origin = [m[0][3], m[1][3], m[2][3]];
            for j in 0..3 {
                let normal = [m[0][j], m[1][j], m[2][j]];
                let d = dot_product(&normal, &bone_origin);
                let adjust = (normal[0] * pose.size[0]).abs()
                    + (normal[1] * pose.size[1]).abs()
                    + (normal[2] * pose.size[2]).abs();

                self.planes.push(Plane::new(normal, hitbox.bb_max[j] + d + adjust));
                self.planes.push(Plane::new(normal, hitbox.bb_min[j] + d - adjust));
            }
            self.hitgroups.push(hitbox.group);
        }

        let count = self.hitgroups.len();
        if use_cache {
            self.add_to_cache(model, pose, count);
        }
        Ok(count)
    }

    /// Copies the current result into the store behind the last entry.
    fn add_to_cache(&mut self, model: &Rc<StudioModel>, pose: &StudioPose, count: usize) {
        if count + self.current_hull >= MAX_BONES {
            self.flush();
        }
        if self.entries.len() == MAX_STUDIO_CACHE {
            self.entries.pop_front();
        }

        let start = self.current_hull;
        self.cache_planes[start * MAX_BOX_SIDES..(start + count) * MAX_BOX_SIDES]
            .copy_from_slice(&self.planes);
        self.cache_hitgroups[start..start + count].copy_from_slice(&self.hitgroups);
        self.current_hull += count;

        self.entries.push_back(StudioCacheEntry {
            model: Rc::clone(model),
            pose: *pose,
            start_hull: start,
            num_hulls: count,
        });
    }

    /// Hitbox hull `index` of the last result.
    pub fn hull(&self, index: usize) -> Hull<'_> {
        let first = index * MAX_BOX_SIDES;
        Hull {
            clipnodes: &BOX_CLIPNODES,
            planes: &self.planes[first..first + MAX_BOX_SIDES],
            firstclipnode: 0,
            lastclipnode: MAX_BOX_SIDES - 1,
            clip_mins: [0.0; 3],
            clip_maxs: [0.0; 3],
        }
    }

    pub fn hitgroup(&self, index: usize) -> i32 {
        self.hitgroups.get(index).copied().unwrap_or(0)
    }

    /// Planes of the last result, six per hull.
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gsphys_common::cmodel::hull_point_contents;
    use gsphys_common::shared::Contents;
    use gsphys_common::studio::{StudioAnimBlend, StudioBone, StudioHitbox, StudioSequence};

    fn boxed_model(hitboxes: usize) -> Rc<StudioModel> {
        Rc::new(StudioModel {
            name: "models/boxes.mdl".into(),
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
            hitboxes: (0..hitboxes)
                .map(|i| StudioHitbox {
                    bone: 0,
                    group: i as i32,
                    bb_min: [-4.0, -4.0, i as f32 * 2.0],
                    bb_max: [4.0, 4.0, i as f32 * 2.0 + 2.0],
                })
                .collect(),
            ..Default::default()
        })
    }

    fn pose_at(origin: Vec3) -> StudioPose {
        StudioPose {
            sequence: 0,
            frame: 0.0,
            angles: [0.0; 3],
            origin,
            size: [0.0; 3],
            controllers: [127; MAX_CONTROLLERS],
            blenders: [0; MAX_BLENDERS],
        }
    }

    #[test]
    fn test_hitbox_hull_contains_its_box() {
        let model = boxed_model(1);
        let mut cache = StudioCache::new();

        let n = cache.studio_hull(&model, &pose_at([100.0, 0.0, 0.0]), false, false).unwrap();
        assert_eq!(n, 1);

        let hull = cache.hull(0);
        let inside = hull_point_contents(&hull, hull.head_node(), &[101.0, 1.0, 1.0]).unwrap();
        let outside = hull_point_contents(&hull, hull.head_node(), &[110.0, 0.0, 1.0]).unwrap();
        assert_eq!(inside, Contents::Solid);
        assert_eq!(outside, Contents::Empty);
        assert!(!cache.is_cached(&model, &pose_at([100.0, 0.0, 0.0])), "cache disabled");
    }

    #[test]
    fn test_size_widens_every_plane() {
        let model = boxed_model(1);
        let mut cache = StudioCache::new();
        let mut pose = pose_at([0.0; 3]);
        pose.size = [8.0, 8.0, 8.0];

        cache.studio_hull(&model, &pose, false, false).unwrap();
        let hull = cache.hull(0);
        // 4 units past the hitbox, inside the 8 unit slack
        let p = [8.0, 0.0, 1.0];
        assert_eq!(hull_point_contents(&hull, hull.head_node(), &p).unwrap(), Contents::Solid);
    }

    #[test]
    fn test_cache_hit_matches_fresh_build() {
        let model = boxed_model(3);
        let pose = pose_at([10.0, 20.0, 30.0]);

        let mut cached = StudioCache::new();
        cached.studio_hull(&model, &pose, false, true).unwrap();
        assert!(cached.is_cached(&model, &pose));
        let n = cached.studio_hull(&model, &pose, false, true).unwrap();
        assert_eq!(cached.len(), 1, "second call is a hit");

        let mut fresh = StudioCache::new();
        let m = fresh.studio_hull(&model, &pose, false, false).unwrap();

        assert_eq!(n, m);
        assert_eq!(cached.planes(), fresh.planes(), "planes are bit identical");
        for i in 0..n {
            assert_eq!(cached.hitgroup(i), fresh.hitgroup(i));
        }
    }

    #[test]
    fn test_different_model_instance_misses() {
        let a = boxed_model(1);
        let b = boxed_model(1);
        let pose = pose_at([0.0; 3]);
        let mut cache = StudioCache::new();

        cache.studio_hull(&a, &pose, false, true).unwrap();
        assert!(!cache.is_cached(&b, &pose), "models compare by identity");
    }

    #[test]
    fn test_overflow_flushes_everything() {
        let model = boxed_model(50);
        let mut cache = StudioCache::new();
        let first = pose_at([0.0; 3]);
        let second = pose_at([64.0, 0.0, 0.0]);
        let third = pose_at([128.0, 0.0, 0.0]);

        cache.studio_hull(&model, &first, false, true).unwrap();
        cache.studio_hull(&model, &second, false, true).unwrap();
        assert_eq!(cache.len(), 2);

        // 100 hulls stored, 50 more do not fit
        cache.studio_hull(&model, &third, false, true).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_cached(&model, &first));
        assert!(!cache.is_cached(&model, &second));
        assert!(cache.is_cached(&model, &third));

        // a lookup of a flushed pose rebuilds it from scratch
        let n = cache.studio_hull(&model, &first, false, true).unwrap();
        assert_eq!(n, 50);
        let hull = cache.hull(0);
        assert_eq!(
            hull_point_contents(&hull, hull.head_node(), &[0.0, 0.0, 1.0]).unwrap(),
            Contents::Solid
        );
    }

    #[test]
    fn test_ring_drops_oldest_entry() {
        let model = boxed_model(1);
        let mut cache = StudioCache::new();

        for i in 0..=MAX_STUDIO_CACHE {
            cache.studio_hull(&model, &pose_at([i as f32, 0.0, 0.0]), false, true).unwrap();
        }
        assert_eq!(cache.len(), MAX_STUDIO_CACHE);
        assert!(!cache.is_cached(&model, &pose_at([0.0; 3])));
        assert!(cache.is_cached(&model, &pose_at([MAX_STUDIO_CACHE as f32, 0.0, 0.0])));
    }

    #[test]
    fn test_shield_hitbox_skipped() {
        let model = boxed_model(SHIELD_HITBOX + 2);
        let mut cache = StudioCache::new();
        let pose = pose_at([0.0; 3]);

        let with_shield = cache.studio_hull(&model, &pose, false, false).unwrap();
        let without = cache.studio_hull(&model, &pose, true, false).unwrap();

        assert_eq!(with_shield, SHIELD_HITBOX + 2);
        assert_eq!(without, SHIELD_HITBOX + 1);
        // hulls after the shield move down one slot
        assert_eq!(cache.hitgroup(SHIELD_HITBOX), SHIELD_HITBOX as i32 + 1);
    }

    #[test]
    fn test_bad_sequence_is_an_error() {
        let model = boxed_model(1);
        let mut cache = StudioCache::new();
        let mut pose = pose_at([0.0; 3]);
        pose.sequence = 5;

        assert!(cache.studio_hull(&model, &pose, false, true).is_err());
    }
}
