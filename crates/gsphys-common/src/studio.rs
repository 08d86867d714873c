// studio.rs -- studio (skeletal) model data and bone setup for hitbox hulls

use std::f32::consts::PI;

use crate::common::{PhysicsError, PhysicsResult};
use crate::shared::{Vec3, PITCH, ROLL, YAW};

pub const MAX_BONES: usize = 128;
pub const MAX_CONTROLLERS: usize = 8;
pub const MAX_BLENDERS: usize = 2;

/// The mouth controller is normalized against 64 instead of 255 and never
/// wraps around.
pub const MOUTH_CONTROLLER: usize = 4;

/// Rotation plus translation, row major.
pub type BoneMatrix = [[f32; 4]; 3];

/// x, y, z, w
pub type Quat = [f32; 4];

pub const IDENTITY_MATRIX: BoneMatrix = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
];

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MotionTypes: u32 {
        const X     = 0x0001;
        const Y     = 0x0002;
        const Z     = 0x0004;
        const XR    = 0x0008;
        const YR    = 0x0010;
        const ZR    = 0x0020;
        const LX    = 0x0040;
        const LY    = 0x0080;
        const LZ    = 0x0100;
        const AX    = 0x0200;
        const AY    = 0x0400;
        const AZ    = 0x0800;
        const AXR   = 0x1000;
        const AYR   = 0x2000;
        const AZR   = 0x4000;
        const TYPES = 0x7FFF;
        /// Controller wraps around 360 degrees.
        const RLOOP = 0x8000;
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct StudioFlags: u32 {
        const ROCKET       = 1 << 0;
        const GRENADE      = 1 << 1;
        const GIB          = 1 << 2;
        const ROTATE       = 1 << 3;
        const TRACER       = 1 << 4;
        const ZOMGIB       = 1 << 5;
        const TRACER2      = 1 << 6;
        const TRACER3      = 1 << 7;
        const NOSHADELIGHT = 1 << 8;
        /// Trace against hitboxes even for sized movers.
        const TRACE_HITBOX = 1 << 9;
    }
}

// ============================================================
// Model data
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct StudioBone {
    pub name: String,
    pub parent: Option<usize>,
    /// Bone controller driving each of x, y, z, xr, yr, zr.
    pub controllers: [Option<usize>; 6],
    /// Default pose.
    pub values: [f32; 6],
    /// Scale applied to animation values.
    pub scales: [f32; 6],
}

#[derive(Debug, Clone, Default)]
pub struct StudioBoneController {
    pub bone: Option<usize>,
    pub motion_type: MotionTypes,
    pub start: f32,
    pub end: f32,
    /// Slot in the entity's controller array.
    pub index: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StudioBlend {
    pub motion_type: MotionTypes,
    pub start: f32,
    pub end: f32,
}

/// Decoded animation channels of one bone: x, y, z, xr, yr, zr. A missing
/// channel keeps the bone's default value.
#[derive(Debug, Clone, Default)]
pub struct StudioAnimation {
    pub values: [Option<Vec<f32>>; 6],
}

/// One blend of a sequence, an animation per bone.
#[derive(Debug, Clone, Default)]
pub struct StudioAnimBlend {
    pub animations: Vec<StudioAnimation>,
}

#[derive(Debug, Clone, Default)]
pub struct StudioSequence {
    pub label: String,
    pub fps: f32,
    pub num_frames: usize,
    pub motion_type: MotionTypes,
    pub motion_bone: usize,
    pub bb_min: Vec3,
    pub bb_max: Vec3,
    pub blends: [StudioBlend; MAX_BLENDERS],
    /// One, two or four blends.
    pub anim_blends: Vec<StudioAnimBlend>,
}

#[derive(Debug, Clone, Default)]
pub struct StudioHitbox {
    pub bone: usize,
    pub group: i32,
    pub bb_min: Vec3,
    pub bb_max: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct StudioModel {
    pub name: String,
    pub flags: StudioFlags,
    pub bones: Vec<StudioBone>,
    pub controllers: Vec<StudioBoneController>,
    pub sequences: Vec<StudioSequence>,
    pub hitboxes: Vec<StudioHitbox>,
}

// ============================================================
// Math
// ============================================================

/// Angles in radians, ordered roll, pitch, yaw as stored in bone data.
pub fn angle_quaternion(angles: &Vec3) -> Quat {
    let (sy, cy) = (angles[2] * 0.5).sin_cos();
    let (sp, cp) = (angles[1] * 0.5).sin_cos();
    let (sr, cr) = (angles[0] * 0.5).sin_cos();

    [
        sr * cp * cy - cr * sp * sy,
        cr * sp * cy + sr * cp * sy,
        cr * cp * sy - sr * sp * cy,
        cr * cp * cy + sr * sp * sy,
    ]
}

pub fn quaternion_matrix(q: &Quat) -> BoneMatrix {
    let mut m = [[0.0; 4]; 3];

    m[0][0] = 1.0 - 2.0 * q[1] * q[1] - 2.0 * q[2] * q[2];
    m[1][0] = 2.0 * q[0] * q[1] + 2.0 * q[3] * q[2];
    m[2][0] = 2.0 * q[0] * q[2] - 2.0 * q[3] * q[1];

    m[0][1] = 2.0 * q[0] * q[1] - 2.0 * q[3] * q[2];
    m[1][1] = 1.0 - 2.0 * q[0] * q[0] - 2.0 * q[2] * q[2];
    m[2][1] = 2.0 * q[1] * q[2] + 2.0 * q[3] * q[0];

    m[0][2] = 2.0 * q[0] * q[2] + 2.0 * q[3] * q[1];
    m[1][2] = 2.0 * q[1] * q[2] - 2.0 * q[3] * q[0];
    m[2][2] = 1.0 - 2.0 * q[0] * q[0] - 2.0 * q[1] * q[1];

    m
}

pub fn quaternion_slerp(p: &Quat, q: &Quat, t: f32) -> Quat {
    // decide if one of the quaternions is backwards
    let mut a = 0.0;
    let mut b = 0.0;
    for i in 0..4 {
        a += (p[i] - q[i]) * (p[i] - q[i]);
        b += (p[i] + q[i]) * (p[i] + q[i]);
    }
    let q = if a > b { [-q[0], -q[1], -q[2], -q[3]] } else { *q };

    let cosom = p[0] * q[0] + p[1] * q[1] + p[2] * q[2] + p[3] * q[3];
    let mut qt = [0.0; 4];

    if 1.0 + cosom > 0.000_000_01 {
        let (sclp, sclq) = if 1.0 - cosom > 0.000_000_01 {
            let omega = cosom.acos();
            let sinom = omega.sin();
            (((1.0 - t) * omega).sin() / sinom, (t * omega).sin() / sinom)
        } else {
            (1.0 - t, t)
        };
        for i in 0..4 {
            qt[i] = sclp * p[i] + sclq * q[i];
        }
    } else {
        qt[0] = -p[1];
        qt[1] = p[0];
        qt[2] = -p[3];
        qt[3] = p[2];
        let sclp = ((1.0 - t) * 0.5 * PI).sin();
        let sclq = (t * 0.5 * PI).sin();
        for i in 0..3 {
            qt[i] = sclp * p[i] + sclq * qt[i];
        }
    }

    qt
}

pub fn concat_transforms(in1: &BoneMatrix, in2: &BoneMatrix) -> BoneMatrix {
    let mut out = [[0.0; 4]; 3];
    for i in 0..3 {
        for j in 0..4 {
            out[i][j] = in1[i][0] * in2[0][j] + in1[i][1] * in2[1][j] + in1[i][2] * in2[2][j];
        }
        out[i][3] += in1[i][3];
    }
    out
}

/// Rotation matrix for pitch/yaw/roll in degrees, zero translation.
pub fn angle_matrix(angles: &Vec3) -> BoneMatrix {
    let (sy, cy) = (angles[YAW] * (PI * 2.0 / 360.0)).sin_cos();
    let (sp, cp) = (angles[PITCH] * (PI * 2.0 / 360.0)).sin_cos();
    let (sr, cr) = (angles[ROLL] * (PI * 2.0 / 360.0)).sin_cos();

    [
        [cp * cy, sr * sp * cy + cr * -sy, cr * sp * cy + -sr * -sy, 0.0],
        [cp * sy, sr * sp * sy + cr * cy, cr * sp * sy + -sr * cy, 0.0],
        [-sp, sr * cp, cr * cp, 0.0],
    ]
}

// ============================================================
// Bone setup
// ============================================================

/// Scratch state for evaluating a pose. Reused between calls.
#[derive(Debug, Clone)]
pub struct BoneCalculator {
    bone_adjust: [f32; MAX_CONTROLLERS],
    pos: [Vec<Vec3>; 4],
    q: [Vec<Quat>; 4],
    bones: Vec<BoneMatrix>,
}

impl Default for BoneCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl BoneCalculator {
    pub fn new() -> Self {
        Self {
            bone_adjust: [0.0; MAX_CONTROLLERS],
            pos: Default::default(),
            q: Default::default(),
            bones: Vec::with_capacity(MAX_BONES),
        }
    }

    /// Computes world space bone transforms for `sequence` at `frame`. The
    /// root bones are placed with `angles` (degrees) and `origin`.
    #[allow(clippy::too_many_arguments)]
    pub fn set_up_bones(
        &mut self,
        model: &StudioModel,
        sequence: usize,
        frame: f32,
        controllers: &[u8; MAX_CONTROLLERS],
        blenders: &[u8; MAX_BLENDERS],
        angles: &Vec3,
        origin: &Vec3,
    ) -> PhysicsResult<&[BoneMatrix]> {
        let seq = model
            .sequences
            .get(sequence)
            .ok_or(PhysicsError::StudioSequenceOutOfRange { sequence, count: model.sequences.len() })?;

        let num_bones = model.bones.len().min(MAX_BONES);
        for i in 0..4 {
            self.pos[i].clear();
            self.pos[i].resize(num_bones, [0.0; 3]);
            self.q[i].clear();
            self.q[i].resize(num_bones, [0.0, 0.0, 0.0, 1.0]);
        }

        self.calc_bone_adjust(model, controllers);

        let frame = frame.max(0.0);
        let blend_count = seq.anim_blends.len();

        self.calc_rotations(model, seq, 0, frame);

        if blend_count > 1 {
            self.calc_rotations(model, seq, 1, frame);
            let s = blenders[0] as f32 / 255.0;
            self.slerp_bones(0, 1, s);

            if blend_count == 4 {
                self.calc_rotations(model, seq, 2, frame);
                self.calc_rotations(model, seq, 3, frame);

                let s = blenders[0] as f32 / 255.0;
                self.slerp_bones(2, 3, s);

                let s = blenders[1] as f32 / 255.0;
                self.slerp_bones(0, 2, s);
            }
        }

        let mut root = angle_matrix(angles);
        root[0][3] = origin[0];
        root[1][3] = origin[1];
        root[2][3] = origin[2];

        self.bones.clear();
        for i in 0..num_bones {
            let mut bone_matrix = quaternion_matrix(&self.q[0][i]);
            bone_matrix[0][3] = self.pos[0][i][0];
            bone_matrix[1][3] = self.pos[0][i][1];
            bone_matrix[2][3] = self.pos[0][i][2];

            let parent_matrix = match model.bones[i].parent {
                Some(parent) if parent < i => self.bones[parent],
                _ => root,
            };
            self.bones.push(concat_transforms(&parent_matrix, &bone_matrix));
        }

        Ok(&self.bones)
    }

    fn calc_bone_adjust(&mut self, model: &StudioModel, controllers: &[u8; MAX_CONTROLLERS]) {
        self.bone_adjust = [0.0; MAX_CONTROLLERS];

        for (j, controller) in model.controllers.iter().take(MAX_CONTROLLERS).enumerate() {
            let setting = controllers.get(controller.index).copied().unwrap_or(0) as f32;

            let value = if controller.index != MOUTH_CONTROLLER
                && controller.motion_type.contains(MotionTypes::RLOOP)
            {
                setting * (360.0 / 256.0) + controller.start
            } else {
                let normalizer = if controller.index == MOUTH_CONTROLLER { 64.0 } else { 255.0 };
                let v = (setting / normalizer).clamp(0.0, 1.0);
                (1.0 - v) * controller.start + v * controller.end
            };

            let kind = controller.motion_type & MotionTypes::TYPES;
            if kind == MotionTypes::XR || kind == MotionTypes::YR || kind == MotionTypes::ZR {
                self.bone_adjust[j] = value.to_radians();
            } else if kind == MotionTypes::X || kind == MotionTypes::Y || kind == MotionTypes::Z {
                self.bone_adjust[j] = value;
            }
        }
    }

    fn calc_rotations(&mut self, model: &StudioModel, seq: &StudioSequence, blend: usize, f: f32) {
        let frame = f as usize;
        let s = f - frame as f32;

        let anims = seq.anim_blends.get(blend);

        for (i, bone) in model.bones.iter().take(MAX_BONES).enumerate() {
            let anim = anims.and_then(|b| b.animations.get(i));
            self.q[blend][i] = self.calc_bone_quaternion(frame, s, bone, anim);
            self.pos[blend][i] = self.calc_bone_position(frame, s, bone, anim);
        }

        if let Some(pos) = self.pos[blend].get_mut(seq.motion_bone) {
            if seq.motion_type.contains(MotionTypes::X) {
                pos[0] = 0.0;
            }
            if seq.motion_type.contains(MotionTypes::Y) {
                pos[1] = 0.0;
            }
            if seq.motion_type.contains(MotionTypes::Z) {
                pos[2] = 0.0;
            }
        }
    }

    fn calc_bone_position(&self, frame: usize, s: f32, bone: &StudioBone, anim: Option<&StudioAnimation>) -> Vec3 {
        let mut pos = [0.0; 3];

        for (j, p) in pos.iter_mut().enumerate() {
            *p = bone.values[j];

            if let Some((v1, v2)) = channel_values(anim, j, frame) {
                *p += (v1 * (1.0 - s) + s * v2) * bone.scales[j];
            }

            if let Some(c) = bone.controllers[j] {
                *p += self.bone_adjust.get(c).copied().unwrap_or(0.0);
            }
        }

        pos
    }

    fn calc_bone_quaternion(&self, frame: usize, s: f32, bone: &StudioBone, anim: Option<&StudioAnimation>) -> Quat {
        let mut angle1 = [0.0; 3];
        let mut angle2 = [0.0; 3];

        for j in 0..3 {
            let axis = j + 3;

            match channel_values(anim, axis, frame) {
                Some((v1, v2)) => {
                    angle1[j] = bone.values[axis] + v1 * bone.scales[axis];
                    angle2[j] = bone.values[axis] + v2 * bone.scales[axis];
                }
                None => {
                    angle1[j] = bone.values[axis];
                    angle2[j] = bone.values[axis];
                }
            }

            if let Some(c) = bone.controllers[axis] {
                let adjust = self.bone_adjust.get(c).copied().unwrap_or(0.0);
                angle1[j] += adjust;
                angle2[j] += adjust;
            }
        }

        if angle1 != angle2 {
            let q1 = angle_quaternion(&angle1);
            let q2 = angle_quaternion(&angle2);
            quaternion_slerp(&q1, &q2, s)
        } else {
            angle_quaternion(&angle1)
        }
    }

    /// Blend `b` into `a` by `s`.
    fn slerp_bones(&mut self, a: usize, b: usize, s: f32) {
        let s = s.clamp(0.0, 1.0);
        let s1 = 1.0 - s;

        let (q_a, q_b) = pick_two(&mut self.q, a, b);
        let (pos_a, pos_b) = pick_two(&mut self.pos, a, b);

        for i in 0..q_a.len() {
            q_a[i] = quaternion_slerp(&q_a[i], &q_b[i], s);
            for k in 0..3 {
                pos_a[i][k] = pos_a[i][k] * s1 + pos_b[i][k] * s;
            }
        }
    }
}

/// Values of one channel at `frame` and the frame after it. The last frame
/// holds.
fn channel_values(anim: Option<&StudioAnimation>, channel: usize, frame: usize) -> Option<(f32, f32)> {
    let values = anim?.values[channel].as_ref()?;
    let last = values.len().checked_sub(1)?;
    let v1 = values[frame.min(last)];
    let v2 = if frame < last { values[frame + 1] } else { v1 };
    Some((v1, v2))
}

/// Mutable first and shared second element of two distinct slots.
fn pick_two<T>(slots: &mut [Vec<T>; 4], a: usize, b: usize) -> (&mut Vec<T>, &Vec<T>) {
    if a < b {
        let (lo, hi) = slots.split_at_mut(b);
        (&mut lo[a], &hi[0])
    } else {
        let (lo, hi) = slots.split_at_mut(a);
        (&mut hi[0], &lo[b])
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn one_bone_model() -> StudioModel {
        StudioModel {
            name: "models/test.mdl".into(),
            bones: vec![StudioBone {
                name: "root".into(),
                scales: [1.0; 6],
                ..Default::default()
            }],
            sequences: vec![StudioSequence {
                label: "idle".into(),
                num_frames: 1,
                anim_blends: vec![StudioAnimBlend::default()],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_angle_matrix_yaw() {
        let m = angle_matrix(&[0.0, 90.0, 0.0]);
        // x axis maps onto y
        assert!(approx(m[0][0], 0.0));
        assert!(approx(m[1][0], 1.0));
        assert!(approx(m[2][2], 1.0));
    }

    #[test]
    fn test_quaternion_identity() {
        let q = angle_quaternion(&[0.0; 3]);
        assert_eq!(q, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(quaternion_matrix(&q), [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ]);
    }

    #[test]
    fn test_quaternion_matches_angle_matrix() {
        // bone angles are roll, pitch, yaw in radians
        let q = angle_quaternion(&[0.0, 0.0, PI / 2.0]);
        let m = quaternion_matrix(&q);
        let reference = angle_matrix(&[0.0, 90.0, 0.0]);
        for i in 0..3 {
            for j in 0..3 {
                assert!(approx(m[i][j], reference[i][j]), "[{}][{}] {} vs {}", i, j, m[i][j], reference[i][j]);
            }
        }
    }

    #[test]
    fn test_slerp_endpoints_and_midpoint() {
        let p = angle_quaternion(&[0.0; 3]);
        let q = angle_quaternion(&[0.0, 0.0, PI / 2.0]);
        let start = quaternion_slerp(&p, &q, 0.0);
        let end = quaternion_slerp(&p, &q, 1.0);
        for i in 0..4 {
            assert!(approx(start[i], p[i]));
            assert!(approx(end[i], q[i]));
        }
        let mid = quaternion_slerp(&p, &q, 0.5);
        let expected = angle_quaternion(&[0.0, 0.0, PI / 4.0]);
        for i in 0..4 {
            assert!(approx(mid[i], expected[i]));
        }
    }

    #[test]
    fn test_concat_translation() {
        let mut parent = IDENTITY_MATRIX;
        parent[0][3] = 10.0;
        let mut child = IDENTITY_MATRIX;
        child[2][3] = 5.0;
        let out = concat_transforms(&parent, &child);
        assert_eq!([out[0][3], out[1][3], out[2][3]], [10.0, 0.0, 5.0]);
    }

    #[test]
    fn test_root_bone_placed_at_origin() {
        let model = one_bone_model();
        let mut calc = BoneCalculator::new();
        let bones = calc
            .set_up_bones(&model, 0, 0.0, &[0; MAX_CONTROLLERS], &[0; MAX_BLENDERS], &[0.0; 3], &[1.0, 2.0, 3.0])
            .unwrap();
        assert_eq!(bones.len(), 1);
        assert_eq!([bones[0][0][3], bones[0][1][3], bones[0][2][3]], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_child_bone_follows_parent() {
        let mut model = one_bone_model();
        model.bones.push(StudioBone {
            name: "child".into(),
            parent: Some(0),
            values: [0.0, 0.0, 8.0, 0.0, 0.0, 0.0],
            scales: [1.0; 6],
            ..Default::default()
        });
        model.bones[0].values[0] = 4.0;
        let mut calc = BoneCalculator::new();
        let bones = calc
            .set_up_bones(&model, 0, 0.0, &[0; MAX_CONTROLLERS], &[0; MAX_BLENDERS], &[0.0; 3], &[0.0; 3])
            .unwrap();
        assert_eq!([bones[1][0][3], bones[1][1][3], bones[1][2][3]], [4.0, 0.0, 8.0]);
    }

    #[test]
    fn test_animation_interpolates_between_frames() {
        let mut model = one_bone_model();
        let mut anim = StudioAnimation::default();
        anim.values[0] = Some(vec![0.0, 10.0]);
        model.sequences[0].anim_blends[0].animations.push(anim);
        model.sequences[0].num_frames = 2;

        let mut calc = BoneCalculator::new();
        let bones = calc
            .set_up_bones(&model, 0, 0.5, &[0; MAX_CONTROLLERS], &[0; MAX_BLENDERS], &[0.0; 3], &[0.0; 3])
            .unwrap();
        assert!(approx(bones[0][0][3], 5.0));

        // past the last frame holds
        let bones = calc
            .set_up_bones(&model, 0, 7.0, &[0; MAX_CONTROLLERS], &[0; MAX_BLENDERS], &[0.0; 3], &[0.0; 3])
            .unwrap();
        assert!(approx(bones[0][0][3], 10.0));
    }

    #[test]
    fn test_motion_bone_axis_zeroed() {
        let mut model = one_bone_model();
        model.bones[0].values[0] = 12.0;
        model.bones[0].values[2] = 3.0;
        model.sequences[0].motion_type = MotionTypes::X;
        let mut calc = BoneCalculator::new();
        let bones = calc
            .set_up_bones(&model, 0, 0.0, &[0; MAX_CONTROLLERS], &[0; MAX_BLENDERS], &[0.0; 3], &[0.0; 3])
            .unwrap();
        assert_eq!(bones[0][0][3], 0.0);
        assert_eq!(bones[0][2][3], 3.0);
    }

    #[test]
    fn test_controller_moves_bone() {
        let mut model = one_bone_model();
        model.bones[0].controllers[2] = Some(0);
        model.controllers.push(StudioBoneController {
            bone: Some(0),
            motion_type: MotionTypes::Z,
            start: 0.0,
            end: 10.0,
            index: 0,
        });
        let mut controllers = [0; MAX_CONTROLLERS];
        controllers[0] = 255;
        let mut calc = BoneCalculator::new();
        let bones = calc
            .set_up_bones(&model, 0, 0.0, &controllers, &[0; MAX_BLENDERS], &[0.0; 3], &[0.0; 3])
            .unwrap();
        assert!(approx(bones[0][2][3], 10.0));
    }

    #[test]
    fn test_mouth_controller_uses_smaller_range() {
        let mut model = one_bone_model();
        model.bones[0].controllers[0] = Some(0);
        model.controllers.push(StudioBoneController {
            bone: Some(0),
            motion_type: MotionTypes::X | MotionTypes::RLOOP,
            start: 0.0,
            end: 30.0,
            index: MOUTH_CONTROLLER,
        });
        let mut controllers = [0; MAX_CONTROLLERS];
        controllers[MOUTH_CONTROLLER] = 64;
        let mut calc = BoneCalculator::new();
        let bones = calc
            .set_up_bones(&model, 0, 0.0, &controllers, &[0; MAX_BLENDERS], &[0.0; 3], &[0.0; 3])
            .unwrap();
        // fully open, no wrap
        assert!(approx(bones[0][0][3], 30.0));
    }

    #[test]
    fn test_two_way_blend() {
        let mut model = one_bone_model();
        let mut a = StudioAnimation::default();
        a.values[1] = Some(vec![0.0]);
        let mut b = StudioAnimation::default();
        b.values[1] = Some(vec![20.0]);
        model.sequences[0].anim_blends = vec![
            StudioAnimBlend { animations: vec![a] },
            StudioAnimBlend { animations: vec![b] },
        ];
        let mut calc = BoneCalculator::new();
        let bones = calc
            .set_up_bones(&model, 0, 0.0, &[0; MAX_CONTROLLERS], &[255, 0], &[0.0; 3], &[0.0; 3])
            .unwrap();
        assert!(approx(bones[0][1][3], 20.0));
    }

    #[test]
    fn test_sequence_out_of_range() {
        let model = one_bone_model();
        let mut calc = BoneCalculator::new();
        let result = calc.set_up_bones(&model, 3, 0.0, &[0; MAX_CONTROLLERS], &[0; MAX_BLENDERS], &[0.0; 3], &[0.0; 3]);
        assert!(matches!(result, Err(PhysicsError::StudioSequenceOutOfRange { sequence: 3, count: 1 })));
    }
}
