// shared.rs -- math, planes, contents and trace types shared by every layer

// ============================================================
// Vector types
// ============================================================

pub type Vec3 = [f32; 3];

pub const VEC3_ORIGIN: Vec3 = [0.0, 0.0, 0.0];

// angle indexes
pub const PITCH: usize = 0;
pub const YAW: usize = 1;
pub const ROLL: usize = 2;

/// Velocity components smaller than this are snapped to zero after clipping.
pub const STOP_EPSILON: f32 = 0.1;

/// Bias kept between a sweep endpoint and the plane it hit.
pub const DIST_EPSILON: f32 = 0.03125;

// ============================================================
// MATHLIB -- Vector operations
// ============================================================

#[inline]
pub fn dot_product(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn vector_subtract(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn vector_add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn vector_negate(v: &Vec3) -> Vec3 {
    [-v[0], -v[1], -v[2]]
}

/// veca + scale * vecb
#[inline]
pub fn vector_ma(veca: &Vec3, scale: f32, vecb: &Vec3) -> Vec3 {
    [
        veca[0] + scale * vecb[0],
        veca[1] + scale * vecb[1],
        veca[2] + scale * vecb[2],
    ]
}

#[inline]
pub fn vector_scale(v: &Vec3, scale: f32) -> Vec3 {
    [v[0] * scale, v[1] * scale, v[2] * scale]
}

pub fn vector_compare(v1: &Vec3, v2: &Vec3) -> bool {
    v1[0] == v2[0] && v1[1] == v2[1] && v1[2] == v2[2]
}

pub fn vector_is_zero(v: &Vec3) -> bool {
    vector_compare(v, &VEC3_ORIGIN)
}

pub fn vector_length(v: &Vec3) -> f32 {
    dot_product(v, v).sqrt()
}

pub fn vector_length_squared(v: &Vec3) -> f32 {
    dot_product(v, v)
}

/// Normalize in place, returns original length.
pub fn vector_normalize(v: &mut Vec3) -> f32 {
    let length = vector_length(v);
    if length != 0.0 {
        let ilength = 1.0 / length;
        v[0] *= ilength;
        v[1] *= ilength;
        v[2] *= ilength;
    }
    length
}

pub fn cross_product(v1: &Vec3, v2: &Vec3) -> Vec3 {
    [
        v1[1] * v2[2] - v1[2] * v2[1],
        v1[2] * v2[0] - v1[0] * v2[2],
        v1[0] * v2[1] - v1[1] * v2[0],
    ]
}

/// Radius of the sphere centered on the origin that encloses the box.
pub fn radius_from_bounds(mins: &Vec3, maxs: &Vec3) -> f32 {
    let mut corner = [0.0f32; 3];
    for i in 0..3 {
        corner[i] = mins[i].abs().max(maxs[i].abs());
    }
    vector_length(&corner)
}

// ============================================================
// Angle functions
// ============================================================

pub fn angle_vectors(
    angles: &Vec3,
    forward: Option<&mut Vec3>,
    right: Option<&mut Vec3>,
    up: Option<&mut Vec3>,
) {
    let angle_yaw = angles[YAW].to_radians();
    let sy = angle_yaw.sin();
    let cy = angle_yaw.cos();

    let angle_pitch = angles[PITCH].to_radians();
    let sp = angle_pitch.sin();
    let cp = angle_pitch.cos();

    let angle_roll = angles[ROLL].to_radians();
    let sr = angle_roll.sin();
    let cr = angle_roll.cos();

    if let Some(fwd) = forward {
        fwd[0] = cp * cy;
        fwd[1] = cp * sy;
        fwd[2] = -sp;
    }
    if let Some(r) = right {
        r[0] = -sr * sp * cy + -cr * -sy;
        r[1] = -sr * sp * sy + -cr * cy;
        r[2] = -sr * cp;
    }
    if let Some(u) = up {
        u[0] = cr * sp * cy + -sr * -sy;
        u[1] = cr * sp * sy + -sr * cy;
        u[2] = cr * cp;
    }
}

/// (forward, right, up)
pub fn angle_vectors_tuple(angles: &Vec3) -> (Vec3, Vec3, Vec3) {
    let mut forward = [0.0f32; 3];
    let mut right = [0.0f32; 3];
    let mut up = [0.0f32; 3];
    angle_vectors(angles, Some(&mut forward), Some(&mut right), Some(&mut up));
    (forward, right, up)
}

/// Rows of the inverse of the rotation `angle_vectors` describes, so that
/// a vector moved into entity space with (forward, -right, up) can be
/// brought back with three dot products.
pub fn angle_vectors_transpose(angles: &Vec3) -> (Vec3, Vec3, Vec3) {
    let angle_yaw = angles[YAW].to_radians();
    let sy = angle_yaw.sin();
    let cy = angle_yaw.cos();

    let angle_pitch = angles[PITCH].to_radians();
    let sp = angle_pitch.sin();
    let cp = angle_pitch.cos();

    let angle_roll = angles[ROLL].to_radians();
    let sr = angle_roll.sin();
    let cr = angle_roll.cos();

    let forward = [cp * cy, sr * sp * cy + cr * -sy, cr * sp * cy + -sr * -sy];
    let right = [cp * sy, sr * sp * sy + cr * cy, cr * sp * sy + -sr * cy];
    let up = [-sp, sr * cp, cr * cp];

    (forward, right, up)
}

// ============================================================
// Contents
// ============================================================

/// Leaf contents. Clip node children encode these as negative numbers on
/// disk; in memory they only ever appear inside `NodeRef::Leaf`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Contents {
    Node = 0,
    Empty = -1,
    Solid = -2,
    Water = -3,
    Slime = -4,
    Lava = -5,
    Sky = -6,
    Origin = -7,
    Clip = -8,
    Current0 = -9,
    Current90 = -10,
    Current180 = -11,
    Current270 = -12,
    CurrentUp = -13,
    CurrentDown = -14,
    Translucent = -15,
    Ladder = -16,
}

impl Contents {
    pub fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::Node,
            -1 => Self::Empty,
            -2 => Self::Solid,
            -3 => Self::Water,
            -4 => Self::Slime,
            -5 => Self::Lava,
            -6 => Self::Sky,
            -7 => Self::Origin,
            -8 => Self::Clip,
            -9 => Self::Current0,
            -10 => Self::Current90,
            -11 => Self::Current180,
            -12 => Self::Current270,
            -13 => Self::CurrentUp,
            -14 => Self::CurrentDown,
            -15 => Self::Translucent,
            -16 => Self::Ladder,
            _ => return None,
        })
    }

    #[inline]
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Water, slime, lava and the currents. Translucent and ladder volumes
    /// are numbered below them but are not liquid.
    #[inline]
    pub fn is_liquid(self) -> bool {
        self.value() <= Contents::Water.value() && self.value() > Contents::Translucent.value()
    }

    /// Current0 and everything numbered below it.
    #[inline]
    pub fn is_current(self) -> bool {
        self.value() <= Contents::Current0.value()
    }
}

/// Push directions for Current0..CurrentDown, indexed by
/// `Current0 - contents`.
pub const CURRENT_TABLE: [Vec3; 6] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, -1.0, 0.0],
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
];

pub fn current_direction(contents: Contents) -> Option<Vec3> {
    let index = Contents::Current0.value() - contents.value();
    if (0..CURRENT_TABLE.len() as i32).contains(&index) {
        Some(CURRENT_TABLE[index as usize])
    } else {
        None
    }
}

// ============================================================
// Plane
// ============================================================

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaneType {
    #[default]
    X = 0,
    Y = 1,
    Z = 2,
    AnyX = 3,
    AnyY = 4,
    AnyZ = 5,
}

impl PlaneType {
    /// Axis index for axial planes.
    #[inline]
    pub fn axis(self) -> Option<usize> {
        match self {
            PlaneType::X => Some(0),
            PlaneType::Y => Some(1),
            PlaneType::Z => Some(2),
            _ => None,
        }
    }

    pub fn for_normal(normal: &Vec3) -> Self {
        // only positive axial normals take the shortcut
        if normal[0] == 1.0 {
            return PlaneType::X;
        }
        if normal[1] == 1.0 {
            return PlaneType::Y;
        }
        if normal[2] == 1.0 {
            return PlaneType::Z;
        }

        let ax = normal[0].abs();
        let ay = normal[1].abs();
        let az = normal[2].abs();

        if ax >= ay && ax >= az {
            PlaneType::AnyX
        } else if ay >= ax && ay >= az {
            PlaneType::AnyY
        } else {
            PlaneType::AnyZ
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Plane {
    pub normal: Vec3,
    pub dist: f32,
    pub plane_type: PlaneType,
    /// Bit i is set when normal[i] is negative.
    pub signbits: u8,
}

impl Plane {
    pub fn new(normal: Vec3, dist: f32) -> Self {
        Self {
            normal,
            dist,
            plane_type: PlaneType::for_normal(&normal),
            signbits: signbits_for_plane(&normal),
        }
    }

    /// Signed distance of `p` from the plane, taking the axial shortcut
    /// when the plane type allows it.
    #[inline]
    pub fn distance_to(&self, p: &Vec3) -> f32 {
        match self.plane_type.axis() {
            Some(axis) => p[axis] - self.dist,
            None => dot_product(&self.normal, p) - self.dist,
        }
    }
}

pub fn signbits_for_plane(normal: &Vec3) -> u8 {
    let mut bits = 0;
    for (j, n) in normal.iter().enumerate() {
        if *n < 0.0 {
            bits |= 1 << j;
        }
    }
    bits
}

bitflags::bitflags! {
    /// Result of classifying a box against a plane. `CROSSES_PLANE` is
    /// both bits set.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PlaneSide: u8 {
        const IN_FRONT      = 1;
        const BEHIND        = 2;
        const CROSSES_PLANE = Self::IN_FRONT.bits() | Self::BEHIND.bits();
    }
}

/// BoxOnPlaneSide
pub fn box_on_plane_side(emins: &Vec3, emaxs: &Vec3, p: &Plane) -> PlaneSide {
    // fast axial cases
    if let Some(t) = p.plane_type.axis() {
        if p.dist <= emins[t] {
            return PlaneSide::IN_FRONT;
        }
        if p.dist >= emaxs[t] {
            return PlaneSide::BEHIND;
        }
        return PlaneSide::CROSSES_PLANE;
    }

    // near/far corners picked by the normal's octant
    let n = &p.normal;
    let (dist1, dist2) = match p.signbits & 7 {
        0 => (
            n[0] * emaxs[0] + n[1] * emaxs[1] + n[2] * emaxs[2],
            n[0] * emins[0] + n[1] * emins[1] + n[2] * emins[2],
        ),
        1 => (
            n[0] * emins[0] + n[1] * emaxs[1] + n[2] * emaxs[2],
            n[0] * emaxs[0] + n[1] * emins[1] + n[2] * emins[2],
        ),
        2 => (
            n[0] * emaxs[0] + n[1] * emins[1] + n[2] * emaxs[2],
            n[0] * emins[0] + n[1] * emaxs[1] + n[2] * emins[2],
        ),
        3 => (
            n[0] * emins[0] + n[1] * emins[1] + n[2] * emaxs[2],
            n[0] * emaxs[0] + n[1] * emaxs[1] + n[2] * emins[2],
        ),
        4 => (
            n[0] * emaxs[0] + n[1] * emaxs[1] + n[2] * emins[2],
            n[0] * emins[0] + n[1] * emins[1] + n[2] * emaxs[2],
        ),
        5 => (
            n[0] * emins[0] + n[1] * emaxs[1] + n[2] * emins[2],
            n[0] * emaxs[0] + n[1] * emins[1] + n[2] * emaxs[2],
        ),
        6 => (
            n[0] * emaxs[0] + n[1] * emins[1] + n[2] * emins[2],
            n[0] * emins[0] + n[1] * emaxs[1] + n[2] * emaxs[2],
        ),
        _ => (
            n[0] * emins[0] + n[1] * emins[1] + n[2] * emins[2],
            n[0] * emaxs[0] + n[1] * emaxs[1] + n[2] * emaxs[2],
        ),
    };

    let mut sides = PlaneSide::empty();
    if dist1 >= p.dist {
        sides |= PlaneSide::IN_FRONT;
    }
    if dist2 < p.dist {
        sides |= PlaneSide::BEHIND;
    }
    sides
}

pub fn boxes_overlap(mins1: &Vec3, maxs1: &Vec3, mins2: &Vec3, maxs2: &Vec3) -> bool {
    !(mins1[0] > maxs2[0]
        || mins1[1] > maxs2[1]
        || mins1[2] > maxs2[2]
        || maxs1[0] < mins2[0]
        || maxs1[1] < mins2[1]
        || maxs1[2] < mins2[2])
}

// ============================================================
// Entity handles
// ============================================================

/// Generational reference to an entity slot. A handle whose serial no
/// longer matches the slot refers to a destroyed entity and resolves to
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle {
    pub index: u32,
    pub serial: u32,
}

impl EntityHandle {
    pub const fn new(index: u32, serial: u32) -> Self {
        Self { index, serial }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

// ============================================================
// Trace
// ============================================================

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceType {
    #[default]
    None = 0,
    IgnoreMonsters = 1,
    /// Monsters are clipped with a fixed +-15 box.
    Missile = 2,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TraceFlags: u32 {
        /// Never use studio hitbox hulls, only the bounding box.
        const SIMPLE_BOX = 1 << 0;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub allsolid: bool,
    pub startsolid: bool,
    pub inopen: bool,
    pub inwater: bool,
    /// 1.0 = the whole move completed
    pub fraction: f32,
    pub endpos: Vec3,
    pub plane: Plane,
    pub ent: Option<EntityHandle>,
    /// Hit group of the studio hitbox that was hit, 0 otherwise.
    pub hitgroup: i32,
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            allsolid: false,
            startsolid: false,
            inopen: false,
            inwater: false,
            fraction: 1.0,
            endpos: [0.0; 3],
            plane: Plane::default(),
            ent: None,
            hitgroup: 0,
        }
    }
}

impl Trace {
    /// Starting state for a sweep: everything is solid until a leaf says
    /// otherwise.
    pub fn begin(end: &Vec3) -> Self {
        Self {
            allsolid: true,
            fraction: 1.0,
            endpos: *end,
            ..Self::default()
        }
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_dot_product() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        assert_eq!(dot_product(&a, &b), 32.0);
    }

    #[test]
    fn test_cross_product() {
        let c = cross_product(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert_eq!(c, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_vector_normalize() {
        let mut v = [3.0, 0.0, 4.0];
        let len = vector_normalize(&mut v);
        assert!((len - 5.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[2] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_plane_type_and_signbits() {
        let p = Plane::new([0.0, 0.0, 1.0], 10.0);
        assert_eq!(p.plane_type, PlaneType::Z);
        assert_eq!(p.signbits, 0);

        let q = Plane::new([-0.6, 0.0, -0.8], 0.0);
        assert_eq!(q.plane_type, PlaneType::AnyZ);
        assert_eq!(q.signbits, 0b101);
    }

    #[test]
    fn test_contents_ordering_helpers() {
        assert!(Contents::Water.is_liquid());
        assert!(Contents::Lava.is_liquid());
        assert!(!Contents::Empty.is_liquid());
        assert!(!Contents::Solid.is_liquid());
        assert!(Contents::CurrentDown.is_liquid());
        assert!(!Contents::Translucent.is_liquid());
        assert!(!Contents::Ladder.is_liquid());
        assert!(Contents::Current90.is_current());
        assert!(!Contents::Water.is_current());
        assert_eq!(Contents::from_i32(-12), Some(Contents::Current270));
        assert_eq!(Contents::from_i32(-40), None);
    }

    #[test]
    fn test_current_direction() {
        assert_eq!(current_direction(Contents::Current0), Some([1.0, 0.0, 0.0]));
        assert_eq!(current_direction(Contents::CurrentDown), Some([0.0, 0.0, -1.0]));
        assert_eq!(current_direction(Contents::Water), None);
        assert_eq!(current_direction(Contents::Translucent), None);
    }

    #[test]
    fn test_box_on_plane_side_axial() {
        let mins = [-16.0, -16.0, 0.0];
        let maxs = [16.0, 16.0, 72.0];

        let floor = Plane::new([0.0, 0.0, 1.0], -8.0);
        assert_eq!(box_on_plane_side(&mins, &maxs, &floor), PlaneSide::IN_FRONT);

        let ceiling = Plane::new([0.0, 0.0, 1.0], 100.0);
        assert_eq!(box_on_plane_side(&mins, &maxs, &ceiling), PlaneSide::BEHIND);

        let split = Plane::new([1.0, 0.0, 0.0], 0.0);
        assert_eq!(box_on_plane_side(&mins, &maxs, &split), PlaneSide::CROSSES_PLANE);
    }

    fn brute_force_side(mins: &Vec3, maxs: &Vec3, p: &Plane) -> PlaneSide {
        let mut lo = f32::MAX;
        let mut hi = f32::MIN;
        for corner in 0..8 {
            let c = [
                if corner & 1 != 0 { maxs[0] } else { mins[0] },
                if corner & 2 != 0 { maxs[1] } else { mins[1] },
                if corner & 4 != 0 { maxs[2] } else { mins[2] },
            ];
            let d = p.normal[0] * c[0] + p.normal[1] * c[1] + p.normal[2] * c[2];
            lo = lo.min(d);
            hi = hi.max(d);
        }

        let mut sides = PlaneSide::empty();
        if hi >= p.dist {
            sides |= PlaneSide::IN_FRONT;
        }
        if lo < p.dist {
            sides |= PlaneSide::BEHIND;
        }
        sides
    }

    #[test]
    fn test_box_on_plane_side_matches_corner_check() {
        let mut rng = StdRng::seed_from_u64(0x51de);

        for _ in 0..2000 {
            let mut mins = [0.0f32; 3];
            let mut maxs = [0.0f32; 3];
            for i in 0..3 {
                let a: f32 = rng.gen_range(-256.0..256.0);
                let b: f32 = rng.gen_range(-256.0..256.0);
                mins[i] = a.min(b);
                maxs[i] = a.max(b);
            }

            let mut normal = [
                rng.gen_range(-1.0f32..1.0),
                rng.gen_range(-1.0f32..1.0),
                rng.gen_range(-1.0f32..1.0),
            ];
            if vector_normalize(&mut normal) == 0.0 {
                continue;
            }
            let plane = Plane::new(normal, rng.gen_range(-300.0..300.0));

            assert_eq!(
                box_on_plane_side(&mins, &maxs, &plane),
                brute_force_side(&mins, &maxs, &plane),
                "mismatch for box {:?}-{:?} against {:?}",
                mins,
                maxs,
                plane
            );
        }
    }

    #[test]
    fn test_box_on_plane_side_axial_matches_corner_check() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let axis = rng.gen_range(0..3);
            let mut normal = [0.0f32; 3];
            normal[axis] = 1.0;
            let plane = Plane::new(normal, rng.gen_range(-64.0..64.0));

            let lo: f32 = rng.gen_range(-64.0..64.0);
            let mins = [lo, lo, lo];
            let maxs = [lo + rng.gen_range(1.0..32.0); 3];

            assert_eq!(
                box_on_plane_side(&mins, &maxs, &plane),
                brute_force_side(&mins, &maxs, &plane)
            );
        }
    }

    #[test]
    fn test_angle_vectors_transpose_inverts_rotation() {
        let angles = [15.0, 40.0, -20.0];
        let (f, r, u) = angle_vectors_tuple(&angles);
        let (ft, rt, ut) = angle_vectors_transpose(&angles);

        let world = [3.0, -7.0, 11.0];
        let local = [dot_product(&world, &f), -dot_product(&world, &r), dot_product(&world, &u)];
        let back = [dot_product(&local, &ft), dot_product(&local, &rt), dot_product(&local, &ut)];

        for i in 0..3 {
            assert!((back[i] - world[i]).abs() < 1e-4, "axis {} {:?} vs {:?}", i, back, world);
        }
    }

    #[test]
    fn test_boxes_overlap() {
        assert!(boxes_overlap(&[0.0; 3], &[10.0; 3], &[5.0; 3], &[15.0; 3]));
        assert!(!boxes_overlap(&[0.0; 3], &[10.0; 3], &[11.0; 3], &[15.0; 3]));
    }

    #[test]
    fn test_trace_begin() {
        let t = Trace::begin(&[1.0, 2.0, 3.0]);
        assert!(t.allsolid);
        assert_eq!(t.fraction, 1.0);
        assert_eq!(t.endpos, [1.0, 2.0, 3.0]);
        assert!(t.ent.is_none());
    }
}
