// cmodel.rs -- collision hulls and the hull traversal primitives
//
// Brush models are consumed already parsed. Every size class of a model is
// a Hull view into storage shared by the whole map, so submodels and the
// world reuse one plane and clip node array with different start indices.

use std::rc::Rc;

use crate::common::{com_dprintf, PhysicsError, PhysicsResult};
use crate::shared::{vector_negate, Contents, Plane, Trace, Vec3, DIST_EPSILON};

pub const MAX_MAP_HULLS: usize = 4;
pub const MAX_BOX_SIDES: usize = 6;

/// Clip box of each hull size class: point, standing player, large
/// monster, crouching player.
pub const HULL_SIZES: [(Vec3, Vec3); MAX_MAP_HULLS] = [
    ([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
    ([-16.0, -16.0, -36.0], [16.0, 16.0, 36.0]),
    ([-32.0, -32.0, -32.0], [32.0, 32.0, 32.0]),
    ([-16.0, -16.0, -18.0], [16.0, 16.0, 18.0]),
];

// ============================================================
// Clip nodes
// ============================================================

/// A clip node child: either another node or a leaf's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Branch(usize),
    Leaf(Contents),
}

impl NodeRef {
    /// Decode the on-disk form where negative numbers are contents.
    pub fn from_raw(raw: i32) -> Option<Self> {
        if raw >= 0 {
            Some(NodeRef::Branch(raw as usize))
        } else {
            Contents::from_i32(raw).map(NodeRef::Leaf)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipNode {
    pub planenum: usize,
    /// [front, back]
    pub children: [NodeRef; 2],
}

/// Six alternating nodes over six planes: +x max, +x min, +y max, +y min,
/// +z max, +z min. Each even node is empty in front, each odd node is
/// empty behind, and passing all six lands in solid.
pub const BOX_CLIPNODES: [ClipNode; MAX_BOX_SIDES] = [
    ClipNode { planenum: 0, children: [NodeRef::Leaf(Contents::Empty), NodeRef::Branch(1)] },
    ClipNode { planenum: 1, children: [NodeRef::Branch(2), NodeRef::Leaf(Contents::Empty)] },
    ClipNode { planenum: 2, children: [NodeRef::Leaf(Contents::Empty), NodeRef::Branch(3)] },
    ClipNode { planenum: 3, children: [NodeRef::Branch(4), NodeRef::Leaf(Contents::Empty)] },
    ClipNode { planenum: 4, children: [NodeRef::Leaf(Contents::Empty), NodeRef::Branch(5)] },
    ClipNode { planenum: 5, children: [NodeRef::Leaf(Contents::Solid), NodeRef::Leaf(Contents::Empty)] },
];

// ============================================================
// Hull
// ============================================================

/// Borrowed view of one hull: a node range inside shared clip node and
/// plane arrays.
#[derive(Debug, Clone, Copy)]
pub struct Hull<'a> {
    pub clipnodes: &'a [ClipNode],
    pub planes: &'a [Plane],
    pub firstclipnode: usize,
    pub lastclipnode: usize,
    pub clip_mins: Vec3,
    pub clip_maxs: Vec3,
}

impl<'a> Hull<'a> {
    #[inline]
    pub fn head_node(&self) -> NodeRef {
        NodeRef::Branch(self.firstclipnode)
    }

    fn node(&self, func: &'static str, num: usize) -> PhysicsResult<(&'a ClipNode, &'a Plane)> {
        if num < self.firstclipnode || num > self.lastclipnode {
            return Err(PhysicsError::BadNodeNumber { func, node: num });
        }
        let clipnodes: &'a [ClipNode] = self.clipnodes;
        let planes: &'a [Plane] = self.planes;
        let node = clipnodes
            .get(num)
            .ok_or(PhysicsError::BadNodeNumber { func, node: num })?;
        let plane = planes
            .get(node.planenum)
            .ok_or(PhysicsError::BadNodeNumber { func, node: num })?;
        Ok((node, plane))
    }
}

/// Hull description stored on a model, resolved to a `Hull` on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HullDef {
    pub firstclipnode: usize,
    pub lastclipnode: usize,
    pub clip_mins: Vec3,
    pub clip_maxs: Vec3,
}

// ============================================================
// HullPointContents
// ============================================================

pub fn hull_point_contents(hull: &Hull, num: NodeRef, p: &Vec3) -> PhysicsResult<Contents> {
    let mut current = num;

    loop {
        match current {
            NodeRef::Leaf(contents) => return Ok(contents),
            NodeRef::Branch(i) => {
                let (node, plane) = hull.node("HullPointContents", i)?;
                let d = plane.distance_to(p);
                current = if d >= 0.0 { node.children[0] } else { node.children[1] };
            }
        }
    }
}

// ============================================================
// RecursiveHullCheck
// ============================================================

/// Sweeps the segment p1..p2 (fractions p1f..p2f of the whole move) through
/// the hull. Returns false once the trace has been finalized against a
/// solid boundary, true to keep going.
#[allow(clippy::too_many_arguments)]
pub fn recursive_hull_check(
    hull: &Hull,
    num: NodeRef,
    p1f: f32,
    p2f: f32,
    p1: &Vec3,
    p2: &Vec3,
    trace: &mut Trace,
) -> PhysicsResult<bool> {
    let i = match num {
        NodeRef::Leaf(contents) => {
            if contents == Contents::Solid {
                trace.startsolid = true;
            } else {
                trace.allsolid = false;
                if contents == Contents::Empty {
                    trace.inopen = true;
                } else if contents != Contents::Translucent {
                    trace.inwater = true;
                }
            }
            return Ok(true);
        }
        NodeRef::Branch(i) => i,
    };

    let (node, plane) = hull.node("RecursiveHullCheck", i)?;

    let front = plane.distance_to(p1);
    let back = plane.distance_to(p2);

    if front >= 0.0 && back >= 0.0 {
        return recursive_hull_check(hull, node.children[0], p1f, p2f, p1, p2, trace);
    }
    if front < 0.0 && back < 0.0 {
        return recursive_hull_check(hull, node.children[1], p1f, p2f, p1, p2, trace);
    }

    // put the crosspoint DIST_EPSILON pixels on the near side
    let mut frac = if front < 0.0 {
        (front + DIST_EPSILON) / (front - back)
    } else {
        (front - DIST_EPSILON) / (front - back)
    };
    frac = frac.clamp(0.0, 1.0);
    if frac.is_nan() {
        return Ok(false);
    }

    let delta = p2f - p1f;
    let mut midf = p1f + delta * frac;
    let mut mid = lerp(p1, p2, frac);

    let side = if front < 0.0 { 1 } else { 0 };

    // move up to the node
    if !recursive_hull_check(hull, node.children[side], p1f, midf, p1, &mid, trace)? {
        return Ok(false);
    }

    if hull_point_contents(hull, node.children[side ^ 1], &mid)? != Contents::Solid {
        // go past the node
        return recursive_hull_check(hull, node.children[side ^ 1], midf, p2f, &mid, p2, trace);
    }

    if trace.allsolid {
        return Ok(false); // never got out of the solid area
    }

    // the other side of the node is solid, this is the impact point
    trace.plane = if side == 0 {
        *plane
    } else {
        Plane::new(vector_negate(&plane.normal), -plane.dist)
    };

    loop {
        trace.fraction = midf;
        if hull_point_contents(hull, hull.head_node(), &mid)? != Contents::Solid {
            trace.endpos = mid;
            return Ok(false);
        }

        // shouldn't really happen, but does occasionally
        frac -= 0.1;
        if frac < 0.0 {
            break;
        }
        midf = p1f + delta * frac;
        mid = lerp(p1, p2, frac);
    }

    trace.endpos = mid;
    com_dprintf("backup past 0\n");
    Ok(false)
}

#[inline]
fn lerp(p1: &Vec3, p2: &Vec3, frac: f32) -> Vec3 {
    [
        p1[0] + frac * (p2[0] - p1[0]),
        p1[1] + frac * (p2[1] - p1[1]),
        p1[2] + frac * (p2[2] - p1[2]),
    ]
}

// ============================================================
// Box hull
// ============================================================

/// Hull used to clip against entities that are not brush models. The
/// plane distances are rewritten for every query.
#[derive(Debug, Clone)]
pub struct BoxHull {
    planes: [Plane; MAX_BOX_SIDES],
}

impl BoxHull {
    pub fn new() -> Self {
        let mut planes = [Plane::default(); MAX_BOX_SIDES];
        for (i, plane) in planes.iter_mut().enumerate() {
            let mut normal = [0.0; 3];
            normal[i / 2] = 1.0;
            *plane = Plane::new(normal, 0.0);
        }
        Self { planes }
    }

    /// Place the box so that a mover with `mins`/`maxs` touches the
    /// entity box `ent_mins`/`ent_maxs` when its origin reaches a plane.
    pub fn set_bounds(&mut self, ent_mins: &Vec3, ent_maxs: &Vec3, mins: &Vec3, maxs: &Vec3) {
        self.planes[0].dist = ent_maxs[0] - mins[0];
        self.planes[1].dist = ent_mins[0] - maxs[0];
        self.planes[2].dist = ent_maxs[1] - mins[1];
        self.planes[3].dist = ent_mins[1] - maxs[1];
        self.planes[4].dist = ent_maxs[2] - mins[2];
        self.planes[5].dist = ent_mins[2] - maxs[2];
    }

    pub fn hull(&self) -> Hull<'_> {
        Hull {
            clipnodes: &BOX_CLIPNODES,
            planes: &self.planes,
            firstclipnode: 0,
            lastclipnode: MAX_BOX_SIDES - 1,
            clip_mins: [0.0; 3],
            clip_maxs: [0.0; 3],
        }
    }
}

impl Default for BoxHull {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Brush models
// ============================================================

/// Child of a render BSP node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BspChild {
    Node(usize),
    Leaf(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspNode {
    pub planenum: usize,
    pub children: [BspChild; 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BspLeaf {
    pub contents: Contents,
}

/// Arrays shared by the world and all of its submodels.
#[derive(Debug, Clone, Default)]
pub struct BspData {
    pub planes: Vec<Plane>,
    pub clipnodes: Vec<ClipNode>,
    pub nodes: Vec<BspNode>,
    /// Leaf 0 is the shared solid leaf.
    pub leafs: Vec<BspLeaf>,
}

#[derive(Debug, Clone)]
pub struct BrushModel {
    pub name: String,
    pub data: Rc<BspData>,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub origin: Vec3,
    pub hulls: [HullDef; MAX_MAP_HULLS],
    /// Root of the render tree, used to find touched leafs.
    pub headnode: BspChild,
}

impl BrushModel {
    pub fn hull(&self, index: usize) -> Hull<'_> {
        let def = &self.hulls[index];
        Hull {
            clipnodes: &self.data.clipnodes,
            planes: &self.data.planes,
            firstclipnode: def.firstclipnode,
            lastclipnode: def.lastclipnode,
            clip_mins: def.clip_mins,
            clip_maxs: def.clip_maxs,
        }
    }

    /// A model whose hull 0 is an axis aligned box with `inside` contents
    /// surrounded by `outside` contents, with the larger hulls grown or
    /// shrunk by their clip boxes. Rooms are built with an empty inside and
    /// solid outside, brush entities with a solid inside.
    pub fn aabb(name: &str, mins: Vec3, maxs: Vec3, inside: Contents, outside: Contents) -> Self {
        let mut data = BspData::default();
        let mut hulls = [HullDef::default(); MAX_MAP_HULLS];

        for (h, (clip_mins, clip_maxs)) in HULL_SIZES.iter().enumerate() {
            let (lo, hi) = if inside == Contents::Empty {
                (
                    [mins[0] - clip_mins[0], mins[1] - clip_mins[1], mins[2] - clip_mins[2]],
                    [maxs[0] - clip_maxs[0], maxs[1] - clip_maxs[1], maxs[2] - clip_maxs[2]],
                )
            } else {
                (
                    [mins[0] - clip_maxs[0], mins[1] - clip_maxs[1], mins[2] - clip_maxs[2]],
                    [maxs[0] - clip_mins[0], maxs[1] - clip_mins[1], maxs[2] - clip_mins[2]],
                )
            };

            let first_plane = data.planes.len();
            let first_node = data.clipnodes.len();

            for axis in 0..3 {
                let mut normal = [0.0; 3];
                normal[axis] = 1.0;
                data.planes.push(Plane::new(normal, hi[axis]));
                data.planes.push(Plane::new(normal, lo[axis]));
            }

            for i in 0..MAX_BOX_SIDES {
                let next = if i == MAX_BOX_SIDES - 1 {
                    NodeRef::Leaf(inside)
                } else {
                    NodeRef::Branch(first_node + i + 1)
                };
                let children = if i % 2 == 0 {
                    [NodeRef::Leaf(outside), next]
                } else {
                    [next, NodeRef::Leaf(outside)]
                };
                data.clipnodes.push(ClipNode { planenum: first_plane + i, children });
            }

            hulls[h] = HullDef {
                firstclipnode: first_node,
                lastclipnode: first_node + MAX_BOX_SIDES - 1,
                clip_mins: *clip_mins,
                clip_maxs: *clip_maxs,
            };
        }

        // render tree over the hull 0 planes
        data.leafs.push(BspLeaf { contents: Contents::Solid });
        let leaf_for = |leafs: &mut Vec<BspLeaf>, contents: Contents| -> usize {
            if contents == Contents::Solid {
                return 0;
            }
            leafs.push(BspLeaf { contents });
            leafs.len() - 1
        };
        let inside_leaf = leaf_for(&mut data.leafs, inside);
        let outside_leaf = leaf_for(&mut data.leafs, outside);

        for i in 0..MAX_BOX_SIDES {
            let next = if i == MAX_BOX_SIDES - 1 {
                BspChild::Leaf(inside_leaf)
            } else {
                BspChild::Node(i + 1)
            };
            let children = if i % 2 == 0 {
                [BspChild::Leaf(outside_leaf), next]
            } else {
                [next, BspChild::Leaf(outside_leaf)]
            };
            data.nodes.push(BspNode { planenum: i, children });
        }

        Self {
            name: name.to_string(),
            data: Rc::new(data),
            mins,
            maxs,
            origin: [0.0; 3],
            hulls,
            headnode: BspChild::Node(0),
        }
    }
}

// ============================================================
// Tests
// ============================================================
