// sv_world.rs -- world query functions
//
// Entity area checking: spatial partitioning via area nodes, linking and
// unlinking entities, trigger touching, box queries and point contents.
// Sweeps against the linked entities live in sv_move.rs.

use std::rc::Rc;

use gsphys_common::cmodel::{hull_point_contents, BoxHull, BrushModel, BspChild};
use gsphys_common::common::{com_dprintf, PhysicsError, PhysicsResult};
use gsphys_common::shared::*;
use gsphys_game::dispatch::call_touch;
use gsphys_game::g_local::{Edict, EntityList, MoveType, PhysicsState, Solid, MAX_ENT_LEAFS};

use crate::sv_studio::StudioCache;

// ===============================================================================
// ENTITY AREA CHECKING
// ===============================================================================

const AREA_DEPTH: i32 = 4;
pub const AREA_NODES: usize = 32;

#[derive(Debug, Clone)]
pub struct AreaNode {
    pub axis: i32, // -1 = leaf node
    pub dist: f32,
    pub children: [usize; 2], // indices into GamePhysics::area_nodes
    pub trigger_edicts: Vec<EntityHandle>,
    pub solid_edicts: Vec<EntityHandle>,
}

impl Default for AreaNode {
    fn default() -> Self {
        Self {
            axis: -1,
            dist: 0.0,
            children: [usize::MAX; 2],
            trigger_edicts: Vec::new(),
            solid_edicts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaType {
    Solid,
    Triggers,
}

/// How two nonzero group masks decide whether entities interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupOp {
    /// Interact when the masks share a bit.
    #[default]
    And,
    /// Interact unless the masks share a bit.
    Nand,
}

impl GroupOp {
    pub fn from_mode(mode: i32) -> PhysicsResult<Self> {
        match mode {
            0 => Ok(GroupOp::And),
            1 => Ok(GroupOp::Nand),
            _ => Err(PhysicsError::UnknownGroupOperation(mode)),
        }
    }
}

// ============================================================
// GamePhysics
// ============================================================

/// Collision side of the server: the area tree over the current map, the
/// hulls entities are clipped against and the studio hull cache.
#[derive(Debug)]
pub struct GamePhysics {
    pub(crate) world_model: Rc<BrushModel>,
    pub(crate) area_nodes: Vec<AreaNode>,
    group_op: GroupOp,
    touch_link_semaphore: bool,
    pub(crate) box_hull: BoxHull,
    pub(crate) studio_cache: StudioCache,
    /// Leave the shield hitbox out of studio hulls for entities that do
    /// not carry one.
    pub skip_shield_hitbox: bool,
}

impl GamePhysics {
    pub fn new(world_model: Rc<BrushModel>) -> Self {
        let mut physics = Self {
            world_model,
            area_nodes: Vec::with_capacity(AREA_NODES),
            group_op: GroupOp::And,
            touch_link_semaphore: false,
            box_hull: BoxHull::new(),
            studio_cache: StudioCache::new(),
            skip_shield_hitbox: false,
        };
        physics.clear_world();
        physics
    }

    pub fn world_model(&self) -> &Rc<BrushModel> {
        &self.world_model
    }

    pub fn area_nodes(&self) -> &[AreaNode] {
        &self.area_nodes
    }

    pub fn studio_cache(&self) -> &StudioCache {
        &self.studio_cache
    }

    pub fn studio_cache_mut(&mut self) -> &mut StudioCache {
        &mut self.studio_cache
    }

    // ================================================================
    // SV_CreateAreaNode
    //
    // Builds a uniformly subdivided tree for the given world size.
    // Returns the index of the created node.
    // ================================================================
    fn create_area_node(&mut self, depth: i32, mins: &Vec3, maxs: &Vec3) -> usize {
        let anode_idx = self.area_nodes.len();
        self.area_nodes.push(AreaNode::default());

        if depth == AREA_DEPTH {
            return anode_idx;
        }

        let size = vector_subtract(maxs, mins);
        let axis = if size[0] > size[1] { 0 } else { 1 };
        let dist = 0.5 * (maxs[axis] + mins[axis]);
        self.area_nodes[anode_idx].axis = axis as i32;
        self.area_nodes[anode_idx].dist = dist;

        let mins1 = *mins;
        let mut mins2 = *mins;
        let mut maxs1 = *maxs;
        let maxs2 = *maxs;

        maxs1[axis] = dist;
        mins2[axis] = dist;

        let child0 = self.create_area_node(depth + 1, &mins2, &maxs2);
        let child1 = self.create_area_node(depth + 1, &mins1, &maxs1);

        self.area_nodes[anode_idx].children = [child0, child1];

        anode_idx
    }

    // ================================================================
    // SV_ClearWorld
    // ================================================================
    pub fn clear_world(&mut self) {
        self.area_nodes.clear();
        let mins = self.world_model.mins;
        let maxs = self.world_model.maxs;
        self.create_area_node(0, &mins, &maxs);
    }

    // ================================================================
    // Group masks
    // ================================================================

    pub fn set_group_op(&mut self, mode: i32) -> PhysicsResult<()> {
        self.group_op = GroupOp::from_mode(mode)?;
        Ok(())
    }

    pub fn group_op(&self) -> GroupOp {
        self.group_op
    }

    pub fn test_group_operation(&self, lhs: u32, rhs: u32) -> bool {
        match self.group_op {
            GroupOp::And => lhs & rhs != 0,
            GroupOp::Nand => lhs & rhs == 0,
        }
    }

    /// Both masks set and the current operation says they stay apart.
    pub(crate) fn groups_excluded(&self, a: u32, b: u32) -> bool {
        a != 0 && b != 0 && !self.test_group_operation(a, b)
    }

    // ================================================================
    // SV_UnlinkEdict
    // ================================================================
    pub fn unlink_edict(&mut self, ents: &mut EntityList, h: EntityHandle) {
        let Some(ent) = ents.get_mut(h) else {
            return;
        };
        let Some(area) = ent.physics.area.take() else {
            return; // not linked in anywhere
        };

        if let Some(node) = self.area_nodes.get_mut(area) {
            node.trigger_edicts.retain(|&e| e != h);
            node.solid_edicts.retain(|&e| e != h);
        }
    }

    // ================================================================
    // SV_FindTouchedLeafs
    // ================================================================
    fn find_touched_leafs(
        &self,
        state: &mut PhysicsState,
        absmin: &Vec3,
        absmax: &Vec3,
        node: BspChild,
        topnode: &mut i32,
    ) -> PhysicsResult<()> {
        let data = &self.world_model.data;

        let num = match node {
            BspChild::Leaf(leaf) => {
                let contents = data
                    .leafs
                    .get(leaf)
                    .map_or(Contents::Solid, |l| l.contents);
                if contents != Contents::Solid {
                    // leaf 0 is the shared solid leaf and is not counted
                    state.add_leaf_number(leaf as i16 - 1);
                }
                return Ok(());
            }
            BspChild::Node(num) => num,
        };

        let bad_node = || PhysicsError::BadNodeNumber { func: "SV_FindTouchedLeafs", node: num };
        let node = data.nodes.get(num).ok_or_else(bad_node)?;
        let plane = data.planes.get(node.planenum).ok_or_else(bad_node)?;

        let sides = box_on_plane_side(absmin, absmax, plane);
        if sides == PlaneSide::CROSSES_PLANE && *topnode == -1 {
            *topnode = num as i32;
        }

        // recurse down the contacted sides
        if sides.contains(PlaneSide::IN_FRONT) {
            self.find_touched_leafs(state, absmin, absmax, node.children[0], topnode)?;
        }
        if sides.contains(PlaneSide::BEHIND) {
            self.find_touched_leafs(state, absmin, absmax, node.children[1], topnode)?;
        }
        Ok(())
    }

    // ================================================================
    // SV_LinkEdict
    //
    // Needs to be called any time an entity changes origin, mins, maxs or
    // solid. Sets the abs box, finds the touched world leafs and files the
    // entity under the first area node its box crosses.
    // ================================================================
    pub fn link_edict(&mut self, ents: &mut EntityList, h: EntityHandle, touch_triggers: bool) -> PhysicsResult<()> {
        self.unlink_edict(ents, h); // unlink from old position

        if h.index() == 0 {
            return Ok(()); // don't add the world
        }

        let (movetype, aim) = match ents.get_mut(h) {
            Some(ent) if !ent.pending_destruction() => {
                ent.set_abs_box();
                (ent.movetype, ent.aim_entity)
            }
            _ => return Ok(()),
        };

        // followers share the leafs of whatever they follow
        let leader = if movetype == MoveType::Follow {
            ents.lookup(aim).map(|a| a.physics.clone())
        } else {
            None
        };

        let Some(ent) = ents.get_mut(h) else {
            return Ok(());
        };

        match leader {
            Some(state) => ent.physics.copy_node_state_from(&state),
            None => {
                ent.physics.clear_node_state();
                if !ent.model.is_none() {
                    let mut topnode = -1;
                    let (absmin, absmax) = (ent.absmin, ent.absmax);
                    self.find_touched_leafs(&mut ent.physics, &absmin, &absmax, self.world_model.headnode, &mut topnode)?;
                    if ent.physics.leaf_count > MAX_ENT_LEAFS {
                        ent.physics.mark_leaf_count_overflowed(topnode);
                    }
                }
            }
        }

        if ent.solid == Solid::Not && ent.contents.value() >= Contents::Empty.value() {
            return Ok(()); // nothing to collide with or be inside of
        }

        if ent.solid == Solid::BSP && ent.model.brush().is_none() {
            com_dprintf(&format!("Inserted {} with no model\n", ent.classname));
            return Ok(());
        }

        // find the first node that the ent's box crosses
        let mut node_idx = 0;
        loop {
            let node = &self.area_nodes[node_idx];
            if node.axis == -1 {
                break;
            }
            let axis = node.axis as usize;
            if ent.absmin[axis] > node.dist {
                node_idx = node.children[0];
            } else if ent.absmax[axis] < node.dist {
                node_idx = node.children[1];
            } else {
                break; // crosses the node
            }
        }

        // link it in
        if ent.solid == Solid::Trigger {
            self.area_nodes[node_idx].trigger_edicts.push(h);
        } else {
            self.area_nodes[node_idx].solid_edicts.push(h);
        }
        ent.physics.area = Some(node_idx);

        // if touch_triggers, touch all entities at this node and descend
        // for more
        if touch_triggers && !self.touch_link_semaphore {
            self.touch_link_semaphore = true;
            let result = self.touch_links(ents, h);
            self.touch_link_semaphore = false;
            result?;
        }

        Ok(())
    }

    // ================================================================
    // SV_TouchLinks
    // ================================================================
    fn touch_links(&mut self, ents: &mut EntityList, h: EntityHandle) -> PhysicsResult<()> {
        let mut touched = Vec::new();
        if let Some(ent) = ents.get(h) {
            self.touch_candidates(0, ents, h, ent, &mut touched)?;
        }

        // touch callbacks may remove either side
        for other in touched {
            if !touchable(ents, other) || !touchable(ents, h) {
                continue;
            }
            call_touch(other, h, ents, None);

            if !touchable(ents, other) || !touchable(ents, h) {
                continue;
            }
            call_touch(h, other, ents, None);
        }
        Ok(())
    }

    fn touch_candidates(
        &self,
        node_idx: usize,
        ents: &EntityList,
        h: EntityHandle,
        ent: &Edict,
        list: &mut Vec<EntityHandle>,
    ) -> PhysicsResult<()> {
        let node = &self.area_nodes[node_idx];

        for &other in &node.trigger_edicts {
            if other == h {
                continue;
            }
            let Some(touch) = ents.get(other) else {
                continue;
            };
            if self.groups_excluded(touch.physics.group_info, ent.physics.group_info) {
                continue;
            }
            if touch.solid != Solid::Trigger {
                continue;
            }
            if !boxes_overlap(&ent.absmin, &ent.absmax, &touch.absmin, &touch.absmax) {
                continue;
            }

            // brush triggers need the origin inside the hull, not just an
            // overlapping box
            if touch.model.brush().is_some() {
                let (model, hull_index, offset) = self.hull_for_bsp(touch, &ent.mins, &ent.maxs)?;
                let hull = model.hull(hull_index);
                let local = vector_subtract(&ent.origin, &offset);
                if hull_point_contents(&hull, hull.head_node(), &local)? != Contents::Solid {
                    continue;
                }
            }

            list.push(other);
        }

        if node.axis == -1 {
            return Ok(()); // terminal node
        }

        // recurse down both sides
        let axis = node.axis as usize;
        if ent.absmax[axis] > node.dist {
            self.touch_candidates(node.children[0], ents, h, ent, list)?;
        }
        if ent.absmin[axis] < node.dist {
            self.touch_candidates(node.children[1], ents, h, ent, list)?;
        }
        Ok(())
    }

    // ================================================================
    // SV_AreaEdicts
    // ================================================================
    pub fn area_edicts(&self, ents: &EntityList, mins: &Vec3, maxs: &Vec3, area_type: AreaType) -> Vec<EntityHandle> {
        let mut list = Vec::new();
        if !self.area_nodes.is_empty() {
            self.area_edicts_r(0, ents, mins, maxs, area_type, &mut list);
        }
        list
    }

    fn area_edicts_r(
        &self,
        node_idx: usize,
        ents: &EntityList,
        area_mins: &Vec3,
        area_maxs: &Vec3,
        area_type: AreaType,
        area_list: &mut Vec<EntityHandle>,
    ) {
        let node = &self.area_nodes[node_idx];

        // touch linked edicts
        let start = match area_type {
            AreaType::Solid => &node.solid_edicts,
            AreaType::Triggers => &node.trigger_edicts,
        };

        for &h in start {
            let Some(check) = ents.get(h) else {
                continue;
            };
            if check.solid == Solid::Not {
                continue; // deactivated
            }
            if !boxes_overlap(&check.absmin, &check.absmax, area_mins, area_maxs) {
                continue; // not touching
            }
            area_list.push(h);
        }

        if node.axis == -1 {
            return; // terminal node
        }

        let axis = node.axis as usize;
        if area_maxs[axis] > node.dist {
            self.area_edicts_r(node.children[0], ents, area_mins, area_maxs, area_type, area_list);
        }
        if area_mins[axis] < node.dist {
            self.area_edicts_r(node.children[1], ents, area_mins, area_maxs, area_type, area_list);
        }
    }

    // ================================================================
    // SV_PointContents
    // ================================================================

    /// World contents at `p` exactly as the map stores them.
    pub fn true_point_contents(&self, p: &Vec3) -> PhysicsResult<Contents> {
        let hull = self.world_model.hull(0);
        hull_point_contents(&hull, hull.head_node(), p)
    }

    /// Contents at `p`, with currents reported as plain water and liquid
    /// brush entities overriding the world.
    pub fn point_contents(&self, ents: &EntityList, p: &Vec3, group_mask: u32) -> PhysicsResult<Contents> {
        let mut contents = self.true_point_contents(p)?;
        if contents.value() <= Contents::Current0.value() && contents.value() >= Contents::CurrentDown.value() {
            contents = Contents::Water;
        }
        if contents == Contents::Solid {
            return Ok(contents);
        }

        let entity_contents = self.link_contents(0, ents, p, group_mask)?;
        if entity_contents != Contents::Empty {
            return Ok(entity_contents);
        }
        Ok(contents)
    }

    // ================================================================
    // SV_LinkContents
    // ================================================================
    fn link_contents(&self, node_idx: usize, ents: &EntityList, p: &Vec3, group_mask: u32) -> PhysicsResult<Contents> {
        let node = &self.area_nodes[node_idx];

        for &h in &node.solid_edicts {
            let Some(touch) = ents.get(h) else {
                continue;
            };
            if touch.solid != Solid::Not {
                continue;
            }
            if touch.physics.group_info != 0 && !self.test_group_operation(touch.physics.group_info, group_mask) {
                continue;
            }
            if touch.model.brush().is_none() {
                continue;
            }
            if !boxes_overlap(&touch.absmin, &touch.absmax, p, p) {
                continue;
            }

            let (model, hull_index, offset) = self.hull_for_bsp(touch, &VEC3_ORIGIN, &VEC3_ORIGIN)?;
            let hull = model.hull(hull_index);
            let local = vector_subtract(p, &offset);
            if hull_point_contents(&hull, hull.head_node(), &local)? != Contents::Empty {
                return Ok(touch.contents);
            }
        }

        if node.axis == -1 {
            return Ok(Contents::Empty);
        }

        let axis = node.axis as usize;
        if p[axis] > node.dist {
            return self.link_contents(node.children[0], ents, p, group_mask);
        }
        if p[axis] < node.dist {
            return self.link_contents(node.children[1], ents, p, group_mask);
        }
        Ok(Contents::Empty)
    }
}

fn touchable(ents: &EntityList, h: EntityHandle) -> bool {
    ents.get(h).is_some_and(|e| !e.pending_destruction())
}
