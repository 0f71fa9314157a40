//! Scene arena and the per-frame recalculation pass
//!
//! All nodes live in a single append-only arena indexed by dense ids that
//! are never reused, so bitsets and per-id side arrays can be sized from the
//! arena high-water mark. Raw ownership of entries never leaves the arena;
//! parent links are plain back-indices.
//!
//! `recalculate` interleaves the two propagation directions in one recursive
//! walk per node: transforms flow top-down (a child cannot know it must
//! recompute until told its parent changed) while bounding volumes flow
//! bottom-up (a parent volume is only known once all children are resolved).
//! Running them as two separate tree walks would double traversal cost.

use thiserror::Error;

use crate::config::TraversalConfig;
use crate::culling::frustum::Frustum;
use crate::foundation::collections::IdSet;
use crate::foundation::math::{normal_matrix, Mat4, Point3, Transform, Vec3};
use crate::scene::bounds::BoundingVolume;
use crate::scene::node::{
    CameraData, GroupData, LeafData, NodeId, NodeKind, Projection, ResourceState, SceneNode,
};
use crate::spatial::splitter;

/// Structural scene-graph errors
///
/// The per-frame hot path (recalculation, culling) is infallible by design;
/// errors only surface from structural mutation and lookup APIs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    /// The id does not name a live node
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// The operation requires a group node
    #[error("node {0} is not a group")]
    NotAGroup(NodeId),

    /// The operation requires a camera node
    #[error("node {0} is not a camera")]
    NotACamera(NodeId),

    /// The operation requires a drawable leaf node
    #[error("node {0} is not a drawable leaf")]
    NotADrawable(NodeId),

    /// Attaching a node that is still attached elsewhere; reparenting is
    /// sanctioned only as detach-then-attach
    #[error("node {child} is already parented under node {parent}")]
    AlreadyParented {
        /// The node being attached
        child: NodeId,
        /// Its current parent
        parent: NodeId,
    },

    /// The root group cannot be detached or removed
    #[error("the scene root cannot be removed")]
    CannotRemoveRoot,
}

/// Hierarchical transform graph backed by an append-only node arena
#[derive(Debug)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    root: NodeId,
    retired: IdSet,
    newly_retired: Vec<NodeId>,
    topology_changed: bool,
    config: TraversalConfig,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create a graph holding only a root group
    pub fn new() -> Self {
        Self::with_config(TraversalConfig::default())
    }

    /// Create a graph with explicit traversal configuration
    pub fn with_config(config: TraversalConfig) -> Self {
        let root = SceneNode::new(
            0,
            "root".to_string(),
            Transform::identity(),
            NodeKind::Group(GroupData {
                children: Vec::new(),
                split_threshold: config.split_threshold,
                synthetic: false,
                subtree_ids: Vec::new(),
            }),
        );
        Self {
            nodes: vec![root],
            root: 0,
            retired: IdSet::new(),
            newly_retired: Vec::new(),
            topology_changed: false,
            config,
        }
    }

    /// Id of the root group
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Arena high-water mark (includes retired ids); sizes bitsets and
    /// per-id side arrays
    pub fn node_count(&self) -> u32 {
        self.nodes.len() as u32
    }

    /// Borrow a live node
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        if self.retired.contains(id) {
            return None;
        }
        self.nodes.get(id as usize)
    }

    /// Mutably borrow a live node
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        if self.retired.contains(id) {
            return None;
        }
        self.nodes.get_mut(id as usize)
    }

    /// Find a live node by name
    ///
    /// Lookup is transparent to spatial subdivision: a node is found whether
    /// or not it currently sits under a synthesized group.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| n.name == name && !self.retired.contains(n.id))
            .map(|n| n.id)
    }

    // --- construction ---

    /// Add a group under `parent`
    pub fn add_group(&mut self, parent: NodeId, name: &str) -> Result<NodeId, SceneError> {
        let threshold = self.config.split_threshold;
        self.add_node(
            parent,
            name,
            Transform::identity(),
            NodeKind::Group(GroupData {
                children: Vec::new(),
                split_threshold: threshold,
                synthetic: false,
                subtree_ids: Vec::new(),
            }),
        )
    }

    /// Add a drawable leaf under `parent`
    ///
    /// `resource` may be [`ResourceState::Pending`] for leaves whose
    /// geometry/material are still being resolved; the leaf participates in
    /// transform and bounds propagation immediately.
    pub fn add_leaf(
        &mut self,
        parent: NodeId,
        name: &str,
        local: Transform,
        mut local_bounds: BoundingVolume,
        resource: ResourceState,
    ) -> Result<NodeId, SceneError> {
        if !local_bounds.is_unset() {
            local_bounds.compute_corners();
        }
        self.add_node(
            parent,
            name,
            local,
            NodeKind::Leaf(LeafData {
                resource,
                local_bounds,
            }),
        )
    }

    /// Add a camera under `parent`
    pub fn add_camera(
        &mut self,
        parent: NodeId,
        name: &str,
        local: Transform,
        projection: Projection,
    ) -> Result<NodeId, SceneError> {
        self.add_node(parent, name, local, NodeKind::Camera(CameraData::new(projection)))
    }

    /// Add a light under `parent`
    pub fn add_light(
        &mut self,
        parent: NodeId,
        name: &str,
        local: Transform,
    ) -> Result<NodeId, SceneError> {
        self.add_node(parent, name, local, NodeKind::Light)
    }

    fn add_node(
        &mut self,
        parent: NodeId,
        name: &str,
        local: Transform,
        kind: NodeKind,
    ) -> Result<NodeId, SceneError> {
        self.ensure_live(parent)?;
        if self.nodes[parent as usize].group().is_none() {
            return Err(SceneError::NotAGroup(parent));
        }

        let id = self.nodes.len() as NodeId;
        let mut node = SceneNode::new(id, name.to_string(), local, kind);
        node.parent = Some(parent);
        self.nodes.push(node);
        if let Some(group) = self.nodes[parent as usize].group_mut() {
            group.children.push(id);
        }
        self.topology_changed = true;
        log::trace!("added node {id} ({name}) under {parent}");
        Ok(id)
    }

    // --- structural mutation ---

    /// Attach a detached node under a group
    ///
    /// Attaching a node that is currently attached elsewhere is an error;
    /// detach it first. Attaching to its current parent is a no-op.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.ensure_live(parent)?;
        self.ensure_live(child)?;
        if self.nodes[parent as usize].group().is_none() {
            return Err(SceneError::NotAGroup(parent));
        }
        if let Some(existing) = self.nodes[child as usize].parent {
            if existing == parent {
                return Ok(());
            }
            return Err(SceneError::AlreadyParented {
                child,
                parent: existing,
            });
        }

        if let Some(group) = self.nodes[parent as usize].group_mut() {
            group.children.push(child);
        }
        self.nodes[child as usize].parent = Some(parent);
        self.nodes[child as usize].dirty = true;
        self.topology_changed = true;
        Ok(())
    }

    /// Detach a node from its parent, leaving it outside the tree
    ///
    /// Detaching an already-detached node is a no-op. The root cannot be
    /// detached.
    pub fn detach(&mut self, child: NodeId) -> Result<(), SceneError> {
        self.ensure_live(child)?;
        if child == self.root {
            return Err(SceneError::CannotRemoveRoot);
        }
        let Some(parent) = self.nodes[child as usize].parent else {
            return Ok(());
        };
        if let Some(group) = self.nodes[parent as usize].group_mut() {
            group.children.retain(|&c| c != child);
        }
        self.nodes[child as usize].parent = None;
        self.topology_changed = true;
        Ok(())
    }

    /// Remove a node and its whole subtree, retiring their ids
    ///
    /// Retired ids are never reused; the traversal clears them from its
    /// bookkeeping bitsets at the next frame boundary.
    pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.ensure_live(id)?;
        if id == self.root {
            return Err(SceneError::CannotRemoveRoot);
        }
        self.detach(id)?;

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            pending.extend_from_slice(self.nodes[current as usize].children());
            self.retired.insert(current);
            self.newly_retired.push(current);
        }
        log::debug!("removed node {id} and its subtree");
        Ok(())
    }

    /// Drain the ids retired since the last call (consumed by the traversal)
    pub fn take_newly_retired(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.newly_retired)
    }

    /// Consume the topology-changed marker (consumed by the traversal to
    /// batch subtree-id rebuilds to at most one per frame)
    pub fn take_topology_changed(&mut self) -> bool {
        std::mem::take(&mut self.topology_changed)
    }

    // --- resource readiness ---

    /// Flip a pending leaf's resources to ready
    ///
    /// Called by the frame loop when the asset layer signals completion.
    /// Resolving an already-ready leaf is benign.
    pub fn mark_resource_ready(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.ensure_live(id)?;
        let node = &mut self.nodes[id as usize];
        let NodeKind::Leaf(leaf) = &mut node.kind else {
            return Err(SceneError::NotADrawable(id));
        };
        if leaf.resource == ResourceState::Pending {
            leaf.resource = ResourceState::Ready;
            node.processing = false;
            log::trace!("resources resolved for node {id}");
        }
        Ok(())
    }

    // --- per-frame passes ---

    /// Run the whole-graph recalculation pass
    ///
    /// Registers every reachable node id into `found` (this is how the
    /// traversal discovers all live nodes each frame), recomputes local and
    /// world transforms top-down where dirty, re-aggregates group bounding
    /// volumes bottom-up, re-derives `processing` flags, and triggers
    /// spatial subdivision on oversized settled groups. Returns the
    /// pre-clear dirty state of the root subtree.
    pub fn recalculate(&mut self, found: &mut IdSet) -> bool {
        let root = self.root;
        self.recalc_node(root, false, found)
    }

    fn recalc_node(&mut self, id: NodeId, parent_dirty: bool, found: &mut IdSet) -> bool {
        found.insert(id);
        let idx = id as usize;

        let was_dirty = self.nodes[idx].dirty;
        let synthetic = self.nodes[idx].is_synthetic();
        let world_changed = was_dirty || parent_dirty;

        if was_dirty && !synthetic {
            self.nodes[idx].local_matrix = self.nodes[idx].local.to_matrix();
        }

        if world_changed {
            let parent_world = self.nodes[idx]
                .parent
                .map(|p| self.nodes[p as usize].world_matrix);
            let world = match parent_world {
                // a synthetic group owns no transform; it adopts its parent's
                Some(parent_world) if synthetic => parent_world,
                Some(parent_world) => parent_world * self.nodes[idx].local_matrix,
                None => self.nodes[idx].local_matrix,
            };
            let normal = normal_matrix(&world);
            let node = &mut self.nodes[idx];
            node.world_matrix = world;
            node.normal_matrix = normal;
            if let NodeKind::Camera(camera) = &mut node.kind {
                camera.view_dirty = true;
            }
        }

        self.nodes[idx].dirty = false;
        self.nodes[idx].updated = world_changed;

        if world_changed {
            self.update_leaf_bounds(idx);
        }

        let mut subtree_dirty = was_dirty;
        if self.nodes[idx].group().is_some() {
            let mut any_processing = false;
            let mut i = 0;
            loop {
                let Some(child) = self.nodes[idx].children().get(i).copied() else {
                    break;
                };
                subtree_dirty |= self.recalc_node(child, world_changed, found);
                any_processing |= self.nodes[child as usize].processing;
                i += 1;
            }

            if subtree_dirty || world_changed {
                let mut bounds = BoundingVolume::new();
                let child_count = self.nodes[idx].children().len();
                for i in 0..child_count {
                    let child = self.nodes[idx].children()[i];
                    bounds.expand_from_box(&self.nodes[child as usize].bounds);
                }
                bounds.compute_corners();
                self.nodes[idx].bounds = bounds;
            }

            self.nodes[idx].processing = any_processing;

            // a group with still-resolving descendants defers subdivision:
            // its final bounding shape is not yet stable
            let split_needed = !any_processing
                && self.nodes[idx]
                    .group()
                    .is_some_and(|g| g.children.len() > g.split_threshold);
            if split_needed {
                splitter::split_group(self, id, found);
            }
        }

        subtree_dirty
    }

    fn update_leaf_bounds(&mut self, idx: usize) {
        let leaf_state = match &self.nodes[idx].kind {
            NodeKind::Leaf(leaf) if !leaf.local_bounds.is_unset() => {
                Some((leaf.local_bounds.corners(), self.nodes[idx].world_matrix))
            }
            _ => None,
        };
        if let Some((corners, world)) = leaf_state {
            let mut world_points = [Vec3::zeros(); 8];
            for (i, corner) in corners.iter().enumerate() {
                world_points[i] = world.transform_point(&Point3::from(*corner)).coords;
            }
            let mut bounds = BoundingVolume::new();
            bounds.expand_from_points(&world_points);
            bounds.compute_corners();
            self.nodes[idx].bounds = bounds;
        }
    }

    /// Rebuild every group's cached subtree id list
    ///
    /// Called by the traversal only in frames where topology changed (new
    /// nodes discovered, a split occurred, or removals were applied); never
    /// per structural call, to avoid quadratic rebuild cost.
    pub fn rebuild_subtree_ids(&mut self) {
        let root = self.root;
        self.build_subtree(root);
    }

    fn build_subtree(&mut self, id: NodeId) -> Vec<NodeId> {
        let mut ids = vec![id];
        let child_count = self.nodes[id as usize].children().len();
        for i in 0..child_count {
            let child = self.nodes[id as usize].children()[i];
            let child_ids = self.build_subtree(child);
            ids.extend(child_ids);
        }
        if let Some(group) = self.nodes[id as usize].group_mut() {
            group.subtree_ids.clone_from(&ids);
        }
        ids
    }

    // --- camera state ---

    /// Re-derive a camera's projection matrix and frustum planes if the
    /// camera moved or a projection parameter changed; otherwise a no-op
    pub fn refresh_camera(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.ensure_live(id)?;
        let world = self.nodes[id as usize].world_matrix;
        let Some(camera) = self.nodes[id as usize].camera_mut() else {
            return Err(SceneError::NotACamera(id));
        };
        if camera.projection_dirty {
            camera.projection_matrix = camera.projection.matrix();
        }
        if camera.projection_dirty || camera.view_dirty {
            let view = world.try_inverse().unwrap_or_else(Mat4::identity);
            camera.frustum = Frustum::from_matrix(&(camera.projection_matrix * view));
            camera.projection_dirty = false;
            camera.view_dirty = false;
            log::trace!("frustum refreshed for camera {id}");
        }
        Ok(())
    }

    /// Borrow a camera's current frustum
    pub fn camera_frustum(&self, id: NodeId) -> Result<&Frustum, SceneError> {
        match self.node(id).map(SceneNode::kind) {
            Some(NodeKind::Camera(camera)) => Ok(&camera.frustum),
            Some(_) => Err(SceneError::NotACamera(id)),
            None => Err(SceneError::NodeNotFound(id)),
        }
    }

    fn ensure_live(&self, id: NodeId) -> Result<(), SceneError> {
        if (id as usize) < self.nodes.len() && !self.retired.contains(id) {
            Ok(())
        } else {
            Err(SceneError::NodeNotFound(id))
        }
    }

    // --- splitter support ---

    pub(crate) fn splitter_config(&self) -> &TraversalConfig {
        &self.config
    }

    pub(crate) fn take_children(&mut self, group: NodeId) -> Vec<NodeId> {
        self.nodes[group as usize]
            .group_mut()
            .map(|g| std::mem::take(&mut g.children))
            .unwrap_or_default()
    }

    pub(crate) fn set_group_children(&mut self, group: NodeId, children: Vec<NodeId>) {
        for &child in &children {
            self.nodes[child as usize].parent = Some(group);
        }
        if let Some(g) = self.nodes[group as usize].group_mut() {
            g.children = children;
        }
        self.topology_changed = true;
    }

    pub(crate) fn raise_split_threshold(&mut self, group: NodeId) -> usize {
        let Some(g) = self.nodes[group as usize].group_mut() else {
            return 0;
        };
        g.split_threshold *= 2;
        g.split_threshold
    }

    pub(crate) fn append_synthetic_group(
        &mut self,
        source: NodeId,
        octant: usize,
        children: Vec<NodeId>,
    ) -> NodeId {
        let id = self.nodes.len() as NodeId;
        let source_idx = source as usize;
        let name = format!("{}.octant{octant}", self.nodes[source_idx].name);
        let world = self.nodes[source_idx].world_matrix;
        let normal = self.nodes[source_idx].normal_matrix;
        let threshold = self.nodes[source_idx]
            .group()
            .map_or(self.config.split_threshold, |g| g.split_threshold);

        let mut bounds = BoundingVolume::new();
        for &child in &children {
            bounds.expand_from_box(&self.nodes[child as usize].bounds);
        }
        bounds.compute_corners();

        let mut node = SceneNode::new(
            id,
            name,
            Transform::identity(),
            NodeKind::Group(GroupData {
                children: Vec::new(),
                split_threshold: threshold,
                synthetic: true,
                subtree_ids: Vec::new(),
            }),
        );
        node.parent = Some(source);
        node.world_matrix = world;
        node.normal_matrix = normal;
        node.bounds = bounds;
        node.dirty = false;
        node.updated = true;
        self.nodes.push(node);

        self.set_group_children(id, children);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    fn unit_box() -> BoundingVolume {
        BoundingVolume::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5))
    }

    fn add_ready_leaf(graph: &mut SceneGraph, parent: NodeId, name: &str, at: Vec3) -> NodeId {
        graph
            .add_leaf(
                parent,
                name,
                Transform::from_position(at),
                unit_box(),
                ResourceState::Ready,
            )
            .unwrap()
    }

    #[test]
    fn test_recalculate_leaf_at_origin_then_translate() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let leaf = add_ready_leaf(&mut graph, root, "leaf", Vec3::zeros());

        let mut found = IdSet::new();
        let changed = graph.recalculate(&mut found);

        // fresh nodes start dirty: the pass must report the pre-clear value
        assert!(changed);
        let node = graph.node(leaf).unwrap();
        assert!(!node.is_dirty());
        assert_relative_eq!(*node.world_matrix(), Mat4::identity(), epsilon = EPSILON);

        graph.node_mut(leaf).unwrap().translate(Vec3::new(5.0, 0.0, 0.0));
        assert!(graph.node(leaf).unwrap().is_dirty());

        found.clear();
        let changed = graph.recalculate(&mut found);
        assert!(changed);

        let node = graph.node(leaf).unwrap();
        assert!(!node.is_dirty());
        let expected = Mat4::new_translation(&Vec3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(*node.world_matrix(), expected, epsilon = EPSILON);
    }

    #[test]
    fn test_dirty_propagates_down_and_composes_transforms() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let group = graph.add_group(root, "group").unwrap();
        let leaf = add_ready_leaf(&mut graph, group, "leaf", Vec3::new(1.0, 0.0, 0.0));

        let mut found = IdSet::new();
        graph.recalculate(&mut found);

        // moving the group must flow into the leaf's world transform
        graph.node_mut(group).unwrap().translate(Vec3::new(0.0, 3.0, 0.0));
        found.clear();
        graph.recalculate(&mut found);

        let group_world = *graph.node(group).unwrap().world_matrix();
        let leaf_node = graph.node(leaf).unwrap();
        let composed = group_world * leaf_node.local_matrix;
        assert_relative_eq!(*leaf_node.world_matrix(), composed, epsilon = EPSILON);

        let origin = Point3::origin();
        assert_relative_eq!(
            leaf_node.world_matrix().transform_point(&origin),
            Point3::new(1.0, 3.0, 0.0),
            epsilon = EPSILON
        );

        // bounds follow: the group's volume must contain the moved leaf
        assert!(graph
            .node(group)
            .unwrap()
            .bounds()
            .contains_point(Vec3::new(1.0, 3.0, 0.0)));
    }

    #[test]
    fn test_recalculate_is_idempotent() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let group = graph.add_group(root, "group").unwrap();
        let leaf = add_ready_leaf(&mut graph, group, "leaf", Vec3::new(2.0, -1.0, 4.0));
        graph.node_mut(group).unwrap().rotate_y(30.0);

        let mut found = IdSet::new();
        assert!(graph.recalculate(&mut found));

        let world_after_first = *graph.node(leaf).unwrap().world_matrix();
        let bounds_after_first = *graph.node(leaf).unwrap().bounds();

        found.clear();
        let changed = graph.recalculate(&mut found);
        assert!(!changed);
        assert!(!graph.node(leaf).unwrap().is_dirty());
        assert!(!graph.node(leaf).unwrap().was_updated());
        assert_eq!(*graph.node(leaf).unwrap().world_matrix(), world_after_first);
        assert_eq!(*graph.node(leaf).unwrap().bounds(), bounds_after_first);
    }

    #[test]
    fn test_normal_matrix_tracks_nonuniform_scale() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let leaf = add_ready_leaf(&mut graph, root, "leaf", Vec3::zeros());
        graph.node_mut(leaf).unwrap().resize(Vec3::new(2.0, 1.0, 1.0));

        let mut found = IdSet::new();
        graph.recalculate(&mut found);

        let normal = *graph.node(leaf).unwrap().normal_matrix();
        assert_relative_eq!(normal[(0, 0)], 0.5, epsilon = EPSILON);
        assert_relative_eq!(normal[(1, 1)], 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_split_preserves_the_child_set_exactly() {
        let mut graph = SceneGraph::with_config(TraversalConfig {
            split_threshold: 8,
            raise_threshold_on_degenerate_split: true,
        });
        let root = graph.root();
        let crowd = graph.add_group(root, "crowd").unwrap();

        let mut leaves = Vec::new();
        for i in 0..12_i32 {
            let position = Vec3::new(
                (i % 3) as f32 * 8.0 - 8.0,
                (i % 2) as f32 * 10.0 - 5.0,
                (i / 4) as f32 * -12.0,
            );
            leaves.push(add_ready_leaf(&mut graph, crowd, &format!("leaf_{i}"), position));
        }

        let mut found = IdSet::new();
        graph.recalculate(&mut found);
        graph.rebuild_subtree_ids();

        let crowd_node = graph.node(crowd).unwrap();
        let direct: Vec<NodeId> = crowd_node.children().to_vec();
        assert!(direct.len() <= 8);
        assert!(direct.iter().all(|&c| graph.node(c).unwrap().is_synthetic()));

        // union of leaf descendants across the synthetic groups equals the
        // original child set exactly: nothing lost, nothing duplicated
        let mut recovered: Vec<NodeId> = direct
            .iter()
            .flat_map(|&c| graph.node(c).unwrap().children().to_vec())
            .collect();
        recovered.sort_unstable();
        let mut expected = leaves.clone();
        expected.sort_unstable();
        assert_eq!(recovered, expected);

        // a synthetic group's subtree cache covers itself and its leaves
        for &synthetic in &direct {
            let subtree = graph.node(synthetic).unwrap().subtree_ids();
            assert_eq!(subtree[0], synthetic);
            assert_eq!(subtree.len(), 1 + graph.node(synthetic).unwrap().children().len());
        }
    }

    #[test]
    fn test_degenerate_split_raises_threshold_instead_of_looping() {
        let mut graph = SceneGraph::with_config(TraversalConfig {
            split_threshold: 4,
            raise_threshold_on_degenerate_split: true,
        });
        let root = graph.root();
        let pile = graph.add_group(root, "pile").unwrap();

        // co-located children: they collapse into one octant of any split
        for i in 0..6 {
            add_ready_leaf(
                &mut graph,
                pile,
                &format!("leaf_{i}"),
                Vec3::new(100.0, 100.0, 100.0),
            );
        }
        // one far-away child fixes the midpoint away from the pile
        add_ready_leaf(&mut graph, pile, "outlier", Vec3::new(-100.0, -100.0, -100.0));

        let mut found = IdSet::new();
        graph.recalculate(&mut found);

        // first pass splits into two octant groups (pile + outlier), then
        // the pile-side synthetic group is itself oversized and degenerate
        let direct: Vec<NodeId> = graph.node(pile).unwrap().children().to_vec();
        assert_eq!(direct.len(), 2);

        found.clear();
        graph.recalculate(&mut found);

        let clustered = direct
            .iter()
            .copied()
            .find(|&c| graph.node(c).unwrap().children().len() == 6)
            .unwrap();
        // its children collapse into one octant: the threshold must have
        // been raised rather than splitting forever
        let clustered_node = graph.node(clustered).unwrap();
        assert!(clustered_node.children().iter().all(|&c| {
            !graph.node(c).unwrap().is_synthetic()
        }));
        assert!(clustered_node.group().unwrap().split_threshold > 4);
    }

    #[test]
    fn test_synthetic_groups_track_the_parent_transform() {
        let mut graph = SceneGraph::with_config(TraversalConfig {
            split_threshold: 2,
            raise_threshold_on_degenerate_split: true,
        });
        let root = graph.root();
        let crowd = graph.add_group(root, "crowd").unwrap();
        let near = add_ready_leaf(&mut graph, crowd, "near", Vec3::new(-5.0, 0.0, 0.0));
        let far = add_ready_leaf(&mut graph, crowd, "far", Vec3::new(5.0, 0.0, 0.0));
        let third = add_ready_leaf(&mut graph, crowd, "third", Vec3::new(5.0, 5.0, 0.0));

        let mut found = IdSet::new();
        graph.recalculate(&mut found);
        let direct: Vec<NodeId> = graph.node(crowd).unwrap().children().to_vec();
        assert!(direct.iter().all(|&c| graph.node(c).unwrap().is_synthetic()));

        // moving the source group must move every split-off child
        graph.node_mut(crowd).unwrap().translate(Vec3::new(0.0, 0.0, -10.0));
        found.clear();
        graph.recalculate(&mut found);

        for (leaf, expected) in [
            (near, Point3::new(-5.0, 0.0, -10.0)),
            (far, Point3::new(5.0, 0.0, -10.0)),
            (third, Point3::new(5.0, 5.0, -10.0)),
        ] {
            let world = graph.node(leaf).unwrap().world_matrix();
            assert_relative_eq!(
                world.transform_point(&Point3::origin()),
                expected,
                epsilon = EPSILON
            );
        }
        // and the synthetic layer itself reports the parent's world matrix
        for &synthetic in &direct {
            assert_relative_eq!(
                *graph.node(synthetic).unwrap().world_matrix(),
                *graph.node(crowd).unwrap().world_matrix(),
                epsilon = EPSILON
            );
        }
    }
}
