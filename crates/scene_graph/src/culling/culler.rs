//! Stateful hierarchical frustum culling over the scene graph
//!
//! The walk is an explicit stack (not recursive call depth) so stack usage
//! stays bounded on deep or wide trees. Classification outcomes drive the
//! traversal policy: OUTSIDE prunes the subtree, INSIDE bulk-marks the
//! cached subtree id list without recursing, INTERSECT marks the node and
//! descends with the narrowed plane mask.

use crate::culling::frustum::{PlaneMask, Visibility};
use crate::foundation::collections::IdSet;
use crate::scene::graph::{SceneError, SceneGraph};
use crate::scene::node::{NodeId, NodeKind};

/// Cross-frame culling state
///
/// Holds the per-node "last failed plane" cache keyed by dense node id.
/// A node rejected by a plane on one frame is very likely rejected by the
/// same plane on the next, so that plane is retested first.
#[derive(Debug, Default)]
pub struct CullingState {
    last_failed: Vec<Option<u8>>,
}

impl CullingState {
    /// Create empty culling state
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_capacity(&mut self, node_count: u32) {
        if self.last_failed.len() < node_count as usize {
            self.last_failed.resize(node_count as usize, None);
        }
    }

    /// Walk the graph once and collect the ids visible from `camera`
    ///
    /// The camera's frustum must be current (see
    /// [`SceneGraph::refresh_camera`]). `visible` is cleared first.
    pub fn cull(
        &mut self,
        graph: &SceneGraph,
        camera: NodeId,
        visible: &mut IdSet,
    ) -> Result<(), SceneError> {
        let frustum = graph.camera_frustum(camera)?;
        self.ensure_capacity(graph.node_count());
        visible.clear();

        let mut stack: Vec<(NodeId, PlaneMask)> = vec![(graph.root(), PlaneMask::all())];
        while let Some((id, mask)) = stack.pop() {
            let Some(node) = graph.node(id) else {
                continue;
            };

            // nodes without spatial extent (cameras, lights, empty groups)
            // carry no culling information; test their children individually
            let classification = if node.bounds().is_unset() {
                None
            } else {
                Some(frustum.classify(node.bounds(), mask, self.last_failed[id as usize]))
            };

            let (visibility, out_mask) = classification.map_or(
                (Visibility::Intersect, mask),
                |c| {
                    if c.failed_plane.is_some() {
                        self.last_failed[id as usize] = c.failed_plane;
                    }
                    (c.visibility, c.out_mask)
                },
            );

            match visibility {
                Visibility::Outside => {}
                Visibility::Inside => match node.kind() {
                    NodeKind::Group(_) => visible.extend_from_ids(node.subtree_ids()),
                    _ => visible.insert(id),
                },
                Visibility::Intersect => {
                    visible.insert(id);
                    for &child in node.children() {
                        stack.push((child, out_mask));
                    }
                }
            }
        }

        log::trace!("culling pass: {} nodes visible", visible.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Transform, Vec3};
    use crate::scene::bounds::BoundingVolume;
    use crate::scene::node::{Projection, ResourceState};

    fn unit_box() -> BoundingVolume {
        BoundingVolume::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5))
    }

    fn camera_projection() -> Projection {
        Projection::Perspective {
            fov_y: std::f32::consts::FRAC_PI_2,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }

    // camera at the origin looking down -Z, one group of leaves ahead of
    // the camera and one leaf behind it
    fn build_scene() -> (SceneGraph, NodeId, NodeId, Vec<NodeId>, NodeId) {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let camera = graph
            .add_camera(root, "camera", Transform::identity(), camera_projection())
            .unwrap();

        let cluster = graph.add_group(root, "cluster").unwrap();
        let mut cluster_leaves = Vec::new();
        for i in 0..4 {
            let offset = Vec3::new(i as f32 * 1.5 - 2.0, 0.0, -20.0);
            let leaf = graph
                .add_leaf(
                    cluster,
                    &format!("cluster_leaf_{i}"),
                    Transform::from_position(offset),
                    unit_box(),
                    ResourceState::Ready,
                )
                .unwrap();
            cluster_leaves.push(leaf);
        }

        let behind = graph
            .add_leaf(
                root,
                "behind_camera",
                Transform::from_position(Vec3::new(0.0, 0.0, 20.0)),
                unit_box(),
                ResourceState::Ready,
            )
            .unwrap();

        let mut found = IdSet::new();
        graph.recalculate(&mut found);
        graph.rebuild_subtree_ids();
        graph.refresh_camera(camera).unwrap();
        (graph, camera, cluster, cluster_leaves, behind)
    }

    #[test]
    fn test_fully_visible_cluster_is_bulk_marked() {
        let (graph, camera, cluster, cluster_leaves, behind) = build_scene();
        let mut state = CullingState::new();
        let mut visible = IdSet::new();
        state.cull(&graph, camera, &mut visible).unwrap();

        // the cluster sits well inside the frustum: its whole cached
        // subtree must be visible
        assert!(visible.contains(cluster));
        for leaf in &cluster_leaves {
            assert!(visible.contains(*leaf));
        }
        // the leaf behind the camera must not be
        assert!(!visible.contains(behind));
    }

    #[test]
    fn test_outside_node_caches_failing_plane() {
        let (graph, camera, _, _, behind) = build_scene();
        let mut state = CullingState::new();
        let mut visible = IdSet::new();

        state.cull(&graph, camera, &mut visible).unwrap();
        let cached = state.last_failed[behind as usize];
        assert!(cached.is_some());

        // a second pass reproduces the same rejection from the cache
        state.cull(&graph, camera, &mut visible).unwrap();
        assert_eq!(state.last_failed[behind as usize], cached);
        assert!(!visible.contains(behind));
    }

    #[test]
    fn test_cull_requires_camera_node() {
        let (graph, _, cluster, _, _) = build_scene();
        let mut state = CullingState::new();
        let mut visible = IdSet::new();
        let result = state.cull(&graph, cluster, &mut visible);
        assert_eq!(result.unwrap_err(), SceneError::NotACamera(cluster));
    }
}
