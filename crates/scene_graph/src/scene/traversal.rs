//! Per-frame orchestration
//!
//! One `run_frame` call executes the frame phases in their required order:
//! resource completions are drained before transform propagation, transform
//! propagation completes before culling, and new-node discovery happens
//! after the transform pass (so newly attached nodes have registered ids)
//! but before subtree-id recomputation.
//!
//! This is the only component that talks to external collaborators: the
//! asset layer feeds completions in through [`SceneTraversal::notify_resource_ready`],
//! and the draw-submission layer reads the visible and newly-discovered id
//! sets back out after each frame.

use crate::culling::culler::CullingState;
use crate::foundation::collections::IdSet;
use crate::scene::graph::{SceneError, SceneGraph};
use crate::scene::node::NodeId;

/// Frame-loop driver owning the persistent traversal bookkeeping
#[derive(Debug, Default)]
pub struct SceneTraversal {
    found: IdSet,
    processed: IdSet,
    new_nodes: IdSet,
    visible: IdSet,
    culling: CullingState,
    completions: Vec<NodeId>,
    frame: u64,
}

impl SceneTraversal {
    /// Create a traversal with empty bookkeeping
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a resource-completion signal for a pending leaf
    ///
    /// Called by the host when asynchronously loaded geometry/material for
    /// `id` becomes available. Completions are delivered on the frame
    /// thread and applied at the top of the next frame; the graph is never
    /// mutated from the completion source itself.
    pub fn notify_resource_ready(&mut self, id: NodeId) {
        self.completions.push(id);
    }

    /// Execute one frame: completions, removals, recalculation, discovery,
    /// topology re-indexing, culling
    pub fn run_frame(&mut self, graph: &mut SceneGraph, camera: NodeId) -> Result<(), SceneError> {
        self.frame += 1;

        // resolved resources flip to ready before transforms propagate
        for id in self.completions.drain(..) {
            // a completion may race a removal of the same node; that is a
            // stale signal, not an error
            if graph.node(id).is_some() {
                graph.mark_resource_ready(id)?;
            }
        }

        // retire removed ids from the persistent bookkeeping
        let retired = graph.take_newly_retired();
        for &id in &retired {
            self.processed.remove(id);
        }

        // whole-graph transform and bounds pass; registers every live id
        self.found.clear();
        graph.recalculate(&mut self.found);

        // discovery by set difference: new = found \ processed
        self.new_nodes = self.found.difference(&self.processed);
        self.processed.union_with(&self.found);

        // subtree id caches follow topology, rebuilt at most once per frame
        if graph.take_topology_changed() || !self.new_nodes.is_empty() || !retired.is_empty() {
            graph.rebuild_subtree_ids();
        }

        graph.refresh_camera(camera)?;
        self.culling.cull(graph, camera, &mut self.visible)?;

        log::trace!(
            "frame {}: {} visible, {} new",
            self.frame,
            self.visible.len(),
            self.new_nodes.len()
        );
        Ok(())
    }

    /// Ids visible from the camera after the most recent frame
    pub fn visible(&self) -> &IdSet {
        &self.visible
    }

    /// Ids discovered for the first time during the most recent frame;
    /// the renderer initializes per-node resources exactly once from this
    pub fn newly_discovered(&self) -> &IdSet {
        &self.new_nodes
    }

    /// Every id ever discovered and not since retired
    pub fn processed(&self) -> &IdSet {
        &self.processed
    }
}
