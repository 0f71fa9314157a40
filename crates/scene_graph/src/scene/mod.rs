//! Scene graph core - nodes, arena, bounds, and the frame traversal
//!
//! ## Architecture
//!
//! ```text
//! host mutations (translate / rotate / resize, attach / detach)
//!        |
//! SceneTraversal::run_frame
//!        |-- completion queue drain        (resource readiness)
//!        |-- SceneGraph::recalculate       (transforms down, bounds up)
//!        |-- id set difference             (new-node discovery)
//!        |-- subtree id re-index           (only on topology change)
//!        `-- CullingState::cull            (visible set)
//! ```
//!
//! The traversal's outputs - the visible id set, the newly-discovered id
//! set, and per-node world/normal matrices - are the renderer's inputs.

pub mod bounds;
pub mod graph;
pub mod node;
pub mod traversal;

pub use bounds::BoundingVolume;
pub use graph::{SceneError, SceneGraph};
pub use node::{
    CameraData, GroupData, LeafData, NodeId, NodeKind, Projection, ResourceState, SceneNode,
};
pub use traversal::SceneTraversal;
