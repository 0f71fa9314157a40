//! # Scene Graph
//!
//! A hierarchical 3D transform graph for real-time renderers: every frame it
//! decides which nodes are visible and which need their world-space state
//! recomputed.
//!
//! ## Features
//!
//! - **Incremental recomputation**: dirty-flag-driven world transform and
//!   bounding volume updates across a tree mutated between frames
//! - **Coherent frustum culling**: six-plane tests with a per-node
//!   last-failed-plane cache and hierarchical plane-mask early-outs
//! - **Automatic subdivision**: overlarge flat groups are re-bucketed into
//!   a bounded-fanout spatial hierarchy, transparently to callers
//! - **Incremental discovery**: bitset set-difference yields the nodes
//!   added since the last frame, so renderer resources initialize once
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_graph::prelude::*;
//!
//! fn main() -> Result<(), SceneError> {
//!     let mut graph = SceneGraph::new();
//!     let root = graph.root();
//!
//!     let camera = graph.add_camera(
//!         root,
//!         "camera",
//!         Transform::identity(),
//!         Projection::Perspective {
//!             fov_y: std::f32::consts::FRAC_PI_4,
//!             aspect: 16.0 / 9.0,
//!             near: 0.1,
//!             far: 1000.0,
//!         },
//!     )?;
//!     let cube = graph.add_leaf(
//!         root,
//!         "cube",
//!         Transform::from_position(Vec3::new(0.0, 0.0, -10.0)),
//!         BoundingVolume::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)),
//!         ResourceState::Ready,
//!     )?;
//!
//!     let mut traversal = SceneTraversal::new();
//!     traversal.run_frame(&mut graph, camera)?;
//!     assert!(traversal.visible().contains(cube));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod culling;
pub mod foundation;
pub mod scene;
pub mod spatial;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        config::{CameraConfig, ConfigError, SceneConfig, TraversalConfig},
        culling::{CullingState, Frustum, PlaneMask, Visibility},
        foundation::{
            collections::IdSet,
            math::{Mat3, Mat4, Quat, Transform, Vec3},
        },
        scene::{
            BoundingVolume, NodeId, NodeKind, Projection, ResourceState, SceneError, SceneGraph,
            SceneNode, SceneTraversal,
        },
    };
}
