//! Scene node entity and node kinds
//!
//! Every node carries the full transform state (local TRS, local/world/normal
//! matrices), a world-space bounding volume, and the dirty/processing flags
//! that drive incremental recomputation. Kind-specific state lives in a
//! closed [`NodeKind`] tag resolved once at construction, so the per-frame
//! hot loop matches on the tag instead of performing runtime type inspection.

use crate::culling::frustum::Frustum;
use crate::foundation::math::{utils, Mat3, Mat4, Quat, Transform, Vec3};
use crate::scene::bounds::BoundingVolume;

/// Dense node identifier; index into the scene arena and every id-keyed
/// bitset and side array. Never reused.
pub type NodeId = u32;

/// Readiness of a leaf's drawable resources (geometry/material)
///
/// A node may be inserted into the graph before its resources have finished
/// loading; it then participates in transform and bounds propagation while
/// `Pending` and is skipped by resource-dependent steps until resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Resources are still being resolved asynchronously
    Pending,
    /// Resources are available to the renderer
    Ready,
}

/// Camera projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection (right-handed, camera looks down -Z)
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
        /// Viewport aspect ratio (width / height)
        aspect: f32,
        /// Near clip distance
        near: f32,
        /// Far clip distance
        far: f32,
    },
    /// Orthographic projection
    Orthographic {
        /// Left clip bound
        left: f32,
        /// Right clip bound
        right: f32,
        /// Bottom clip bound
        bottom: f32,
        /// Top clip bound
        top: f32,
        /// Near clip distance
        near: f32,
        /// Far clip distance
        far: f32,
    },
}

impl Projection {
    /// Build the projection matrix
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Self::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::new_perspective(aspect, fov_y, near, far),
            Self::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::new_orthographic(left, right, bottom, top, near, far),
        }
    }
}

/// Leaf-specific state
#[derive(Debug, Clone)]
pub struct LeafData {
    /// Readiness of the drawable resources
    pub resource: ResourceState,

    /// Object-space bounding volume used to seed the world-space volume
    pub local_bounds: BoundingVolume,
}

/// Group-specific state
#[derive(Debug, Clone)]
pub struct GroupData {
    /// Ordered direct children
    pub(crate) children: Vec<NodeId>,

    /// Direct fan-out above which subdivision is triggered
    pub(crate) split_threshold: usize,

    /// True for groups synthesized by the spatial splitter; a synthetic
    /// group owns no transform of its own and adopts its parent's
    pub(crate) synthetic: bool,

    /// Cached ids of this node and all transitive descendants, rebuilt on
    /// topology changes; enables bulk visibility marking
    pub(crate) subtree_ids: Vec<NodeId>,
}

/// Camera-specific state
#[derive(Debug, Clone)]
pub struct CameraData {
    /// Projection parameters
    pub(crate) projection: Projection,

    /// Set when a projection parameter changed since the last refresh
    pub(crate) projection_dirty: bool,

    /// Set when the camera's world transform changed since the last refresh
    pub(crate) view_dirty: bool,

    /// Cached projection matrix
    pub(crate) projection_matrix: Mat4,

    /// Frustum derived from projection * view, refreshed lazily
    pub(crate) frustum: Frustum,
}

impl CameraData {
    pub(crate) fn new(projection: Projection) -> Self {
        let projection_matrix = projection.matrix();
        Self {
            projection,
            projection_dirty: false,
            view_dirty: true,
            projection_matrix,
            frustum: Frustum::from_matrix(&projection_matrix),
        }
    }
}

/// Kind-specific node state, closed at construction
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Drawable leaf
    Leaf(LeafData),
    /// Light source; participates in transform propagation only
    Light,
    /// Composite node owning an ordered child list
    Group(GroupData),
    /// View point owning projection and frustum state
    Camera(CameraData),
}

/// A node in the transform graph
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) local: Transform,
    pub(crate) local_matrix: Mat4,
    pub(crate) world_matrix: Mat4,
    pub(crate) normal_matrix: Mat3,
    pub(crate) bounds: BoundingVolume,
    pub(crate) dirty: bool,
    pub(crate) updated: bool,
    pub(crate) processing: bool,
    pub(crate) kind: NodeKind,
}

impl SceneNode {
    pub(crate) fn new(id: NodeId, name: String, local: Transform, kind: NodeKind) -> Self {
        let processing = matches!(
            &kind,
            NodeKind::Leaf(leaf) if leaf.resource == ResourceState::Pending
        );
        Self {
            id,
            name,
            parent: None,
            local,
            local_matrix: Mat4::identity(),
            world_matrix: Mat4::identity(),
            normal_matrix: Mat3::identity(),
            bounds: BoundingVolume::new(),
            dirty: true,
            updated: false,
            processing,
            kind,
        }
    }

    /// The node's dense id
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Human-readable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Non-owning back-reference to the parent, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Kind-specific state
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Local transform components
    pub fn local_transform(&self) -> &Transform {
        &self.local
    }

    /// World transform (composition of all ancestor locals with this local)
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// Normal-transform matrix (inverse-transpose of the world upper 3x3)
    pub fn normal_matrix(&self) -> &Mat3 {
        &self.normal_matrix
    }

    /// World-space bounding volume
    pub fn bounds(&self) -> &BoundingVolume {
        &self.bounds
    }

    /// True when local state changed since the last recompute
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True when the world transform was recomputed during the most recent
    /// recalculation pass; the renderer uses this to decide whether derived
    /// products (e.g. a model-view-projection matrix) must be rebuilt
    pub fn was_updated(&self) -> bool {
        self.updated
    }

    /// True while this node (or, for groups, anything beneath it) still has
    /// drawable resources being resolved
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// True for groups synthesized by the spatial splitter
    pub fn is_synthetic(&self) -> bool {
        matches!(&self.kind, NodeKind::Group(group) if group.synthetic)
    }

    /// Direct children (empty for non-groups)
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Group(group) => &group.children,
            _ => &[],
        }
    }

    /// Cached subtree id list (self plus all transitive descendants);
    /// empty for non-groups and for groups not yet indexed
    pub fn subtree_ids(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Group(group) => &group.subtree_ids,
            _ => &[],
        }
    }

    // --- local-state mutators; each marks the node dirty ---

    /// Translate the local position by `v`
    pub fn translate(&mut self, v: Vec3) {
        self.local.position += v;
        self.dirty = true;
    }

    /// Rotate around the local X axis by `degrees`
    pub fn rotate_x(&mut self, degrees: f32) {
        self.rotate_axis(Vec3::x_axis(), degrees);
    }

    /// Rotate around the local Y axis by `degrees`
    pub fn rotate_y(&mut self, degrees: f32) {
        self.rotate_axis(Vec3::y_axis(), degrees);
    }

    /// Rotate around the local Z axis by `degrees`
    pub fn rotate_z(&mut self, degrees: f32) {
        self.rotate_axis(Vec3::z_axis(), degrees);
    }

    fn rotate_axis(&mut self, axis: nalgebra::Unit<Vec3>, degrees: f32) {
        self.local.rotation =
            self.local.rotation * Quat::from_axis_angle(&axis, utils::deg_to_rad(degrees));
        self.dirty = true;
    }

    /// Set a non-uniform scale
    pub fn resize(&mut self, scale: Vec3) {
        self.local.scale = scale;
        self.dirty = true;
    }

    /// Set a uniform scale
    pub fn resize_uniform(&mut self, scale: f32) {
        self.resize(Vec3::new(scale, scale, scale));
    }

    /// Reset the orientation to identity
    pub fn look_forward(&mut self) {
        self.local.rotation = Quat::identity();
        self.dirty = true;
    }

    /// Replace the whole local transform
    pub fn set_local_transform(&mut self, local: Transform) {
        self.local = local;
        self.dirty = true;
    }

    // --- camera parameter mutators; each marks the projection dirty ---

    /// Replace the camera projection parameters
    ///
    /// No effect on non-camera nodes.
    pub fn set_projection(&mut self, projection: Projection) {
        if let NodeKind::Camera(camera) = &mut self.kind {
            camera.projection = projection;
            camera.projection_dirty = true;
        } else {
            log::warn!("set_projection on non-camera node {} ignored", self.id);
        }
    }

    /// Update the viewport aspect ratio of a perspective camera
    ///
    /// No effect on orthographic cameras or non-camera nodes.
    pub fn set_aspect_ratio(&mut self, new_aspect: f32) {
        if let NodeKind::Camera(camera) = &mut self.kind {
            if let Projection::Perspective { aspect, .. } = &mut camera.projection {
                *aspect = new_aspect;
                camera.projection_dirty = true;
            }
        }
    }

    pub(crate) fn group(&self) -> Option<&GroupData> {
        match &self.kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub(crate) fn group_mut(&mut self) -> Option<&mut GroupData> {
        match &mut self.kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub(crate) fn camera_mut(&mut self) -> Option<&mut CameraData> {
        match &mut self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn leaf_node() -> SceneNode {
        SceneNode::new(
            0,
            "leaf".to_string(),
            Transform::identity(),
            NodeKind::Leaf(LeafData {
                resource: ResourceState::Ready,
                local_bounds: BoundingVolume::from_center_extents(
                    Vec3::zeros(),
                    Vec3::new(1.0, 1.0, 1.0),
                ),
            }),
        )
    }

    #[test]
    fn test_mutators_set_dirty() {
        let mut node = leaf_node();
        node.dirty = false;
        node.translate(Vec3::new(1.0, 0.0, 0.0));
        assert!(node.is_dirty());

        node.dirty = false;
        node.rotate_y(90.0);
        assert!(node.is_dirty());

        node.dirty = false;
        node.resize_uniform(2.0);
        assert!(node.is_dirty());

        node.dirty = false;
        node.look_forward();
        assert!(node.is_dirty());
        assert_relative_eq!(node.local.rotation, Quat::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_is_in_degrees() {
        let mut node = leaf_node();
        node.rotate_y(90.0);

        let rotated = node.local.rotation * Vec3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(rotated, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_pending_leaf_starts_processing() {
        let node = SceneNode::new(
            1,
            "pending".to_string(),
            Transform::identity(),
            NodeKind::Leaf(LeafData {
                resource: ResourceState::Pending,
                local_bounds: BoundingVolume::new(),
            }),
        );
        assert!(node.is_processing());
    }
}
