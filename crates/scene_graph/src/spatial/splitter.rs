//! Octant subdivision of overlarge flat groups
//!
//! When a settled group's direct fan-out exceeds its threshold, its children
//! are bucketed into up to eight synthetic groups by comparing each child's
//! bounding-volume center against the midpoint of the group's volume. This
//! keeps culling and bounds maintenance sub-linear as scene size grows
//! without the caller organizing spatial locality by hand.
//!
//! Splitting is not recursive within one invocation: a synthetic group that
//! itself grows past the threshold is split again on a later frame through
//! the ordinary recalculation path.

use crate::foundation::collections::IdSet;
use crate::foundation::math::Vec3;
use crate::scene::graph::SceneGraph;
use crate::scene::node::NodeId;

/// Octant index (0-7) for a position relative to a midpoint.
///
/// Bit layout matches the bounding-volume corner ordering:
/// bit 0 -> +x half, bit 1 -> +y half, bit 2 -> +z half.
fn octant_code(position: Vec3, midpoint: Vec3) -> usize {
    usize::from(position.x >= midpoint.x)
        | usize::from(position.y >= midpoint.y) << 1
        | usize::from(position.z >= midpoint.z) << 2
}

/// Subdivide `group`'s children into synthetic octant groups.
///
/// New synthetic group ids are registered into `found` so the traversal
/// discovers them this frame. Degenerate inputs are tolerated: a zero-size
/// or unset bounding volume makes the attempt a no-op, and a child set that
/// collapses into a single octant raises the group's effective threshold
/// instead of creating a group that makes no forward progress.
pub(crate) fn split_group(graph: &mut SceneGraph, group: NodeId, found: &mut IdSet) {
    let Some(node) = graph.node(group) else {
        return;
    };
    let bounds = node.bounds();
    if bounds.is_unset() || bounds.extents() == Vec3::zeros() {
        log::trace!("split of group {group} skipped: degenerate bounding volume");
        return;
    }
    let midpoint = bounds.center();

    let children = graph.take_children(group);
    let mut buckets: [Vec<NodeId>; 8] = Default::default();
    for &child in &children {
        let Some(child_node) = graph.node(child) else {
            continue;
        };
        buckets[octant_code(child_node.bounds().center(), midpoint)].push(child);
    }

    let occupied = buckets.iter().filter(|b| !b.is_empty()).count();
    if occupied <= 1 {
        // every child in one octant: subdivision makes no forward progress
        graph.set_group_children(group, children);
        if graph.splitter_config().raise_threshold_on_degenerate_split {
            let new_threshold = graph.raise_split_threshold(group);
            log::debug!(
                "degenerate split of group {group}: threshold raised to {new_threshold}"
            );
        }
        return;
    }

    let mut new_children = Vec::with_capacity(occupied);
    for (octant, bucket) in buckets.into_iter().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        let synthetic = graph.append_synthetic_group(group, octant, bucket);
        found.insert(synthetic);
        new_children.push(synthetic);
    }
    log::debug!(
        "group {group} split: {} children into {} octant groups",
        children.len(),
        new_children.len()
    );
    graph.set_group_children(group, new_children);
}
