//! Flyby demo application
//!
//! Headless exercise of the scene graph core: scatters a large field of
//! leaves under one flat group, orbits a camera around it, and logs how
//! many nodes survive culling each frame. Along the way the oversized
//! group is subdivided into octant groups, a batch of late-loading leaves
//! resolves mid-flight, and the per-frame discovery set shrinks to empty.

use rand::Rng;
use scene_graph::prelude::*;

const FIELD_RADIUS: f32 = 120.0;
const LEAF_COUNT: usize = 500;
const PENDING_COUNT: usize = 20;
const FRAME_COUNT: u32 = 120;

fn scatter(rng: &mut impl Rng) -> Vec3 {
    Vec3::new(
        rng.gen_range(-FIELD_RADIUS..FIELD_RADIUS),
        rng.gen_range(-FIELD_RADIUS..FIELD_RADIUS),
        rng.gen_range(-FIELD_RADIUS..FIELD_RADIUS),
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    scene_graph::foundation::logging::init();
    log::info!("Building flyby scene ({LEAF_COUNT} leaves)...");

    let config = SceneConfig::default();
    let mut graph = SceneGraph::with_config(config.traversal.clone());
    let root = graph.root();

    let camera = graph.add_camera(
        root,
        "camera",
        Transform::looking_at(
            Vec3::new(0.0, 40.0, 250.0),
            Vec3::zeros(),
            Vec3::y(),
        ),
        config.camera.to_projection(),
    )?;

    graph.add_light(root, "sun", Transform::from_position(Vec3::new(0.0, 500.0, 0.0)))?;

    let field = graph.add_group(root, "field")?;
    let mut rng = rand::thread_rng();
    let leaf_bounds =
        BoundingVolume::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));

    let mut pending = Vec::new();
    for i in 0..LEAF_COUNT {
        let state = if i < PENDING_COUNT {
            ResourceState::Pending
        } else {
            ResourceState::Ready
        };
        let leaf = graph.add_leaf(
            field,
            &format!("rock_{i}"),
            Transform::from_position(scatter(&mut rng)),
            leaf_bounds,
            state,
        )?;
        if state == ResourceState::Pending {
            pending.push(leaf);
        }
    }

    let mut traversal = SceneTraversal::new();
    for frame in 0..FRAME_COUNT {
        // simulate the asset layer finishing a batch mid-flight
        if frame == 10 {
            log::info!("Assets resolved for {} pending leaves", pending.len());
            for &leaf in &pending {
                traversal.notify_resource_ready(leaf);
            }
        }

        // orbit the camera around the field
        let angle = frame as f32 / FRAME_COUNT as f32 * std::f32::consts::TAU;
        let eye = Vec3::new(250.0 * angle.cos(), 40.0, 250.0 * angle.sin());
        graph
            .node_mut(camera)
            .ok_or("camera vanished")?
            .set_local_transform(Transform::looking_at(eye, Vec3::zeros(), Vec3::y()));

        traversal.run_frame(&mut graph, camera)?;

        if !traversal.newly_discovered().is_empty() || frame % 30 == 0 {
            log::info!(
                "frame {frame:3}: {:3} visible, {:3} newly discovered, field fan-out {}",
                traversal.visible().len(),
                traversal.newly_discovered().len(),
                graph.node(field).ok_or("field vanished")?.children().len(),
            );
        }
    }

    // subdivision stays transparent to queries
    let probe = format!("rock_{}", LEAF_COUNT / 2);
    match graph.find_by_name(&probe) {
        Some(id) => log::info!("{probe} found as node {id} after subdivision"),
        None => log::warn!("{probe} missing!"),
    }

    log::info!("Flyby complete");
    Ok(())
}
