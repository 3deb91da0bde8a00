//! Body-node binding and transform flushing.

use glam::{Quat, Vec3};
use marble_bind::{BodyDesc, Simulation};
use marble_physics::{Collider, PhysicsConfig, Transform};
use marble_scene::{SceneError, VisualNode};

const EPS: f32 = 1e-5;

#[test]
fn test_node_matches_body_after_creation() {
    let mut sim = Simulation::new(PhysicsConfig::default());
    let node = sim.scene_mut().add(
        VisualNode::new("ball")
            .with_position(Vec3::new(9.0, 9.0, 9.0))
            .with_orientation(Quat::from_rotation_z(0.7)),
    );
    let body = sim
        .create_body(
            Collider::sphere(0.5),
            node,
            &BodyDesc::default().at(Vec3::new(1.0, 10.0, -2.0)),
        )
        .unwrap();

    let node_world = sim.scene().world_transform(node).unwrap();
    let body_world = sim.world().transform(body).unwrap();
    assert!(node_world.approx_eq(&body_world, EPS));
    assert_eq!(body_world.position, Vec3::new(1.0, 10.0, -2.0));
}

#[test]
fn test_child_node_matches_body_in_world_space() {
    let mut sim = Simulation::new(PhysicsConfig::default());
    let group = sim.scene_mut().add(
        VisualNode::new("course")
            .with_position(Vec3::new(0.0, 2.0, 0.0))
            .with_orientation(Quat::from_rotation_y(0.4)),
    );
    let node = sim
        .scene_mut()
        .add_child(group, VisualNode::new("ball"))
        .unwrap();
    let body = sim
        .create_body(Collider::sphere(0.5), node, &BodyDesc::default().at(Vec3::new(3.0, 5.0, 1.0)))
        .unwrap();

    for _ in 0..20 {
        sim.step(1.0 / 60.0).unwrap();
    }
    let node_world = sim.scene().world_transform(node).unwrap();
    assert!(node_world.approx_eq(&sim.world().transform(body).unwrap(), EPS));
}

#[test]
fn test_every_dynamic_node_follows_its_body() {
    let mut sim = Simulation::new(PhysicsConfig::default());
    let floor = sim.scene_mut().add(VisualNode::new("floor"));
    sim.create_body(Collider::ground(), floor, &BodyDesc::fixed()).unwrap();

    let mut bodies = Vec::new();
    for i in 0..5 {
        let node = sim.scene_mut().add(VisualNode::new(format!("box{i}")));
        let body = sim
            .create_body(
                Collider::box_shape(Vec3::splat(0.25)),
                node,
                &BodyDesc::default().at(Vec3::new(i as f32 * 0.3, 1.0 + i as f32, 0.0)),
            )
            .unwrap();
        bodies.push((node, body));
    }

    for frame in 0..180 {
        let dt = if frame % 3 == 0 { 1.0 / 30.0 } else { 1.0 / 60.0 };
        sim.step(dt).unwrap();
        for (node, body) in &bodies {
            let rb = sim.world().body(*body).unwrap();
            if !rb.is_awake() {
                continue;
            }
            let node_world = sim.scene().world_transform(*node).unwrap();
            assert!(
                node_world.approx_eq(&rb.transform(), EPS),
                "frame {frame}: node {node_world:?} body {:?}",
                rb.transform()
            );
        }
    }
}

#[test]
fn test_missing_nodes_are_reported_not_null() {
    let sim = Simulation::new(PhysicsConfig::default());
    assert_eq!(
        sim.scene().lookup("golfClub"),
        Err(SceneError::NotFound("golfClub".into()))
    );
}

#[test]
fn test_manual_node_edit_is_overwritten_on_step() {
    let mut sim = Simulation::new(PhysicsConfig::default());
    let node = sim.scene_mut().add(VisualNode::new("ball"));
    let body = sim
        .create_body(Collider::sphere(0.5), node, &BodyDesc::default().at(Vec3::Y * 3.0))
        .unwrap();
    sim.scene_mut()
        .set_world_transform(node, Transform::from_position(Vec3::splat(100.0)))
        .unwrap();
    sim.step(1.0 / 60.0).unwrap();
    let node_world = sim.scene().world_transform(node).unwrap();
    assert!(node_world.approx_eq(&sim.world().transform(body).unwrap(), EPS));
}
