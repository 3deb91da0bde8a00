//! Zero-mass bodies that are not kinematic never move.

use glam::{Quat, Vec3};
use marble_bind::{BodyDesc, CompoundBuilder, ShapeKind, Simulation};
use marble_physics::{Collider, PhysicsConfig};
use marble_scene::{Geometry, VisualNode};

#[test]
fn test_static_bodies_unmoved_under_bombardment() {
    let mut sim = Simulation::new(PhysicsConfig::default());

    let ramp_node = sim.scene_mut().add(
        VisualNode::new("ramp").with_orientation(Quat::from_rotation_z(-0.3)),
    );
    let mut ramp = CompoundBuilder::new();
    ramp.add_part(
        marble_physics::Transform::IDENTITY,
        &Geometry::Box { size: Vec3::new(6.0, 0.2, 2.0) },
        ShapeKind::Box,
    )
    .unwrap();
    let ramp = sim
        .create_body(ramp.build().unwrap(), ramp_node, &BodyDesc::fixed().at(Vec3::new(0.0, 2.0, 0.0)))
        .unwrap();

    let post_node = sim.scene_mut().add(VisualNode::new("post"));
    let post = sim
        .create_body(
            Collider::cylinder(0.3, 1.0),
            post_node,
            &BodyDesc::fixed().at(Vec3::new(2.0, 1.0, 0.0)),
        )
        .unwrap();

    let before = [
        sim.world().transform(ramp).unwrap(),
        sim.world().transform(post).unwrap(),
    ];

    for i in 0..12 {
        let node = sim.scene_mut().add(VisualNode::new("ball"));
        sim.create_body(
            Collider::sphere(0.25),
            node,
            &BodyDesc::default().at(Vec3::new(-2.0 + i as f32 * 0.35, 5.0 + i as f32 * 0.5, 0.0)),
        )
        .unwrap();
    }

    for _ in 0..400 {
        sim.step(1.0 / 60.0).unwrap();
    }

    assert_eq!(sim.world().transform(ramp).unwrap(), before[0]);
    assert_eq!(sim.world().transform(post).unwrap(), before[1]);
    assert_eq!(sim.world().body(ramp).unwrap().velocity, Vec3::ZERO);
}
