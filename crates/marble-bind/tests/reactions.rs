//! Tag rules and collision reactions.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec3;
use marble_bind::{BodyDesc, CollisionEvent, Simulation};
use marble_physics::{
    Collider, Constraint, PhysicsConfig, PhysicsWorld, Spring6DofConstraint, Transform,
};
use marble_scene::{NodeId, VisualNode};

fn counter(sim: &mut Simulation, node: NodeId) -> Rc<Cell<usize>> {
    let hits = Rc::new(Cell::new(0));
    let seen = hits.clone();
    sim.set_reaction(node, move |_: &CollisionEvent, _: &mut PhysicsWorld| {
        seen.set(seen.get() + 1);
    })
    .unwrap();
    hits
}

fn target(sim: &mut Simulation) -> NodeId {
    let node = sim
        .scene_mut()
        .add(VisualNode::new("target").with_tag("target"));
    sim.create_body(Collider::box_shape(Vec3::new(1.0, 0.5, 1.0)), node, &BodyDesc::fixed())
        .unwrap();
    node
}

fn drop_ball(sim: &mut Simulation, tag: Option<&str>, position: Vec3) -> NodeId {
    let mut ball = VisualNode::new("ball");
    if let Some(tag) = tag {
        ball = ball.with_tag(tag);
    }
    let node = sim.scene_mut().add(ball);
    sim.create_body(Collider::sphere(0.3), node, &BodyDesc::default().at(position))
        .unwrap();
    node
}

fn run(sim: &mut Simulation, frames: usize) {
    for _ in 0..frames {
        sim.step(1.0 / 60.0).unwrap();
    }
}

#[test]
fn test_ruled_pair_reaches_both_nodes() {
    let mut sim = Simulation::new(PhysicsConfig::default());
    sim.rules_mut().add("target", "cannonBall");
    let target = target(&mut sim);
    let ball = drop_ball(&mut sim, Some("cannonBall"), Vec3::new(0.0, 2.0, 0.0));

    let target_hits = counter(&mut sim, target);
    let ball_hits = counter(&mut sim, ball);
    run(&mut sim, 120);

    assert!(target_hits.get() > 0);
    assert_eq!(target_hits.get(), ball_hits.get());
}

#[test]
fn test_event_describes_the_other_node() {
    let mut sim = Simulation::new(PhysicsConfig::default());
    sim.rules_mut().add("target", "cannonBall");
    let target = target(&mut sim);
    let ball = drop_ball(&mut sim, Some("cannonBall"), Vec3::new(0.0, 2.0, 0.0));

    let events = Rc::new(RefCell::new(Vec::new()));
    let log = events.clone();
    sim.set_reaction(target, move |event: &CollisionEvent, _: &mut PhysicsWorld| {
        log.borrow_mut().push(event.clone());
    })
    .unwrap();
    run(&mut sim, 60);

    let events = events.borrow();
    let first = events.first().expect("target was never hit");
    assert_eq!(first.node, target);
    assert_eq!(first.other, ball);
    assert_eq!(first.tag.as_str(), "target");
    assert_eq!(first.other_tag.as_str(), "cannonBall");
    assert_eq!(Some(first.other_body), sim.body_of(ball));
    // From the ball down into the target.
    assert!(first.normal.y < -0.9, "normal {}", first.normal);
}

#[test]
fn test_unruled_and_untagged_contacts_are_silent() {
    let mut sim = Simulation::new(PhysicsConfig::default());
    sim.rules_mut().add("target", "cannonBall");
    let target = target(&mut sim);
    let tagged = drop_ball(&mut sim, Some("ball"), Vec3::new(0.5, 2.0, 0.0));
    let untagged = drop_ball(&mut sim, None, Vec3::new(-0.5, 2.0, 0.0));

    let hits = [
        counter(&mut sim, target),
        counter(&mut sim, tagged),
        counter(&mut sim, untagged),
    ];
    let mut touched = 0;
    for _ in 0..120 {
        sim.step(1.0 / 60.0).unwrap();
        touched = touched.max(sim.world().contact_pairs().count());
    }

    assert_eq!(touched, 2);
    assert!(hits.iter().all(|h| h.get() == 0));
}

#[test]
fn test_removed_rule_stops_reactions() {
    let mut sim = Simulation::new(PhysicsConfig::default());
    sim.rules_mut().add("ball", "ball");
    let floor = sim.scene_mut().add(VisualNode::new("ground"));
    sim.create_body(Collider::ground(), floor, &BodyDesc::fixed()).unwrap();
    let a = drop_ball(&mut sim, Some("ball"), Vec3::new(0.0, 0.3, 0.0));
    drop_ball(&mut sim, Some("ball"), Vec3::new(0.55, 0.3, 0.0));
    let hits = counter(&mut sim, a);

    run(&mut sim, 5);
    let before = hits.get();
    assert!(before > 0);

    assert!(sim.rules_mut().remove("ball", "ball"));
    run(&mut sim, 5);
    assert_eq!(hits.get(), before);
}

#[test]
fn test_ball_hit_fires_the_cannon() {
    let mut sim = Simulation::new(PhysicsConfig::default());
    sim.rules_mut().add("cannonBody", "ball");

    let base_node = sim.scene_mut().add(VisualNode::new("cannonBase"));
    let base = sim
        .create_body(Collider::sphere(0.1), base_node, &BodyDesc::fixed())
        .unwrap();
    let plunger_node = sim
        .scene_mut()
        .add(VisualNode::new("cannonBody").with_tag("cannonBody"));
    let plunger = sim
        .create_body(
            Collider::box_shape(Vec3::new(0.5, 0.25, 0.5)),
            plunger_node,
            &BodyDesc::with_mass(20.0).at(Vec3::new(0.0, 1.0, 0.0)),
        )
        .unwrap();

    let mut spring = Spring6DofConstraint::new(base, plunger, Transform::IDENTITY, Transform::IDENTITY)
        .with_linear_limits(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 6.0, 0.0))
        .with_angular_limits(Vec3::ZERO, Vec3::ZERO);
    spring.set_stiffness(1, 8500.0).unwrap();
    spring.set_damping(1, 100.0).unwrap();
    spring.set_equilibrium_point(1, 4.0).unwrap();
    let cannon = sim.add_constraint(spring, true).unwrap();

    sim.set_reaction(plunger_node, move |_: &CollisionEvent, world: &mut PhysicsWorld| {
        if let Some(spring) = world.constraint_mut(cannon).and_then(Constraint::as_spring_mut) {
            spring.enable_spring(1, true).unwrap();
        }
    })
    .unwrap();

    // Resting on its lower limit until something hits it.
    run(&mut sim, 30);
    let idle = sim.world().transform(plunger).unwrap().position.y;
    assert!((idle - 1.0).abs() < 0.05, "plunger idle at {idle}");

    drop_ball(&mut sim, Some("ball"), Vec3::new(0.0, 2.0, 0.0));
    run(&mut sim, 180);

    let enabled = sim
        .constraint_mut(cannon)
        .and_then(Constraint::as_spring_mut)
        .unwrap()
        .spring(1)
        .unwrap()
        .enabled;
    assert!(enabled);
    let fired = sim.world().transform(plunger).unwrap().position.y;
    assert!((fired - 4.0).abs() < 0.1, "plunger at {fired}");
}
