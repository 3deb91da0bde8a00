//! The demo course.
//!
//! A ramp feeds balls past a swinging club onto a lift, which carries them
//! into a spring-loaded cannon. Tagged nodes tally the ruled contacts they
//! see.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::f32::consts::FRAC_PI_2;
use std::rc::Rc;

use glam::{Quat, Vec3};
use tracing::{info, warn};

use marble_bind::{
    BindError, BodyDesc, CollisionEvent, CompoundBuilder, ShapeKind, Simulation, collider_for,
};
use marble_physics::{
    ActivationState, BodyHandle, Collider, Constraint, ConstraintHandle, HingeConstraint,
    PhysicsConfig, PhysicsWorld, Spring6DofConstraint, Transform,
};
use marble_scene::{Geometry, NodeId, VisualNode};

/// Ruled contacts seen so far, keyed by `"tag/other"`.
pub type Tally = Rc<RefCell<BTreeMap<String, usize>>>;

// ============================================================================
// Layout
// ============================================================================

const BALL_RADIUS: f32 = 0.3;
const LIFT_BASE: Vec3 = Vec3::new(4.0, 0.25, 0.0);
const LIFT_TRAVEL: f32 = 2.5;
const CANNON_AT: Vec3 = Vec3::new(8.0, 0.0, 0.0);
const CANNON_EQUILIBRIUM: f32 = 3.0;

/// Seconds into the run at which the club is swung.
const SWING_AT: f32 = 1.5;
const SWING_FOR: f32 = 0.4;

/// A built course and the handles its script needs.
pub struct Course {
    /// Simulation holding the whole course.
    pub sim: Simulation,
    /// Kinematic lift platform.
    pub lift: BodyHandle,
    /// Club hinge.
    pub club: ConstraintHandle,
    /// Cannon spring.
    pub cannon: ConstraintHandle,
    /// Balls, in drop order.
    pub balls: Vec<BodyHandle>,
    /// Ruled contacts seen so far.
    pub tally: Tally,
}

impl Course {
    /// Builds the course in a fresh simulation.
    pub fn build(config: PhysicsConfig, balls: usize) -> Result<Self, BindError> {
        let mut sim = Simulation::new(config);
        let tally = Tally::default();

        sim.rules_mut()
            .add("ball", "ball")
            .add("golfClub", "ball")
            .add("lift", "ball")
            .add("cannonBody", "ball");

        ground(&mut sim)?;
        ramp(&mut sim)?;
        let balls = (0..balls)
            .map(|i| {
                let at = Vec3::new(-7.5 + i as f32 * 0.7, 6.0 + i as f32 * 0.4, 0.0);
                ball(&mut sim, i, at)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let lift = lift(&mut sim, &tally)?;
        let club = club(&mut sim, &tally)?;
        let cannon = cannon(&mut sim, &tally)?;

        info!(
            bodies = sim.world().body_count(),
            constraints = sim.world().constraint_count(),
            nodes = sim.scene().len(),
            "course built"
        );
        Ok(Self {
            sim,
            lift,
            club,
            cannon,
            balls,
            tally,
        })
    }

    /// Applies the scripted input for time `t`, before the step at `t`.
    pub fn drive(&mut self, t: f32) -> Result<(), BindError> {
        // Lift bobs with a 4 s period.
        let phase = t * std::f32::consts::TAU / 4.0;
        let height = LIFT_TRAVEL * 0.5 * (1.0 - phase.cos());
        self.sim.set_position(self.lift, LIFT_BASE + Vec3::Y * height)?;

        let swinging = (SWING_AT..SWING_AT + SWING_FOR).contains(&t);
        if let Some(hinge) = self
            .sim
            .constraint_mut(self.club)
            .and_then(Constraint::as_hinge_mut)
        {
            if swinging {
                hinge.enable_angular_motor(true, -8.0, 2.0);
            } else {
                hinge.enable_angular_motor(true, 0.0, 0.04);
            }
        }
        Ok(())
    }

    /// True once a ball has set off the cannon.
    pub fn cannon_fired(&mut self) -> bool {
        self.sim
            .constraint_mut(self.cannon)
            .and_then(Constraint::as_spring_mut)
            .and_then(|s| s.spring(1))
            .is_some_and(|s| s.enabled)
    }
}

// ============================================================================
// Pieces
// ============================================================================

fn ground(sim: &mut Simulation) -> Result<NodeId, BindError> {
    let geometry = Geometry::Box {
        size: Vec3::new(100.0, 5.0, 100.0),
    };
    let volume = collider_for(&geometry, ShapeKind::Box)?;
    let node = sim
        .scene_mut()
        .add(VisualNode::new("ground").with_geometry(geometry));
    sim.create_body(volume, node, &BodyDesc::fixed().at(Vec3::new(0.0, -2.5, 0.0)))?;
    Ok(node)
}

fn ramp(sim: &mut Simulation) -> Result<NodeId, BindError> {
    let group = sim.scene_mut().add(
        VisualNode::new("ramp").with_orientation(Quat::from_rotation_z(-0.3)),
    );
    let mut compound = CompoundBuilder::new();
    let deck = VisualNode::new("deck").with_geometry(Geometry::Box {
        size: Vec3::new(8.0, 0.2, 2.0),
    });
    sim.add_visual_part(group, &mut compound, deck, ShapeKind::Box)?;
    for side in [-1.0, 1.0] {
        let rail = VisualNode::new("rail")
            .with_position(Vec3::new(0.0, 0.3, side * 0.95))
            .with_geometry(Geometry::Box {
                size: Vec3::new(8.0, 0.4, 0.1),
            });
        sim.add_visual_part(group, &mut compound, rail, ShapeKind::Box)?;
    }
    sim.create_body(
        compound.build()?,
        group,
        &BodyDesc::fixed()
            .at(Vec3::new(-4.0, 2.5, 0.0))
            .with_material(0.2, 0.5),
    )?;
    Ok(group)
}

fn ball(sim: &mut Simulation, index: usize, at: Vec3) -> Result<BodyHandle, BindError> {
    let geometry = Geometry::Sphere {
        radius: BALL_RADIUS,
    };
    let volume = collider_for(&geometry, ShapeKind::Sphere)?;
    let node = sim.scene_mut().add(
        VisualNode::new(format!("ball{index}"))
            .with_tag("ball")
            .with_geometry(geometry),
    );
    sim.create_body(volume, node, &BodyDesc::default().at(at))
}

fn lift(sim: &mut Simulation, tally: &Tally) -> Result<BodyHandle, BindError> {
    let geometry = Geometry::Box {
        size: Vec3::new(1.6, 0.2, 1.6),
    };
    let volume = collider_for(&geometry, ShapeKind::Box)?;
    let node = sim.scene_mut().add(
        VisualNode::new("lift")
            .with_tag("lift")
            .with_geometry(geometry),
    );
    let body = sim.create_body(volume, node, &BodyDesc::kinematic().at(LIFT_BASE))?;
    sim.set_reaction(node, counter(tally))?;
    Ok(body)
}

fn club(sim: &mut Simulation, tally: &Tally) -> Result<ConstraintHandle, BindError> {
    let stand_node = sim.scene_mut().add(VisualNode::new("clubStand"));
    let stand = sim.create_body(
        Collider::sphere(0.1),
        stand_node,
        &BodyDesc::fixed()
            .at(Vec3::new(1.5, 2.4, 0.0))
            .with_activation(ActivationState::AlwaysActive),
    )?;

    let geometry = Geometry::Box {
        size: Vec3::new(0.2, 2.0, 0.4),
    };
    let volume = collider_for(&geometry, ShapeKind::Box)?;
    let club_node = sim.scene_mut().add(
        VisualNode::new("golfClub")
            .with_tag("golfClub")
            .with_geometry(geometry),
    );
    let club = sim.create_body(
        volume,
        club_node,
        &BodyDesc::with_mass(2.0)
            .at(Vec3::new(1.5, 1.4, 0.0))
            .with_activation(ActivationState::AlwaysActive),
    )?;
    sim.set_reaction(club_node, counter(tally))?;

    let hinge = HingeConstraint::new(stand, club)
        .with_anchors(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0))
        .with_axes(Vec3::Z, Vec3::Z)
        .with_limits(-FRAC_PI_2, FRAC_PI_2)
        .with_motor(0.0, 0.04);
    sim.add_constraint(hinge, true)
}

fn cannon(sim: &mut Simulation, tally: &Tally) -> Result<ConstraintHandle, BindError> {
    let base_node = sim.scene_mut().add(VisualNode::new("cannonBase"));
    let base = sim.create_body(
        Collider::sphere(0.1),
        base_node,
        &BodyDesc::fixed().at(CANNON_AT),
    )?;

    let geometry = Geometry::Box {
        size: Vec3::new(1.2, 0.3, 1.2),
    };
    let volume = collider_for(&geometry, ShapeKind::Box)?;
    let plunger_node = sim.scene_mut().add(
        VisualNode::new("cannonBody")
            .with_tag("cannonBody")
            .with_geometry(geometry),
    );
    let plunger = sim.create_body(
        volume,
        plunger_node,
        &BodyDesc::with_mass(20.0).at(CANNON_AT + Vec3::new(0.0, 0.5, 0.0)),
    )?;

    let mut spring =
        Spring6DofConstraint::new(base, plunger, Transform::IDENTITY, Transform::IDENTITY)
            .with_linear_limits(Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, 6.0, 0.0))
            .with_angular_limits(Vec3::ZERO, Vec3::ZERO);
    spring.set_stiffness(1, 8500.0)?;
    spring.set_damping(1, 100.0)?;
    spring.set_equilibrium_point(1, CANNON_EQUILIBRIUM)?;
    let handle = sim.add_constraint(spring, true)?;

    let mut count = counter(tally);
    sim.set_reaction(
        plunger_node,
        move |event: &CollisionEvent, world: &mut PhysicsWorld| {
            count(event, world);
            let Some(spring) = world
                .constraint_mut(handle)
                .and_then(Constraint::as_spring_mut)
            else {
                return;
            };
            if spring.spring(1).is_some_and(|s| !s.enabled) {
                info!(ball = event.other.index(), "cannon fired");
            }
            if spring.enable_spring(1, true).is_err() {
                warn!("cannon spring axis missing");
            }
        },
    )?;
    Ok(handle)
}

/// A reaction that tallies each ruled contact under `"tag/other"`.
fn counter(tally: &Tally) -> impl FnMut(&CollisionEvent, &mut PhysicsWorld) + 'static {
    let tally = Rc::clone(tally);
    move |event: &CollisionEvent, _: &mut PhysicsWorld| {
        *tally
            .borrow_mut()
            .entry(format!("{}/{}", event.tag, event.other_tag))
            .or_default() += 1;
    }
}
