//! Constraints and joints for rigid body simulation.
//!
//! Provides hinge, point, generic 6-DoF and spring 6-DoF constraints between
//! two bodies. The world solves them by projecting positions and orientations
//! back onto the allowed configuration after each integration step; hinge
//! motors and 6-DoF springs act on velocities and forces.

use glam::{EulerRot, Quat, Vec3};

use crate::{BodyHandle, PhysicsError, RigidBody, Transform};

/// A constraint between two bodies.
#[derive(Clone, Debug)]
pub enum Constraint {
    /// Hinge - rotation around a single axis.
    Hinge(HingeConstraint),
    /// Point - ball-and-socket joint.
    Point(PointConstraint),
    /// Generic 6-DoF - per-axis linear and angular limits.
    Generic6Dof(Generic6DofConstraint),
    /// 6-DoF with per-axis springs.
    Spring6Dof(Spring6DofConstraint),
}

impl Constraint {
    /// The two linked bodies.
    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        match self {
            Constraint::Hinge(c) => (c.body_a, c.body_b),
            Constraint::Point(c) => (c.body_a, c.body_b),
            Constraint::Generic6Dof(c) => (c.body_a, c.body_b),
            Constraint::Spring6Dof(c) => (c.dof.body_a, c.dof.body_b),
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Constraint::Hinge(_) => "hinge",
            Constraint::Point(_) => "point",
            Constraint::Generic6Dof(_) => "generic 6dof",
            Constraint::Spring6Dof(_) => "spring 6dof",
        }
    }

    /// The hinge, if this is one.
    pub fn as_hinge_mut(&mut self) -> Option<&mut HingeConstraint> {
        match self {
            Constraint::Hinge(c) => Some(c),
            _ => None,
        }
    }

    /// The spring 6-DoF, if this is one.
    pub fn as_spring_mut(&mut self) -> Option<&mut Spring6DofConstraint> {
        match self {
            Constraint::Spring6Dof(c) => Some(c),
            _ => None,
        }
    }

    /// Captures the rest configuration when the constraint joins a world.
    pub(crate) fn capture_reference(&mut self, a: &RigidBody, b: &RigidBody) {
        if let Constraint::Hinge(hinge) = self {
            hinge.reference = a.orientation.inverse() * b.orientation;
        }
    }
}

impl From<HingeConstraint> for Constraint {
    fn from(c: HingeConstraint) -> Self {
        Constraint::Hinge(c)
    }
}

impl From<PointConstraint> for Constraint {
    fn from(c: PointConstraint) -> Self {
        Constraint::Point(c)
    }
}

impl From<Generic6DofConstraint> for Constraint {
    fn from(c: Generic6DofConstraint) -> Self {
        Constraint::Generic6Dof(c)
    }
}

impl From<Spring6DofConstraint> for Constraint {
    fn from(c: Spring6DofConstraint) -> Self {
        Constraint::Spring6Dof(c)
    }
}

// ============================================================================
// Hinge
// ============================================================================

/// Angular motor driving a hinge toward a target velocity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AngularMotor {
    /// Target relative angular velocity (rad/s) of B about the hinge axis.
    pub target_velocity: f32,
    /// Largest impulse the motor may apply per sub-step.
    pub max_impulse: f32,
}

/// Hinge constraint - rotation around a single axis.
///
/// The hinge angle is measured relative to the orientation the bodies had
/// when the constraint was added to the world.
#[derive(Clone, Debug)]
pub struct HingeConstraint {
    /// First body.
    pub body_a: BodyHandle,
    /// Second body.
    pub body_b: BodyHandle,
    /// Anchor point in body A's local space.
    pub local_anchor_a: Vec3,
    /// Anchor point in body B's local space.
    pub local_anchor_b: Vec3,
    /// Hinge axis in body A's local space.
    pub local_axis_a: Vec3,
    /// Hinge axis in body B's local space.
    pub local_axis_b: Vec3,
    /// Optional angle limits (min, max) in radians.
    pub limits: Option<(f32, f32)>,
    /// Optional angular motor.
    pub motor: Option<AngularMotor>,
    pub(crate) reference: Quat,
}

impl HingeConstraint {
    /// Create a hinge constraint with axis along Y.
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: Vec3::ZERO,
            local_anchor_b: Vec3::ZERO,
            local_axis_a: Vec3::Y,
            local_axis_b: Vec3::Y,
            limits: None,
            motor: None,
            reference: Quat::IDENTITY,
        }
    }

    /// Set anchor points.
    pub fn with_anchors(mut self, anchor_a: Vec3, anchor_b: Vec3) -> Self {
        self.local_anchor_a = anchor_a;
        self.local_anchor_b = anchor_b;
        self
    }

    /// Set hinge axes (should be unit vectors).
    pub fn with_axes(mut self, axis_a: Vec3, axis_b: Vec3) -> Self {
        self.local_axis_a = axis_a.normalize();
        self.local_axis_b = axis_b.normalize();
        self
    }

    /// Set angle limits.
    pub fn with_limits(mut self, min: f32, max: f32) -> Self {
        self.set_limits(min, max);
        self
    }

    /// Set an angular motor.
    pub fn with_motor(mut self, target_velocity: f32, max_impulse: f32) -> Self {
        self.enable_angular_motor(true, target_velocity, max_impulse);
        self
    }

    /// Change the angle limits.
    pub fn set_limits(&mut self, min: f32, max: f32) {
        self.limits = Some((min.min(max), min.max(max)));
    }

    /// Turn the motor on or off.
    ///
    /// A motor with target velocity 0 acts as a brake.
    pub fn enable_angular_motor(&mut self, enable: bool, target_velocity: f32, max_impulse: f32) {
        self.motor = enable.then_some(AngularMotor {
            target_velocity,
            max_impulse: max_impulse.max(0.0),
        });
    }

    /// World-space anchor points on A and B.
    pub fn world_anchors(&self, a: &RigidBody, b: &RigidBody) -> (Vec3, Vec3) {
        (
            a.position + a.orientation * self.local_anchor_a,
            b.position + b.orientation * self.local_anchor_b,
        )
    }

    /// Current hinge angle in `(-pi, pi]`.
    pub fn angle(&self, a: &RigidBody, b: &RigidBody) -> f32 {
        let relative = a.orientation.inverse() * b.orientation * self.reference.inverse();
        twist_angle(relative, self.local_axis_a)
    }
}

/// Angle of the twist part of `q` about `axis` (swing-twist decomposition).
pub(crate) fn twist_angle(q: Quat, axis: Vec3) -> f32 {
    let projection = Vec3::new(q.x, q.y, q.z).dot(axis);
    wrap_angle(2.0 * projection.atan2(q.w))
}

fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if angle > PI {
        angle - TAU
    } else if angle <= -PI {
        angle + TAU
    } else {
        angle
    }
}

// ============================================================================
// Point
// ============================================================================

/// Point constraint - ball-and-socket joint between two bodies.
#[derive(Clone, Debug)]
pub struct PointConstraint {
    /// First body.
    pub body_a: BodyHandle,
    /// Second body.
    pub body_b: BodyHandle,
    /// Pivot in body A's local space.
    pub local_anchor_a: Vec3,
    /// Pivot in body B's local space.
    pub local_anchor_b: Vec3,
}

impl PointConstraint {
    /// Create a point constraint connecting two bodies (ball joint).
    pub fn new(
        body_a: BodyHandle,
        local_anchor_a: Vec3,
        body_b: BodyHandle,
        local_anchor_b: Vec3,
    ) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a,
            local_anchor_b,
        }
    }
}

// ============================================================================
// Generic 6-DoF
// ============================================================================

/// Per-axis limits between two constraint frames.
///
/// For every axis, `lower > upper` leaves it free, `lower == upper` locks it,
/// and `lower < upper` limits it to that range. Linear axes are measured in
/// frame A; angular axes are XYZ Euler angles of frame B relative to frame A.
/// By default linear axes are locked and angular axes are free.
#[derive(Clone, Debug)]
pub struct Generic6DofConstraint {
    /// First body.
    pub body_a: BodyHandle,
    /// Second body.
    pub body_b: BodyHandle,
    /// Constraint frame in body A's local space.
    pub frame_a: Transform,
    /// Constraint frame in body B's local space.
    pub frame_b: Transform,
    /// Lower linear limits.
    pub linear_lower: Vec3,
    /// Upper linear limits.
    pub linear_upper: Vec3,
    /// Lower angular limits (radians).
    pub angular_lower: Vec3,
    /// Upper angular limits (radians).
    pub angular_upper: Vec3,
}

impl Generic6DofConstraint {
    /// Create a 6-DoF constraint between two frames.
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, frame_a: Transform, frame_b: Transform) -> Self {
        Self {
            body_a,
            body_b,
            frame_a,
            frame_b,
            linear_lower: Vec3::ZERO,
            linear_upper: Vec3::ZERO,
            angular_lower: Vec3::ONE,
            angular_upper: Vec3::NEG_ONE,
        }
    }

    /// Set linear limits.
    pub fn with_linear_limits(mut self, lower: Vec3, upper: Vec3) -> Self {
        self.linear_lower = lower;
        self.linear_upper = upper;
        self
    }

    /// Set angular limits.
    pub fn with_angular_limits(mut self, lower: Vec3, upper: Vec3) -> Self {
        self.angular_lower = lower;
        self.angular_upper = upper;
        self
    }

    /// Change the lower linear limits.
    pub fn set_linear_lower_limit(&mut self, lower: Vec3) {
        self.linear_lower = lower;
    }

    /// Change the upper linear limits.
    pub fn set_linear_upper_limit(&mut self, upper: Vec3) {
        self.linear_upper = upper;
    }

    /// Change the lower angular limits.
    pub fn set_angular_lower_limit(&mut self, lower: Vec3) {
        self.angular_lower = lower;
    }

    /// Change the upper angular limits.
    pub fn set_angular_upper_limit(&mut self, upper: Vec3) {
        self.angular_upper = upper;
    }

    /// World-space frames of A and B.
    pub fn world_frames(&self, a: &RigidBody, b: &RigidBody) -> (Transform, Transform) {
        (
            a.transform().then(&self.frame_a),
            b.transform().then(&self.frame_b),
        )
    }

    /// Offset of frame B from frame A, in frame A coordinates.
    pub fn linear_offset(&self, a: &RigidBody, b: &RigidBody) -> Vec3 {
        let (fa, fb) = self.world_frames(a, b);
        fa.orientation.inverse() * (fb.position - fa.position)
    }

    /// XYZ Euler angles of frame B relative to frame A.
    pub fn angles(&self, a: &RigidBody, b: &RigidBody) -> Vec3 {
        let (fa, fb) = self.world_frames(a, b);
        relative_euler(fa.orientation, fb.orientation)
    }
}

pub(crate) fn relative_euler(frame_a: Quat, frame_b: Quat) -> Vec3 {
    let (x, y, z) = (frame_a.inverse() * frame_b).to_euler(EulerRot::XYZ);
    Vec3::new(x, y, z)
}

/// Clamps each component into its range; free axes pass through.
pub(crate) fn clamp_axes(value: Vec3, lower: Vec3, upper: Vec3) -> Vec3 {
    let clamp = |v: f32, lo: f32, hi: f32| if lo > hi { v } else { v.clamp(lo, hi) };
    Vec3::new(
        clamp(value.x, lower.x, upper.x),
        clamp(value.y, lower.y, upper.y),
        clamp(value.z, lower.z, upper.z),
    )
}

// ============================================================================
// Spring 6-DoF
// ============================================================================

/// Spring acting along or about one 6-DoF axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisSpring {
    /// Whether the spring applies force.
    pub enabled: bool,
    /// Stiffness (force per unit displacement).
    pub stiffness: f32,
    /// Damping (force per unit relative velocity).
    pub damping: f32,
    /// Rest displacement.
    pub equilibrium: f32,
}

impl Default for AxisSpring {
    fn default() -> Self {
        Self {
            enabled: false,
            stiffness: 0.0,
            damping: 0.0,
            equilibrium: 0.0,
        }
    }
}

/// Generic 6-DoF constraint with a spring per axis.
///
/// Axes 0-2 are linear X, Y, Z in frame A; axes 3-5 are the angular axes.
#[derive(Clone, Debug)]
pub struct Spring6DofConstraint {
    /// Limits and frames.
    pub dof: Generic6DofConstraint,
    springs: [AxisSpring; 6],
}

impl Spring6DofConstraint {
    /// Create a spring 6-DoF constraint with all springs disabled.
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, frame_a: Transform, frame_b: Transform) -> Self {
        Self {
            dof: Generic6DofConstraint::new(body_a, body_b, frame_a, frame_b),
            springs: [AxisSpring::default(); 6],
        }
    }

    /// Set linear limits.
    pub fn with_linear_limits(mut self, lower: Vec3, upper: Vec3) -> Self {
        self.dof = self.dof.with_linear_limits(lower, upper);
        self
    }

    /// Set angular limits.
    pub fn with_angular_limits(mut self, lower: Vec3, upper: Vec3) -> Self {
        self.dof = self.dof.with_angular_limits(lower, upper);
        self
    }

    /// Spring settings for `index`.
    pub fn spring(&self, index: usize) -> Option<&AxisSpring> {
        self.springs.get(index)
    }

    /// All six springs.
    pub fn springs(&self) -> &[AxisSpring; 6] {
        &self.springs
    }

    fn spring_mut(&mut self, index: usize) -> Result<&mut AxisSpring, PhysicsError> {
        self.springs
            .get_mut(index)
            .ok_or(PhysicsError::InvalidAxis(index))
    }

    /// Turn the spring on `index` on or off.
    pub fn enable_spring(&mut self, index: usize, enabled: bool) -> Result<(), PhysicsError> {
        self.spring_mut(index)?.enabled = enabled;
        Ok(())
    }

    /// Set the stiffness of the spring on `index`.
    pub fn set_stiffness(&mut self, index: usize, stiffness: f32) -> Result<(), PhysicsError> {
        self.spring_mut(index)?.stiffness = stiffness.max(0.0);
        Ok(())
    }

    /// Set the damping of the spring on `index`.
    pub fn set_damping(&mut self, index: usize, damping: f32) -> Result<(), PhysicsError> {
        self.spring_mut(index)?.damping = damping.max(0.0);
        Ok(())
    }

    /// Set the rest displacement of the spring on `index`.
    pub fn set_equilibrium_point(&mut self, index: usize, value: f32) -> Result<(), PhysicsError> {
        self.spring_mut(index)?.equilibrium = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Collider;
    use std::f32::consts::FRAC_PI_2;

    fn body_at(position: Vec3, orientation: Quat) -> RigidBody {
        RigidBody::with_orientation(position, orientation, Collider::sphere(0.5), 1.0).unwrap()
    }

    #[test]
    fn test_twist_angle() {
        let q = Quat::from_rotation_z(0.7);
        assert!((twist_angle(q, Vec3::Z) - 0.7).abs() < 1e-5);
        assert!(twist_angle(q, Vec3::X).abs() < 1e-5);
        let swing_and_twist = Quat::from_rotation_x(0.3) * Quat::from_rotation_z(-0.4);
        assert!((twist_angle(swing_and_twist, Vec3::Z) + 0.4).abs() < 0.05);
    }

    #[test]
    fn test_hinge_angle_relative_to_reference() {
        let a = body_at(Vec3::ZERO, Quat::IDENTITY);
        let b = body_at(Vec3::Y, Quat::from_rotation_z(0.2));
        let mut c = Constraint::Hinge(HingeConstraint::new(BodyHandle(0), BodyHandle(1)).with_axes(Vec3::Z, Vec3::Z));
        c.capture_reference(&a, &b);
        let Constraint::Hinge(hinge) = &c else {
            unreachable!()
        };
        assert!(hinge.angle(&a, &b).abs() < 1e-6);

        let b2 = body_at(Vec3::Y, Quat::from_rotation_z(0.2 + FRAC_PI_2));
        assert!((hinge.angle(&a, &b2) - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_hinge_limits_are_ordered() {
        let hinge = HingeConstraint::new(BodyHandle(0), BodyHandle(1)).with_limits(1.0, -1.0);
        assert_eq!(hinge.limits, Some((-1.0, 1.0)));
    }

    #[test]
    fn test_motor_toggle() {
        let mut hinge = HingeConstraint::new(BodyHandle(0), BodyHandle(1)).with_motor(0.0, 4.0);
        assert_eq!(hinge.motor.map(|m| m.max_impulse), Some(4.0));
        hinge.enable_angular_motor(false, 0.0, 0.0);
        assert!(hinge.motor.is_none());
    }

    #[test]
    fn test_clamp_axes_free_and_locked() {
        let v = Vec3::new(2.0, 2.0, 2.0);
        let out = clamp_axes(v, Vec3::new(0.0, 1.0, -1.0), Vec3::new(0.0, 0.0, 1.0));
        // x locked at 0, y free (lower > upper), z limited to [-1, 1]
        assert_eq!(out, Vec3::new(0.0, 2.0, 1.0));
    }

    #[test]
    fn test_linear_offset_in_frame_a() {
        let a = body_at(Vec3::ZERO, Quat::from_rotation_z(FRAC_PI_2));
        let b = body_at(Vec3::new(-2.0, 0.0, 0.0), Quat::IDENTITY);
        let dof = Generic6DofConstraint::new(BodyHandle(0), BodyHandle(1), Transform::IDENTITY, Transform::IDENTITY);
        // A's local +Y points along world -X.
        assert!((dof.linear_offset(&a, &b) - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_spring_setters() {
        let mut spring = Spring6DofConstraint::new(BodyHandle(0), BodyHandle(1), Transform::IDENTITY, Transform::IDENTITY);
        spring.enable_spring(1, true).unwrap();
        spring.set_stiffness(1, 8500.0).unwrap();
        spring.set_damping(1, 100.0).unwrap();
        spring.set_equilibrium_point(1, 3.0).unwrap();
        assert_eq!(
            spring.spring(1),
            Some(&AxisSpring {
                enabled: true,
                stiffness: 8500.0,
                damping: 100.0,
                equilibrium: 3.0,
            })
        );
        assert_eq!(spring.enable_spring(6, true), Err(PhysicsError::InvalidAxis(6)));
    }
}
