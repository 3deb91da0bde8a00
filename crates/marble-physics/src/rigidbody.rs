//! Rigid body dynamics.
//!
//! Provides the core `RigidBody` type with mass, inertia, forces, impulses,
//! motion kind, activation state, and collision filtering.

use glam::{Quat, Vec3};

use crate::{Collider, PhysicsError, Transform};

/// Collision filter groups used by the marble course.
pub mod groups {
    /// Ground planes and terrain.
    pub const PLANE: u32 = 1;
    /// Free-rolling spheres.
    pub const SPHERE: u32 = 2;
    /// Kinematic, user-moved pieces.
    pub const MOVABLE: u32 = 4;
    /// Boxes and box-built parts.
    pub const BOX: u32 = 8;
    /// Spheres hanging from hinges.
    pub const HINGE_SPHERE: u32 = 16;
    /// Spring-loaded parts.
    pub const SPRING: u32 = 32;
    /// Bodies joined by point constraints.
    pub const P2P: u32 = 64;
    /// Collides with every group.
    pub const ALL: u32 = u32::MAX;
}

/// How the solver treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Moved by forces, contacts, and constraints.
    Dynamic,
    /// Never moves.
    Static,
    /// Zero mass, moved only by application code; pushes dynamic bodies.
    Kinematic,
}

/// Whether a body takes part in simulation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// Simulated; may fall asleep when it comes to rest.
    Active,
    /// At rest and skipped until something wakes it.
    Sleeping,
    /// Simulated and never allowed to sleep.
    AlwaysActive,
}

/// A rigid body in the physics simulation.
#[derive(Clone, Debug)]
pub struct RigidBody {
    /// Position in world space.
    pub position: Vec3,
    /// Orientation as quaternion.
    pub orientation: Quat,
    /// Linear velocity.
    pub velocity: Vec3,
    /// Angular velocity.
    pub angular_velocity: Vec3,
    /// Mass (0 = infinite).
    pub mass: f32,
    /// Inverse mass (cached).
    pub inv_mass: f32,
    /// Inertia tensor (diagonal approximation).
    pub inertia: Vec3,
    /// Inverse inertia tensor.
    pub inv_inertia: Vec3,
    /// Restitution (bounciness) 0-1.
    pub restitution: f32,
    /// Friction coefficient.
    pub friction: f32,
    /// Linear damping.
    pub linear_damping: f32,
    /// Angular damping.
    pub angular_damping: f32,
    /// Collision shape.
    pub collider: Collider,
    /// Collision group bits this body belongs to.
    pub group: u32,
    /// Collision group bits this body collides with.
    pub mask: u32,
    pub(crate) kind: BodyKind,
    pub(crate) activation: ActivationState,
    /// Seconds spent below the sleep thresholds.
    pub(crate) sleep_timer: f32,
    /// Transform at the end of the previous step (kinematic velocity source).
    pub(crate) previous: Transform,
    /// Accumulated force for this frame.
    pub(crate) force: Vec3,
    /// Accumulated torque for this frame.
    pub(crate) torque: Vec3,
}

impl RigidBody {
    /// Create a new rigid body; mass 0 makes it static.
    pub fn new(position: Vec3, collider: Collider, mass: f32) -> Result<Self, PhysicsError> {
        Self::with_orientation(position, Quat::IDENTITY, collider, mass)
    }

    /// Create a new rigid body with an initial orientation.
    pub fn with_orientation(
        position: Vec3,
        orientation: Quat,
        collider: Collider,
        mass: f32,
    ) -> Result<Self, PhysicsError> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(PhysicsError::InvalidMass(mass));
        }
        let inertia = compute_inertia(&collider, mass)?;
        let (inv_mass, inv_inertia) = if mass > 0.0 {
            (1.0 / mass, Vec3::ONE / inertia)
        } else {
            (0.0, Vec3::ZERO)
        };
        let kind = if mass > 0.0 {
            BodyKind::Dynamic
        } else {
            BodyKind::Static
        };

        Ok(Self {
            position,
            orientation,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass,
            inv_mass,
            inertia,
            inv_inertia,
            restitution: 0.3,
            friction: 0.5,
            linear_damping: 0.0,
            angular_damping: 0.0,
            collider,
            group: 1,
            mask: groups::ALL,
            kind,
            activation: ActivationState::Active,
            sleep_timer: 0.0,
            previous: Transform::new(position, orientation),
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
        })
    }

    /// Create a static (immovable) rigid body.
    pub fn new_static(position: Vec3, collider: Collider) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 0.0,
            inv_mass: 0.0,
            inertia: Vec3::ZERO,
            inv_inertia: Vec3::ZERO,
            restitution: 0.3,
            friction: 0.5,
            linear_damping: 0.0,
            angular_damping: 0.0,
            collider,
            group: 1,
            mask: groups::ALL,
            kind: BodyKind::Static,
            activation: ActivationState::Active,
            sleep_timer: 0.0,
            previous: Transform::from_position(position),
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
        }
    }

    /// Turn a zero-mass body into a kinematic one that application code may move.
    ///
    /// Kinematic bodies never sleep.
    pub fn into_kinematic(mut self) -> Result<Self, PhysicsError> {
        if self.mass != 0.0 {
            return Err(PhysicsError::InvalidMass(self.mass));
        }
        self.kind = BodyKind::Kinematic;
        self.activation = ActivationState::AlwaysActive;
        Ok(self)
    }

    /// Set restitution.
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set friction.
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Set collision group and mask.
    pub fn with_collision_filter(mut self, group: u32, mask: u32) -> Self {
        self.group = group;
        self.mask = mask;
        self
    }

    /// Set the activation state.
    pub fn with_activation(mut self, activation: ActivationState) -> Self {
        self.activation = activation;
        self
    }

    /// Motion kind.
    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    /// True for bodies moved by the solver.
    pub fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }

    /// True for bodies moved only by application code.
    pub fn is_kinematic(&self) -> bool {
        self.kind == BodyKind::Kinematic
    }

    /// True for bodies that never move.
    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    /// Current activation state.
    pub fn activation(&self) -> ActivationState {
        self.activation
    }

    /// Change the activation state; `AlwaysActive` disables sleeping.
    pub fn set_activation(&mut self, activation: ActivationState) {
        self.activation = activation;
        self.sleep_timer = 0.0;
    }

    /// Wake the body if it is sleeping.
    pub fn activate(&mut self) {
        if self.activation == ActivationState::Sleeping {
            self.activation = ActivationState::Active;
        }
        self.sleep_timer = 0.0;
    }

    /// True unless the body is sleeping.
    pub fn is_awake(&self) -> bool {
        self.activation != ActivationState::Sleeping
    }

    /// The current motion record.
    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.orientation)
    }

    /// True if two bodies' filters let them collide.
    pub fn collides_with(&self, other: &RigidBody) -> bool {
        self.group & other.mask != 0 && other.group & self.mask != 0
    }

    /// Apply a force at the center of mass.
    pub fn apply_force(&mut self, force: Vec3) {
        if self.is_dynamic() {
            self.force += force;
        }
    }

    /// Apply a force at a world-space point (generates torque).
    pub fn apply_force_at_point(&mut self, force: Vec3, point: Vec3) {
        if self.is_dynamic() {
            self.force += force;
            let r = point - self.position;
            self.torque += r.cross(force);
        }
    }

    /// Apply an impulse at the center of mass.
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        if self.is_dynamic() {
            self.velocity += impulse * self.inv_mass;
        }
    }

    /// Apply an impulse at a world-space point.
    pub fn apply_impulse_at_point(&mut self, impulse: Vec3, point: Vec3) {
        if self.is_dynamic() {
            self.velocity += impulse * self.inv_mass;
            let r = point - self.position;
            self.angular_velocity += self.world_inv_inertia(r.cross(impulse));
        }
    }

    /// Apply torque.
    pub fn apply_torque(&mut self, torque: Vec3) {
        if self.is_dynamic() {
            self.torque += torque;
        }
    }

    /// Get the velocity at a world-space point on the body.
    pub fn velocity_at_point(&self, point: Vec3) -> Vec3 {
        let r = point - self.position;
        self.velocity + self.angular_velocity.cross(r)
    }

    /// Multiply a world-space vector by the world-space inverse inertia.
    pub fn world_inv_inertia(&self, v: Vec3) -> Vec3 {
        let local = self.orientation.inverse() * v;
        self.orientation * (self.inv_inertia * local)
    }

    /// Inverse mass seen by the solver: zero unless the body is dynamic and awake.
    pub(crate) fn effective_inv_mass(&self) -> f32 {
        if self.is_dynamic() && self.is_awake() {
            self.inv_mass
        } else {
            0.0
        }
    }

    /// World inverse inertia seen by the solver.
    pub(crate) fn effective_inv_inertia(&self, v: Vec3) -> Vec3 {
        if self.is_dynamic() && self.is_awake() {
            self.world_inv_inertia(v)
        } else {
            Vec3::ZERO
        }
    }

    /// True if the body moves faster than the given thresholds.
    pub(crate) fn is_moving(&self, linear: f32, angular: f32) -> bool {
        self.velocity.length() > linear || self.angular_velocity.length() > angular
    }

    /// Clear accumulated forces.
    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }
}

/// Compute the diagonal inertia tensor for a volume.
///
/// Mass 0 yields a zero tensor. Convex meshes and compounds use the inertia of
/// their bounding box.
pub fn compute_inertia(collider: &Collider, mass: f32) -> Result<Vec3, PhysicsError> {
    if mass == 0.0 {
        return Ok(Vec3::ZERO);
    }
    if let Some(kind) = collider.static_only_kind() {
        return Err(PhysicsError::StaticOnlyShape(kind));
    }

    let inertia = match collider {
        Collider::Sphere { radius } => {
            let i = 0.4 * mass * radius * radius;
            Vec3::splat(i)
        }
        Collider::Box { half_extents } => box_inertia(*half_extents, mass),
        Collider::Cylinder {
            radius,
            half_height,
        } => {
            let h = half_height * 2.0;
            let side = mass * (3.0 * radius * radius + h * h) / 12.0;
            Vec3::new(side, 0.5 * mass * radius * radius, side)
        }
        Collider::ConvexMesh(mesh) => box_inertia(mesh.aabb().half_extents(), mass),
        Collider::Compound(_) => match collider.local_aabb() {
            Some(aabb) => box_inertia(aabb.half_extents(), mass),
            None => return Err(PhysicsError::StaticOnlyShape("plane")),
        },
        Collider::Plane { .. } | Collider::TriangleMesh(_) | Collider::HeightField(_) => {
            return Err(PhysicsError::StaticOnlyShape(collider.kind_name()));
        }
    };

    if !inertia.is_finite() || inertia.cmple(Vec3::ZERO).any() {
        return Err(PhysicsError::DegenerateInertia {
            shape: collider.kind_name(),
            inertia: inertia.to_array(),
        });
    }
    Ok(inertia)
}

fn box_inertia(half_extents: Vec3, mass: f32) -> Vec3 {
    let e = half_extents * 2.0; // full extents
    let factor = mass / 12.0;
    Vec3::new(
        factor * (e.y * e.y + e.z * e.z),
        factor * (e.x * e.x + e.z * e.z),
        factor * (e.x * e.x + e.y * e.y),
    )
}
