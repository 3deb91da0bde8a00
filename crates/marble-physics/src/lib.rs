//! Rigid body physics for marble courses.
//!
//! Provides rigid body dynamics with collision detection, constraints and
//! sleeping:
//! - `RigidBody` - dynamic, static or kinematic body with mass and inertia
//! - `Collider` - volumes (sphere, box, cylinder, plane, meshes, height field, compound)
//! - `Constraint` - hinge, point, 6-DoF and sprung 6-DoF joints
//! - `PhysicsWorld` - fixed-step simulation container with contact reporting

pub mod collider;
pub mod collision;
pub mod constraint;
pub mod error;
pub mod rigidbody;
pub mod transform;
pub mod world;

pub use collider::{Aabb, Collider, CompoundChild, CompoundShape, HeightField, TriMesh};
pub use collision::Contact;
pub use constraint::{
    AngularMotor, AxisSpring, Constraint, Generic6DofConstraint, HingeConstraint,
    PointConstraint, Spring6DofConstraint,
};
pub use error::PhysicsError;
pub use rigidbody::{ActivationState, BodyKind, RigidBody, compute_inertia, groups};
pub use transform::Transform;
pub use world::{BodyHandle, ConstraintHandle, PhysicsConfig, PhysicsWorld};
