//! Physics error types.

use thiserror::Error;

use crate::{BodyHandle, ConstraintHandle};

/// Errors reported by the physics world.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// A handle does not refer to a body in this world.
    #[error("unknown body: {0:?}")]
    UnknownBody(BodyHandle),

    /// A handle does not refer to a live constraint.
    #[error("unknown constraint: {0:?}")]
    UnknownConstraint(ConstraintHandle),

    /// Mass is negative or not finite.
    #[error("invalid mass: {0}")]
    InvalidMass(f32),

    /// Triangle meshes, planes and height fields can only back immovable bodies.
    #[error("{0} volumes cannot back a dynamic body")]
    StaticOnlyShape(&'static str),

    /// Inertia computation produced a non-finite or non-positive tensor.
    #[error("degenerate inertia for {shape}: {inertia:?}")]
    DegenerateInertia {
        /// Collider kind.
        shape: &'static str,
        /// Offending diagonal.
        inertia: [f32; 3],
    },

    /// Local scaling must be finite and strictly positive.
    #[error("invalid local scaling: {0:?}")]
    InvalidScale([f32; 3]),

    /// Step size is negative or not finite.
    #[error("invalid time step: {0}")]
    InvalidTimestep(f32),

    /// A mesh has no triangles, or an index is out of range.
    #[error("invalid triangle mesh: {0}")]
    InvalidMesh(String),

    /// Height field dimensions and data disagree.
    #[error("invalid height field: {0}")]
    InvalidHeightField(String),

    /// A spring or limit axis index outside `0..6`.
    #[error("axis index {0} out of range (expected 0..6)")]
    InvalidAxis(usize),

    /// A compound volume needs at least one child.
    #[error("compound volume has no children")]
    EmptyCompound,
}
