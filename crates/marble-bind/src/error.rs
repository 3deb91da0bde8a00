//! Binding layer errors.

use thiserror::Error;

use marble_physics::{BodyHandle, PhysicsError};
use marble_scene::SceneError;

use crate::Motion;

/// Configuration errors raised while building collision volumes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    /// A shape kind string names no known kind.
    #[error("unknown shape kind {0:?}")]
    UnknownKind(String),

    /// A compound was built without parts.
    #[error("compound has no parts")]
    EmptyCompound,

    /// A visual part was added without geometry to derive its volume from.
    #[error("node {0:?} has no geometry")]
    MissingGeometry(String),

    /// The authored geometry is unusable.
    #[error(transparent)]
    Geometry(#[from] SceneError),

    /// The physics engine rejected the volume.
    #[error(transparent)]
    Physics(#[from] PhysicsError),
}

/// Errors reported by the simulation context.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    /// The physics world rejected an operation.
    #[error(transparent)]
    Physics(#[from] PhysicsError),

    /// The scene graph rejected an operation.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// A collision volume could not be built.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Mass and motion disagree: dynamic bodies need mass, static and kinematic ones none.
    #[error("{motion:?} body cannot have mass {mass}")]
    MassMismatch {
        /// Requested motion.
        motion: Motion,
        /// Requested mass.
        mass: f32,
    },

    /// Only bodies created as kinematic may be moved by application code.
    #[error("{0:?} is not kinematic")]
    NotKinematic(BodyHandle),
}
