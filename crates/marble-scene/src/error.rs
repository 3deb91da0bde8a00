//! Scene graph errors.

use thiserror::Error;

use crate::NodeId;
use marble_physics::BodyHandle;

/// Errors reported by the scene graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    /// No node carries the requested name.
    #[error("no scene node named {0:?}")]
    NotFound(String),

    /// A node id does not refer to a live node.
    #[error("unknown scene node: {0:?}")]
    UnknownNode(NodeId),

    /// The node is already bound to a body.
    #[error("scene node {node:?} is already bound to {body:?}")]
    AlreadyBound {
        /// Node being bound.
        node: NodeId,
        /// Body it is bound to.
        body: BodyHandle,
    },

    /// Geometry dimensions or data are unusable.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A parent chain has zero or non-finite scale, so world placement cannot be inverted.
    #[error("scene node {0:?} has a degenerate parent scale")]
    DegenerateScale(NodeId),
}
