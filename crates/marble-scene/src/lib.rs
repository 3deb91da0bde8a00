//! Scene graph for marble courses.
//!
//! The visual side of the course: named nodes with tags, parenting,
//! position/orientation/scale, and authored geometry that physics volumes are
//! derived from.
//!
//! - `SceneGraph` - node storage, parenting and named lookup
//! - `VisualNode` - one renderable node, optionally bound to a rigid body
//! - `Geometry` - authored surface description with bounds and triangulation

pub mod error;
pub mod geometry;
pub mod graph;

pub use error::SceneError;
pub use geometry::{Geometry, MeshData};
pub use graph::{NodeId, SceneGraph, Tag, VisualNode};
