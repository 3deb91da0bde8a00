//! Scene-physics binding for marble courses.
//!
//! Keeps visual nodes and rigid bodies in step:
//! - `CompoundBuilder` / `collider_for` - collision volumes from authored geometry
//! - `Simulation::create_body` - bodies bound one-to-one to scene nodes
//! - `Simulation::step` - advance the world and mirror body transforms onto nodes
//! - `Simulation::translate` and friends - drive kinematic bodies
//! - `CollisionRules` / `Reactive` - tag-matched collision reactions

pub mod context;
pub mod error;
pub mod factory;
pub mod kinematic;
pub mod rules;
pub mod shapes;
pub mod stepper;

pub use context::Simulation;
pub use error::{BindError, ShapeError};
pub use factory::{BodyDesc, Motion};
pub use rules::{CollisionEvent, CollisionRules, Reactive};
pub use shapes::{CompoundBuilder, ShapeKind, collider_for};
pub use stepper::StepReport;
