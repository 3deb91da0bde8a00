//! Kinematic driver.
//!
//! Moves bodies created with [`Motion::Kinematic`](crate::Motion::Kinematic).
//! The world never integrates these bodies, so a transform set here survives
//! the next step unchanged and is flushed onto the node like any other.

use glam::{Quat, Vec3};
use tracing::trace;

use marble_physics::{BodyHandle, Transform};

use crate::{BindError, Simulation};

impl Simulation {
    fn kinematic_transform(&self, body: BodyHandle) -> Result<Transform, BindError> {
        let rb = self
            .world
            .body(body)
            .ok_or(marble_physics::PhysicsError::UnknownBody(body))?;
        if !rb.is_kinematic() {
            return Err(BindError::NotKinematic(body));
        }
        Ok(rb.transform())
    }

    fn drive(&mut self, body: BodyHandle, transform: Transform) -> Result<(), BindError> {
        trace!(body = body.index(), position = %transform.position, "kinematic move");
        self.world.set_transform(body, transform)?;
        Ok(())
    }

    /// Moves a kinematic body by `delta`.
    pub fn translate(&mut self, body: BodyHandle, delta: Vec3) -> Result<(), BindError> {
        let mut t = self.kinematic_transform(body)?;
        t.position += delta;
        self.drive(body, t)
    }

    /// Places a kinematic body at `position`, keeping its orientation.
    pub fn set_position(&mut self, body: BodyHandle, position: Vec3) -> Result<(), BindError> {
        let mut t = self.kinematic_transform(body)?;
        t.position = position;
        self.drive(body, t)
    }

    /// Replaces the orientation of a kinematic body.
    pub fn set_rotation(&mut self, body: BodyHandle, orientation: Quat) -> Result<(), BindError> {
        let mut t = self.kinematic_transform(body)?;
        t.orientation = orientation.normalize();
        self.drive(body, t)
    }

    /// Rotates a kinematic body by `delta`, applied in world space.
    ///
    /// The result is re-normalized so repeated small turns do not drift.
    pub fn rotate(&mut self, body: BodyHandle, delta: Quat) -> Result<(), BindError> {
        let mut t = self.kinematic_transform(body)?;
        t.orientation = (delta * t.orientation).normalize();
        self.drive(body, t)
    }
}
