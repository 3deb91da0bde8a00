//! Rigid transform (position + orientation).
//!
//! This is the motion record exchanged between bodies and whatever mirrors
//! them: compound child offsets, constraint frames, and visual nodes all use it.

use glam::{Quat, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rigid transform without scale.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform {
    /// Origin in world (or parent) space.
    pub position: Vec3,
    /// Unit orientation quaternion.
    pub orientation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    /// Creates a new transform.
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Creates a transform with only a position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Creates a transform with only an orientation.
    pub fn from_orientation(orientation: Quat) -> Self {
        Self {
            orientation,
            ..Self::IDENTITY
        }
    }

    /// Combines two transforms (self then other), `other` being local to `self`.
    pub fn then(&self, other: &Transform) -> Transform {
        Transform {
            position: self.position + self.orientation * other.position,
            orientation: self.orientation * other.orientation,
        }
    }

    /// Returns the inverse transform.
    pub fn inverse(&self) -> Transform {
        let inv = self.orientation.inverse();
        Transform {
            position: inv * -self.position,
            orientation: inv,
        }
    }

    /// Transforms a point from local space.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.orientation * point
    }

    /// Transforms a point into local space.
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.orientation.inverse() * (point - self.position)
    }

    /// Returns a copy with a re-normalized orientation.
    pub fn normalized(&self) -> Transform {
        Transform {
            position: self.position,
            orientation: self.orientation.normalize(),
        }
    }

    /// True if both parts match within `eps`.
    ///
    /// Quaternions `q` and `-q` describe the same rotation and compare equal.
    pub fn approx_eq(&self, other: &Transform, eps: f32) -> bool {
        self.position.abs_diff_eq(other.position, eps)
            && (1.0 - self.orientation.dot(other.orientation).abs()) <= eps
    }

    /// True if both parts are finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}
