//! Rigid body factory.

use glam::Vec3;
use tracing::debug;

use marble_physics::{ActivationState, BodyHandle, Collider, RigidBody, groups};
use marble_scene::NodeId;

use crate::{BindError, Simulation};

/// How a body moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Moved by gravity, contacts and constraints. Needs mass.
    Dynamic,
    /// Never moves. Mass 0.
    Static,
    /// Mass 0, moved only through the kinematic driver.
    Kinematic,
}

/// Physical parameters for a new body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    /// Bounciness.
    pub restitution: f32,
    /// Friction coefficient.
    pub friction: f32,
    /// Initial world position.
    pub position: Vec3,
    /// Mass; 0 for static and kinematic bodies.
    pub mass: f32,
    /// Bake the node's scale into the volume.
    pub apply_local_scaling: bool,
    /// Motion kind.
    pub motion: Motion,
    /// Activation override, e.g. [`ActivationState::AlwaysActive`] for anchors.
    pub activation: Option<ActivationState>,
    /// Collision group bits.
    pub group: u32,
    /// Groups this body collides with.
    pub mask: u32,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            restitution: 0.7,
            friction: 0.8,
            position: Vec3::ZERO,
            mass: 1.0,
            apply_local_scaling: true,
            motion: Motion::Dynamic,
            activation: None,
            group: 1,
            mask: groups::ALL,
        }
    }
}

impl BodyDesc {
    /// A body whose kind follows its mass: dynamic above zero, static at zero.
    pub fn with_mass(mass: f32) -> Self {
        Self {
            mass,
            motion: if mass > 0.0 {
                Motion::Dynamic
            } else {
                Motion::Static
            },
            ..Default::default()
        }
    }

    /// An immovable body.
    pub fn fixed() -> Self {
        Self::with_mass(0.0)
    }

    /// A zero-mass body moved by application code.
    pub fn kinematic() -> Self {
        Self {
            mass: 0.0,
            motion: Motion::Kinematic,
            ..Default::default()
        }
    }

    /// Sets the initial position.
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets restitution and friction.
    pub fn with_material(mut self, restitution: f32, friction: f32) -> Self {
        self.restitution = restitution;
        self.friction = friction;
        self
    }

    /// Sets collision group and mask.
    pub fn with_collision_filter(mut self, group: u32, mask: u32) -> Self {
        self.group = group;
        self.mask = mask;
        self
    }

    /// Overrides the activation state.
    pub fn with_activation(mut self, activation: ActivationState) -> Self {
        self.activation = Some(activation);
        self
    }

    /// Enables or disables baking node scale into the volume.
    pub fn with_local_scaling(mut self, apply: bool) -> Self {
        self.apply_local_scaling = apply;
        self
    }

    fn check_mass(&self) -> Result<(), BindError> {
        let consistent = match self.motion {
            Motion::Dynamic => self.mass > 0.0,
            Motion::Static | Motion::Kinematic => self.mass == 0.0,
        };
        if consistent {
            Ok(())
        } else {
            Err(BindError::MassMismatch {
                motion: self.motion,
                mass: self.mass,
            })
        }
    }
}

impl Simulation {
    /// Creates a body for `node` and binds the two one-to-one.
    ///
    /// The body takes the node's world orientation and `desc.position`; the
    /// node's world scale is baked into the volume if requested. Afterwards the
    /// node sits exactly where the body does. Nothing is registered on error.
    pub fn create_body(
        &mut self,
        volume: Collider,
        node: NodeId,
        desc: &BodyDesc,
    ) -> Result<BodyHandle, BindError> {
        desc.check_mass()?;
        let placed = self.scene.world_transform(node)?;
        if let Some(existing) = self.scene.node(node).and_then(|n| n.body()) {
            return Err(marble_scene::SceneError::AlreadyBound {
                node,
                body: existing,
            }
            .into());
        }

        let volume = if desc.apply_local_scaling {
            volume.scaled(self.scene.world_scale(node)?)?
        } else {
            volume
        };

        let mut body = RigidBody::with_orientation(
            desc.position,
            placed.orientation.normalize(),
            volume,
            desc.mass,
        )?
        .with_restitution(desc.restitution)
        .with_friction(desc.friction)
        .with_collision_filter(desc.group, desc.mask);
        if desc.motion == Motion::Kinematic {
            body = body.into_kinematic()?;
        }
        if let Some(activation) = desc.activation {
            body = body.with_activation(activation);
        }
        let local = self.scene.local_transform_for(node, body.transform())?;

        let handle = self.world.add_body(body);
        self.scene.bind_body(node, handle)?;
        self.bindings.insert(handle, node);
        if let Some(n) = self.scene.node_mut(node) {
            n.transform = local;
        }

        debug!(
            body = handle.index(),
            node = node.index(),
            motion = ?desc.motion,
            "bound body to node"
        );
        Ok(handle)
    }
}
