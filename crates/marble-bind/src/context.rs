//! The application context.
//!
//! [`Simulation`] owns everything the course needs at run time: the physics
//! world, the scene graph, the body-node bindings, collision rules and the
//! reactions attached to nodes. It is created explicitly at startup and torn
//! down by dropping it.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use marble_physics::{
    BodyHandle, Constraint, ConstraintHandle, PhysicsConfig, PhysicsWorld,
};
use marble_scene::{NodeId, SceneGraph, VisualNode};

use crate::{BindError, CollisionRules, CompoundBuilder, Reactive, ShapeError, ShapeKind};

/// Physics world, scene graph and the bindings between them.
pub struct Simulation {
    pub(crate) world: PhysicsWorld,
    pub(crate) scene: SceneGraph,
    /// Body to node; the node side is recorded on the node itself.
    pub(crate) bindings: BTreeMap<BodyHandle, NodeId>,
    pub(crate) rules: CollisionRules,
    pub(crate) reactions: HashMap<NodeId, Box<dyn Reactive>>,
}

impl Simulation {
    /// Creates an empty simulation.
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            world: PhysicsWorld::new(config),
            scene: SceneGraph::new(),
            bindings: BTreeMap::new(),
            rules: CollisionRules::new(),
            reactions: HashMap::new(),
        }
    }

    /// The physics world.
    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    /// The physics world, mutably.
    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    /// The scene graph.
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// The scene graph, mutably.
    ///
    /// Bound nodes are overwritten by the next [`Simulation::step`].
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// Collision rules.
    pub fn rules(&self) -> &CollisionRules {
        &self.rules
    }

    /// Collision rules, mutably.
    pub fn rules_mut(&mut self) -> &mut CollisionRules {
        &mut self.rules
    }

    /// The node a body is bound to.
    pub fn node_of(&self, body: BodyHandle) -> Option<NodeId> {
        self.bindings.get(&body).copied()
    }

    /// The body a node is bound to.
    pub fn body_of(&self, node: NodeId) -> Option<BodyHandle> {
        self.scene.node(node).and_then(|n| n.body())
    }

    /// All bindings in body order.
    pub fn bindings(&self) -> impl Iterator<Item = (BodyHandle, NodeId)> + '_ {
        self.bindings.iter().map(|(b, n)| (*b, *n))
    }

    /// Adds a visual part under `parent` and the matching volume to `compound`.
    ///
    /// The node's parent-space transform is used as the part's offset from
    /// the compound origin, so the compound must later be given to the body
    /// bound to `parent`.
    pub fn add_visual_part(
        &mut self,
        parent: NodeId,
        compound: &mut CompoundBuilder,
        node: VisualNode,
        kind: ShapeKind,
    ) -> Result<NodeId, BindError> {
        if self.scene.node(parent).is_none() {
            return Err(marble_scene::SceneError::UnknownNode(parent).into());
        }
        let Some(geometry) = node.geometry.as_ref() else {
            return Err(ShapeError::MissingGeometry(node.name).into());
        };
        compound.add_part(node.transform, geometry, kind)?;
        Ok(self.scene.add_child(parent, node)?)
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    /// Adds a constraint between two existing bodies.
    pub fn add_constraint(
        &mut self,
        constraint: impl Into<Constraint>,
        disable_linked_collisions: bool,
    ) -> Result<ConstraintHandle, BindError> {
        Ok(self
            .world
            .add_constraint(constraint, disable_linked_collisions)?)
    }

    /// Gets a constraint for runtime changes (motors, springs, limits).
    pub fn constraint_mut(&mut self, handle: ConstraintHandle) -> Option<&mut Constraint> {
        self.world.constraint_mut(handle)
    }

    /// Removes a constraint.
    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> Result<Constraint, BindError> {
        Ok(self.world.remove_constraint(handle)?)
    }

    // ========================================================================
    // Reactions
    // ========================================================================

    /// Attaches a collision reaction to a node, replacing any previous one.
    pub fn set_reaction(
        &mut self,
        node: NodeId,
        reaction: impl Reactive + 'static,
    ) -> Result<(), BindError> {
        if self.scene.node(node).is_none() {
            return Err(marble_scene::SceneError::UnknownNode(node).into());
        }
        debug!(node = node.index(), "attached collision reaction");
        self.reactions.insert(node, Box::new(reaction));
        Ok(())
    }

    /// Detaches the collision reaction of a node.
    pub fn clear_reaction(&mut self, node: NodeId) -> bool {
        self.reactions.remove(&node).is_some()
    }

    /// True if the node has a collision reaction.
    pub fn has_reaction(&self, node: NodeId) -> bool {
        self.reactions.contains_key(&node)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}
