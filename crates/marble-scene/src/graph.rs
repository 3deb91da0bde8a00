//! Scene nodes, parenting, and named lookup.

use std::fmt;

use glam::{Quat, Vec3};
use marble_physics::{BodyHandle, Transform};

use crate::{Geometry, SceneError};

/// A scene node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Creates a new node ID.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Gameplay identity of a node, matched by collision rules.
///
/// Independent of the display name, so renaming a node never changes which
/// rules apply to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    /// Creates a tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The tag text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// A node in the scene graph.
#[derive(Debug, Clone)]
pub struct VisualNode {
    /// Display name, used for lookup.
    pub name: String,
    /// Gameplay identity.
    pub tag: Option<Tag>,
    /// Placement in parent space.
    pub transform: Transform,
    /// Scale in parent space.
    pub scale: Vec3,
    /// Authored surface, if the node draws anything.
    pub geometry: Option<Geometry>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    body: Option<BodyHandle>,
}

impl Default for VisualNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            tag: None,
            transform: Transform::IDENTITY,
            scale: Vec3::ONE,
            geometry: None,
            parent: None,
            children: Vec::new(),
            body: None,
        }
    }
}

impl VisualNode {
    /// Creates an empty node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the gameplay tag.
    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the parent-space placement.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Sets the parent-space position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    /// Sets the parent-space orientation.
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.transform.orientation = orientation;
        self
    }

    /// Sets the scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the authored geometry.
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Parent node, if any.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The body this node mirrors, if bound.
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }
}

/// A hierarchy of visual nodes.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<Option<VisualNode>>,
}

impl SceneGraph {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root node.
    pub fn add(&mut self, mut node: VisualNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = None;
        node.children.clear();
        node.body = None;
        self.nodes.push(Some(node));
        id
    }

    /// Adds a node under `parent`.
    pub fn add_child(&mut self, parent: NodeId, node: VisualNode) -> Result<NodeId, SceneError> {
        self.get(parent)?;
        let id = self.add(node);
        if let Some(child) = self.nodes[id.index()].as_mut() {
            child.parent = Some(parent);
        }
        self.get_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Removes a node and its whole subtree.
    ///
    /// Returns the removed nodes, the requested one first, so callers can
    /// release any bodies they were bound to.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<(NodeId, VisualNode)>, SceneError> {
        let parent = self.get(id)?.parent;
        if let Some(parent) = parent {
            self.get_mut(parent)?.children.retain(|c| *c != id);
        }

        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(next.index()).and_then(Option::take) {
                stack.extend(node.children.iter().rev());
                removed.push((next, node));
            }
        }
        Ok(removed)
    }

    /// Gets a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&VisualNode> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Gets a mutable node by ID.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut VisualNode> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn get(&self, id: NodeId) -> Result<&VisualNode, SceneError> {
        self.node(id).ok_or(SceneError::UnknownNode(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut VisualNode, SceneError> {
        self.node_mut(id).ok_or(SceneError::UnknownNode(id))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// True if the scene has no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all live nodes.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &VisualNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i as u32), n)))
    }

    /// Nodes without a parent.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| id)
    }

    /// Finds the first node with the given name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.iter().find(|(_, n)| n.name == name).map(|(id, _)| id)
    }

    /// Finds a node by name, reporting absence as an error.
    pub fn lookup(&self, name: &str) -> Result<NodeId, SceneError> {
        self.find(name)
            .ok_or_else(|| SceneError::NotFound(name.to_string()))
    }

    /// All nodes carrying `tag`.
    pub fn tagged<'a>(&'a self, tag: &'a Tag) -> impl Iterator<Item = NodeId> + 'a {
        self.iter()
            .filter(move |(_, n)| n.tag.as_ref() == Some(tag))
            .map(|(id, _)| id)
    }

    // ========================================================================
    // Body binding
    // ========================================================================

    /// Records that `id` mirrors `body`. A node mirrors at most one body.
    pub fn bind_body(&mut self, id: NodeId, body: BodyHandle) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        if let Some(existing) = node.body {
            return Err(SceneError::AlreadyBound {
                node: id,
                body: existing,
            });
        }
        node.body = Some(body);
        Ok(())
    }

    /// Clears the body binding of a node.
    pub fn unbind_body(&mut self, id: NodeId) -> Result<Option<BodyHandle>, SceneError> {
        Ok(self.get_mut(id)?.body.take())
    }

    // ========================================================================
    // World placement
    // ========================================================================

    /// Accumulated scale from the root down to `id`.
    ///
    /// Scales multiply per axis and parent rotation is not taken into account.
    /// This is exact for uniform scales and for non-uniform scales whose axes
    /// line up with their children's; a non-uniform parent under a rotation
    /// gives an axis-aligned approximation of the true sheared scale.
    pub fn world_scale(&self, id: NodeId) -> Result<Vec3, SceneError> {
        let node = self.get(id)?;
        match node.parent {
            Some(parent) => Ok(self.world_scale(parent)? * node.scale),
            None => Ok(node.scale),
        }
    }

    /// World-space placement of a node.
    ///
    /// Parent scale stretches child offsets along the parent's local axes.
    pub fn world_transform(&self, id: NodeId) -> Result<Transform, SceneError> {
        let node = self.get(id)?;
        let Some(parent) = node.parent else {
            return Ok(node.transform);
        };
        let parent_world = self.world_transform(parent)?;
        let parent_scale = self.world_scale(parent)?;
        Ok(Transform {
            position: parent_world.transform_point(parent_scale * node.transform.position),
            orientation: parent_world.orientation * node.transform.orientation,
        })
    }

    /// Parent-space transform that would put `id` at `world`.
    ///
    /// Fails with [`SceneError::DegenerateScale`] when the parent's world scale
    /// cannot be inverted. The orientation is re-normalized.
    pub fn local_transform_for(&self, id: NodeId, world: Transform) -> Result<Transform, SceneError> {
        let Some(parent) = self.get(id)?.parent else {
            return Ok(world.normalized());
        };
        let parent_world = self.world_transform(parent)?;
        let parent_scale = self.world_scale(parent)?;
        if !parent_scale.is_finite() || parent_scale.abs().min_element() <= f32::EPSILON {
            return Err(SceneError::DegenerateScale(id));
        }
        Ok(Transform {
            position: parent_world.inverse_transform_point(world.position) / parent_scale,
            orientation: (parent_world.orientation.inverse() * world.orientation).normalize(),
        })
    }

    /// Places a node so that its world transform equals `world`.
    ///
    /// The node's parent-space transform is solved for with
    /// [`SceneGraph::local_transform_for`].
    pub fn set_world_transform(&mut self, id: NodeId, world: Transform) -> Result<(), SceneError> {
        let local = self.local_transform_for(id, world)?;
        self.get_mut(id)?.transform = local;
        Ok(())
    }
}
