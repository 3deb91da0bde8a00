//! Tag-matched collision reactions.
//!
//! Rules pair two gameplay tags. After each step every touching body pair
//! whose nodes carry a ruled pair of tags produces one [`CollisionEvent`] per
//! node, delivered to that node's [`Reactive`] if it has one.

use std::collections::BTreeSet;

use glam::Vec3;
use marble_physics::{BodyHandle, PhysicsWorld};
use marble_scene::{NodeId, Tag};

/// A contact seen from one of the two nodes involved.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    /// The node receiving the event.
    pub node: NodeId,
    /// Its body.
    pub body: BodyHandle,
    /// Its tag.
    pub tag: Tag,
    /// The node it touched.
    pub other: NodeId,
    /// The other node's body.
    pub other_body: BodyHandle,
    /// The other node's tag.
    pub other_tag: Tag,
    /// Deepest contact point, world space.
    pub point: Vec3,
    /// Contact normal pointing from the other body toward this one.
    pub normal: Vec3,
    /// Penetration depth.
    pub depth: f32,
}

/// Something that reacts when its node collides under a rule.
pub trait Reactive {
    /// Called once per step while the rule's contact persists.
    fn on_collision(&mut self, event: &CollisionEvent, world: &mut PhysicsWorld);
}

impl<F> Reactive for F
where
    F: FnMut(&CollisionEvent, &mut PhysicsWorld),
{
    fn on_collision(&mut self, event: &CollisionEvent, world: &mut PhysicsWorld) {
        self(event, world)
    }
}

/// Unordered pairs of tags whose contacts trigger reactions.
#[derive(Debug, Clone, Default)]
pub struct CollisionRules {
    pairs: BTreeSet<(Tag, Tag)>,
}

impl CollisionRules {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: Tag, b: Tag) -> (Tag, Tag) {
        if a <= b { (a, b) } else { (b, a) }
    }

    /// Adds a rule; the order of the tags does not matter.
    pub fn add(&mut self, a: impl Into<Tag>, b: impl Into<Tag>) -> &mut Self {
        self.pairs.insert(Self::key(a.into(), b.into()));
        self
    }

    /// Builder form of [`CollisionRules::add`].
    pub fn with_rule(mut self, a: impl Into<Tag>, b: impl Into<Tag>) -> Self {
        self.add(a, b);
        self
    }

    /// Removes a rule, returning whether it existed.
    pub fn remove(&mut self, a: impl Into<Tag>, b: impl Into<Tag>) -> bool {
        self.pairs.remove(&Self::key(a.into(), b.into()))
    }

    /// True if contacts between the two tags are ruled.
    pub fn matches(&self, a: &Tag, b: &Tag) -> bool {
        let key = if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        self.pairs.contains(&key)
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates over the rules.
    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &Tag)> {
        self.pairs.iter().map(|(a, b)| (a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_are_unordered() {
        let rules = CollisionRules::new()
            .with_rule("target", "cannonBall")
            .with_rule("ball", "ball");
        assert!(rules.matches(&Tag::new("cannonBall"), &Tag::new("target")));
        assert!(rules.matches(&Tag::new("target"), &Tag::new("cannonBall")));
        assert!(rules.matches(&Tag::new("ball"), &Tag::new("ball")));
        assert!(!rules.matches(&Tag::new("ball"), &Tag::new("target")));
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_duplicate_rules_collapse() {
        let mut rules = CollisionRules::new();
        rules.add("golfClub", "ball").add("ball", "golfClub");
        assert_eq!(rules.len(), 1);
        assert!(rules.remove("golfClub", "ball"));
        assert!(rules.is_empty());
    }

    #[test]
    fn test_closures_are_reactive() {
        let mut hits = 0;
        let mut reaction = |_: &CollisionEvent, _: &mut PhysicsWorld| hits += 1;
        let event = CollisionEvent {
            node: NodeId(0),
            body: PhysicsWorld::default().add_body(marble_physics::RigidBody::new_static(
                Vec3::ZERO,
                marble_physics::Collider::sphere(1.0),
            )),
            tag: Tag::new("a"),
            other: NodeId(1),
            other_body: PhysicsWorld::default().add_body(marble_physics::RigidBody::new_static(
                Vec3::ZERO,
                marble_physics::Collider::sphere(1.0),
            )),
            other_tag: Tag::new("b"),
            point: Vec3::ZERO,
            normal: Vec3::Y,
            depth: 0.0,
        };
        let mut world = PhysicsWorld::default();
        reaction.on_collision(&event, &mut world);
        reaction.on_collision(&event, &mut world);
        assert_eq!(hits, 2);
    }
}
