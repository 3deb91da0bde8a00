//! Simulation stepper.

use tracing::{debug, trace, warn};

use marble_scene::NodeId;

use crate::{BindError, CollisionEvent, Simulation};

/// What one call to [`Simulation::step`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Fixed sub-steps the world ran.
    pub substeps: u32,
    /// Nodes whose transform was refreshed from their body.
    pub flushed: usize,
    /// Body pairs in contact after the step.
    pub contacts: usize,
    /// Reactions invoked.
    pub reactions: usize,
}

impl Simulation {
    /// Advances the world by `dt` seconds, mirrors bodies onto nodes, then
    /// runs collision reactions.
    ///
    /// Every awake bound body's transform is written verbatim onto its node.
    /// Sleeping bodies keep their last flushed transform. If the world refuses
    /// to step, the error is returned and no node is touched. A node that can
    /// no longer be placed is skipped and left where it was.
    pub fn step(&mut self, dt: f32) -> Result<StepReport, BindError> {
        let substeps = self.world.step(dt)?;
        let flushed = self.flush_transforms();
        let events = self.collision_events();
        let contacts = self.world.contact_pairs().count();

        let mut reactions = 0;
        for event in &events {
            if let Some(reaction) = self.reactions.get_mut(&event.node) {
                debug!(
                    node = event.node.index(),
                    tag = %event.tag,
                    other = %event.other_tag,
                    "collision reaction"
                );
                reaction.on_collision(event, &mut self.world);
                reactions += 1;
            }
        }

        trace!(dt, substeps, flushed, contacts, reactions, "simulation step");
        Ok(StepReport {
            substeps,
            flushed,
            contacts,
            reactions,
        })
    }

    /// Copies every awake bound body's transform onto its node.
    ///
    /// Returns the number of nodes refreshed. Nodes whose parent scale has
    /// collapsed are skipped with a warning.
    pub fn flush_transforms(&mut self) -> usize {
        let mut flushed = 0;
        for (&handle, &node) in &self.bindings {
            let Some(body) = self.world.body(handle) else {
                continue;
            };
            if !body.is_awake() || self.scene.node(node).is_none() {
                continue;
            }
            match self.scene.set_world_transform(node, body.transform()) {
                Ok(()) => flushed += 1,
                Err(err) => warn!(
                    node = node.index(),
                    body = handle.index(),
                    %err,
                    "node not refreshed"
                ),
            }
        }
        flushed
    }

    /// Events for every reported contact whose node tags match a rule.
    fn collision_events(&self) -> Vec<CollisionEvent> {
        let mut events = Vec::new();
        for contact in self.world.contact_pairs() {
            let (Some(node_a), Some(node_b)) = (
                self.node_of(contact.body_a),
                self.node_of(contact.body_b),
            ) else {
                continue;
            };
            let (Some(tag_a), Some(tag_b)) = (self.tag_of(node_a), self.tag_of(node_b)) else {
                continue;
            };
            if !self.rules.matches(&tag_a, &tag_b) {
                continue;
            }
            events.push(CollisionEvent {
                node: node_a,
                body: contact.body_a,
                tag: tag_a.clone(),
                other: node_b,
                other_body: contact.body_b,
                other_tag: tag_b.clone(),
                point: contact.point,
                normal: contact.normal,
                depth: contact.depth,
            });
            events.push(CollisionEvent {
                node: node_b,
                body: contact.body_b,
                tag: tag_b,
                other: node_a,
                other_body: contact.body_a,
                other_tag: tag_a,
                point: contact.point,
                normal: -contact.normal,
                depth: contact.depth,
            });
        }
        events
    }

    fn tag_of(&self, node: NodeId) -> Option<marble_scene::Tag> {
        self.scene.node(node).and_then(|n| n.tag.clone())
    }
}
