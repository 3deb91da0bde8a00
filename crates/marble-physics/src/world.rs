//! Physics simulation world.
//!
//! Contains the `PhysicsWorld` container that drives rigid body simulation
//! including force integration, collision detection, contact and constraint
//! solving, sleeping, and contact reporting.

use std::collections::{BTreeMap, HashMap};

use glam::{Quat, Vec3};
use tracing::{debug, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::collision::{self, Leaf};
use crate::constraint::{clamp_axes, relative_euler};
use crate::{
    ActivationState, Aabb, Constraint, Contact, Generic6DofConstraint, HingeConstraint,
    PhysicsError, PointConstraint, RigidBody, Spring6DofConstraint, Transform,
};

/// Opaque handle to a body in a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub(crate) u32);

impl BodyHandle {
    /// Dense index of the body, usable as a key into side tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Opaque handle to a constraint in a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintHandle(pub(crate) u32);

/// Configuration for physics simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PhysicsConfig {
    /// Gravity acceleration.
    pub gravity: Vec3,
    /// Length of one solver sub-step in seconds.
    pub fixed_timestep: f32,
    /// Most sub-steps run per call to [`PhysicsWorld::step`]; extra time is dropped.
    pub max_substeps: u32,
    /// Number of velocity and position solver iterations per sub-step.
    pub solver_iterations: u32,
    /// Linear speed under which a body counts as resting.
    pub linear_sleep_threshold: f32,
    /// Angular speed under which a body counts as resting.
    pub angular_sleep_threshold: f32,
    /// Seconds a body must rest before it falls asleep.
    pub sleep_time: f32,
    /// Impact speed under which contacts do not bounce.
    pub restitution_threshold: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 10,
            solver_iterations: 10,
            linear_sleep_threshold: 0.8,
            angular_sleep_threshold: 1.0,
            sleep_time: 2.0,
            restitution_threshold: 0.5,
        }
    }
}

/// A registered constraint.
#[derive(Clone, Debug)]
struct ConstraintSlot {
    constraint: Constraint,
    disables_collisions: bool,
}

/// Precomputed contact row for the velocity solver.
struct ContactRow {
    a: usize,
    b: usize,
    normal: Vec3,
    r_a: Vec3,
    r_b: Vec3,
    normal_mass: f32,
    target_velocity: f32,
    friction: f32,
    tangents: [Vec3; 2],
    tangent_mass: [f32; 2],
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
}

// Contact positional correction.
const SLOP: f32 = 0.01;
const PERCENT: f32 = 0.8;

/// The physics simulation world.
pub struct PhysicsWorld {
    bodies: Vec<RigidBody>,
    constraints: Vec<Option<ConstraintSlot>>,
    /// Body pairs whose collisions are disabled, with the number of constraints asking for it.
    excluded_pairs: HashMap<(BodyHandle, BodyHandle), u32>,
    /// Deepest contact per pair seen during the last [`PhysicsWorld::step`].
    frame_contacts: BTreeMap<(BodyHandle, BodyHandle), Contact>,
    accumulator: f32,
    /// Wall time since kinematic bodies last had `previous` refreshed.
    kinematic_elapsed: f32,
    /// Configuration.
    pub config: PhysicsConfig,
}

impl PhysicsWorld {
    /// Create a new physics world.
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            bodies: Vec::new(),
            constraints: Vec::new(),
            excluded_pairs: HashMap::new(),
            frame_contacts: BTreeMap::new(),
            accumulator: 0.0,
            kinematic_elapsed: 0.0,
            config,
        }
    }

    // ========================================================================
    // Bodies
    // ========================================================================

    /// Add a rigid body and return its handle.
    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        debug!(
            body = handle.0,
            kind = ?body.kind(),
            collider = body.collider.kind_name(),
            mass = body.mass,
            "added body"
        );
        self.bodies.push(body);
        handle
    }

    /// Get a body by handle.
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.index())
    }

    /// Get a mutable body by handle.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle.index())
    }

    /// Iterate over all bodies.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies
            .iter()
            .enumerate()
            .map(|(i, b)| (BodyHandle(i as u32), b))
    }

    /// Number of bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn get(&self, handle: BodyHandle) -> Result<&RigidBody, PhysicsError> {
        self.body(handle).ok_or(PhysicsError::UnknownBody(handle))
    }

    fn get_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        self.body_mut(handle).ok_or(PhysicsError::UnknownBody(handle))
    }

    /// Current motion record of a body.
    pub fn transform(&self, handle: BodyHandle) -> Result<Transform, PhysicsError> {
        Ok(self.get(handle)?.transform())
    }

    /// Place a body and wake it.
    ///
    /// For kinematic bodies the move since the previous step becomes the
    /// velocity they push other bodies with.
    pub fn set_transform(
        &mut self,
        handle: BodyHandle,
        transform: Transform,
    ) -> Result<(), PhysicsError> {
        let body = self.get_mut(handle)?;
        body.position = transform.position;
        body.orientation = transform.orientation.normalize();
        if !body.is_kinematic() {
            body.previous = body.transform();
        }
        body.activate();
        Ok(())
    }

    /// Wake a sleeping body.
    pub fn activate(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        self.get_mut(handle)?.activate();
        Ok(())
    }

    /// Change the activation state of a body.
    pub fn set_activation(
        &mut self,
        handle: BodyHandle,
        activation: ActivationState,
    ) -> Result<(), PhysicsError> {
        self.get_mut(handle)?.set_activation(activation);
        Ok(())
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    /// Add a constraint.
    ///
    /// Both bodies must already exist. With `disable_linked_collisions` the two
    /// bodies stop colliding with each other while the constraint exists.
    pub fn add_constraint(
        &mut self,
        constraint: impl Into<Constraint>,
        disable_linked_collisions: bool,
    ) -> Result<ConstraintHandle, PhysicsError> {
        let mut constraint = constraint.into();
        let (a, b) = constraint.bodies();
        let body_a = self.get(a)?;
        let body_b = self.get(b)?;
        constraint.capture_reference(body_a, body_b);

        if disable_linked_collisions {
            *self.excluded_pairs.entry(pair_key(a, b)).or_insert(0) += 1;
        }

        let handle = ConstraintHandle(self.constraints.len() as u32);
        debug!(
            constraint = handle.0,
            kind = constraint.kind_name(),
            body_a = a.0,
            body_b = b.0,
            disable_linked_collisions,
            "added constraint"
        );
        self.constraints.push(Some(ConstraintSlot {
            constraint,
            disables_collisions: disable_linked_collisions,
        }));
        Ok(handle)
    }

    /// Get a constraint by handle.
    pub fn constraint(&self, handle: ConstraintHandle) -> Option<&Constraint> {
        self.constraints
            .get(handle.0 as usize)
            .and_then(|slot| slot.as_ref())
            .map(|slot| &slot.constraint)
    }

    /// Get a mutable constraint by handle.
    pub fn constraint_mut(&mut self, handle: ConstraintHandle) -> Option<&mut Constraint> {
        self.constraints
            .get_mut(handle.0 as usize)
            .and_then(|slot| slot.as_mut())
            .map(|slot| &mut slot.constraint)
    }

    /// Remove a constraint, re-enabling collisions between its bodies.
    pub fn remove_constraint(
        &mut self,
        handle: ConstraintHandle,
    ) -> Result<Constraint, PhysicsError> {
        let slot = self
            .constraints
            .get_mut(handle.0 as usize)
            .and_then(Option::take)
            .ok_or(PhysicsError::UnknownConstraint(handle))?;
        if slot.disables_collisions {
            let (a, b) = slot.constraint.bodies();
            let key = pair_key(a, b);
            if let Some(count) = self.excluded_pairs.get_mut(&key) {
                *count -= 1;
                if *count == 0 {
                    self.excluded_pairs.remove(&key);
                }
            }
        }
        debug!(constraint = handle.0, "removed constraint");
        Ok(slot.constraint)
    }

    /// Number of live constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.iter().flatten().count()
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Advance the simulation by `dt` seconds of wall time.
    ///
    /// Time accumulates and is consumed in fixed sub-steps of
    /// `config.fixed_timestep`, at most `config.max_substeps` per call.
    /// Returns the number of sub-steps run.
    pub fn step(&mut self, dt: f32) -> Result<u32, PhysicsError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(PhysicsError::InvalidTimestep(dt));
        }
        let h = self.config.fixed_timestep;
        if !h.is_finite() || h <= 0.0 {
            return Err(PhysicsError::InvalidTimestep(h));
        }

        self.frame_contacts.clear();
        self.accumulator += dt;
        self.kinematic_elapsed += dt;
        // Tolerate rounding so that dt == h always yields one sub-step.
        let due = (self.accumulator / h + 1e-3).floor() as u32;
        self.accumulator = (self.accumulator - due as f32 * h).max(0.0);
        let run = due.min(self.config.max_substeps);
        if due > run {
            warn!(due, run, "dropping simulation time beyond max sub-steps");
        }
        if run == 0 {
            return Ok(0);
        }

        // Kinematic moves made during frames without a sub-step are spread over
        // all the wall time since the last refresh.
        let elapsed = if self.kinematic_elapsed > 0.0 {
            self.kinematic_elapsed
        } else {
            run as f32 * h
        };
        self.kinematic_elapsed = 0.0;
        self.derive_kinematic_velocities(elapsed);
        for _ in 0..run {
            self.single_step(h);
        }
        for body in self.bodies.iter_mut().filter(|b| b.is_kinematic()) {
            body.previous = body.transform();
        }

        trace!(dt, substeps = run, contacts = self.frame_contacts.len(), "stepped world");
        Ok(run)
    }

    /// Run one solver pass of length `dt`.
    pub fn single_step(&mut self, dt: f32) {
        self.apply_forces();
        self.integrate_velocities(dt);

        let contacts = self.detect_collisions();
        self.wake_touched(&contacts);
        self.record_contacts(&contacts);
        self.solve_velocities(&contacts);

        let before: Vec<Vec3> = self.bodies.iter().map(|b| b.position).collect();
        self.integrate_positions(dt);
        self.solve_constraint_positions(dt);
        self.correct_contacts(&contacts, &before);

        self.update_sleeping(dt);
    }

    /// Body pairs that touched during the last [`PhysicsWorld::step`].
    ///
    /// Pairs are unique and ordered; each entry is the deepest contact seen
    /// across the sub-steps, with `body_a < body_b`.
    pub fn contact_pairs(&self) -> impl Iterator<Item = &Contact> {
        self.frame_contacts.values()
    }

    /// Kinematic velocities from the externally set motion since the last step.
    fn derive_kinematic_velocities(&mut self, elapsed: f32) {
        for body in self.bodies.iter_mut().filter(|b| b.is_kinematic()) {
            body.velocity = (body.position - body.previous.position) / elapsed;
            if body.orientation == body.previous.orientation {
                body.angular_velocity = Vec3::ZERO;
                continue;
            }
            let mut dq = body.orientation * body.previous.orientation.inverse();
            if dq.w < 0.0 {
                dq = -dq;
            }
            let (axis, angle) = dq.to_axis_angle();
            body.angular_velocity = if angle > 1e-6 {
                axis * (angle / elapsed)
            } else {
                Vec3::ZERO
            };
        }
    }

    /// Apply gravity and 6-DoF spring forces.
    fn apply_forces(&mut self) {
        let gravity = self.config.gravity;
        for body in &mut self.bodies {
            if body.is_dynamic() && body.is_awake() {
                body.apply_force(gravity * body.mass);
            }
        }
        self.apply_spring_forces();
    }

    fn apply_spring_forces(&mut self) {
        for slot in self.constraints.iter().flatten() {
            let Constraint::Spring6Dof(spring) = &slot.constraint else {
                continue;
            };
            if !spring.springs().iter().any(|s| s.enabled) {
                continue;
            }
            let (ia, ib) = (spring.dof.body_a.index(), spring.dof.body_b.index());
            let Some((a, b)) = pair_mut(&mut self.bodies, ia, ib) else {
                continue;
            };
            apply_spring(spring, a, b);
        }
    }

    /// Integrate velocities from accumulated forces.
    fn integrate_velocities(&mut self, dt: f32) {
        for body in &mut self.bodies {
            if body.is_dynamic() && body.is_awake() {
                body.velocity += body.force * body.inv_mass * dt;
                body.velocity *= (1.0 - body.linear_damping * dt).max(0.0);

                let angular = body.world_inv_inertia(body.torque);
                body.angular_velocity += angular * dt;
                body.angular_velocity *= (1.0 - body.angular_damping * dt).max(0.0);
            }
            body.clear_forces();
        }
    }

    /// Integrate positions from velocities.
    fn integrate_positions(&mut self, dt: f32) {
        for body in &mut self.bodies {
            if body.is_dynamic() && body.is_awake() {
                body.position += body.velocity * dt;
                body.orientation = integrate_rotation(body.orientation, body.angular_velocity * dt);
            }
        }
    }

    /// Fall asleep after resting long enough.
    fn update_sleeping(&mut self, dt: f32) {
        let (linear, angular, sleep_time) = (
            self.config.linear_sleep_threshold,
            self.config.angular_sleep_threshold,
            self.config.sleep_time,
        );
        for body in &mut self.bodies {
            if !body.is_dynamic() || body.activation != ActivationState::Active {
                continue;
            }
            if body.is_moving(linear, angular) {
                body.sleep_timer = 0.0;
                continue;
            }
            body.sleep_timer += dt;
            if body.sleep_timer >= sleep_time {
                body.activation = ActivationState::Sleeping;
                body.velocity = Vec3::ZERO;
                body.angular_velocity = Vec3::ZERO;
            }
        }
    }

    /// Wake sleeping bodies touched by, or linked to, an active body.
    ///
    /// A kinematic body that has moved wakes what it touches and keeps it from
    /// dozing off while it rides along. An awake dynamic body wakes its
    /// neighbours at any speed and hands them its own rest time, so bodies
    /// resting together fall asleep in the same sub-step.
    fn wake_touched(&mut self, contacts: &[Contact]) {
        let links = self
            .constraints
            .iter()
            .flatten()
            .map(|slot| slot.constraint.bodies());
        let pairs: Vec<(usize, usize)> = contacts
            .iter()
            .map(|c| (c.body_a, c.body_b))
            .chain(links)
            .map(|(a, b)| (a.index(), b.index()))
            .collect();

        for (a, b) in pairs {
            for (target, other) in [(a, b), (b, a)] {
                let rest = {
                    let t = &self.bodies[target];
                    let o = &self.bodies[other];
                    if !t.is_dynamic() {
                        None
                    } else if o.is_kinematic() {
                        let moved = o.velocity != Vec3::ZERO || o.angular_velocity != Vec3::ZERO;
                        moved.then_some(0.0)
                    } else if !t.is_awake() && o.is_dynamic() && o.is_awake() {
                        Some(o.sleep_timer)
                    } else {
                        None
                    }
                };
                if let Some(rest) = rest {
                    let body = &mut self.bodies[target];
                    body.activate();
                    body.sleep_timer = rest;
                }
            }
        }
    }

    // ========================================================================
    // Collision detection
    // ========================================================================

    /// Detect all collisions between bodies.
    pub(crate) fn detect_collisions(&self) -> Vec<Contact> {
        let mut leaves: Vec<Vec<Leaf<'_>>> = Vec::with_capacity(self.bodies.len());
        let mut bounds: Vec<Option<Aabb>> = Vec::with_capacity(self.bodies.len());
        for (handle, body) in self.bodies() {
            let mut out = Vec::new();
            collision::expand_leaves(handle, body.transform(), &body.collider, &mut out);
            let aabb = out.iter().try_fold(None, |acc: Option<Aabb>, leaf| {
                let leaf_aabb = leaf.aabb?;
                Some(Some(acc.map_or(leaf_aabb, |a| a.merge(&leaf_aabb))))
            });
            bounds.push(aabb.flatten());
            leaves.push(out);
        }

        let mut contacts = Vec::new();
        for i in 0..self.bodies.len() {
            for j in (i + 1)..self.bodies.len() {
                if !self.should_test(i, j) {
                    continue;
                }
                if let (Some(a), Some(b)) = (&bounds[i], &bounds[j]) {
                    if !a.overlaps(b) {
                        continue;
                    }
                }
                for la in &leaves[i] {
                    for lb in &leaves[j] {
                        collision::collide_leaves(la, lb, &mut contacts);
                    }
                }
            }
        }
        contacts
    }

    /// Broad filters: motion kinds, activation, groups and excluded pairs.
    fn should_test(&self, i: usize, j: usize) -> bool {
        let (a, b) = (&self.bodies[i], &self.bodies[j]);
        if !a.is_dynamic() && !b.is_dynamic() {
            return false;
        }
        let active = |body: &RigidBody| !body.is_static() && body.is_awake();
        if !active(a) && !active(b) {
            return false;
        }
        if !a.collides_with(b) {
            return false;
        }
        !self
            .excluded_pairs
            .contains_key(&pair_key(BodyHandle(i as u32), BodyHandle(j as u32)))
    }

    fn record_contacts(&mut self, contacts: &[Contact]) {
        for contact in contacts {
            if contact.depth < 0.0 {
                continue;
            }
            let ordered = if contact.body_a <= contact.body_b {
                *contact
            } else {
                contact.flip()
            };
            let key = (ordered.body_a, ordered.body_b);
            match self.frame_contacts.get(&key) {
                Some(existing) if existing.depth >= ordered.depth => {}
                _ => {
                    self.frame_contacts.insert(key, ordered);
                }
            }
        }
    }

    // ========================================================================
    // Velocity solver
    // ========================================================================

    /// Sequential impulses for contacts and hinge motors.
    fn solve_velocities(&mut self, contacts: &[Contact]) {
        let mut rows: Vec<ContactRow> = contacts
            .iter()
            .filter_map(|c| self.contact_row(c))
            .collect();

        let motors: Vec<(usize, usize, Vec3, f32, f32)> = self
            .constraints
            .iter()
            .flatten()
            .filter_map(|slot| match &slot.constraint {
                Constraint::Hinge(h) => h.motor.map(|m| {
                    let a = h.body_a.index();
                    let axis = self.bodies[a].orientation * h.local_axis_a;
                    (a, h.body_b.index(), axis, m.target_velocity, m.max_impulse)
                }),
                _ => None,
            })
            .collect();
        let mut motor_impulses = vec![0.0_f32; motors.len()];

        for _ in 0..self.config.solver_iterations {
            for (k, &(ia, ib, axis, target, max_impulse)) in motors.iter().enumerate() {
                let Some((a, b)) = pair_mut(&mut self.bodies, ia, ib) else {
                    continue;
                };
                let mass = axis.dot(a.effective_inv_inertia(axis)) + axis.dot(b.effective_inv_inertia(axis));
                if mass < 1e-9 {
                    continue;
                }
                let relative = (b.angular_velocity - a.angular_velocity).dot(axis);
                let old = motor_impulses[k];
                motor_impulses[k] = (old + (target - relative) / mass).clamp(-max_impulse, max_impulse);
                let lambda = motor_impulses[k] - old;
                a.angular_velocity -= a.effective_inv_inertia(axis * lambda);
                b.angular_velocity += b.effective_inv_inertia(axis * lambda);
            }

            for row in &mut rows {
                let Some((a, b)) = pair_mut(&mut self.bodies, row.a, row.b) else {
                    continue;
                };
                let relative = (a.velocity + a.angular_velocity.cross(row.r_a))
                    - (b.velocity + b.angular_velocity.cross(row.r_b));

                // Normal
                let vn = relative.dot(row.normal);
                let old = row.normal_impulse;
                row.normal_impulse = (old + (row.target_velocity - vn) * row.normal_mass).max(0.0);
                let impulse = row.normal * (row.normal_impulse - old);
                apply_impulse(a, impulse, row.r_a);
                apply_impulse(b, -impulse, row.r_b);

                // Friction
                let limit = row.friction * row.normal_impulse;
                for t in 0..2 {
                    let relative = (a.velocity + a.angular_velocity.cross(row.r_a))
                        - (b.velocity + b.angular_velocity.cross(row.r_b));
                    let vt = relative.dot(row.tangents[t]);
                    let old = row.tangent_impulse[t];
                    row.tangent_impulse[t] = (old - vt * row.tangent_mass[t]).clamp(-limit, limit);
                    let impulse = row.tangents[t] * (row.tangent_impulse[t] - old);
                    apply_impulse(a, impulse, row.r_a);
                    apply_impulse(b, -impulse, row.r_b);
                }
            }
        }
    }

    fn contact_row(&self, contact: &Contact) -> Option<ContactRow> {
        let (ia, ib) = (contact.body_a.index(), contact.body_b.index());
        let (a, b) = (&self.bodies[ia], &self.bodies[ib]);
        let n = contact.normal;
        let r_a = contact.point - a.position;
        let r_b = contact.point - b.position;

        let inv_mass = |dir: Vec3| {
            let ra = r_a.cross(dir);
            let rb = r_b.cross(dir);
            a.effective_inv_mass()
                + b.effective_inv_mass()
                + ra.dot(a.effective_inv_inertia(ra))
                + rb.dot(b.effective_inv_inertia(rb))
        };
        let k = inv_mass(n);
        if k < 1e-9 {
            return None;
        }

        let relative = a.velocity_at_point(contact.point) - b.velocity_at_point(contact.point);
        let vn = relative.dot(n);
        let restitution = (a.restitution + b.restitution) * 0.5;
        let target_velocity = if -vn > self.config.restitution_threshold {
            -restitution * vn
        } else {
            0.0
        };

        let t1 = n.any_orthonormal_vector();
        let t2 = n.cross(t1);
        let tangent_mass = [t1, t2].map(|t| {
            let k = inv_mass(t);
            if k > 1e-9 { 1.0 / k } else { 0.0 }
        });

        Some(ContactRow {
            a: ia,
            b: ib,
            normal: n,
            r_a,
            r_b,
            normal_mass: 1.0 / k,
            target_velocity,
            friction: (a.friction + b.friction) * 0.5,
            tangents: [t1, t2],
            tangent_mass,
            normal_impulse: 0.0,
            tangent_impulse: [0.0; 2],
        })
    }

    // ========================================================================
    // Position solver
    // ========================================================================

    /// Project constraints back onto their allowed configuration.
    fn solve_constraint_positions(&mut self, dt: f32) {
        for _ in 0..self.config.solver_iterations {
            for slot in self.constraints.iter().flatten() {
                let (a, b) = slot.constraint.bodies();
                let Some((body_a, body_b)) = pair_mut(&mut self.bodies, a.index(), b.index())
                else {
                    continue;
                };
                match &slot.constraint {
                    Constraint::Hinge(hinge) => solve_hinge(hinge, body_a, body_b, dt),
                    Constraint::Point(point) => solve_point(point, body_a, body_b, dt),
                    Constraint::Generic6Dof(dof) => solve_6dof(dof, body_a, body_b, dt),
                    Constraint::Spring6Dof(spring) => solve_6dof(&spring.dof, body_a, body_b, dt),
                }
            }
        }
    }

    /// Push apart pairs still overlapping after integration.
    ///
    /// Only the deepest contact per pair is used, with its depth updated by
    /// the motion since detection.
    fn correct_contacts(&mut self, contacts: &[Contact], before: &[Vec3]) {
        let mut deepest: BTreeMap<(usize, usize), (Vec3, f32)> = BTreeMap::new();
        for c in contacts {
            let (ia, ib) = (c.body_a.index(), c.body_b.index());
            let moved_a = self.bodies[ia].position - before[ia];
            let moved_b = self.bodies[ib].position - before[ib];
            let depth = c.depth - (moved_a - moved_b).dot(c.normal);
            match deepest.get(&(ia, ib)) {
                Some((_, d)) if *d >= depth => {}
                _ => {
                    deepest.insert((ia, ib), (c.normal, depth));
                }
            }
        }

        for ((ia, ib), (normal, depth)) in deepest {
            let Some((a, b)) = pair_mut(&mut self.bodies, ia, ib) else {
                continue;
            };
            let (wa, wb) = (a.effective_inv_mass(), b.effective_inv_mass());
            if wa + wb <= 0.0 {
                continue;
            }
            let correction = normal * (depth - SLOP).max(0.0) * PERCENT / (wa + wb);
            a.position += correction * wa;
            b.position -= correction * wb;
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

// ============================================================================
// Solver helpers
// ============================================================================

/// Order-independent key for a body pair.
fn pair_key(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Mutable references to two distinct bodies, in the order asked for.
fn pair_mut(bodies: &mut [RigidBody], a: usize, b: usize) -> Option<(&mut RigidBody, &mut RigidBody)> {
    if a == b || a >= bodies.len() || b >= bodies.len() {
        return None;
    }
    if a < b {
        let (left, right) = bodies.split_at_mut(b);
        Some((&mut left[a], &mut right[0]))
    } else {
        let (left, right) = bodies.split_at_mut(a);
        Some((&mut right[0], &mut left[b]))
    }
}

/// Rotate `q` by the small rotation vector `theta`.
fn integrate_rotation(q: Quat, theta: Vec3) -> Quat {
    let dq = Quat::from_xyzw(theta.x, theta.y, theta.z, 0.0) * q * 0.5;
    (q + dq).normalize()
}

fn apply_impulse(body: &mut RigidBody, impulse: Vec3, r: Vec3) {
    body.velocity += impulse * body.effective_inv_mass();
    body.angular_velocity += body.effective_inv_inertia(r.cross(impulse));
}

/// Positional impulse `p` at offset `r`, with the matching velocity change.
fn shift_body(body: &mut RigidBody, p: Vec3, r: Vec3, dt: f32) {
    let inv_mass = body.effective_inv_mass();
    if inv_mass == 0.0 {
        return;
    }
    let dx = p * inv_mass;
    let dtheta = body.effective_inv_inertia(r.cross(p));
    body.position += dx;
    body.orientation = integrate_rotation(body.orientation, dtheta);
    body.velocity += dx / dt;
    body.angular_velocity += dtheta / dt;
}

fn turn_body(body: &mut RigidBody, dtheta: Vec3, dt: f32) {
    if dtheta == Vec3::ZERO {
        return;
    }
    body.orientation = integrate_rotation(body.orientation, dtheta);
    body.angular_velocity += dtheta / dt;
}

/// Move two bodies so that `point_a` (on A) and `point_b` (on B) meet.
fn project_points(a: &mut RigidBody, b: &mut RigidBody, point_a: Vec3, point_b: Vec3, dt: f32) {
    let delta = point_b - point_a;
    let len = delta.length();
    if len < 1e-6 {
        return;
    }
    let n = delta / len;
    let r_a = point_a - a.position;
    let r_b = point_b - b.position;
    let (ca, cb) = (r_a.cross(n), r_b.cross(n));
    let w = a.effective_inv_mass()
        + b.effective_inv_mass()
        + ca.dot(a.effective_inv_inertia(ca))
        + cb.dot(b.effective_inv_inertia(cb));
    if w < 1e-9 {
        return;
    }
    let p = n * (len / w);
    shift_body(a, p, r_a, dt);
    shift_body(b, -p, r_b, dt);
}

/// Rotate B by `theta` relative to A, split by inverse inertia.
fn project_rotation(a: &mut RigidBody, b: &mut RigidBody, theta: Vec3, dt: f32) {
    let angle = theta.length();
    if angle < 1e-6 {
        return;
    }
    let axis = theta / angle;
    let w = axis.dot(a.effective_inv_inertia(axis)) + axis.dot(b.effective_inv_inertia(axis));
    if w < 1e-9 {
        return;
    }
    let lambda = axis * (angle / w);
    turn_body(b, b.effective_inv_inertia(lambda), dt);
    turn_body(a, -a.effective_inv_inertia(lambda), dt);
}

fn solve_point(point: &PointConstraint, a: &mut RigidBody, b: &mut RigidBody, dt: f32) {
    let pa = a.position + a.orientation * point.local_anchor_a;
    let pb = b.position + b.orientation * point.local_anchor_b;
    project_points(a, b, pa, pb, dt);
}

fn solve_hinge(hinge: &HingeConstraint, a: &mut RigidBody, b: &mut RigidBody, dt: f32) {
    // Anchors together
    let (pa, pb) = hinge.world_anchors(a, b);
    project_points(a, b, pa, pb, dt);

    // Axes aligned
    let axis_a = a.orientation * hinge.local_axis_a;
    let axis_b = b.orientation * hinge.local_axis_b;
    project_rotation(a, b, axis_b.cross(axis_a), dt);

    // Angle limits
    if let Some((min, max)) = hinge.limits {
        let angle = hinge.angle(a, b);
        let clamped = angle.clamp(min, max);
        if clamped != angle {
            let axis = a.orientation * hinge.local_axis_a;
            project_rotation(a, b, axis * (clamped - angle), dt);
        }
    }
}

fn solve_6dof(dof: &Generic6DofConstraint, a: &mut RigidBody, b: &mut RigidBody, dt: f32) {
    // Linear limits, in frame A
    let (fa, fb) = dof.world_frames(a, b);
    let offset = fa.orientation.inverse() * (fb.position - fa.position);
    let clamped = clamp_axes(offset, dof.linear_lower, dof.linear_upper);
    if (offset - clamped).length_squared() > 1e-12 {
        let target = fa.position + fa.orientation * clamped;
        project_points(a, b, target, fb.position, dt);
    }

    // Angular limits, as XYZ Euler angles of B in A
    let (fa, fb) = dof.world_frames(a, b);
    let angles = relative_euler(fa.orientation, fb.orientation);
    let clamped = clamp_axes(angles, dof.angular_lower, dof.angular_upper);
    if (angles - clamped).length_squared() > 1e-12 {
        let relative = fa.orientation.inverse() * fb.orientation;
        let target = Quat::from_euler(glam::EulerRot::XYZ, clamped.x, clamped.y, clamped.z);
        let delta = fa.orientation * (target * relative.inverse()) * fa.orientation.inverse();
        let mut delta = delta.normalize();
        if delta.w < 0.0 {
            delta = -delta;
        }
        let (axis, angle) = delta.to_axis_angle();
        project_rotation(a, b, axis * angle, dt);
    }
}

/// Accumulate the forces of every enabled spring.
fn apply_spring(spring: &Spring6DofConstraint, a: &mut RigidBody, b: &mut RigidBody) {
    let dof = &spring.dof;
    let (fa, fb) = dof.world_frames(a, b);
    let offset = fa.orientation.inverse() * (fb.position - fa.position);
    let velocity =
        fa.orientation.inverse() * (b.velocity_at_point(fb.position) - a.velocity_at_point(fb.position));
    let angles = relative_euler(fa.orientation, fb.orientation);
    let spin = fa.orientation.inverse() * (b.angular_velocity - a.angular_velocity);
    let axes = [Vec3::X, Vec3::Y, Vec3::Z];

    let mut stretched = false;
    for (i, s) in spring.springs().iter().enumerate() {
        if !s.enabled {
            continue;
        }
        if i < 3 {
            let x = offset[i] - s.equilibrium;
            let f = -s.stiffness * x - s.damping * velocity[i];
            let force = fa.orientation * (axes[i] * f);
            b.apply_force_at_point(force, fb.position);
            a.apply_force_at_point(-force, fb.position);
            stretched |= x.abs() > 1e-3;
        } else {
            let x = angles[i - 3] - s.equilibrium;
            let t = -s.stiffness * x - s.damping * spin[i - 3];
            let torque = fa.orientation * (axes[i - 3] * t);
            b.apply_torque(torque);
            a.apply_torque(-torque);
            stretched |= x.abs() > 1e-3;
        }
    }
    if stretched {
        a.activate();
        b.activate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Collider, CompoundChild, CompoundShape, groups};
    use std::f32::consts::FRAC_PI_2;

    fn ball(world: &mut PhysicsWorld, position: Vec3) -> BodyHandle {
        world.add_body(RigidBody::new(position, Collider::sphere(0.5), 1.0).unwrap())
    }

    fn ground(world: &mut PhysicsWorld) -> BodyHandle {
        world.add_body(RigidBody::new_static(Vec3::ZERO, Collider::ground()))
    }

    #[test]
    fn test_world_creation() {
        let world = PhysicsWorld::default();
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.config.gravity, Vec3::new(0.0, -9.81, 0.0));
    }

    #[test]
    fn test_gravity() {
        let mut world = PhysicsWorld::default();
        let ball = ball(&mut world, Vec3::new(0.0, 10.0, 0.0));
        for _ in 0..10 {
            world.step(1.0 / 60.0).unwrap();
        }
        let body = world.body(ball).unwrap();
        assert!(body.position.y < 10.0);
        assert!(body.velocity.y < 0.0);
    }

    #[test]
    fn test_step_counts_substeps() {
        let mut world = PhysicsWorld::default();
        assert_eq!(world.step(1.0 / 60.0).unwrap(), 1);
        assert_eq!(world.step(1.0 / 120.0).unwrap(), 0);
        assert_eq!(world.step(1.0 / 120.0).unwrap(), 1);
        assert_eq!(world.step(1.0).unwrap(), 10);
        assert_eq!(world.step(0.0).unwrap(), 0);
    }

    #[test]
    fn test_invalid_timestep() {
        let mut world = PhysicsWorld::default();
        let b = ball(&mut world, Vec3::Y * 5.0);
        assert_eq!(world.step(-1.0), Err(PhysicsError::InvalidTimestep(-1.0)));
        assert!(world.step(f32::NAN).is_err());
        assert_eq!(world.body(b).unwrap().position, Vec3::Y * 5.0);
    }

    #[test]
    fn test_ball_rests_on_ground() {
        let mut world = PhysicsWorld::default();
        ground(&mut world);
        let ball = ball(&mut world, Vec3::new(0.0, 2.0, 0.0));
        for _ in 0..300 {
            world.step(1.0 / 60.0).unwrap();
        }
        let y = world.body(ball).unwrap().position.y;
        assert!((y - 0.5).abs() < 0.05, "ball at {y}");
    }

    #[test]
    fn test_static_body_unmoved_by_contact() {
        let mut world = PhysicsWorld::default();
        let floor = world.add_body(RigidBody::new_static(Vec3::ZERO, Collider::box_shape(Vec3::new(5.0, 0.5, 5.0))));
        ball(&mut world, Vec3::new(0.0, 3.0, 0.0));
        for _ in 0..120 {
            world.step(1.0 / 60.0).unwrap();
        }
        assert_eq!(world.transform(floor).unwrap(), Transform::IDENTITY);
    }

    #[test]
    fn test_body_falls_asleep_and_wakes() {
        let mut world = PhysicsWorld::default();
        ground(&mut world);
        let resting = ball(&mut world, Vec3::new(0.0, 0.5, 0.0));
        for _ in 0..200 {
            world.step(1.0 / 60.0).unwrap();
        }
        assert_eq!(world.body(resting).unwrap().activation(), ActivationState::Sleeping);

        world.activate(resting).unwrap();
        assert!(world.body(resting).unwrap().is_awake());
    }

    #[test]
    fn test_always_active_never_sleeps() {
        let mut world = PhysicsWorld::default();
        ground(&mut world);
        let b = world.add_body(
            RigidBody::new(Vec3::new(0.0, 0.5, 0.0), Collider::sphere(0.5), 1.0)
                .unwrap()
                .with_activation(ActivationState::AlwaysActive),
        );
        for _ in 0..200 {
            world.step(1.0 / 60.0).unwrap();
        }
        assert_eq!(world.body(b).unwrap().activation(), ActivationState::AlwaysActive);
    }

    #[test]
    fn test_collision_filter_lets_ball_fall_through() {
        let mut world = PhysicsWorld::default();
        world.add_body(
            RigidBody::new_static(Vec3::ZERO, Collider::ground())
                .with_collision_filter(groups::PLANE, groups::BOX),
        );
        let b = world.add_body(
            RigidBody::new(Vec3::new(0.0, 1.0, 0.0), Collider::sphere(0.5), 1.0)
                .unwrap()
                .with_collision_filter(groups::SPHERE, groups::ALL),
        );
        for _ in 0..120 {
            world.step(1.0 / 60.0).unwrap();
        }
        assert!(world.body(b).unwrap().position.y < -1.0);
        assert_eq!(world.contact_pairs().count(), 0);
    }

    #[test]
    fn test_contact_pairs_are_deduplicated() {
        let mut world = PhysicsWorld::default();
        let floor = ground(&mut world);
        let cube = world.add_body(
            RigidBody::new(Vec3::new(0.0, 0.49, 0.0), Collider::box_shape(Vec3::splat(0.5)), 1.0).unwrap(),
        );
        world.step(1.0 / 30.0).unwrap();
        let pairs: Vec<_> = world.contact_pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].body_a, pairs[0].body_b), (floor, cube));
        // Normal points from the cube toward the floor (B toward A).
        assert!(pairs[0].normal.y < -0.99);
    }

    #[test]
    fn test_kinematic_moves_exactly() {
        let mut world = PhysicsWorld::default();
        let k = world.add_body(
            RigidBody::new(Vec3::ZERO, Collider::box_shape(Vec3::ONE), 0.0)
                .unwrap()
                .into_kinematic()
                .unwrap(),
        );
        ball(&mut world, Vec3::new(0.0, 1.4, 0.0));
        let target = Transform::from_position(Vec3::new(0.0, 0.3, 0.0));
        world.set_transform(k, target).unwrap();
        world.step(1.0 / 60.0).unwrap();
        assert_eq!(world.transform(k).unwrap(), target);
        assert!((world.body(k).unwrap().velocity.y - 18.0).abs() < 1e-3);
    }

    #[test]
    fn test_kinematic_pushes_ball() {
        let mut world = PhysicsWorld::default();
        world.config.gravity = Vec3::ZERO;
        let k = world.add_body(
            RigidBody::new(Vec3::ZERO, Collider::box_shape(Vec3::splat(0.5)), 0.0)
                .unwrap()
                .into_kinematic()
                .unwrap(),
        );
        let b = ball(&mut world, Vec3::new(1.05, 0.0, 0.0));
        world.set_transform(k, Transform::from_position(Vec3::X * 0.1)).unwrap();
        world.step(1.0 / 60.0).unwrap();
        assert!(world.body(b).unwrap().velocity.x > 0.0);
    }

    #[test]
    fn test_kinematic_velocity_spans_frames_without_substeps() {
        let mut world = PhysicsWorld::default();
        let k = world.add_body(
            RigidBody::new(Vec3::ZERO, Collider::box_shape(Vec3::ONE), 0.0)
                .unwrap()
                .into_kinematic()
                .unwrap(),
        );
        // 144 Hz display: the first two frames run no sub-step.
        let mut substeps = Vec::new();
        for frame in 1..=3 {
            let target = Transform::from_position(Vec3::X * 0.01 * frame as f32);
            world.set_transform(k, target).unwrap();
            substeps.push(world.step(1.0 / 144.0).unwrap());
        }
        assert_eq!(substeps, vec![0, 0, 1]);
        let vx = world.body(k).unwrap().velocity.x;
        assert!((vx - 1.44).abs() < 1e-3, "lift speed {vx}");
    }

    #[test]
    fn test_sleeper_woken_by_falling_body() {
        let mut world = PhysicsWorld::default();
        ground(&mut world);
        let resting = ball(&mut world, Vec3::new(0.0, 0.5, 0.0));
        for _ in 0..200 {
            world.step(1.0 / 60.0).unwrap();
        }
        assert_eq!(world.body(resting).unwrap().activation(), ActivationState::Sleeping);

        ball(&mut world, Vec3::new(0.2, 3.0, 0.0));
        let mut woke = false;
        for _ in 0..60 {
            world.step(1.0 / 60.0).unwrap();
            woke |= world.body(resting).unwrap().is_awake();
        }
        assert!(woke, "resting ball slept through the hit");
    }

    #[test]
    fn test_sleeper_woken_by_moving_kinematic() {
        let mut world = PhysicsWorld::default();
        ground(&mut world);
        let resting = ball(&mut world, Vec3::new(0.0, 0.5, 0.0));
        let k = world.add_body(
            RigidBody::new(Vec3::new(-1.2, 0.5, 0.0), Collider::box_shape(Vec3::splat(0.5)), 0.0)
                .unwrap()
                .into_kinematic()
                .unwrap(),
        );
        for _ in 0..200 {
            world.step(1.0 / 60.0).unwrap();
        }
        assert_eq!(world.body(resting).unwrap().activation(), ActivationState::Sleeping);

        for frame in 1..=30 {
            let x = -1.2 + 0.02 * frame as f32;
            world.set_transform(k, Transform::from_position(Vec3::new(x, 0.5, 0.0))).unwrap();
            world.step(1.0 / 60.0).unwrap();
        }
        let body = world.body(resting).unwrap();
        assert!(body.is_awake());
        assert!(body.position.x > 0.05, "ball at {}", body.position);
    }

    #[test]
    fn test_idle_kinematic_lets_rider_sleep() {
        let mut world = PhysicsWorld::default();
        world.add_body(
            RigidBody::new(Vec3::ZERO, Collider::box_shape(Vec3::new(1.0, 0.1, 1.0)), 0.0)
                .unwrap()
                .into_kinematic()
                .unwrap(),
        );
        let rider = ball(&mut world, Vec3::new(0.0, 0.6, 0.0));
        for _ in 0..200 {
            world.step(1.0 / 60.0).unwrap();
        }
        assert_eq!(world.body(rider).unwrap().activation(), ActivationState::Sleeping);
    }

    #[test]
    fn test_resting_stack_falls_asleep_together() {
        let mut world = PhysicsWorld::default();
        ground(&mut world);
        let cube = |y: f32| RigidBody::new(Vec3::new(0.0, y, 0.0), Collider::box_shape(Vec3::splat(0.5)), 1.0).unwrap();
        let lower = world.add_body(cube(0.5));
        let upper = world.add_body(cube(1.5));
        for _ in 0..300 {
            world.step(1.0 / 60.0).unwrap();
        }
        assert_eq!(world.body(lower).unwrap().activation(), ActivationState::Sleeping);
        assert_eq!(world.body(upper).unwrap().activation(), ActivationState::Sleeping);
    }

    #[test]
    fn test_constraint_requires_bodies() {
        let mut world = PhysicsWorld::default();
        let a = ball(&mut world, Vec3::ZERO);
        let err = world
            .add_constraint(HingeConstraint::new(a, BodyHandle(7)), false)
            .unwrap_err();
        assert_eq!(err, PhysicsError::UnknownBody(BodyHandle(7)));
        assert_eq!(world.constraint_count(), 0);
    }

    #[test]
    fn test_remove_constraint_reenables_collisions() {
        let mut world = PhysicsWorld::default();
        let a = ball(&mut world, Vec3::ZERO);
        let b = ball(&mut world, Vec3::X * 0.8);
        let c = world
            .add_constraint(PointConstraint::new(a, Vec3::ZERO, b, Vec3::ZERO), true)
            .unwrap();
        assert!(!world.should_test(0, 1));
        world.remove_constraint(c).unwrap();
        assert!(world.should_test(0, 1));
        assert_eq!(
            world.remove_constraint(c).unwrap_err(),
            PhysicsError::UnknownConstraint(c)
        );
    }

    #[test]
    fn test_point_constraint_pendulum_keeps_length() {
        let mut world = PhysicsWorld::default();
        let anchor = world.add_body(RigidBody::new_static(Vec3::new(0.0, 5.0, 0.0), Collider::sphere(0.1)));
        let bob = ball(&mut world, Vec3::new(2.0, 5.0, 0.0));
        world
            .add_constraint(PointConstraint::new(anchor, Vec3::ZERO, bob, Vec3::new(-2.0, 0.0, 0.0)), true)
            .unwrap();
        for _ in 0..120 {
            world.step(1.0 / 60.0).unwrap();
        }
        let p = world.body(bob).unwrap().position;
        let len = (p - Vec3::new(0.0, 5.0, 0.0)).length();
        assert!((len - 2.0).abs() < 0.05, "length {len}");
        assert!(p.y < 5.0);
    }

    #[test]
    fn test_hinge_swings_about_axis() {
        let mut world = PhysicsWorld::default();
        let stand = world.add_body(RigidBody::new_static(Vec3::new(0.0, 5.0, 0.0), Collider::sphere(0.1)));
        let club = world.add_body(
            RigidBody::new(Vec3::new(1.0, 5.0, 0.0), Collider::box_shape(Vec3::new(1.0, 0.1, 0.1)), 1.0).unwrap(),
        );
        let hinge = HingeConstraint::new(stand, club)
            .with_anchors(Vec3::ZERO, Vec3::new(-1.0, 0.0, 0.0))
            .with_axes(Vec3::Z, Vec3::Z);
        world.add_constraint(hinge, true).unwrap();
        for _ in 0..30 {
            world.step(1.0 / 60.0).unwrap();
        }
        let body = world.body(club).unwrap();
        // Swung down around Z: anchor still at the stand, no tilt out of the XY plane.
        let anchor = body.position + body.orientation * Vec3::new(-1.0, 0.0, 0.0);
        assert!((anchor - Vec3::new(0.0, 5.0, 0.0)).length() < 0.05);
        assert!(body.position.y < 5.0);
        assert!((body.orientation * Vec3::Z - Vec3::Z).length() < 0.05);
    }

    #[test]
    fn test_hinge_limits_hold() {
        let mut world = PhysicsWorld::default();
        let stand = world.add_body(RigidBody::new_static(Vec3::new(0.0, 5.0, 0.0), Collider::sphere(0.1)));
        let club = world.add_body(
            RigidBody::new(Vec3::new(1.0, 5.0, 0.0), Collider::box_shape(Vec3::new(1.0, 0.1, 0.1)), 1.0).unwrap(),
        );
        let hinge = HingeConstraint::new(stand, club)
            .with_anchors(Vec3::ZERO, Vec3::new(-1.0, 0.0, 0.0))
            .with_axes(Vec3::Z, Vec3::Z)
            .with_limits(-0.3, 0.3);
        let h = world.add_constraint(hinge, true).unwrap();
        for _ in 0..120 {
            world.step(1.0 / 60.0).unwrap();
        }
        let Some(Constraint::Hinge(hinge)) = world.constraint(h) else {
            panic!("expected hinge");
        };
        let angle = hinge.angle(world.body(stand).unwrap(), world.body(club).unwrap());
        assert!(angle >= -0.35, "angle {angle}");
    }

    #[test]
    fn test_hinge_motor_brakes() {
        let mut world = PhysicsWorld::default();
        world.config.gravity = Vec3::ZERO;
        let stand = world.add_body(RigidBody::new_static(Vec3::ZERO, Collider::sphere(0.1)));
        let wheel = world.add_body(RigidBody::new(Vec3::ZERO, Collider::sphere(0.5), 1.0).unwrap());
        let hinge = HingeConstraint::new(stand, wheel)
            .with_axes(Vec3::Z, Vec3::Z)
            .with_motor(0.0, 0.05);
        world.add_constraint(hinge, true).unwrap();
        world.body_mut(wheel).unwrap().angular_velocity = Vec3::Z * 5.0;
        for _ in 0..60 {
            world.step(1.0 / 60.0).unwrap();
        }
        assert!(world.body(wheel).unwrap().angular_velocity.z.abs() < 5.0 - 0.1);
    }

    #[test]
    fn test_6dof_locks_and_frees_axes() {
        let mut world = PhysicsWorld::default();
        let base = world.add_body(RigidBody::new_static(Vec3::ZERO, Collider::box_shape(Vec3::splat(0.5))));
        let slider = world.add_body(
            RigidBody::new(Vec3::new(0.0, 2.0, 0.0), Collider::box_shape(Vec3::splat(0.2)), 1.0).unwrap(),
        );
        // Only Y is free; all rotation locked.
        let dof = Generic6DofConstraint::new(base, slider, Transform::IDENTITY, Transform::IDENTITY)
            .with_linear_limits(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 0.0))
            .with_angular_limits(Vec3::ZERO, Vec3::ZERO);
        world.add_constraint(dof, true).unwrap();
        world.body_mut(slider).unwrap().velocity = Vec3::new(3.0, 0.0, 0.0);
        world.body_mut(slider).unwrap().angular_velocity = Vec3::new(0.0, 2.0, 0.0);
        for _ in 0..30 {
            world.step(1.0 / 60.0).unwrap();
        }
        let body = world.body(slider).unwrap();
        assert!(body.position.x.abs() < 0.02);
        assert!(body.position.y < 2.0);
        assert!(body.orientation.angle_between(Quat::IDENTITY) < 0.02);
    }

    #[test]
    fn test_spring_oscillates_around_equilibrium() {
        let mut world = PhysicsWorld::default();
        world.config.gravity = Vec3::ZERO;
        let base = world.add_body(RigidBody::new_static(Vec3::ZERO, Collider::sphere(0.1)));
        let top = world.add_body(RigidBody::new(Vec3::new(0.0, 0.1, 0.0), Collider::sphere(0.2), 10.0).unwrap());
        let mut spring = Spring6DofConstraint::new(base, top, Transform::IDENTITY, Transform::IDENTITY)
            .with_linear_limits(Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO)
            .with_angular_limits(Vec3::ZERO, Vec3::ZERO);
        spring.set_stiffness(1, 800.0).unwrap();
        spring.set_damping(1, 20.0).unwrap();
        spring.set_equilibrium_point(1, 1.0).unwrap();
        let c = world.add_constraint(spring, true).unwrap();

        world.step(1.0 / 60.0).unwrap();
        assert!((world.body(top).unwrap().position.y - 0.1).abs() < 1e-4);

        world
            .constraint_mut(c)
            .and_then(Constraint::as_spring_mut)
            .unwrap()
            .enable_spring(1, true)
            .unwrap();
        for _ in 0..600 {
            world.step(1.0 / 60.0).unwrap();
        }
        let p = world.body(top).unwrap().position;
        assert!((p.y - 1.0).abs() < 0.05, "settled at {p}");
        assert!(p.x.abs() < 1e-3 && p.z.abs() < 1e-3);
    }

    #[test]
    fn test_compound_body_lands_on_both_ends() {
        let mut world = PhysicsWorld::default();
        ground(&mut world);
        let dumbbell = Collider::compound(
            CompoundShape::new(vec![
                CompoundChild {
                    local: Transform::from_position(Vec3::X),
                    collider: Collider::sphere(0.5),
                },
                CompoundChild {
                    local: Transform::from_position(Vec3::NEG_X),
                    collider: Collider::sphere(0.5),
                },
            ])
            .unwrap(),
        );
        let b = world.add_body(RigidBody::new(Vec3::new(0.0, 2.0, 0.0), dumbbell, 2.0).unwrap());
        for _ in 0..240 {
            world.step(1.0 / 60.0).unwrap();
        }
        let body = world.body(b).unwrap();
        assert!((body.position.y - 0.5).abs() < 0.06);
        let tilt = (body.orientation * Vec3::X).y.abs();
        assert!(tilt < 0.05);
    }

    #[test]
    fn test_set_transform_normalizes() {
        let mut world = PhysicsWorld::default();
        let b = ball(&mut world, Vec3::ZERO);
        let q = Quat::from_rotation_y(FRAC_PI_2) * 2.0;
        world.set_transform(b, Transform::new(Vec3::ONE, q)).unwrap();
        assert!(world.body(b).unwrap().orientation.is_normalized());
        assert!(world.set_transform(BodyHandle(9), Transform::IDENTITY).is_err());
    }
}
