//! Rigid-body world built on rapier2d
//!
//! Everything outside this module talks in pixels and `glam::Vec2`; the
//! solver runs in meters (see `PIXELS_PER_METER`). The world owns every
//! registered entity and keeps an explicit body → entity map for routing
//! contacts.
//!
//! Per update:
//! 1. integrate one fixed step (CCD + sub-stepping)
//! 2. route each begin-contact to `Entity::on_collision` on both sides
//! 3. destroy bodies of entities marked during the step
//! 4. copy body poses into entity transforms
//!
//! The world never logs. It records `WorldEvent`s which the owner drains.

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use glam::Vec2;
use rapier2d::parry::bounding_volume::Aabb;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use super::deferred::{DeferredAction, DeferredQueue};
use super::entity::{DamageOutcome, Entity, EntityId, EntityKind, Transform};
use super::projectile::launch_velocity;
use crate::error::{SimError, SimResult};
use crate::settings::PhysicsSettings;
use crate::{to_meters, to_pixels};

/// Body simulation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Simulated, affected by forces
    Dynamic,
    /// Immovable
    Fixed,
    /// Moved by setting its position
    Kinematic,
}

impl BodyKind {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyKind::Dynamic => RigidBodyType::Dynamic,
            BodyKind::Fixed => RigidBodyType::Fixed,
            BodyKind::Kinematic => RigidBodyType::KinematicPositionBased,
        }
    }
}

/// Collision shape in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShapeDesc {
    Ball { radius: f32 },
    Box { half_extents: Vec2 },
}

impl ShapeDesc {
    /// Drawn size of the shape
    pub fn size(&self) -> Vec2 {
        match *self {
            ShapeDesc::Ball { radius } => Vec2::splat(radius * 2.0),
            ShapeDesc::Box { half_extents } => half_extents * 2.0,
        }
    }
}

/// Surface properties
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 1.0,
            friction: 0.3,
            restitution: 0.0,
        }
    }
}

/// Everything needed to create a body and its collider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    /// px
    pub position: Vec2,
    /// radians
    pub rotation: f32,
    /// m/s
    pub velocity: Vec2,
    pub shape: ShapeDesc,
    pub material: Material,
    pub gravity_scale: f32,
    pub ccd: bool,
    pub fixed_rotation: bool,
}

impl BodyDesc {
    pub fn new(kind: BodyKind, shape: ShapeDesc) -> Self {
        Self {
            kind,
            position: Vec2::ZERO,
            rotation: 0.0,
            velocity: Vec2::ZERO,
            shape,
            material: Material::default(),
            gravity_scale: 1.0,
            ccd: false,
            fixed_rotation: false,
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    pub fn with_ccd(mut self, enabled: bool) -> Self {
        self.ccd = enabled;
        self
    }

    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self
    }
}

/// Joint between two entity bodies. Anchors are in each body's local frame (px).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointDesc {
    /// Rigid weld
    Fixed { anchor1: Vec2, anchor2: Vec2 },
    /// Hinge free to rotate
    Revolute { anchor1: Vec2, anchor2: Vec2 },
    /// Spring-damper holding the bodies `rest_length` px apart
    Spring {
        rest_length: f32,
        stiffness: f32,
        damping: f32,
    },
}

/// Collider outline for debug drawing (px)
#[derive(Debug, Clone, PartialEq)]
pub enum DebugShape {
    Circle { center: Vec2, radius: f32 },
    Polygon { points: [Vec2; 4] },
}

/// Things that happened inside the world since the last drain
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// Begin-contact between two bodies (owners, if any)
    Contact {
        first: Option<EntityId>,
        second: Option<EntityId>,
    },
    Damaged {
        entity: EntityId,
        amount: f32,
        destroyed: bool,
    },
    Explosion {
        /// px
        center: Vec2,
        /// px
        radius: f32,
        bodies_pushed: usize,
        damaged: Vec<EntityId>,
    },
    BodyDestroyed {
        entity: EntityId,
    },
    /// A collision handler returned an error; the step carried on
    HandlerFailed {
        entity: EntityId,
        error: String,
    },
}

/// Collects begin-contact events during a step
#[derive(Default)]
struct ContactCollector {
    events: Mutex<Vec<CollisionEvent>>,
}

impl ContactCollector {
    /// Collider pairs that started touching, in report order
    fn take_started(&self) -> Vec<(ColliderHandle, ColliderHandle)> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events
            .drain(..)
            .filter_map(|event| match event {
                CollisionEvent::Started(a, b, _) => Some((a, b)),
                CollisionEvent::Stopped(..) => None,
            })
            .collect()
    }
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Restricted view of the world handed to collision handlers.
/// It can push bodies around and damage entities but cannot create or
/// destroy bodies; spawns go through the deferred queue.
pub struct CollisionContext<'a> {
    world: &'a mut PhysicsWorld,
    queue: &'a mut DeferredQueue,
}

impl CollisionContext<'_> {
    /// Velocity (m/s) just before the step that produced this contact
    pub fn impact_velocity(&self, body: RigidBodyHandle) -> Option<Vec2> {
        self.world
            .impact_velocity
            .get(&body)
            .copied()
            .or_else(|| self.world.velocity(body))
    }

    /// Current velocity (m/s)
    pub fn velocity(&self, body: RigidBodyHandle) -> Option<Vec2> {
        self.world.velocity(body)
    }

    pub fn set_velocity(&mut self, body: RigidBodyHandle, velocity: Vec2) {
        self.world.set_velocity(body, velocity);
    }

    /// Body position (px)
    pub fn position(&self, body: RigidBodyHandle) -> Option<Vec2> {
        self.world.body_position(body)
    }

    pub fn is_damageable(&self, id: EntityId) -> bool {
        self.world
            .entities
            .get(&id)
            .is_some_and(|e| e.as_damageable().is_some())
    }

    pub fn damage(&mut self, id: EntityId, amount: f32) -> Option<DamageOutcome> {
        self.world.damage_entity(id, amount)
    }

    /// Area blast; returns the entities that took damage
    pub fn explode(&mut self, center: Vec2, radius: f32, force: f32) -> Vec<EntityId> {
        self.world.apply_explosion(center, radius, force)
    }

    pub fn defer(&mut self, action: DeferredAction) {
        self.queue.push(action);
    }
}

/// Simulation world
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    collector: ContactCollector,

    entities: BTreeMap<EntityId, Entity>,
    owners: HashMap<RigidBodyHandle, EntityId>,
    /// Pre-step velocities of owned dynamic bodies (m/s)
    impact_velocity: HashMap<RigidBodyHandle, Vec2>,
    events: Vec<WorldEvent>,
    next_id: u32,
    /// Set while contacts are being routed
    locked: bool,
}

impl PhysicsWorld {
    pub fn new(settings: &PhysicsSettings) -> Self {
        let mut params = IntegrationParameters::default();
        params.dt = settings.timestep;
        params.num_solver_iterations =
            NonZeroUsize::new(settings.velocity_iterations).unwrap_or(NonZeroUsize::MIN);
        params.num_internal_pgs_iterations = settings.position_iterations.max(1);
        params.max_ccd_substeps = settings.ccd_substeps.max(1);

        Self {
            gravity: to_vector(settings.gravity),
            params,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            collector: ContactCollector::default(),
            entities: BTreeMap::new(),
            owners: HashMap::new(),
            impact_velocity: HashMap::new(),
            events: Vec::new(),
            next_id: 1,
            locked: false,
        }
    }

    pub fn gravity(&self) -> Vec2 {
        from_vector(&self.gravity)
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = to_vector(gravity);
    }

    // --- bodies -----------------------------------------------------------

    /// Create a body with one collider. Fails while contacts are being routed.
    pub fn create_body(&mut self, desc: &BodyDesc) -> SimResult<RigidBodyHandle> {
        if self.locked {
            return Err(SimError::WorldLocked);
        }
        let position = desc.position / crate::consts::PIXELS_PER_METER;
        let mut builder = RigidBodyBuilder::new(desc.kind.to_rapier())
            .translation(vector![position.x, position.y])
            .rotation(desc.rotation)
            .linvel(to_vector(desc.velocity))
            .gravity_scale(desc.gravity_scale)
            .ccd_enabled(desc.ccd);
        if desc.fixed_rotation {
            builder = builder.lock_rotations();
        }
        let handle = self.bodies.insert(builder.build());

        let collider = match desc.shape {
            ShapeDesc::Ball { radius } => ColliderBuilder::ball(to_meters(radius)),
            ShapeDesc::Box { half_extents } => {
                ColliderBuilder::cuboid(to_meters(half_extents.x), to_meters(half_extents.y))
            }
        }
        .density(desc.material.density)
        .friction(desc.material.friction)
        .restitution(desc.material.restitution)
        .active_events(ActiveEvents::COLLISION_EVENTS)
        .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        Ok(handle)
    }

    /// Destroy a body and everything attached to it. Fails while contacts are
    /// being routed; use `Entity::mark_for_deletion` from handlers instead.
    pub fn destroy_body(&mut self, handle: RigidBodyHandle) -> SimResult<()> {
        if self.locked {
            return Err(SimError::WorldLocked);
        }
        self.remove_body(handle);
        Ok(())
    }

    fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.impact_velocity.remove(&handle);
        if let Some(id) = self.owners.remove(&handle) {
            if let Some(entity) = self.entities.get_mut(&id) {
                entity.body = None;
            }
            self.events.push(WorldEvent::BodyDestroyed { entity: id });
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn contains_body(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    pub fn body_kind(&self, handle: RigidBodyHandle) -> Option<BodyKind> {
        self.bodies.get(handle).map(|b| match b.body_type() {
            RigidBodyType::Dynamic => BodyKind::Dynamic,
            RigidBodyType::Fixed => BodyKind::Fixed,
            RigidBodyType::KinematicPositionBased | RigidBodyType::KinematicVelocityBased => {
                BodyKind::Kinematic
            }
        })
    }

    /// Body position (px)
    pub fn body_position(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|b| {
            let t = b.translation();
            Vec2::new(to_pixels(t.x), to_pixels(t.y))
        })
    }

    /// Linear velocity (m/s)
    pub fn velocity(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|b| from_vector(b.linvel()))
    }

    pub fn set_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(to_vector(velocity), true);
        }
    }

    pub fn gravity_scale(&self, handle: RigidBodyHandle) -> Option<f32> {
        self.bodies.get(handle).map(|b| b.gravity_scale())
    }

    pub fn set_gravity_scale(&mut self, handle: RigidBodyHandle, scale: f32) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_gravity_scale(scale, true);
        }
    }

    /// Set restitution on every collider of the body
    pub fn set_restitution(&mut self, handle: RigidBodyHandle, restitution: f32) {
        let Some(body) = self.bodies.get(handle) else {
            return;
        };
        for &collider in body.colliders() {
            if let Some(collider) = self.colliders.get_mut(collider) {
                collider.set_restitution(restitution);
            }
        }
    }

    pub fn restitution(&self, handle: RigidBodyHandle) -> Option<f32> {
        let body = self.bodies.get(handle)?;
        let collider = body.colliders().first()?;
        self.colliders.get(*collider).map(|c| c.restitution())
    }

    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_impulse(to_vector(impulse), true);
        }
    }

    // --- entities ---------------------------------------------------------

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create a body and register an entity owning it
    pub fn spawn(&mut self, kind: EntityKind, desc: &BodyDesc) -> SimResult<EntityId> {
        let handle = self.create_body(desc)?;
        let id = self.allocate_id();
        let mut transform = Transform::new(desc.position, desc.shape.size());
        transform.rotation = desc.rotation;
        let mut entity = Entity::new(id, kind, transform);
        entity.body = Some(handle);
        self.entities.insert(id, entity);
        self.owners.insert(handle, id);
        Ok(id)
    }

    /// Destroy the entity's body (if any) and unregister it
    pub fn despawn(&mut self, id: EntityId) -> SimResult<Entity> {
        if self.locked {
            return Err(SimError::WorldLocked);
        }
        let body = self
            .entities
            .get(&id)
            .ok_or(SimError::UnknownEntity(id))?
            .body;
        if let Some(handle) = body {
            self.remove_body(handle);
        }
        self.entities.remove(&id).ok_or(SimError::UnknownEntity(id))
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Entities in id order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Owner of a body, if one is registered
    pub fn owner(&self, handle: RigidBodyHandle) -> Option<EntityId> {
        self.owners.get(&handle).copied()
    }

    fn owner_of_collider(&self, collider: ColliderHandle) -> Option<EntityId> {
        let parent = self.colliders.get(collider)?.parent()?;
        self.owner(parent)
    }

    /// Move an entity (px); ignored once it is marked for deletion
    pub fn set_entity_position(&mut self, id: EntityId, position: Vec2) -> SimResult<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(SimError::UnknownEntity(id))?;
        if entity.is_marked() {
            return Ok(());
        }
        entity.transform.position = position;
        if let Some(body) = entity.body.and_then(|h| self.bodies.get_mut(h)) {
            let m = position / crate::consts::PIXELS_PER_METER;
            let rotation = body.rotation().angle();
            body.set_position(Isometry::new(vector![m.x, m.y], rotation), true);
        }
        Ok(())
    }

    /// Rotate an entity (radians); ignored once it is marked for deletion
    pub fn set_entity_rotation(&mut self, id: EntityId, rotation: f32) -> SimResult<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(SimError::UnknownEntity(id))?;
        if entity.is_marked() {
            return Ok(());
        }
        entity.transform.rotation = rotation;
        if let Some(body) = entity.body.and_then(|h| self.bodies.get_mut(h)) {
            let t = *body.translation();
            body.set_position(Isometry::new(t, rotation), true);
        }
        Ok(())
    }

    /// Switch a held projectile to dynamic and send it off along `direction`
    /// with `force` (px/s). One-way: a second launch is an error.
    pub fn launch(&mut self, id: EntityId, direction: Vec2, force: f32) -> SimResult<()> {
        if self.locked {
            return Err(SimError::WorldLocked);
        }
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(SimError::UnknownEntity(id))?;
        let handle = entity.body.ok_or(SimError::MissingBody(id))?;
        let projectile = entity
            .as_projectile_mut()
            .ok_or(SimError::NotAProjectile(id))?;
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(SimError::MissingBody(id))?;
        projectile.mark_launched(id)?;
        body.set_body_type(RigidBodyType::Dynamic, true);
        body.set_linvel(to_vector(launch_velocity(direction, force)), true);
        Ok(())
    }

    /// Damage an entity and report it
    pub fn damage_entity(&mut self, id: EntityId, amount: f32) -> Option<DamageOutcome> {
        let outcome = self.entities.get_mut(&id)?.damage(amount)?;
        self.events.push(WorldEvent::Damaged {
            entity: id,
            amount,
            destroyed: outcome == DamageOutcome::Destroyed,
        });
        Some(outcome)
    }

    // --- joints -----------------------------------------------------------

    pub fn create_joint(
        &mut self,
        first: EntityId,
        second: EntityId,
        desc: &JointDesc,
    ) -> SimResult<ImpulseJointHandle> {
        if self.locked {
            return Err(SimError::WorldLocked);
        }
        let body1 = self.body_of(first)?;
        let body2 = self.body_of(second)?;
        let joint: GenericJoint = match *desc {
            JointDesc::Fixed { anchor1, anchor2 } => FixedJointBuilder::new()
                .local_anchor1(to_point(anchor1))
                .local_anchor2(to_point(anchor2))
                .build()
                .into(),
            JointDesc::Revolute { anchor1, anchor2 } => RevoluteJointBuilder::new()
                .local_anchor1(to_point(anchor1))
                .local_anchor2(to_point(anchor2))
                .build()
                .into(),
            JointDesc::Spring {
                rest_length,
                stiffness,
                damping,
            } => SpringJointBuilder::new(to_meters(rest_length), stiffness, damping)
                .build()
                .into(),
        };
        Ok(self.impulse_joints.insert(body1, body2, joint, true))
    }

    pub fn remove_joint(&mut self, handle: ImpulseJointHandle) {
        self.impulse_joints.remove(handle, true);
    }

    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    fn body_of(&self, id: EntityId) -> SimResult<RigidBodyHandle> {
        self.entities
            .get(&id)
            .ok_or(SimError::UnknownEntity(id))?
            .body
            .ok_or(SimError::MissingBody(id))
    }

    // --- stepping ---------------------------------------------------------

    /// One full update: step, route contacts, sweep marked bodies, sync poses
    pub fn update(&mut self, dt: f32, queue: &mut DeferredQueue) {
        self.params.dt = dt;
        self.step(queue);
        self.sweep_marked();
        self.sync_transforms();
    }

    /// Integrate one step and route the begin-contacts it produced
    pub fn step(&mut self, queue: &mut DeferredQueue) {
        self.snapshot_velocities();
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.collector,
        );

        for (a, b) in self.collector.take_started() {
            let first = self.owner_of_collider(a);
            let second = self.owner_of_collider(b);
            self.route_contact(first, second, queue);
        }
    }

    fn snapshot_velocities(&mut self) {
        self.impact_velocity.clear();
        for &handle in self.owners.keys() {
            if let Some(body) = self.bodies.get(handle).filter(|b| b.is_dynamic()) {
                self.impact_velocity
                    .insert(handle, from_vector(body.linvel()));
            }
        }
    }

    /// Invoke `on_collision` on each side that has an owner, passing the
    /// other side. Handler errors are recorded and do not stop routing.
    pub fn route_contact(
        &mut self,
        first: Option<EntityId>,
        second: Option<EntityId>,
        queue: &mut DeferredQueue,
    ) {
        if first.is_none() && second.is_none() {
            return;
        }
        self.events.push(WorldEvent::Contact { first, second });

        let was_locked = std::mem::replace(&mut self.locked, true);
        for (this, other) in [(first, second), (second, first)] {
            let Some(id) = this else { continue };
            // Detach so the handler can borrow the rest of the world
            let Some(mut entity) = self.entities.remove(&id) else {
                continue;
            };
            let result = {
                let mut ctx = CollisionContext {
                    world: &mut *self,
                    queue: &mut *queue,
                };
                entity.on_collision(other, &mut ctx)
            };
            self.entities.insert(id, entity);
            if let Err(err) = result {
                self.events.push(WorldEvent::HandlerFailed {
                    entity: id,
                    error: err.to_string(),
                });
            }
        }
        self.locked = was_locked;
    }

    /// Destroy the bodies of every marked entity. The entities stay
    /// registered (bodiless) until their owner despawns them.
    pub fn sweep_marked(&mut self) -> usize {
        let doomed: Vec<RigidBodyHandle> = self
            .entities
            .values()
            .filter(|e| e.is_marked())
            .filter_map(|e| e.body)
            .collect();
        let count = doomed.len();
        for handle in doomed {
            self.remove_body(handle);
        }
        count
    }

    /// Copy body poses into entity transforms
    pub fn sync_transforms(&mut self) {
        for entity in self.entities.values_mut() {
            if let Some(body) = entity.body.and_then(|h| self.bodies.get(h)) {
                entity.sync_from_body(body);
            }
        }
    }

    /// Push every body whose center lies within `radius` px of
    /// `center` with `(1 - d/r) * force`, outward, and damage its owner by
    /// the same amount. Returns the damaged entities.
    pub fn apply_explosion(&mut self, center: Vec2, radius: f32, force: f32) -> Vec<EntityId> {
        let c = center / crate::consts::PIXELS_PER_METER;
        let r = to_meters(radius);
        let aabb = Aabb::new(to_point(c - Vec2::splat(r)), to_point(c + Vec2::splat(r)));

        // Bodies created since the last step are not in the tree yet
        self.query_pipeline.update(&self.colliders);
        let mut candidates: Vec<RigidBodyHandle> = Vec::new();
        self.query_pipeline
            .colliders_with_aabb_intersecting_aabb(&aabb, |&collider| {
                if let Some(parent) = self.colliders.get(collider).and_then(|c| c.parent()) {
                    candidates.push(parent);
                }
                true
            });
        // One push per body, in a stable order
        candidates.sort_by_key(|handle| handle.into_raw_parts());
        candidates.dedup();

        let mut pushed = 0;
        let mut damaged = Vec::new();
        for handle in candidates {
            let Some(body) = self.bodies.get_mut(handle) else {
                continue;
            };
            let offset = from_vector(body.translation()) - c;
            let distance = offset.length();
            if distance > r {
                continue;
            }
            let intensity = (1.0 - distance / r) * force;
            body.apply_impulse(to_vector(offset.normalize_or_zero() * intensity), true);
            pushed += 1;

            if let Some(id) = self.owner(handle) {
                if self.damage_entity(id, intensity).is_some() {
                    damaged.push(id);
                }
            }
        }

        self.events.push(WorldEvent::Explosion {
            center,
            radius,
            bodies_pushed: pushed,
            damaged: damaged.clone(),
        });
        damaged
    }

    /// Remove every body, joint and entity
    pub fn clear(&mut self) -> SimResult<()> {
        if self.locked {
            return Err(SimError::WorldLocked);
        }
        let handles: Vec<RigidBodyHandle> = self.bodies.iter().map(|(h, _)| h).collect();
        for handle in handles {
            self.remove_body(handle);
        }
        self.entities.clear();
        self.owners.clear();
        self.impact_velocity.clear();
        self.collector.take_started();
        Ok(())
    }

    /// Take the events recorded since the last call
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Outlines of every collider (px)
    pub fn debug_shapes(&self) -> Vec<DebugShape> {
        self.colliders
            .iter()
            .filter_map(|(_, collider)| {
                let iso = collider.position();
                let shape = collider.shape();
                if let Some(ball) = shape.as_ball() {
                    let t = iso.translation.vector;
                    Some(DebugShape::Circle {
                        center: Vec2::new(to_pixels(t.x), to_pixels(t.y)),
                        radius: to_pixels(ball.radius),
                    })
                } else {
                    let he = shape.as_cuboid()?.half_extents;
                    let corners = [(-he.x, -he.y), (he.x, -he.y), (he.x, he.y), (-he.x, he.y)];
                    Some(DebugShape::Polygon {
                        points: corners.map(|(x, y)| {
                            let p = iso * point![x, y];
                            Vec2::new(to_pixels(p.x), to_pixels(p.y))
                        }),
                    })
                }
            })
            .collect()
    }
}

fn to_vector(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn from_vector(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// px → local anchor point in meters
fn to_point(v: Vec2) -> Point<Real> {
    point![to_meters(v.x), to_meters(v.y)]
}
