//! Entities: destructible blocks and enemies, and projectiles
//!
//! Every entity carries a visual transform in pixels and optionally owns one
//! rigid body. Collision reactions dispatch on `EntityKind`; damage goes
//! through the `Damageable` capability so callers never need to know which
//! concrete variant they hold.

use std::fmt;

use glam::Vec2;
use rapier2d::prelude::{RigidBody, RigidBodyHandle};
use serde::{Deserialize, Serialize};

use super::physics::CollisionContext;
use super::projectile::{Impact, Projectile};
use crate::consts::ENTITY_HEALTH;
use crate::error::{SimError, SimResult};
use crate::to_pixels;

/// Stable entity identifier (allocated by the physics world)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Visual placement in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec2,
    /// Rotation in radians
    pub rotation: f32,
    /// Drawn size (width, height)
    pub size: Vec2,
}

impl Transform {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            rotation: 0.0,
            size,
        }
    }
}

/// Something that can take damage
pub trait Damageable {
    fn health(&self) -> f32;

    /// Subtract `amount`; returns true once health is depleted
    fn apply_damage(&mut self, amount: f32) -> bool;
}

/// Hit points of a destructible
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn fraction(&self) -> f32 {
        (self.current / self.max).clamp(0.0, 1.0)
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(ENTITY_HEALTH)
    }
}

impl Damageable for Health {
    fn health(&self) -> f32 {
        self.current
    }

    fn apply_damage(&mut self, amount: f32) -> bool {
        // Negative damage never heals
        self.current -= amount.max(0.0);
        self.current <= 0.0
    }
}

/// Variant-specific entity data
#[derive(Debug, Clone)]
pub enum EntityKind {
    Block(Health),
    Enemy(Health),
    Projectile(Projectile),
}

/// Kind without payload, for events and counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityTag {
    Block,
    Enemy,
    Projectile,
}

/// Result of damaging an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Survived,
    Destroyed,
}

/// A simulated actor
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub transform: Transform,
    pub(crate) body: Option<RigidBodyHandle>,
    marked: bool,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, transform: Transform) -> Self {
        Self {
            id,
            kind,
            transform,
            body: None,
            marked: false,
        }
    }

    pub fn tag(&self) -> EntityTag {
        match self.kind {
            EntityKind::Block(_) => EntityTag::Block,
            EntityKind::Enemy(_) => EntityTag::Enemy,
            EntityKind::Projectile(_) => EntityTag::Projectile,
        }
    }

    pub fn body(&self) -> Option<RigidBodyHandle> {
        self.body
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Request removal; idempotent
    pub fn mark_for_deletion(&mut self) {
        self.marked = true;
    }

    pub fn is_enemy(&self) -> bool {
        matches!(self.kind, EntityKind::Enemy(_))
    }

    pub fn is_projectile(&self) -> bool {
        matches!(self.kind, EntityKind::Projectile(_))
    }

    pub fn as_projectile(&self) -> Option<&Projectile> {
        match &self.kind {
            EntityKind::Projectile(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_projectile_mut(&mut self) -> Option<&mut Projectile> {
        match &mut self.kind {
            EntityKind::Projectile(p) => Some(p),
            _ => None,
        }
    }

    /// Damage capability, if this variant has one
    pub fn as_damageable(&self) -> Option<&dyn Damageable> {
        match &self.kind {
            EntityKind::Block(health) | EntityKind::Enemy(health) => Some(health),
            EntityKind::Projectile(_) => None,
        }
    }

    pub fn as_damageable_mut(&mut self) -> Option<&mut dyn Damageable> {
        match &mut self.kind {
            EntityKind::Block(health) | EntityKind::Enemy(health) => Some(health),
            EntityKind::Projectile(_) => None,
        }
    }

    /// Apply damage; marks the entity once health is depleted.
    /// Returns `None` for entities that cannot be damaged.
    pub fn damage(&mut self, amount: f32) -> Option<DamageOutcome> {
        let depleted = self.as_damageable_mut()?.apply_damage(amount);
        if depleted {
            self.mark_for_deletion();
            Some(DamageOutcome::Destroyed)
        } else {
            Some(DamageOutcome::Survived)
        }
    }

    /// Copy the body's pose into the visual transform
    pub fn sync_from_body(&mut self, body: &RigidBody) {
        let t = body.translation();
        self.transform.position = Vec2::new(to_pixels(t.x), to_pixels(t.y));
        self.transform.rotation = body.rotation().angle();
    }

    /// React to a contact with `other` (`None` for bodies without an entity,
    /// such as the ground). Marked entities no longer react.
    pub fn on_collision(
        &mut self,
        other: Option<EntityId>,
        ctx: &mut CollisionContext<'_>,
    ) -> SimResult<()> {
        if self.marked {
            return Ok(());
        }
        let id = self.id;
        let body = self.body;
        match &mut self.kind {
            // Destructibles are passive: projectiles and explosions damage them
            EntityKind::Block(_) | EntityKind::Enemy(_) => Ok(()),
            EntityKind::Projectile(projectile) => {
                let body = body.ok_or(SimError::MissingBody(id))?;
                if projectile.on_impact(id, body, other, ctx)? == Impact::Consumed {
                    self.mark_for_deletion();
                }
                Ok(())
            }
        }
    }
}
