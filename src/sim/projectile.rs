//! Projectile kinds and their collision effects
//!
//! A projectile sits kinematic in the sling until `launch`, then flies as a
//! dynamic body. On each qualifying contact (launched and not yet marked) its
//! kind decides what happens:
//! - Standard / Heavy: damage a destructible counterpart, keep flying
//! - Bouncy: speed up for a fixed number of bounces, then expire
//! - Explosive: one area blast, then linger while the blast is drawn
//! - Split: queue two Standard children, then expire

use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};

use super::deferred::{DeferredAction, SplitSpawn};
use super::entity::EntityId;
use super::physics::CollisionContext;
use crate::consts::DAMAGE_REFERENCE_SPEED;
use crate::error::{SimError, SimResult};

/// Bounces granted to a Bouncy projectile
pub const MAX_BOUNCES: u32 = 5;
/// Velocity multiplier applied on each bounce
pub const BOUNCE_VELOCITY_FACTOR: f32 = 1.1;
/// Explosion radius in pixels
pub const EXPLOSION_RADIUS: f32 = 100.0;
/// How long an explosion stays visible (seconds)
pub const EXPLOSION_EFFECT_DURATION: f32 = 0.5;
/// Half-angle between split children (radians)
pub const SPLIT_HALF_ANGLE: f32 = 15.0 * std::f32::consts::PI / 180.0;

/// Projectile types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Plain impact damage
    #[default]
    Standard,
    /// Springy, gains speed on each bounce
    Bouncy,
    /// Area blast on first impact
    Explosive,
    /// Falls faster, hits twice as hard
    Heavy,
    /// Splits into two on first impact
    Split,
}

impl ProjectileKind {
    pub const ALL: [ProjectileKind; 5] = [
        ProjectileKind::Standard,
        ProjectileKind::Bouncy,
        ProjectileKind::Explosive,
        ProjectileKind::Heavy,
        ProjectileKind::Split,
    ];

    pub fn index(self) -> usize {
        match self {
            ProjectileKind::Standard => 0,
            ProjectileKind::Bouncy => 1,
            ProjectileKind::Explosive => 2,
            ProjectileKind::Heavy => 3,
            ProjectileKind::Split => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectileKind::Standard => "Standard",
            ProjectileKind::Bouncy => "Bouncy",
            ProjectileKind::Explosive => "Explosive",
            ProjectileKind::Heavy => "Heavy",
            ProjectileKind::Split => "Split",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Some(ProjectileKind::Standard),
            "bouncy" => Some(ProjectileKind::Bouncy),
            "explosive" => Some(ProjectileKind::Explosive),
            "heavy" => Some(ProjectileKind::Heavy),
            "split" => Some(ProjectileKind::Split),
            _ => None,
        }
    }

    pub fn base_damage(&self) -> f32 {
        match self {
            ProjectileKind::Standard | ProjectileKind::Heavy => 100.0,
            ProjectileKind::Bouncy => 30.0,
            ProjectileKind::Explosive => 200.0,
            ProjectileKind::Split => 40.0,
        }
    }

    pub fn restitution(&self) -> f32 {
        match self {
            ProjectileKind::Bouncy => 0.8,
            _ => 0.5,
        }
    }

    pub fn gravity_scale(&self) -> f32 {
        match self {
            ProjectileKind::Heavy => 1.5,
            _ => 1.0,
        }
    }

    fn damage_multiplier(&self) -> f32 {
        match self {
            ProjectileKind::Heavy => 2.0,
            _ => 1.0,
        }
    }
}

/// Registered split behaviour; children are created without one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitHook {
    pub half_angle: f32,
}

/// What a contact did to the projectile itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Impact {
    /// Nothing happened (not launched yet)
    Ignored,
    /// Effect applied, projectile keeps flying
    Continue,
    /// Projectile is spent and must be marked for deletion
    Consumed,
}

/// Projectile state machine
#[derive(Debug, Clone)]
pub struct Projectile {
    pub kind: ProjectileKind,
    launched: bool,
    /// Seconds of flight left; only counts down after launch
    lifetime: f32,
    bounces_left: u32,
    exploded: bool,
    explosion_timer: f32,
    split: Option<SplitHook>,
}

impl Projectile {
    pub fn new(kind: ProjectileKind, lifetime: f32) -> Self {
        Self {
            kind,
            launched: false,
            lifetime,
            bounces_left: if kind == ProjectileKind::Bouncy {
                MAX_BOUNCES
            } else {
                0
            },
            exploded: false,
            explosion_timer: 0.0,
            split: (kind == ProjectileKind::Split).then_some(SplitHook {
                half_angle: SPLIT_HALF_ANGLE,
            }),
        }
    }

    /// Drop the split hook (used for split children)
    pub fn without_split_hook(mut self) -> Self {
        self.split = None;
        self
    }

    pub fn split_hook(&self) -> Option<SplitHook> {
        self.split
    }

    pub fn is_launched(&self) -> bool {
        self.launched
    }

    pub fn bounces_left(&self) -> u32 {
        self.bounces_left
    }

    pub fn has_exploded(&self) -> bool {
        self.exploded
    }

    pub fn lifetime(&self) -> f32 {
        self.lifetime
    }

    pub fn is_expired(&self) -> bool {
        self.launched && self.lifetime <= 0.0
    }

    /// Explosion blast currently visible
    pub fn explosion_visible(&self) -> bool {
        self.explosion_timer > 0.0
    }

    /// An effect still needs this projectile alive
    pub fn is_effect_active(&self) -> bool {
        self.explosion_visible() || self.bounces_left > 0
    }

    /// Damage dealt at `speed` (m/s); linear in speed
    pub fn calculate_damage(&self, speed: f32) -> f32 {
        self.kind.base_damage() * (speed / DAMAGE_REFERENCE_SPEED) * self.kind.damage_multiplier()
    }

    /// Kinematic to dynamic happens exactly once
    pub(crate) fn mark_launched(&mut self, id: EntityId) -> SimResult<()> {
        if self.launched {
            return Err(SimError::AlreadyLaunched(id));
        }
        self.launched = true;
        Ok(())
    }

    /// Advance timers by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        if self.launched {
            self.lifetime -= dt;
        }
        if self.explosion_timer > 0.0 {
            self.explosion_timer = (self.explosion_timer - dt).max(0.0);
        }
    }

    /// Apply this projectile's effect for a contact with `other`
    pub fn on_impact(
        &mut self,
        id: EntityId,
        body: RigidBodyHandle,
        other: Option<EntityId>,
        ctx: &mut CollisionContext<'_>,
    ) -> SimResult<Impact> {
        if !self.launched {
            return Ok(Impact::Ignored);
        }

        match self.kind {
            ProjectileKind::Standard | ProjectileKind::Heavy => {
                if let Some(other) = other.filter(|o| ctx.is_damageable(*o)) {
                    let speed = ctx
                        .impact_velocity(body)
                        .ok_or(SimError::MissingBody(id))?
                        .length();
                    ctx.damage(other, self.calculate_damage(speed));
                }
                Ok(Impact::Continue)
            }
            ProjectileKind::Bouncy => {
                if self.bounces_left == 0 {
                    return Ok(Impact::Consumed);
                }
                self.bounces_left -= 1;
                let velocity = ctx.velocity(body).ok_or(SimError::MissingBody(id))?;
                ctx.set_velocity(body, velocity * BOUNCE_VELOCITY_FACTOR);
                Ok(Impact::Continue)
            }
            ProjectileKind::Explosive => {
                if self.exploded {
                    return Ok(Impact::Consumed);
                }
                self.exploded = true;
                self.explosion_timer = EXPLOSION_EFFECT_DURATION;
                let center = ctx.position(body).ok_or(SimError::MissingBody(id))?;
                ctx.explode(center, EXPLOSION_RADIUS, self.kind.base_damage());
                Ok(Impact::Consumed)
            }
            ProjectileKind::Split => {
                if let Some(hook) = self.split.take() {
                    let position = ctx.position(body).ok_or(SimError::MissingBody(id))?;
                    let velocity = ctx
                        .impact_velocity(body)
                        .ok_or(SimError::MissingBody(id))?;
                    ctx.defer(DeferredAction::Split(SplitSpawn {
                        parent: id,
                        position,
                        velocity,
                        half_angle: hook.half_angle,
                    }));
                }
                Ok(Impact::Consumed)
            }
        }
    }
}

/// Per-level projectile availability and the current selection.
/// Standard is always available; every other kind can be launched once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arsenal {
    available: [bool; 5],
    selected: ProjectileKind,
}

impl Default for Arsenal {
    fn default() -> Self {
        Self {
            available: [true; 5],
            selected: ProjectileKind::Standard,
        }
    }
}

impl Arsenal {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_available(&self, kind: ProjectileKind) -> bool {
        kind == ProjectileKind::Standard || self.available[kind.index()]
    }

    pub fn selected(&self) -> ProjectileKind {
        self.selected
    }

    /// Select `kind` if it is still available
    pub fn select(&mut self, kind: ProjectileKind) -> bool {
        if !self.is_available(kind) {
            return false;
        }
        self.selected = kind;
        true
    }

    /// Kind to load next: the selection, or Standard if it was spent
    pub fn loadout(&self) -> ProjectileKind {
        if self.is_available(self.selected) {
            self.selected
        } else {
            ProjectileKind::Standard
        }
    }

    /// Record a launch of `kind`
    pub fn spend(&mut self, kind: ProjectileKind) {
        if kind == ProjectileKind::Standard {
            return;
        }
        self.available[kind.index()] = false;
        if self.selected == kind {
            self.selected = ProjectileKind::Standard;
        }
    }

    /// Availability flags in `ProjectileKind::ALL` order
    pub fn availability(&self) -> [bool; 5] {
        let mut flags = self.available;
        flags[ProjectileKind::Standard.index()] = true;
        flags
    }
}

/// Launch velocity (m/s) for a direction and a force in pixels per second
pub fn launch_velocity(direction: Vec2, force: f32) -> Vec2 {
    direction.normalize_or_zero() * crate::to_meters(force)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_scales_with_speed() {
        let standard = Projectile::new(ProjectileKind::Standard, 10.0);
        assert_eq!(standard.calculate_damage(10.0), 100.0);
        assert_eq!(standard.calculate_damage(20.0), 200.0);
        assert_eq!(standard.calculate_damage(0.0), 0.0);

        let heavy = Projectile::new(ProjectileKind::Heavy, 10.0);
        assert_eq!(heavy.calculate_damage(10.0), 200.0);

        let bouncy = Projectile::new(ProjectileKind::Bouncy, 10.0);
        assert_eq!(bouncy.calculate_damage(5.0), 15.0);
    }

    #[test]
    fn test_kind_defaults() {
        assert_eq!(Projectile::new(ProjectileKind::Bouncy, 1.0).bounces_left(), MAX_BOUNCES);
        assert_eq!(Projectile::new(ProjectileKind::Standard, 1.0).bounces_left(), 0);
        assert!(Projectile::new(ProjectileKind::Split, 1.0).split_hook().is_some());
        assert!(Projectile::new(ProjectileKind::Heavy, 1.0).split_hook().is_none());
        assert!(
            Projectile::new(ProjectileKind::Split, 1.0)
                .without_split_hook()
                .split_hook()
                .is_none()
        );
        assert_eq!(ProjectileKind::Heavy.gravity_scale(), 1.5);
        assert_eq!(ProjectileKind::from_str("EXPLOSIVE"), Some(ProjectileKind::Explosive));
        assert_eq!(ProjectileKind::from_str("laser"), None);
    }

    #[test]
    fn test_launch_is_one_way() {
        let mut p = Projectile::new(ProjectileKind::Standard, 10.0);
        assert!(!p.is_launched());
        assert!(p.mark_launched(EntityId(1)).is_ok());
        assert!(matches!(
            p.mark_launched(EntityId(1)),
            Err(SimError::AlreadyLaunched(EntityId(1)))
        ));
        assert!(p.is_launched());
    }

    #[test]
    fn test_lifetime_counts_only_after_launch() {
        let mut p = Projectile::new(ProjectileKind::Standard, 1.0);
        for _ in 0..200 {
            p.tick(0.1);
        }
        assert!(!p.is_expired());
        p.mark_launched(EntityId(1)).unwrap();
        for _ in 0..10 {
            p.tick(0.1);
        }
        assert!(p.is_expired());
    }

    #[test]
    fn test_arsenal_spend_and_fallback() {
        let mut arsenal = Arsenal::default();
        assert!(arsenal.select(ProjectileKind::Explosive));
        assert_eq!(arsenal.loadout(), ProjectileKind::Explosive);

        arsenal.spend(ProjectileKind::Explosive);
        assert!(!arsenal.is_available(ProjectileKind::Explosive));
        assert_eq!(arsenal.selected(), ProjectileKind::Standard);
        assert!(!arsenal.select(ProjectileKind::Explosive));

        arsenal.spend(ProjectileKind::Standard);
        assert!(arsenal.is_available(ProjectileKind::Standard));

        arsenal.reset();
        assert!(arsenal.is_available(ProjectileKind::Explosive));
        assert_eq!(arsenal.availability(), [true; 5]);
    }

    #[test]
    fn test_launch_velocity_converts_to_meters() {
        let v = launch_velocity(Vec2::new(3.0, 4.0), 300.0);
        assert!((v - Vec2::new(6.0, 8.0)).length() < 1e-4);
        assert_eq!(launch_velocity(Vec2::ZERO, 300.0), Vec2::ZERO);
    }
}
