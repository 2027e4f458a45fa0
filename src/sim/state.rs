//! Level state and lifecycle
//!
//! `GameState` owns the physics world, the deferred queue, the sling and the
//! per-level counters. Building, restarting and clearing levels happens here;
//! the per-tick ordering lives in `tick.rs`.

use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};

use super::deferred::{DeferredAction, DeferredQueue};
use super::entity::{EntityId, EntityKind, EntityTag, Health};
use super::level::{Layout, PieceKind, build_layout};
use super::physics::{BodyDesc, BodyKind, JointDesc, Material, PhysicsWorld, ShapeDesc, WorldEvent};
use super::projectile::{Arsenal, Projectile, ProjectileKind};
use super::slingshot::Slingshot;
use crate::consts::{LEVEL_COUNT, PROJECTILE_RADIUS};
use crate::error::SimResult;
use crate::settings::Settings;

/// Where the level stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelPhase {
    /// No level loaded
    Building,
    /// Shots can be fired
    Active,
    /// All enemies destroyed
    Completed,
    /// Out of projectiles with enemies left
    Failed,
}

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    LevelStarted { level: u32 },
    LevelCompleted { level: u32 },
    LevelFailed { level: u32 },
    ProjectileLoaded { kind: ProjectileKind },
    ProjectileLaunched { kind: ProjectileKind, speed: f32 },
    ProjectileSplit { parent: EntityId },
    Explosion { center: Vec2, radius: f32 },
    EntityDestroyed { id: EntityId, tag: EntityTag },
    /// A collision handler or deferred action failed and was skipped
    Fault { message: String },
}

/// Counters the HUD shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hud {
    pub level: u32,
    pub phase: LevelPhase,
    pub projectiles_left: u32,
    pub enemies_left: u32,
    pub selected: ProjectileKind,
    /// In `ProjectileKind::ALL` order
    pub available: [bool; 5],
}

const BLOCK_MATERIAL: Material = Material {
    density: 0.8,
    friction: 0.5,
    restitution: 0.2,
};

const ENEMY_MATERIAL: Material = Material {
    density: 0.9,
    friction: 0.3,
    restitution: 0.15,
};

const PROJECTILE_DENSITY: f32 = 1.0;
const PROJECTILE_FRICTION: f32 = 0.3;

const GROUND_MATERIAL: Material = Material {
    density: 1.0,
    friction: 0.3,
    restitution: 0.1,
};

/// Complete level state
pub struct GameState {
    pub settings: Settings,
    pub physics: PhysicsWorld,
    pub deferred: DeferredQueue,
    pub slingshot: Slingshot,
    pub arsenal: Arsenal,
    /// Current level number (1-based)
    pub level: u32,
    pub phase: LevelPhase,
    pub projectiles_left: u32,
    pub enemies_left: u32,
    /// The last projectile of the level has been fired
    pub final_launched: bool,
    /// Preview path while dragging (px)
    pub trajectory: Vec<Vec2>,
    /// Events since the presentation layer last drained them
    pub events: Vec<GameEvent>,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub debug_draw: bool,
    /// Projectile waiting in the sling
    pub(crate) loaded: Option<EntityId>,
    ground: Option<RigidBodyHandle>,
}

impl GameState {
    /// Create an empty state; call `set_level` to start playing
    pub fn new(settings: Settings) -> SimResult<Self> {
        settings.validate()?;
        let slingshot = Slingshot::new(&settings.sling, settings.sling_rest());
        Ok(Self {
            physics: PhysicsWorld::new(&settings.physics),
            deferred: DeferredQueue::new(),
            slingshot,
            arsenal: Arsenal::default(),
            level: 0,
            phase: LevelPhase::Building,
            projectiles_left: 0,
            enemies_left: 0,
            final_launched: false,
            trajectory: Vec::new(),
            events: Vec::new(),
            time_ticks: 0,
            debug_draw: settings.debug_draw,
            loaded: None,
            ground: None,
            settings,
        })
    }

    pub fn is_level_completed(&self) -> bool {
        self.phase == LevelPhase::Completed
    }

    pub fn is_level_failed(&self) -> bool {
        self.phase == LevelPhase::Failed
    }

    pub fn loaded_projectile(&self) -> Option<EntityId> {
        self.loaded
    }

    pub fn ground_body(&self) -> Option<RigidBodyHandle> {
        self.ground
    }

    /// Projectile entities in id order
    pub fn projectile_ids(&self) -> Vec<EntityId> {
        self.physics
            .entities()
            .filter(|e| e.is_projectile())
            .map(|e| e.id)
            .collect()
    }

    /// Live (unmarked) enemies
    pub fn count_enemies(&self) -> u32 {
        self.physics
            .entities()
            .filter(|e| e.is_enemy() && !e.is_marked())
            .count() as u32
    }

    pub fn hud(&self) -> Hud {
        Hud {
            level: self.level,
            phase: self.phase,
            projectiles_left: self.projectiles_left,
            enemies_left: self.enemies_left,
            selected: self.arsenal.selected(),
            available: self.arsenal.availability(),
        }
    }

    /// Take pending presentation events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // --- lifecycle --------------------------------------------------------

    /// Tear down and build `level`. An unknown level number is reported and
    /// leaves an empty playfield.
    pub fn set_level(&mut self, level: u32) {
        self.clear_level();
        self.level = level;
        self.projectiles_left = self.settings.projectiles_per_level;
        self.final_launched = false;
        self.arsenal.reset();
        self.time_ticks = 0;

        if let Err(err) = self.build_ground() {
            log::warn!("Failed to create ground: {err}");
        }
        match build_layout(level, self.settings.ground_y()) {
            Ok(mut layout) => {
                if let Some(seed) = self.settings.layout_seed {
                    layout.jitter(seed.wrapping_add(level as u64), self.settings.layout_jitter);
                }
                if let Err(err) = self.spawn_layout(&layout) {
                    log::warn!("Level {level} layout incomplete: {err}");
                }
                log::info!(
                    "Level {level}: {} blocks, {} enemies",
                    layout.block_count(),
                    layout.enemy_count()
                );
            }
            Err(err) => log::warn!("{err}; starting an empty level"),
        }

        self.enemies_left = self.count_enemies();
        if let Err(err) = self.load_projectile() {
            log::warn!("Failed to load projectile: {err}");
        }
        self.phase = LevelPhase::Active;
        self.events.push(GameEvent::LevelStarted { level });
    }

    pub fn restart_level(&mut self) {
        self.set_level(self.level);
    }

    /// Move on to the next designed level; false after the last one
    pub fn advance_level(&mut self) -> bool {
        if self.level >= LEVEL_COUNT {
            return false;
        }
        self.set_level(self.level + 1);
        true
    }

    /// Destroy every body and entity and drop pending work
    pub fn clear_level(&mut self) {
        if let Err(err) = self.physics.clear() {
            log::warn!("Failed to clear physics world: {err}");
        }
        self.physics.drain_events();
        self.deferred.clear();
        self.slingshot.cancel();
        self.trajectory.clear();
        self.loaded = None;
        self.ground = None;
        self.enemies_left = 0;
        self.phase = LevelPhase::Building;
    }

    fn build_ground(&mut self) -> SimResult<()> {
        let width = self.settings.playfield.x;
        let height = self.settings.ground_height.max(1.0);
        let desc = BodyDesc::new(
            BodyKind::Fixed,
            ShapeDesc::Box {
                half_extents: Vec2::new(width / 2.0, height / 2.0),
            },
        )
        .with_position(Vec2::new(width / 2.0, self.settings.ground_y() + height / 2.0))
        .with_material(GROUND_MATERIAL);
        self.ground = Some(self.physics.create_body(&desc)?);
        Ok(())
    }

    fn spawn_layout(&mut self, layout: &Layout) -> SimResult<()> {
        let mut ids = Vec::with_capacity(layout.pieces.len());
        for piece in &layout.pieces {
            let shape = ShapeDesc::Box {
                half_extents: piece.size / 2.0,
            };
            let (kind, desc) = match piece.kind {
                PieceKind::Block => (
                    EntityKind::Block(Health::default()),
                    BodyDesc::new(BodyKind::Dynamic, shape).with_material(BLOCK_MATERIAL),
                ),
                PieceKind::Enemy => (
                    EntityKind::Enemy(Health::default()),
                    BodyDesc::new(BodyKind::Dynamic, shape)
                        .with_material(ENEMY_MATERIAL)
                        .with_fixed_rotation(true),
                ),
            };
            ids.push(self.physics.spawn(kind, &desc.with_position(piece.center))?);
        }
        for hinge in &layout.hinges {
            let first = &layout.pieces[hinge.first];
            let second = &layout.pieces[hinge.second];
            self.physics.create_joint(
                ids[hinge.first],
                ids[hinge.second],
                &JointDesc::Revolute {
                    anchor1: hinge.anchor - first.center,
                    anchor2: hinge.anchor - second.center,
                },
            )?;
        }
        Ok(())
    }

    // --- projectiles ------------------------------------------------------

    /// Create a kinematic projectile at `position`
    pub fn spawn_projectile(&mut self, projectile: Projectile, position: Vec2) -> SimResult<EntityId> {
        let kind = projectile.kind;
        let desc = BodyDesc::new(
            BodyKind::Kinematic,
            ShapeDesc::Ball {
                radius: PROJECTILE_RADIUS,
            },
        )
        .with_position(position)
        .with_material(Material {
            density: PROJECTILE_DENSITY,
            friction: PROJECTILE_FRICTION,
            restitution: kind.restitution(),
        })
        .with_gravity_scale(kind.gravity_scale())
        .with_ccd(true)
        .with_fixed_rotation(true);
        self.physics.spawn(EntityKind::Projectile(projectile), &desc)
    }

    /// Put a projectile of the selected (or fallback) kind in the sling
    pub fn load_projectile(&mut self) -> SimResult<EntityId> {
        let kind = self.arsenal.loadout();
        let projectile = Projectile::new(kind, self.settings.projectile_lifetime);
        let id = self.spawn_projectile(projectile, self.slingshot.rest)?;
        self.loaded = Some(id);
        self.events.push(GameEvent::ProjectileLoaded { kind });
        Ok(id)
    }

    /// Change the selected kind. A projectile still sitting in the sling is
    /// swapped for the new kind.
    pub fn select_projectile(&mut self, kind: ProjectileKind) -> bool {
        if !self.arsenal.select(kind) {
            log::debug!("{} is not available", kind.as_str());
            return false;
        }
        let Some(loaded) = self.loaded else {
            return true;
        };
        let held = self
            .physics
            .entity(loaded)
            .and_then(|e| e.as_projectile())
            .map(|p| p.kind);
        if held != Some(kind) {
            self.slingshot.cancel();
            self.trajectory.clear();
            if let Err(err) = self.physics.despawn(loaded) {
                log::warn!("Failed to unload projectile {loaded}: {err}");
            }
            self.loaded = None;
            if let Err(err) = self.load_projectile() {
                log::warn!("Failed to load {}: {err}", kind.as_str());
            }
        }
        true
    }

    // --- sling input ------------------------------------------------------

    /// Pointer pressed: grab the loaded projectile if it is under the pointer
    pub fn begin_drag(&mut self, pointer: Vec2) -> bool {
        if self.phase != LevelPhase::Active {
            return false;
        }
        let Some(position) = self
            .loaded
            .and_then(|id| self.physics.entity(id))
            .map(|e| e.transform.position)
        else {
            return false;
        };
        self.slingshot.begin(pointer, position, PROJECTILE_RADIUS * 2.0)
    }

    /// Pointer moved while dragging
    pub fn drag_to(&mut self, pointer: Vec2) {
        let (Some(id), Some(position)) = (self.loaded, self.slingshot.drag(pointer)) else {
            return;
        };
        if let Err(err) = self.physics.set_entity_position(id, position) {
            log::warn!("Failed to move projectile {id}: {err}");
        }
    }

    /// Pointer released: fire if the pull was long enough
    pub fn release(&mut self) -> SimResult<bool> {
        if !self.slingshot.is_dragging() {
            return Ok(false);
        }
        let Some(id) = self.loaded else {
            self.slingshot.cancel();
            return Ok(false);
        };
        self.trajectory.clear();
        let Some(launch) = self.slingshot.release() else {
            self.physics.set_entity_position(id, self.slingshot.rest)?;
            return Ok(false);
        };

        self.physics.launch(id, launch.direction, launch.force)?;
        let kind = self
            .physics
            .entity(id)
            .and_then(|e| e.as_projectile())
            .map(|p| p.kind)
            .unwrap_or_default();
        self.arsenal.spend(kind);
        self.loaded = None;
        self.projectiles_left = self.projectiles_left.saturating_sub(1);
        if self.projectiles_left == 0 {
            self.final_launched = true;
        }
        let speed = launch.velocity().length();
        log::info!(
            "Launched {} at {speed:.1} m/s, {} left",
            kind.as_str(),
            self.projectiles_left
        );
        self.events.push(GameEvent::ProjectileLaunched { kind, speed });
        Ok(true)
    }

    // --- deferred actions -------------------------------------------------

    /// Execute one queued action
    pub fn execute(&mut self, action: DeferredAction) -> SimResult<()> {
        match action {
            DeferredAction::Split(split) => {
                split.validate()?;
                for child in split.children() {
                    let projectile = Projectile::new(ProjectileKind::Standard, self.settings.projectile_lifetime)
                        .without_split_hook();
                    let id = self.spawn_projectile(projectile, child.position)?;
                    let speed = child.velocity.length();
                    self.physics.launch(
                        id,
                        child.velocity,
                        crate::to_pixels(speed),
                    )?;
                }
                self.events.push(GameEvent::ProjectileSplit { parent: split.parent });
                Ok(())
            }
        }
    }

    /// Turn world events into log lines and presentation events
    pub(crate) fn collect_world_events(&mut self) {
        for event in self.physics.drain_events() {
            match event {
                WorldEvent::Contact { first, second } => {
                    log::trace!("Contact {first:?} / {second:?}");
                }
                WorldEvent::Damaged {
                    entity,
                    amount,
                    destroyed,
                } => {
                    log::debug!("{entity} took {amount:.1} damage (destroyed: {destroyed})");
                }
                WorldEvent::Explosion {
                    center,
                    radius,
                    bodies_pushed,
                    damaged,
                } => {
                    log::info!(
                        "Explosion at ({:.0}, {:.0}) pushed {bodies_pushed} bodies, damaged {}",
                        center.x,
                        center.y,
                        damaged.len()
                    );
                    self.events.push(GameEvent::Explosion { center, radius });
                }
                WorldEvent::BodyDestroyed { entity } => {
                    log::trace!("Body of {entity} destroyed");
                }
                WorldEvent::HandlerFailed { entity, error } => {
                    log::warn!("Collision handler for {entity} failed: {error}");
                    self.events.push(GameEvent::Fault {
                        message: format!("collision handler for {entity}: {error}"),
                    });
                }
            }
        }
    }
}
