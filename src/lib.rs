//! Sling Siege - a slingshot physics arcade game core
//!
//! Core modules:
//! - `sim`: Rigid-body simulation, entities, projectile effects and level flow
//! - `renderer`: Backend-neutral draw calls for the level and debug overlay
//! - `settings`: Data-driven tuning loaded from JSON
//! - `error`: Crate error type

pub mod error;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use error::{SimError, SimResult};
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Pixels per physics meter
    pub const PIXELS_PER_METER: f32 = 30.0;
    /// Gravity in m/s² (positive y points down the screen)
    pub const GRAVITY: f32 = 9.81;
    /// Solver velocity iterations
    pub const VELOCITY_ITERATIONS: usize = 8;
    /// Solver position iterations
    pub const POSITION_ITERATIONS: usize = 3;
    /// CCD sub-steps per step
    pub const CCD_SUBSTEPS: usize = 4;

    /// Playfield dimensions (pixels)
    pub const PLAYFIELD_WIDTH: f32 = 1920.0;
    pub const PLAYFIELD_HEIGHT: f32 = 1080.0;
    pub const GROUND_HEIGHT: f32 = 100.0;

    /// Slingshot
    pub const SLING_OFFSET_X: f32 = 200.0;
    pub const SLING_HEIGHT: f32 = 200.0;
    /// Rest position of a loaded projectile relative to the sling post
    pub const SLING_REST_OFFSET: (f32, f32) = (-40.0, -40.0);
    pub const MAX_PULL_DISTANCE: f32 = 150.0;
    pub const LAUNCH_SCALING: f32 = 4.5;
    /// Extra multiplier on launch force
    pub const LAUNCH_BOOST: f32 = 1.08;

    /// Trajectory preview
    pub const TRAJECTORY_POINTS: usize = 30;
    pub const TRAJECTORY_STEP: f32 = 0.1;

    /// Projectiles
    pub const PROJECTILES_PER_LEVEL: u32 = 5;
    pub const PROJECTILE_RADIUS: f32 = 20.0;
    pub const PROJECTILE_LIFETIME: f32 = 10.0;
    /// Projectiles may leave the playfield by this much before being pruned
    pub const OFFSCREEN_BUFFER: f32 = 100.0;
    /// Speed (m/s) at which a projectile deals exactly its base damage
    pub const DAMAGE_REFERENCE_SPEED: f32 = 10.0;

    /// Destructibles
    pub const BLOCK_SIZE: f32 = 80.0;
    pub const ENTITY_HEALTH: f32 = 100.0;

    /// Number of designed levels
    pub const LEVEL_COUNT: u32 = 3;
}

/// Pixels to physics meters
#[inline]
pub fn to_meters(px: f32) -> f32 {
    px / consts::PIXELS_PER_METER
}

/// Physics meters to pixels
#[inline]
pub fn to_pixels(m: f32) -> f32 {
    m * consts::PIXELS_PER_METER
}

/// Unit vector at `angle` radians
#[inline]
pub fn direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle of a vector in radians (atan2)
#[inline]
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}
