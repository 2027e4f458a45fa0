//! Game tuning and simulation settings
//!
//! Loaded from JSON; anything missing falls back to the `consts` defaults.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{SimError, SimResult};

/// Rigid-body solver tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Gravity in m/s² (y grows downward)
    pub gravity: Vec2,
    /// Fixed timestep in seconds
    pub timestep: f32,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
    /// Continuous collision detection sub-steps
    pub ccd_substeps: usize,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, GRAVITY),
            timestep: SIM_DT,
            velocity_iterations: VELOCITY_ITERATIONS,
            position_iterations: POSITION_ITERATIONS,
            ccd_substeps: CCD_SUBSTEPS,
        }
    }
}

/// Slingshot and trajectory preview tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlingSettings {
    /// Horizontal distance of the sling post from the left edge (px)
    pub offset_x: f32,
    /// Height of the sling post above the ground (px)
    pub height: f32,
    /// Loaded projectile position relative to the post (px)
    pub rest_offset: Vec2,
    pub max_pull: f32,
    pub scaling: f32,
    pub boost: f32,
    pub trajectory_points: usize,
    pub trajectory_step: f32,
}

impl Default for SlingSettings {
    fn default() -> Self {
        Self {
            offset_x: SLING_OFFSET_X,
            height: SLING_HEIGHT,
            rest_offset: Vec2::new(SLING_REST_OFFSET.0, SLING_REST_OFFSET.1),
            max_pull: MAX_PULL_DISTANCE,
            scaling: LAUNCH_SCALING,
            boost: LAUNCH_BOOST,
            trajectory_points: TRAJECTORY_POINTS,
            trajectory_step: TRAJECTORY_STEP,
        }
    }
}

/// Full game settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Playfield size in pixels
    pub playfield: Vec2,
    pub ground_height: f32,

    pub physics: PhysicsSettings,
    pub sling: SlingSettings,

    // === Projectiles ===
    pub projectiles_per_level: u32,
    /// Seconds a launched projectile lives
    pub projectile_lifetime: f32,
    /// How far past the playfield a projectile may fly before it is pruned
    pub offscreen_buffer: f32,

    // === Layout ===
    /// Seed for layout jitter; `None` builds exact layouts
    pub layout_seed: Option<u64>,
    /// Maximum horizontal jitter in pixels when a seed is set
    pub layout_jitter: f32,

    /// Draw collider outlines
    pub debug_draw: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            playfield: Vec2::new(PLAYFIELD_WIDTH, PLAYFIELD_HEIGHT),
            ground_height: GROUND_HEIGHT,
            physics: PhysicsSettings::default(),
            sling: SlingSettings::default(),
            projectiles_per_level: PROJECTILES_PER_LEVEL,
            projectile_lifetime: PROJECTILE_LIFETIME,
            offscreen_buffer: OFFSCREEN_BUFFER,
            layout_seed: None,
            layout_jitter: 6.0,
            debug_draw: false,
        }
    }
}

impl Settings {
    /// Parse and validate settings from a JSON string
    pub fn from_json(json: &str) -> SimResult<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Y coordinate of the ground surface (px)
    pub fn ground_y(&self) -> f32 {
        self.playfield.y - self.ground_height
    }

    /// Sling post position (px)
    pub fn sling_anchor(&self) -> Vec2 {
        Vec2::new(self.sling.offset_x, self.ground_y() - self.sling.height)
    }

    /// Where a loaded projectile rests before it is pulled (px)
    pub fn sling_rest(&self) -> Vec2 {
        self.sling_anchor() + self.sling.rest_offset
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> SimResult<()> {
        fn positive(field: &'static str, value: f32) -> SimResult<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SimError::InvalidSettings {
                    field,
                    details: format!("expected a positive value, got {value}"),
                })
            }
        }

        positive("playfield.x", self.playfield.x)?;
        positive("playfield.y", self.playfield.y)?;
        positive("physics.timestep", self.physics.timestep)?;
        positive("sling.max_pull", self.sling.max_pull)?;
        positive("sling.scaling", self.sling.scaling)?;
        positive("projectile_lifetime", self.projectile_lifetime)?;
        if self.ground_height < 0.0 || self.ground_height >= self.playfield.y {
            return Err(SimError::InvalidSettings {
                field: "ground_height",
                details: format!("{} does not fit the playfield", self.ground_height),
            });
        }
        if self.physics.velocity_iterations == 0 {
            return Err(SimError::InvalidSettings {
                field: "physics.velocity_iterations",
                details: "must be at least 1".into(),
            });
        }
        if !self.physics.gravity.is_finite() {
            return Err(SimError::InvalidSettings {
                field: "physics.gravity",
                details: "must be finite".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.ground_y(), 980.0);
        assert_eq!(settings.sling_anchor(), Vec2::new(200.0, 780.0));
        assert_eq!(settings.sling_rest(), Vec2::new(160.0, 740.0));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(r#"{ "projectiles_per_level": 3 }"#).unwrap();
        assert_eq!(settings.projectiles_per_level, 3);
        assert_eq!(settings.physics.velocity_iterations, VELOCITY_ITERATIONS);
        assert_eq!(settings.sling.max_pull, MAX_PULL_DISTANCE);
    }

    #[test]
    fn test_round_trip_json() {
        let mut settings = Settings::default();
        settings.layout_seed = Some(7);
        let json = settings.to_json().unwrap();
        let back = Settings::from_json(&json).unwrap();
        assert_eq!(back.layout_seed, Some(7));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Settings::from_json(r#"{ "physics": { "timestep": 0.0 } }"#),
            Err(SimError::InvalidSettings { field: "physics.timestep", .. })
        ));
        assert!(matches!(
            Settings::from_json(r#"{ "ground_height": 5000.0 }"#),
            Err(SimError::InvalidSettings { field: "ground_height", .. })
        ));
        assert!(matches!(Settings::from_json("not json"), Err(SimError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, SimError::Io { .. }));
    }
}
