//! Error types for the simulation core.

use thiserror::Error;

use crate::sim::EntityId;

/// Errors raised by the physics facade, the level orchestrator and settings loading.
#[derive(Debug, Error)]
pub enum SimError {
    /// No entity is registered under this id.
    #[error("Unknown entity {0}")]
    UnknownEntity(EntityId),

    /// The entity exists but no longer owns a rigid body.
    #[error("Entity {0} has no rigid body")]
    MissingBody(EntityId),

    /// Bodies cannot be created or destroyed while a step is running.
    #[error("Physics world is locked during a step")]
    WorldLocked,

    /// `launch` was called twice on the same projectile.
    #[error("Projectile {0} has already been launched")]
    AlreadyLaunched(EntityId),

    /// The operation expects a projectile.
    #[error("Entity {0} is not a projectile")]
    NotAProjectile(EntityId),

    /// A queued spawn carried a non-finite position or velocity.
    #[error("Invalid spawn request: {0}")]
    InvalidSpawn(String),

    /// No layout exists for the requested level.
    #[error("Invalid level number {0}")]
    InvalidLevel(u32),

    /// A settings value is out of range.
    #[error("Invalid setting '{field}': {details}")]
    InvalidSettings { field: &'static str, details: String },

    /// Settings file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Settings JSON could not be parsed.
    #[error("Settings parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
