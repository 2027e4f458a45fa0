//! Simulation module
//!
//! All gameplay logic lives here:
//! - Fixed timestep only
//! - Stable iteration order (by entity ID)
//! - World mutations from collision handlers are deferred until after the step
//! - No rendering or platform dependencies

pub mod deferred;
pub mod entity;
pub mod level;
pub mod physics;
pub mod projectile;
pub mod slingshot;
pub mod state;
pub mod tick;

pub use deferred::{DeferredAction, DeferredQueue, ProjectileSpawn, SplitSpawn};
pub use entity::{DamageOutcome, Damageable, Entity, EntityId, EntityKind, EntityTag, Health, Transform};
pub use level::{Layout, Piece, PieceKind, build_layout};
pub use physics::{
    BodyDesc, BodyKind, CollisionContext, DebugShape, JointDesc, Material, PhysicsWorld, ShapeDesc,
    WorldEvent,
};
pub use projectile::{Arsenal, Impact, Projectile, ProjectileKind};
pub use slingshot::{Launch, Slingshot, trajectory};
pub use state::{GameEvent, GameState, Hud, LevelPhase};
pub use tick::{TickInput, tick};
