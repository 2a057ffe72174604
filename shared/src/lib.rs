//! # Shared game state
//!
//! Everything the authoritative server and the client replicas must agree on
//! lives here, so both sides run literally the same code:
//!
//! - [`entity`]: the entity model (players, enemies) and collision
//! - [`world`]: World State plus the join/leave/death lifecycle
//! - [`projection`]: deterministic "state `delta` ms later" computation
//! - [`snapshot`]: the wire snapshot codec
//! - [`events`]: the lifecycle event channel
//! - [`protocol`]: message kinds carried over a connection
//!
//! The server advances its world to wall-clock "now" before handling each
//! message; clients advance their replica on a local timer and lean on
//! full snapshots plus the server's periodic `time` message to stay in step.

pub mod entity;
pub mod error;
pub mod events;
pub mod projection;
pub mod protocol;
pub mod snapshot;
pub mod world;

pub use entity::{collides, Entity, EntityId, EntityKind, EntityType};
pub use error::{EventError, JoinError, SnapshotError};
pub use events::{EventChannel, EventKind, WorldEvent};
pub use projection::compute_state;
pub use protocol::{ClientMessage, JoinNotice, LeaveNotice, ServerMessage, TimeSync};
pub use snapshot::{EntityRecord, Snapshot};
pub use world::{World, WorldState};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const WORLD_WIDTH: f64 = 800.0;
pub const WORLD_HEIGHT: f64 = 600.0;
pub const PLAYER_SIZE: f64 = 32.0;
pub const ENEMY_SIZE: f64 = 24.0;
/// Maximum player speed in world units per second
pub const PLAYER_SPEED: f64 = 300.0;

pub const MAX_PLAYERS: usize = 4;
pub const SPAWN_SLOTS: [(f64, f64); 4] = [
    (200.0, 200.0),
    (200.0, 400.0),
    (400.0, 200.0),
    (400.0, 400.0),
];

/// Client projection tick, ~30 Hz
pub const UPDATE_INTERVAL_MS: u64 = 33;
/// Projection sub-step; collisions are tested on multiples of this in absolute time
pub const PROJECTION_STEP_MS: u64 = 16;
pub const TIME_SYNC_INTERVAL_MS: u64 = 2000;
/// Accumulated skew beyond which a client asks for a full snapshot
pub const SKEW_THRESHOLD_MS: i64 = 1000;

/// Wall-clock milliseconds since the unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
