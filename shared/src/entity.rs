//! Entity model: a shared base record with a per-variant extension
//!
//! Every world object carries identity, position, extents and liveness in
//! [`Entity`]; the behaviour that differs between players and enemies lives
//! in [`EntityKind`]. Collision is a free function over two entities so the
//! argument order stays explicit at the call site.

use crate::{ENEMY_SIZE, PLAYER_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier minted from the world's monotonic id counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminant tag carried on the wire as `"player"` / `"enemy"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Player,
    Enemy,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Player => "player",
            EntityType::Enemy => "enemy",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "player" => Some(EntityType::Player),
            "enemy" => Some(EntityType::Enemy),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerData {
    pub name: String,
    /// Velocity in world units per second, set from client `move` requests
    pub vx: f64,
    pub vy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyData {
    pub vx: f64,
    pub vy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Player(PlayerData),
    Enemy(EnemyData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub dead: bool,
    pub kind: EntityKind,
}

impl Entity {
    pub fn player(id: EntityId, name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            width: PLAYER_SIZE,
            height: PLAYER_SIZE,
            dead: false,
            kind: EntityKind::Player(PlayerData {
                name: name.into(),
                vx: 0.0,
                vy: 0.0,
            }),
        }
    }

    pub fn enemy(id: EntityId, x: f64, y: f64, vx: f64, vy: f64) -> Self {
        Self {
            id,
            x,
            y,
            width: ENEMY_SIZE,
            height: ENEMY_SIZE,
            dead: false,
            kind: EntityKind::Enemy(EnemyData { vx, vy }),
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self.kind {
            EntityKind::Player(_) => EntityType::Player,
            EntityKind::Enemy(_) => EntityType::Enemy,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, EntityKind::Player(_))
    }

    pub fn is_live_player(&self) -> bool {
        self.is_player() && !self.dead
    }

    /// Display name for players, `None` for every other variant
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            EntityKind::Player(player) => Some(&player.name),
            EntityKind::Enemy(_) => None,
        }
    }

    pub fn velocity(&self) -> (f64, f64) {
        match &self.kind {
            EntityKind::Player(player) => (player.vx, player.vy),
            EntityKind::Enemy(enemy) => (enemy.vx, enemy.vy),
        }
    }

    pub fn set_velocity(&mut self, vx: f64, vy: f64) {
        match &mut self.kind {
            EntityKind::Player(player) => {
                player.vx = vx;
                player.vy = vy;
            }
            EntityKind::Enemy(enemy) => {
                enemy.vx = vx;
                enemy.vy = vy;
            }
        }
    }
}

/// Axis-aligned overlap test using half extents around `(x, y)`.
///
/// On each axis the hit window is `-a.width/2 < a.x - b.x < b.width/2`, so it
/// is not centred on either entity. Callers keep a fixed argument order,
/// `collides(player, enemy)`.
pub fn collides(a: &Entity, b: &Entity) -> bool {
    a.x < b.x + b.width / 2.0
        && a.x + a.width / 2.0 > b.x
        && a.y < b.y + b.height / 2.0
        && a.y + a.height / 2.0 > b.y
}
