//! Snapshot codec: world state to and from its wire representation
//!
//! A snapshot is a shallow field dump of every entity keyed by id, plus the
//! timestamp the state is valid for. Loading is all-or-nothing: every record
//! is decoded before the target state is touched.

use crate::entity::{EnemyData, Entity, EntityId, EntityKind, EntityType, PlayerData};
use crate::error::SnapshotError;
use crate::world::WorldState;
use crate::{ENEMY_SIZE, PLAYER_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub objects: BTreeMap<EntityId, EntityRecord>,
    pub time_stamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<u64>,
}

/// Flat per-entity fields as they travel over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub vx: f64,
    #[serde(default)]
    pub vy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl From<&Entity> for EntityRecord {
    fn from(entity: &Entity) -> Self {
        let (vx, vy) = entity.velocity();
        Self {
            id: entity.id,
            x: entity.x,
            y: entity.y,
            kind: entity.entity_type().as_str().to_string(),
            name: entity.name().map(str::to_string),
            dead: entity.dead,
            vx,
            vy,
            width: Some(entity.width),
            height: Some(entity.height),
        }
    }
}

impl TryFrom<EntityRecord> for Entity {
    type Error = SnapshotError;

    fn try_from(record: EntityRecord) -> Result<Self, Self::Error> {
        let entity_type =
            EntityType::from_tag(&record.kind).ok_or_else(|| SnapshotError::UnknownType {
                id: record.id,
                tag: record.kind.clone(),
            })?;

        let (kind, default_size) = match entity_type {
            EntityType::Player => {
                let name = record
                    .name
                    .ok_or(SnapshotError::MissingName { id: record.id })?;
                let player = PlayerData {
                    name,
                    vx: record.vx,
                    vy: record.vy,
                };
                (EntityKind::Player(player), PLAYER_SIZE)
            }
            EntityType::Enemy => {
                let enemy = EnemyData {
                    vx: record.vx,
                    vy: record.vy,
                };
                (EntityKind::Enemy(enemy), ENEMY_SIZE)
            }
        };

        Ok(Entity {
            id: record.id,
            x: record.x,
            y: record.y,
            width: record.width.unwrap_or(default_size),
            height: record.height.unwrap_or(default_size),
            dead: record.dead,
            kind,
        })
    }
}

pub fn save(state: &WorldState) -> Snapshot {
    Snapshot {
        objects: state
            .objects
            .iter()
            .map(|(id, entity)| (*id, EntityRecord::from(entity)))
            .collect(),
        time_stamp: state.time_stamp,
        last_id: Some(state.last_id),
    }
}

/// Replaces `target`'s objects and timestamp with the snapshot's.
/// `last_id` never goes down, so ids minted later stay unique.
pub fn load(target: &mut WorldState, snapshot: Snapshot) -> Result<(), SnapshotError> {
    let mut objects = BTreeMap::new();
    let mut last_id = target.last_id.max(snapshot.last_id.unwrap_or(0));

    for (key, record) in snapshot.objects {
        if key != record.id {
            return Err(SnapshotError::IdMismatch { key, id: record.id });
        }
        let entity = Entity::try_from(record)?;
        last_id = last_id.max(entity.id.0);
        objects.insert(key, entity);
    }

    target.objects = objects;
    target.time_stamp = snapshot.time_stamp;
    target.last_id = last_id;
    Ok(())
}
