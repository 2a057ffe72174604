//! World State and its entity lifecycle
//!
//! [`WorldState`] is the plain data a snapshot describes: the entity map, the
//! logical timestamp it is valid for, and the id counter. [`World`] wraps it
//! with the lifecycle operations (join, leave, death) and the event channel
//! those operations fire into.

use crate::entity::{Entity, EntityId};
use crate::error::{JoinError, SnapshotError};
use crate::events::{EventChannel, EventKind, WorldEvent};
use crate::projection::compute_state;
use crate::snapshot::{self, Snapshot};
use crate::{MAX_PLAYERS, PLAYER_SPEED, SPAWN_SLOTS};
use log::{debug, info};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldState {
    pub objects: BTreeMap<EntityId, Entity>,
    /// Milliseconds since the epoch agreed with the server
    pub time_stamp: u64,
    pub last_id: u64,
}

impl WorldState {
    pub fn new(time_stamp: u64) -> Self {
        Self {
            objects: BTreeMap::new(),
            time_stamp,
            last_id: 0,
        }
    }

    pub fn player_count(&self) -> usize {
        self.objects
            .values()
            .filter(|entity| entity.is_live_player())
            .count()
    }

    pub fn entity_exists(&self, id: EntityId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Id of the live player using `name`
    pub fn player_id(&self, name: &str) -> Option<EntityId> {
        self.objects
            .values()
            .find(|entity| entity.is_live_player() && entity.name() == Some(name))
            .map(|entity| entity.id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Entity> {
        self.objects.values().filter(|entity| entity.is_live_player())
    }

    pub(crate) fn mint_id(&mut self) -> EntityId {
        self.last_id += 1;
        EntityId(self.last_id)
    }
}

/// A world state plus the lifecycle operations that mutate it.
///
/// Every [`EventKind`] must be registered with [`World::on`] before the
/// first join, leave or advance; firing an unregistered kind panics in debug
/// builds and is logged in release builds.
#[derive(Debug)]
pub struct World {
    pub state: WorldState,
    events: EventChannel,
}

impl World {
    pub fn new(time_stamp: u64) -> Self {
        Self {
            state: WorldState::new(time_stamp),
            events: EventChannel::new(),
        }
    }

    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&WorldEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, handler);
    }

    pub fn has_all_handlers(&self) -> bool {
        EventKind::ALL
            .iter()
            .all(|kind| self.events.is_registered(*kind))
    }

    pub fn time_stamp(&self) -> u64 {
        self.state.time_stamp
    }

    pub fn set_time_stamp(&mut self, time_stamp: u64) {
        self.state.time_stamp = time_stamp;
    }

    pub fn player_count(&self) -> usize {
        self.state.player_count()
    }

    pub fn entity_exists(&self, id: EntityId) -> bool {
        self.state.entity_exists(id)
    }

    pub fn player_id(&self, name: &str) -> Option<EntityId> {
        self.state.player_id(name)
    }

    /// Adds a player at the next corner slot.
    pub fn join(&mut self, name: &str) -> Result<EntityId, JoinError> {
        if self.state.player_id(name).is_some() {
            return Err(JoinError::DuplicateName(name.to_string()));
        }

        let count = self.state.player_count();
        if count >= MAX_PLAYERS {
            return Err(JoinError::ServerFull {
                capacity: MAX_PLAYERS,
            });
        }

        let (x, y) = SPAWN_SLOTS[count % SPAWN_SLOTS.len()];
        let id = self.state.mint_id();
        self.state
            .objects
            .insert(id, Entity::player(id, name, x, y));

        info!("Player '{}' joined as {} at ({}, {})", name, id, x, y);
        self.fire(WorldEvent::Joined {
            id,
            name: name.to_string(),
        });

        Ok(id)
    }

    /// Removes an entity. Unknown ids are a no-op and return false.
    pub fn leave(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.state.objects.remove(&id) else {
            debug!("Leave for unknown entity {}", id);
            return false;
        };

        if let Some(name) = entity.name() {
            info!("Player '{}' ({}) left", name, id);
            self.fire(WorldEvent::Left {
                id,
                name: name.to_string(),
            });
        }

        true
    }

    pub fn leave_by_name(&mut self, name: &str) -> Option<EntityId> {
        let id = self.state.player_id(name)?;
        self.leave(id);
        Some(id)
    }

    pub fn spawn_enemy(&mut self, x: f64, y: f64, vx: f64, vy: f64) -> EntityId {
        let id = self.state.mint_id();
        self.state
            .objects
            .insert(id, Entity::enemy(id, x, y, vx, vy));
        debug!("Spawned enemy {} at ({:.1}, {:.1})", id, x, y);
        id
    }

    /// Sets a live player's velocity, scaled down to at most `PLAYER_SPEED`.
    pub fn set_player_velocity(&mut self, id: EntityId, vx: f64, vy: f64) -> bool {
        let Some(player) = self
            .state
            .objects
            .get_mut(&id)
            .filter(|entity| entity.is_live_player())
        else {
            return false;
        };

        let speed = (vx * vx + vy * vy).sqrt();
        let (vx, vy) = if speed > PLAYER_SPEED {
            let scale = PLAYER_SPEED / speed;
            (vx * scale, vy * scale)
        } else {
            (vx, vy)
        };

        player.set_velocity(vx, vy);
        true
    }

    /// Projects the world `delta_ms` forward and announces new deaths.
    pub fn advance(&mut self, delta_ms: u64) -> Vec<EntityId> {
        self.state = compute_state(&self.state, delta_ms);

        let died: Vec<(EntityId, String)> = self
            .state
            .objects
            .values()
            .filter(|entity| entity.is_player() && entity.dead)
            .filter_map(|entity| entity.name().map(|name| (entity.id, name.to_string())))
            .collect();

        for (id, name) in &died {
            info!("Player '{}' ({}) died", name, id);
            self.fire(WorldEvent::Died {
                id: *id,
                name: name.clone(),
            });
        }

        died.into_iter().map(|(id, _)| id).collect()
    }

    /// Advances to an absolute timestamp; earlier timestamps are ignored.
    pub fn advance_to(&mut self, time_stamp: u64) -> Vec<EntityId> {
        match time_stamp.checked_sub(self.state.time_stamp) {
            Some(delta) if delta > 0 => self.advance(delta),
            _ => Vec::new(),
        }
    }

    pub fn save(&self) -> Snapshot {
        snapshot::save(&self.state)
    }

    pub fn load(&mut self, snapshot: Snapshot) -> Result<(), SnapshotError> {
        snapshot::load(&mut self.state, snapshot)
    }

    fn fire(&mut self, event: WorldEvent) {
        if let Err(e) = self.events.emit(&event) {
            debug_assert!(false, "{}", e);
        }
    }
}
