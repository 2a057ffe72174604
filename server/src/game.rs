//! Authoritative game state owned by the server loop
//!
//! Wraps the shared [`World`] with what only the server needs: enemy
//! seeding, the update counter reported in `time` messages, and a queue that
//! collects lifecycle events for the network layer to broadcast.

use log::{debug, info};
use rand::Rng;
use shared::{
    EntityId, EventKind, JoinError, Snapshot, TimeSync, World, WorldEvent, ENEMY_SIZE,
    WORLD_HEIGHT, WORLD_WIDTH,
};
use tokio::sync::mpsc;

pub struct GameState {
    world: World,
    events: mpsc::UnboundedReceiver<WorldEvent>,
    update_count: u64,
}

impl GameState {
    pub fn new(time_stamp: u64) -> Self {
        let (event_tx, events) = mpsc::unbounded_channel();

        let mut world = World::new(time_stamp);
        for kind in EventKind::ALL {
            let event_tx = event_tx.clone();
            world.on(kind, move |event| {
                // receiver lives as long as the GameState
                let _ = event_tx.send(event.clone());
            });
        }

        Self {
            world,
            events,
            update_count: 0,
        }
    }

    /// Spawns enemies on the right side of the arena, clear of the spawn slots.
    pub fn seed_enemies<R: Rng>(&mut self, count: usize, rng: &mut R) {
        let half = ENEMY_SIZE / 2.0;
        for _ in 0..count {
            let x = rng.gen_range(560.0..(WORLD_WIDTH - half));
            let y = rng.gen_range(half..(WORLD_HEIGHT - half));
            let vx = rng.gen_range(60.0..160.0) * if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let vy = rng.gen_range(60.0..160.0) * if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            self.spawn_enemy(x, y, vx, vy);
        }
        if count > 0 {
            info!("Seeded {} enemies", count);
        }
    }

    pub fn spawn_enemy(&mut self, x: f64, y: f64, vx: f64, vy: f64) -> EntityId {
        self.update_count += 1;
        self.world.spawn_enemy(x, y, vx, vy)
    }

    pub fn time_stamp(&self) -> u64 {
        self.world.time_stamp()
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn player_count(&self) -> usize {
        self.world.player_count()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Brings the world up to `now`. Returns players that died on the way.
    pub fn advance_to(&mut self, now: u64) -> Vec<EntityId> {
        if now <= self.world.time_stamp() {
            return Vec::new();
        }
        self.update_count += 1;
        self.world.advance_to(now)
    }

    pub fn join(&mut self, name: &str) -> Result<EntityId, JoinError> {
        let id = self.world.join(name)?;
        self.update_count += 1;
        Ok(id)
    }

    pub fn leave(&mut self, name: &str) -> Option<EntityId> {
        let id = self.world.leave_by_name(name)?;
        self.update_count += 1;
        Some(id)
    }

    pub fn set_velocity(&mut self, name: &str, vx: f64, vy: f64) -> bool {
        let Some(id) = self.world.player_id(name) else {
            debug!("Velocity change for unknown player '{}'", name);
            return false;
        };
        let changed = self.world.set_player_velocity(id, vx, vy);
        if changed {
            self.update_count += 1;
        }
        changed
    }

    pub fn snapshot(&self) -> Snapshot {
        self.world.save()
    }

    pub fn time_sync(&self, now: u64, observer_count: usize) -> TimeSync {
        TimeSync {
            time_stamp: now,
            last_update: self.world.time_stamp(),
            update_count: self.update_count,
            observer_count,
        }
    }

    /// Takes every lifecycle event fired since the last call
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}
