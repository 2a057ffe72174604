//! Deterministic forward projection of a world state
//!
//! [`compute_state`] never mutates its input: it builds the state that is
//! valid `delta_ms` milliseconds later. Server and clients run the same code,
//! so two replicas fed the same state and delta agree exactly.
//!
//! Motion is integrated in sub-steps whose boundaries sit on multiples of
//! [`PROJECTION_STEP_MS`] in absolute time, with a collision pass after each
//! one. A replica ticking every 33 ms and a server jumping seconds at a time
//! therefore test contact at the same instants.

use crate::entity::{collides, Entity, EntityId, EntityKind};
use crate::world::WorldState;
use crate::{PROJECTION_STEP_MS, WORLD_HEIGHT, WORLD_WIDTH};
use std::collections::BTreeMap;

pub fn compute_state(current: &WorldState, delta_ms: u64) -> WorldState {
    let mut objects: BTreeMap<EntityId, Entity> = current
        .objects
        .values()
        .filter(|entity| !entity.dead)
        .map(|entity| (entity.id, entity.clone()))
        .collect();

    let end = current.time_stamp + delta_ms;
    let mut now = current.time_stamp;
    while now < end {
        let next = (now / PROJECTION_STEP_MS + 1) * PROJECTION_STEP_MS;
        let next = next.min(end);
        step(&mut objects, (next - now) as f64 / 1000.0);
        mark_collisions(&mut objects);
        now = next;
    }

    if delta_ms == 0 {
        mark_collisions(&mut objects);
    }

    WorldState {
        objects,
        time_stamp: end,
        last_id: current.last_id,
    }
}

/// Moves every live entity; players that died earlier in the call stay put
fn step(objects: &mut BTreeMap<EntityId, Entity>, dt: f64) {
    for entity in objects.values_mut().filter(|entity| !entity.dead) {
        *entity = project_entity(entity, dt);
    }
}

fn project_entity(entity: &Entity, dt: f64) -> Entity {
    let mut next = entity.clone();

    let (min_x, max_x) = axis_bounds(entity.width, WORLD_WIDTH);
    let (min_y, max_y) = axis_bounds(entity.height, WORLD_HEIGHT);

    match &mut next.kind {
        EntityKind::Player(player) => {
            next.x = (entity.x + player.vx * dt).clamp(min_x, max_x);
            next.y = (entity.y + player.vy * dt).clamp(min_y, max_y);
        }
        EntityKind::Enemy(enemy) => {
            let (x, vx) = bounce(entity.x, enemy.vx, dt, min_x, max_x);
            let (y, vy) = bounce(entity.y, enemy.vy, dt, min_y, max_y);
            next.x = x;
            next.y = y;
            enemy.vx = vx;
            enemy.vy = vy;
        }
    }

    next
}

/// Range the centre of an entity may occupy along one axis
fn axis_bounds(extent: f64, world: f64) -> (f64, f64) {
    let half = extent / 2.0;
    if world - half < half {
        (world / 2.0, world / 2.0)
    } else {
        (half, world - half)
    }
}

/// Moves along one axis, reflecting off both walls as many times as the
/// travelled distance requires. Returns the new position and velocity.
fn bounce(pos: f64, vel: f64, dt: f64, min: f64, max: f64) -> (f64, f64) {
    let next = pos + vel * dt;
    if (min..=max).contains(&next) {
        return (next, vel);
    }

    let span = max - min;
    if span <= 0.0 {
        return (min, vel);
    }

    let travelled = next - min;
    let reflections = travelled.div_euclid(span) as i64;
    let within = travelled.rem_euclid(span);

    if reflections.rem_euclid(2) == 0 {
        (min + within, vel)
    } else {
        (max - within, -vel)
    }
}

/// Marks every live player touching a live enemy as dead
fn mark_collisions(objects: &mut BTreeMap<EntityId, Entity>) {
    let enemies: Vec<&Entity> = objects
        .values()
        .filter(|entity| !entity.is_player() && !entity.dead)
        .collect();

    let hit: Vec<EntityId> = objects
        .values()
        .filter(|entity| entity.is_live_player())
        .filter(|player| enemies.iter().any(|enemy| collides(player, enemy)))
        .map(|player| player.id)
        .collect();

    for id in hit {
        if let Some(player) = objects.get_mut(&id) {
            player.dead = true;
        }
    }
}
