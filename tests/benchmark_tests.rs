//! Performance benchmarks for the shared state engine

use shared::{collides, compute_state, now_millis, Entity, EntityId, EventKind, World, WorldState};
use std::time::Instant;

fn crowded_state(enemies: u64) -> WorldState {
    let mut state = WorldState::new(0);
    for i in 0..enemies {
        let id = EntityId(i + 1);
        let x = (i * 37 % 780) as f64;
        let y = (i * 53 % 580) as f64;
        state
            .objects
            .insert(id, Entity::enemy(id, x, y, 120.0, -80.0));
    }
    state
}

/// Benchmarks the collision predicate
#[test]
fn benchmark_collision_detection() {
    let player = Entity::player(EntityId(1), "alice", 100.0, 100.0);
    let enemy = Entity::enemy(EntityId(2), 110.0, 110.0, 0.0, 0.0);

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = collides(&player, &enemy);
    }

    let duration = start.elapsed();
    println!(
        "Collision detection: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 100);
}

/// Benchmarks projecting a busy world one tick forward
#[test]
fn benchmark_projection() {
    let state = crowded_state(200);

    let iterations = 1_000;
    let start = Instant::now();

    let mut current = state;
    for _ in 0..iterations {
        current = compute_state(&current, 33);
    }

    let duration = start.elapsed();
    println!(
        "Projection of 200 enemies: {} ticks in {:?} ({:.2} μs/tick)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(current.time_stamp, 33 * iterations);
    assert_eq!(current.objects.len(), 200);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks snapshot save/load of a busy world
#[test]
fn benchmark_snapshot_codec() {
    let mut world = World::new(now_millis());
    for kind in EventKind::ALL {
        world.on(kind, |_| {});
    }
    for i in 0..4 {
        world.join(&format!("player{}", i)).unwrap();
    }
    for i in 0..100 {
        world.spawn_enemy(600.0, (i * 5) as f64, 100.0, 100.0);
    }

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let text = serde_json::to_string(&world.save()).unwrap();
        let snapshot = serde_json::from_str(&text).unwrap();
        let mut replica = World::new(0);
        for kind in EventKind::ALL {
            replica.on(kind, |_| {});
        }
        replica.load(snapshot).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot codec (104 entities): {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5000);
}
