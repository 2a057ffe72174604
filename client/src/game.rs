//! Client session: the local replica and everything that feeds it
//!
//! A [`Session`] lives for exactly one connection. It owns the replica
//! [`World`], the [`ClockSync`] state and the name this client joined as, and
//! turns server messages into replica updates (plus any replies the protocol
//! asks for). It does no I/O, so the network layer and tests drive it the
//! same way.

use crate::clock::{ClockSync, SyncDecision};
use log::{debug, info, warn};
use shared::{ClientMessage, EntityId, EventKind, ServerMessage, Snapshot, World, WorldEvent};

pub struct Session {
    world: World,
    clock: ClockSync,
    /// Name requested or confirmed for this connection
    name: Option<String>,
    joined: bool,
}

impl Session {
    pub fn new(skew_threshold_ms: i64) -> Self {
        let mut world = World::new(0);
        for kind in EventKind::ALL {
            world.on(kind, log_replica_event);
        }

        Self {
            world,
            clock: ClockSync::new(skew_threshold_ms),
            name: None,
            joined: false,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn clock(&self) -> &ClockSync {
        &self.clock
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Builds a join request and remembers the name until it is confirmed
    pub fn request_join(&mut self, name: &str) -> ClientMessage {
        self.name = Some(name.to_string());
        ClientMessage::Join {
            name: name.to_string(),
        }
    }

    /// Applies one server message; returns the messages to send back.
    pub fn handle_message(&mut self, message: ServerMessage, local_now: u64) -> Vec<ClientMessage> {
        match message {
            ServerMessage::Start { state } | ServerMessage::State { state } => {
                self.apply_snapshot(state, local_now);
            }

            ServerMessage::Join(notice) => {
                if let Err(e) = self.world.join(&notice.name) {
                    debug!("Replica already has '{}': {}", notice.name, e);
                }
                if notice.is_me() {
                    info!("Joined as '{}'", notice.name);
                    self.name = Some(notice.name);
                    self.joined = true;
                }
            }

            ServerMessage::Leave(notice) => {
                self.world.leave_by_name(&notice.name);
                if self.name.as_deref() == Some(notice.name.as_str()) && self.joined {
                    info!("Our player '{}' is gone", notice.name);
                    self.joined = false;
                }
            }

            ServerMessage::Time(sync) => {
                let decision = self.clock.on_time(sync.last_update, self.world.time_stamp());
                self.world.set_time_stamp(sync.last_update);
                debug!(
                    "Server reports {} updates, {} observers",
                    sync.update_count, sync.observer_count
                );
                if decision == SyncDecision::Resync {
                    return vec![ClientMessage::State];
                }
            }

            ServerMessage::Rejected { name, reason } => {
                warn!("Join as '{}' rejected: {}", name, reason);
                if !self.joined && self.name.as_deref() == Some(name.as_str()) {
                    self.name = None;
                }
            }
        }

        Vec::new()
    }

    /// Projection timer callback. Returns players that died locally.
    pub fn tick(&mut self, local_now: u64) -> Vec<EntityId> {
        match self.clock.projection_target(local_now) {
            Some(target) => self.world.advance_to(target),
            None => Vec::new(),
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot, local_now: u64) {
        let server_time = snapshot.time_stamp;
        match self.world.load(snapshot) {
            Ok(()) => {
                self.clock.on_snapshot(server_time, local_now);
                debug!(
                    "Loaded snapshot at {} with {} players",
                    server_time,
                    self.world.player_count()
                );
            }
            Err(e) => warn!("Ignoring malformed snapshot: {}", e),
        }
    }
}

fn log_replica_event(event: &WorldEvent) {
    match event {
        WorldEvent::Joined { id, name } => debug!("Replica: '{}' joined as {}", name, id),
        WorldEvent::Left { id, name } => debug!("Replica: '{}' ({}) left", name, id),
        WorldEvent::Died { id, name } => info!("Replica: '{}' ({}) died", name, id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SyncStatus;
    use assert_approx_eq::assert_approx_eq;
    use shared::{JoinNotice, LeaveNotice, TimeSync, WorldState, SPAWN_SLOTS};

    fn empty_start(time_stamp: u64) -> ServerMessage {
        ServerMessage::Start {
            state: shared::snapshot::save(&WorldState::new(time_stamp)),
        }
    }

    fn join(name: &str, isme: bool) -> ServerMessage {
        ServerMessage::Join(JoinNotice {
            name: name.to_string(),
            time_stamp: 0,
            isme: isme.then_some(true),
        })
    }

    fn time(last_update: u64) -> ServerMessage {
        ServerMessage::Time(TimeSync {
            time_stamp: last_update,
            last_update,
            update_count: 1,
            observer_count: 1,
        })
    }

    #[test]
    fn test_start_syncs_clock() {
        let mut session = Session::new(1_000);
        assert!(session.handle_message(empty_start(5_000), 5_040).is_empty());

        assert_eq!(session.clock().status(), SyncStatus::Synced);
        assert_eq!(session.clock().start_delta(), Some(40));
        assert_eq!(session.world().time_stamp(), 5_000);
    }

    #[test]
    fn test_own_join_marks_session_joined() {
        let mut session = Session::new(1_000);
        session.handle_message(empty_start(0), 0);
        session.request_join("alice");
        assert!(!session.is_joined());

        session.handle_message(join("alice", true), 10);
        assert!(session.is_joined());
        assert_eq!(session.name(), Some("alice"));

        let id = session.world().player_id("alice").unwrap();
        let player = &session.world().state.objects[&id];
        assert_eq!((player.x, player.y), SPAWN_SLOTS[0]);
    }

    #[test]
    fn test_broadcast_join_and_leave() {
        let mut session = Session::new(1_000);
        session.handle_message(empty_start(0), 0);
        session.handle_message(join("alice", true), 0);
        session.handle_message(join("bob", false), 0);
        assert_eq!(session.world().player_count(), 2);

        session.handle_message(
            ServerMessage::Leave(LeaveNotice {
                name: "bob".to_string(),
                time_stamp: 0,
            }),
            0,
        );
        assert_eq!(session.world().player_count(), 1);
        assert!(session.is_joined());
    }

    #[test]
    fn test_leave_of_own_player() {
        let mut session = Session::new(1_000);
        session.handle_message(join("alice", true), 0);
        session.handle_message(
            ServerMessage::Leave(LeaveNotice {
                name: "alice".to_string(),
                time_stamp: 0,
            }),
            0,
        );
        assert!(!session.is_joined());
        assert_eq!(session.world().player_count(), 0);
    }

    #[test]
    fn test_duplicate_join_notice_is_ignored() {
        let mut session = Session::new(1_000);
        session.handle_message(join("alice", false), 0);
        session.handle_message(join("alice", false), 0);
        assert_eq!(session.world().player_count(), 1);
    }

    #[test]
    fn test_time_overrides_replica_clock() {
        let mut session = Session::new(1_000);
        session.handle_message(empty_start(1_000), 1_000);

        let replies = session.handle_message(time(1_200), 1_200);
        assert!(replies.is_empty());
        assert_eq!(session.world().time_stamp(), 1_200);
        assert_eq!(session.clock().total_skew(), 200);
    }

    #[test]
    fn test_large_skew_requests_snapshot() {
        let mut session = Session::new(1_000);
        session.handle_message(empty_start(1_000), 1_000);

        let replies = session.handle_message(time(3_500), 1_100);
        assert_eq!(replies, vec![ClientMessage::State]);
        assert_eq!(session.clock().total_skew(), 0);
        assert_eq!(session.world().time_stamp(), 3_500);
    }

    #[test]
    fn test_tick_projects_to_server_time() {
        let mut session = Session::new(1_000);
        // client wall clock runs 500ms ahead of the server
        session.handle_message(empty_start(10_000), 10_500);

        session.tick(10_533);
        assert_eq!(session.world().time_stamp(), 10_033);

        // a tick whose target is in the past leaves the replica alone
        session.tick(10_400);
        assert_eq!(session.world().time_stamp(), 10_033);
    }

    #[test]
    fn test_tick_moves_players_along_velocity() {
        let mut state = WorldState::new(1_000);
        let mut alice = shared::Entity::player(EntityId(1), "alice", 200.0, 200.0);
        alice.set_velocity(100.0, -50.0);
        state.objects.insert(EntityId(1), alice);

        let mut session = Session::new(1_000);
        session.handle_message(
            ServerMessage::State {
                state: shared::snapshot::save(&state),
            },
            1_000,
        );
        session.tick(1_500);

        let alice = &session.world().state.objects[&EntityId(1)];
        assert_approx_eq!(alice.x, 250.0);
        assert_approx_eq!(alice.y, 175.0);
    }

    #[test]
    fn test_tick_before_start_does_nothing() {
        let mut session = Session::new(1_000);
        assert!(session.tick(99_999).is_empty());
        assert_eq!(session.world().time_stamp(), 0);
    }

    #[test]
    fn test_malformed_snapshot_keeps_replica() {
        let mut session = Session::new(1_000);
        session.handle_message(empty_start(0), 0);
        session.handle_message(join("alice", true), 0);

        let mut state = WorldState::new(9_000);
        state.objects.insert(
            EntityId(5),
            shared::Entity::enemy(EntityId(5), 1.0, 1.0, 0.0, 0.0),
        );
        let mut snapshot = shared::snapshot::save(&state);
        snapshot.objects.get_mut(&EntityId(5)).unwrap().kind = "ghost".to_string();

        session.handle_message(ServerMessage::State { state: snapshot }, 0);
        assert_eq!(session.world().player_count(), 1);
        assert_eq!(session.world().time_stamp(), 0);
    }

    #[test]
    fn test_rejection_clears_pending_name() {
        let mut session = Session::new(1_000);
        session.request_join("alice");
        session.handle_message(
            ServerMessage::Rejected {
                name: "alice".to_string(),
                reason: "name 'alice' is already taken".to_string(),
            },
            0,
        );
        assert_eq!(session.name(), None);
        assert!(!session.is_joined());
    }
}
