//! Clock-skew correction between a replica and the server
//!
//! The client never trusts its own wall clock to match the server's. It
//! records the offset between the two once, when the first snapshot
//! arrives, and projects the replica to `local_now - start_delta`. Each
//! `time` message compares the server's `lastUpdate` to the replica's
//! timestamp; the drift accumulates, and once it exceeds the threshold the
//! client asks for a fresh snapshot and starts counting again.

use log::{debug, info};
use shared::SKEW_THRESHOLD_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Unsynced,
    Synced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    InSync,
    /// Accumulated skew is too large; request a full snapshot
    Resync,
}

#[derive(Debug, Clone)]
pub struct ClockSync {
    status: SyncStatus,
    total_skew: i64,
    threshold_ms: i64,
    /// `local wall clock - server timestamp` at the first snapshot
    start_delta: Option<i64>,
    resyncs: u64,
}

impl Default for ClockSync {
    fn default() -> Self {
        Self::new(SKEW_THRESHOLD_MS)
    }
}

impl ClockSync {
    pub fn new(threshold_ms: i64) -> Self {
        Self {
            status: SyncStatus::Unsynced,
            total_skew: 0,
            threshold_ms,
            start_delta: None,
            resyncs: 0,
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn total_skew(&self) -> i64 {
        self.total_skew
    }

    pub fn start_delta(&self) -> Option<i64> {
        self.start_delta
    }

    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }

    /// A full snapshot was applied. The clock offset is captured only once.
    pub fn on_snapshot(&mut self, server_time_stamp: u64, local_now: u64) {
        if self.start_delta.is_none() {
            let delta = local_now as i64 - server_time_stamp as i64;
            info!("Clock offset to server: {}ms", delta);
            self.start_delta = Some(delta);
        }
        self.status = SyncStatus::Synced;
    }

    /// Folds one `time` message into the accumulated skew.
    ///
    /// The caller sets the replica timestamp to `last_update` afterwards,
    /// whatever the decision.
    pub fn on_time(&mut self, last_update: u64, local_time_stamp: u64) -> SyncDecision {
        let drift = last_update as i64 - local_time_stamp as i64;
        self.total_skew += drift;
        debug!("Drift {}ms, accumulated skew {}ms", drift, self.total_skew);

        if self.total_skew.abs() > self.threshold_ms {
            info!(
                "Skew {}ms exceeds {}ms, requesting snapshot",
                self.total_skew, self.threshold_ms
            );
            self.total_skew = 0;
            self.status = SyncStatus::Unsynced;
            self.resyncs += 1;
            SyncDecision::Resync
        } else {
            SyncDecision::InSync
        }
    }

    /// Server time the replica should be projected to at `local_now`
    pub fn projection_target(&self, local_now: u64) -> Option<u64> {
        self.start_delta
            .map(|delta| (local_now as i64 - delta).max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unsynced_without_target() {
        let clock = ClockSync::default();
        assert_eq!(clock.status(), SyncStatus::Unsynced);
        assert_eq!(clock.projection_target(1_000), None);
        assert_eq!(clock.total_skew(), 0);
    }

    #[test]
    fn test_start_delta_captured_once() {
        let mut clock = ClockSync::default();
        clock.on_snapshot(10_000, 10_250);
        assert_eq!(clock.start_delta(), Some(250));
        assert_eq!(clock.status(), SyncStatus::Synced);

        clock.on_snapshot(20_000, 20_900);
        assert_eq!(clock.start_delta(), Some(250));
        assert_eq!(clock.projection_target(10_283), Some(10_033));
    }

    #[test]
    fn test_server_ahead_of_client_clock() {
        let mut clock = ClockSync::default();
        clock.on_snapshot(50_000, 1_000);
        assert_eq!(clock.start_delta(), Some(-49_000));
        assert_eq!(clock.projection_target(1_033), Some(50_033));
    }

    #[test]
    fn test_small_drift_accumulates() {
        let mut clock = ClockSync::new(1_000);
        assert_eq!(clock.on_time(2_400, 2_000), SyncDecision::InSync);
        assert_eq!(clock.on_time(4_100, 4_000), SyncDecision::InSync);
        assert_eq!(clock.total_skew(), 500);
    }

    #[test]
    fn test_threshold_triggers_resync_and_reset() {
        let mut clock = ClockSync::new(1_000);
        clock.on_snapshot(0, 0);

        assert_eq!(clock.on_time(2_600, 2_000), SyncDecision::InSync);
        assert_eq!(clock.on_time(4_500, 4_000), SyncDecision::Resync);
        assert_eq!(clock.total_skew(), 0);
        assert_eq!(clock.status(), SyncStatus::Unsynced);
        assert_eq!(clock.resyncs(), 1);

        clock.on_snapshot(4_500, 4_510);
        assert_eq!(clock.status(), SyncStatus::Synced);
    }

    #[test]
    fn test_negative_skew_counts() {
        let mut clock = ClockSync::new(1_000);
        assert_eq!(clock.on_time(1_000, 1_800), SyncDecision::InSync);
        assert_eq!(clock.on_time(3_000, 3_300), SyncDecision::Resync);
    }

    #[test]
    fn test_exact_threshold_is_in_sync() {
        let mut clock = ClockSync::new(1_000);
        assert_eq!(clock.on_time(2_000, 1_000), SyncDecision::InSync);
        assert_eq!(clock.total_skew(), 1_000);
    }
}
