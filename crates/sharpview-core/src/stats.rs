use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Telemetry counters for the upscaling controller.
///
/// Observability only; nothing in the state machine branches on these.
#[derive(Debug, Default)]
pub struct ControllerStats {
    sessions_started: AtomicU64,
    sessions_torn_down: AtomicU64,
    locate_misses: AtomicU64,
    ready_timeouts: AtomicU64,
    render_faults: AtomicU64,
    superseded_attempts: AtomicU64,
}

impl ControllerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_sessions_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sessions_torn_down(&self) {
        self.sessions_torn_down.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_locate_misses(&self) {
        self.locate_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ready_timeouts(&self) {
        self.ready_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_render_faults(&self) {
        self.render_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_superseded_attempts(&self) {
        self.superseded_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ControllerStatsSnapshot {
        ControllerStatsSnapshot {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_torn_down: self.sessions_torn_down.load(Ordering::Relaxed),
            locate_misses: self.locate_misses.load(Ordering::Relaxed),
            ready_timeouts: self.ready_timeouts.load(Ordering::Relaxed),
            render_faults: self.render_faults.load(Ordering::Relaxed),
            superseded_attempts: self.superseded_attempts.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControllerStatsSnapshot {
    pub sessions_started: u64,
    pub sessions_torn_down: u64,
    pub locate_misses: u64,
    pub ready_timeouts: u64,
    pub render_faults: u64,
    pub superseded_attempts: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let stats = ControllerStats::new();
        stats.inc_sessions_started();
        stats.inc_sessions_started();
        stats.inc_sessions_torn_down();
        stats.inc_superseded_attempts();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.sessions_started, 2);
        assert_eq!(snapshot.sessions_torn_down, 1);
        assert_eq!(snapshot.superseded_attempts, 1);
        assert_eq!(snapshot.render_faults, 0);
    }

    #[test]
    fn snapshot_serializes_counter_names() {
        let stats = ControllerStats::new();
        stats.inc_locate_misses();
        let json = serde_json::to_string(&stats.snapshot()).unwrap();
        assert!(json.contains("\"locate_misses\":1"));
        assert!(json.contains("\"ready_timeouts\":0"));
    }
}
