use std::collections::HashMap;
use std::time::Instant;

use crate::snapshot::SessionInfo;

/// Reconciled baseline for one session's timer.
#[derive(Debug, Clone, Copy)]
struct Baseline {
    server_elapsed: u64,
    observed_at: Instant,
    last_shown: u64,
}

/// Per-session elapsed seconds, reconciled without trusting the device
/// wall clock. Each successful sync records the server-computed elapsed
/// value together with a monotonic instant; the displayed value is that
/// baseline plus the monotonic delta since the sync, clamped so it never
/// runs backward for a session seen across consecutive syncs.
#[derive(Debug)]
pub struct ElapsedTracker {
    baselines: HashMap<i64, Baseline>,
    frozen: bool,
}

impl ElapsedTracker {
    pub fn new() -> Self {
        ElapsedTracker {
            baselines: HashMap::new(),
            frozen: false,
        }
    }

    /// Install baselines from a freshly-received session list. Sessions no
    /// longer present are dropped; surviving sessions keep their shown
    /// high-water mark.
    pub fn observe(&mut self, sessions: &[SessionInfo], now: Instant) {
        let mut next = HashMap::with_capacity(sessions.len());
        for session in sessions {
            let last_shown = self
                .baselines
                .get(&session.id)
                .map(|b| b.last_shown)
                .unwrap_or(0)
                .max(session.elapsed);
            next.insert(
                session.id,
                Baseline {
                    server_elapsed: session.elapsed,
                    observed_at: now,
                    last_shown,
                },
            );
        }
        self.baselines = next;
    }

    /// Displayed elapsed seconds for a session, or None if untracked.
    pub fn elapsed(&mut self, id: i64, now: Instant) -> Option<u64> {
        let baseline = self.baselines.get_mut(&id)?;
        if self.frozen {
            return Some(baseline.last_shown);
        }
        let since = now.saturating_duration_since(baseline.observed_at).as_secs();
        let shown = (baseline.server_elapsed + since).max(baseline.last_shown);
        baseline.last_shown = shown;
        Some(shown)
    }

    /// While frozen (connectivity lost) every timer holds its last value
    /// rather than advancing from data that may no longer be real.
    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Drop all baselines, e.g. when switching rooms.
    pub fn reset(&mut self) {
        self.baselines.clear();
        self.frozen = false;
    }
}

impl Default for ElapsedTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session(id: i64, elapsed: u64) -> SessionInfo {
        SessionInfo {
            id,
            name: format!("s{id}"),
            elapsed,
            overdue: false,
            start_ms: 0,
        }
    }

    #[test]
    fn elapsed_advances_with_monotonic_delta() {
        let t0 = Instant::now();
        let mut tracker = ElapsedTracker::new();
        tracker.observe(&[session(1, 130)], t0);
        assert_eq!(tracker.elapsed(1, t0), Some(130));
        assert_eq!(tracker.elapsed(1, t0 + Duration::from_secs(5)), Some(135));
    }

    #[test]
    fn display_is_monotonic_across_syncs() {
        let t0 = Instant::now();
        let mut tracker = ElapsedTracker::new();
        tracker.observe(&[session(1, 100)], t0);
        assert_eq!(tracker.elapsed(1, t0 + Duration::from_secs(10)), Some(110));

        // A later sync reporting a smaller elapsed (server clock hiccup)
        // must not pull the display backward.
        tracker.observe(&[session(1, 95)], t0 + Duration::from_secs(11));
        assert_eq!(tracker.elapsed(1, t0 + Duration::from_secs(11)), Some(110));
        assert_eq!(tracker.elapsed(1, t0 + Duration::from_secs(30)), Some(114));
    }

    #[test]
    fn frozen_timers_hold_still() {
        let t0 = Instant::now();
        let mut tracker = ElapsedTracker::new();
        tracker.observe(&[session(2, 40)], t0);
        assert_eq!(tracker.elapsed(2, t0 + Duration::from_secs(3)), Some(43));

        tracker.set_frozen(true);
        assert_eq!(tracker.elapsed(2, t0 + Duration::from_secs(60)), Some(43));

        tracker.set_frozen(false);
        assert_eq!(tracker.elapsed(2, t0 + Duration::from_secs(60)), Some(100));
    }

    #[test]
    fn departed_sessions_are_dropped() {
        let t0 = Instant::now();
        let mut tracker = ElapsedTracker::new();
        tracker.observe(&[session(1, 10), session(2, 20)], t0);
        tracker.observe(&[session(2, 21)], t0 + Duration::from_secs(1));
        assert_eq!(tracker.elapsed(1, t0 + Duration::from_secs(2)), None);
        assert_eq!(tracker.elapsed(2, t0 + Duration::from_secs(2)), Some(22));
    }

    #[test]
    fn reset_clears_everything() {
        let t0 = Instant::now();
        let mut tracker = ElapsedTracker::new();
        tracker.observe(&[session(1, 10)], t0);
        tracker.set_frozen(true);
        tracker.reset();
        assert_eq!(tracker.elapsed(1, t0), None);
        assert!(!tracker.is_frozen());
    }
}
