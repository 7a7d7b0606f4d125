use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use session::SessionId;

/// Lifecycle of one lookup job inside the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Enqueued,
    InFlight,
    /// A candidate survived the guards and was delivered.
    Resolved,
    /// Every name attempt came back empty or errored.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub enqueued: u64,
    pub in_flight: u64,
    pub resolved: u64,
    pub failed: u64,
    pub stale: u64,
}

/// Counters plus the last known state of each job.
///
/// Per-job states are kept for the newest session only, plus any older job
/// still enqueued or in flight; counters cover every session.
#[derive(Default)]
pub struct DispatcherStats {
    enqueued: AtomicU64,
    in_flight: AtomicU64,
    resolved: AtomicU64,
    failed: AtomicU64,
    stale: AtomicU64,
    jobs: Mutex<HashMap<(SessionId, String), JobState>>,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
        }
    }

    pub fn state_of(&self, session_id: SessionId, commodity_key: &str) -> Option<JobState> {
        self.jobs
            .lock()
            .get(&(session_id, commodity_key.to_string()))
            .copied()
    }

    pub(crate) fn transition(&self, session_id: SessionId, commodity_key: &str, next: JobState) {
        let prev = {
            let mut jobs = self.jobs.lock();
            if next == JobState::Enqueued {
                jobs.retain(|(sid, _), state| {
                    *sid == session_id || matches!(state, JobState::Enqueued | JobState::InFlight)
                });
            }
            jobs.insert((session_id, commodity_key.to_string()), next)
        };

        if prev == Some(JobState::InFlight) {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
        }
        let counter = match next {
            JobState::Enqueued => &self.enqueued,
            JobState::InFlight => &self.in_flight,
            JobState::Resolved => &self.resolved,
            JobState::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a result refused as stale and drops its session's job states.
    pub(crate) fn mark_stale(&self, session_id: SessionId) {
        self.stale.fetch_add(1, Ordering::Relaxed);
        self.jobs.lock().retain(|(sid, _), _| *sid != session_id);
    }

    /// Jobs whose state is still tracked.
    pub fn tracked(&self) -> usize {
        self.jobs.lock().len()
    }
}
