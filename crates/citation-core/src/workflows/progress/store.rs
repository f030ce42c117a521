use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::Utc;

use super::snapshot::{ProgressCounters, ProgressSnapshot};
use crate::persist::{write_json_atomic, PersistError};
use crate::workflows::submission::{Attempt, AttemptId, Outcome};

#[derive(Debug, Default)]
struct ProgressState {
    counters: ProgressCounters,
    log: Vec<Attempt>,
}

/// Shared run progress. The only state written by several workers.
///
/// `record` appends, updates counters and rewrites the snapshot file under
/// one lock, so the file on disk always matches some prefix of the log.
#[derive(Debug)]
pub struct ProgressStore {
    run_id: String,
    started: Instant,
    prior_elapsed: f64,
    sequence: AtomicU64,
    state: Mutex<ProgressState>,
    path: Option<PathBuf>,
}

/// Run identifier derived from the current UTC time.
pub fn new_run_id() -> String {
    Utc::now().format("run-%Y%m%dT%H%M%SZ").to_string()
}

impl ProgressStore {
    /// In-memory store; nothing is written to disk.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self::build(run_id.into(), None, Vec::new(), 0.0)
    }

    pub fn persisted(run_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::build(run_id.into(), Some(path.into()), Vec::new(), 0.0)
    }

    /// A new run seeded with attempts carried over from a previous snapshot.
    pub fn resume(
        run_id: impl Into<String>,
        path: impl Into<PathBuf>,
        carried: Vec<Attempt>,
    ) -> Self {
        Self::build(run_id.into(), Some(path.into()), carried, 0.0)
    }

    /// Rebuilds a store by replaying a persisted log.
    pub fn from_snapshot(snapshot: ProgressSnapshot, path: Option<PathBuf>) -> Self {
        Self::build(
            snapshot.run_id,
            path,
            snapshot.attempt_log,
            snapshot.elapsed_seconds,
        )
    }

    fn build(run_id: String, path: Option<PathBuf>, log: Vec<Attempt>, prior_elapsed: f64) -> Self {
        let counters = ProgressCounters::replay(&log);
        Self {
            run_id,
            started: Instant::now(),
            prior_elapsed,
            sequence: AtomicU64::new(log.len() as u64),
            state: Mutex::new(ProgressState { counters, log }),
            path,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn next_attempt_id(&self) -> AttemptId {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        AttemptId(format!("{}-{seq:04}", self.run_id))
    }

    pub fn record(&self, attempt: Attempt) {
        let mut state = self.lock();
        state.counters.apply(&attempt.outcome);
        state.log.push(attempt);

        if let Some(path) = &self.path {
            let snapshot = self.snapshot_of(&state);
            if let Err(err) = write_json_atomic(path, &snapshot) {
                tracing::warn!(target: "progress", error = %err, "failed to persist progress snapshot");
            }
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.lock();
        self.snapshot_of(&state)
    }

    fn snapshot_of(&self, state: &ProgressState) -> ProgressSnapshot {
        let elapsed = self.prior_elapsed + self.started.elapsed().as_secs_f64();
        ProgressSnapshot {
            timestamp: Utc::now(),
            run_id: self.run_id.clone(),
            counters: state.counters,
            attempt_log: state.log.clone(),
            elapsed_seconds: (elapsed * 10.0).round() / 10.0,
            success_rate_percent: state.counters.success_rate_percent(),
        }
    }

    /// Writes the current snapshot regardless of pending records.
    pub fn flush(&self) -> Result<(), PersistError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let state = self.lock();
        write_json_atomic(path, &self.snapshot_of(&state))
    }

    pub fn counters(&self) -> ProgressCounters {
        self.lock().counters
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.lock().log.clone()
    }

    /// `PendingVerification` attempts for `target`, oldest first.
    pub fn pending_for(&self, target: &str) -> Vec<Attempt> {
        self.lock()
            .log
            .iter()
            .filter(|attempt| {
                attempt.outcome == Outcome::PendingVerification
                    && attempt.target.eq_ignore_ascii_case(target)
            })
            .cloned()
            .collect()
    }
}
