use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::persist::{read_json, PersistError};
use crate::workflows::submission::{Attempt, Outcome, OutcomeBucket, Target};

/// Aggregate counts. `attempted == successful + pending + failed` always.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCounters {
    pub attempted: usize,
    pub successful: usize,
    pub pending: usize,
    pub failed: usize,
}

impl ProgressCounters {
    pub fn apply(&mut self, outcome: &Outcome) {
        self.attempted += 1;
        match outcome.bucket() {
            OutcomeBucket::Successful => self.successful += 1,
            OutcomeBucket::Pending => self.pending += 1,
            OutcomeBucket::Failed => self.failed += 1,
        }
    }

    pub fn replay<'a>(attempts: impl IntoIterator<Item = &'a Attempt>) -> Self {
        let mut counters = Self::default();
        for attempt in attempts {
            counters.apply(&attempt.outcome);
        }
        counters
    }

    pub fn is_balanced(&self) -> bool {
        self.attempted == self.successful + self.pending + self.failed
    }

    /// Successful share of attempts, in percent with one decimal.
    pub fn success_rate_percent(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        let rate = self.successful as f64 / self.attempted as f64 * 100.0;
        (rate * 10.0).round() / 10.0
    }
}

/// Persisted view of a run; everything except the timestamps can be rebuilt
/// from `attempt_log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub timestamp: DateTime<Utc>,
    pub run_id: String,
    pub counters: ProgressCounters,
    pub attempt_log: Vec<Attempt>,
    pub elapsed_seconds: f64,
    pub success_rate_percent: f64,
}

/// Split of a target list into carried-over results and targets to retry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResumePlan {
    pub carried: Vec<Attempt>,
    pub remaining: Vec<Target>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow<'a> {
    attempt_id: &'a str,
    target: &'a str,
    tier: &'static str,
    outcome: &'static str,
    detail: &'a str,
    fields_filled: usize,
    started_at: String,
    finished_at: String,
}

impl ProgressSnapshot {
    pub fn load(path: &Path) -> Result<Option<Self>, PersistError> {
        read_json(path)
    }

    pub fn replay_counters(&self) -> ProgressCounters {
        ProgressCounters::replay(&self.attempt_log)
    }

    /// Counters agree with the log and with each other.
    pub fn is_consistent(&self) -> bool {
        self.counters.is_balanced() && self.counters == self.replay_counters()
    }

    /// Latest attempt per target, keyed by lowercase target name.
    pub fn latest_by_target(&self) -> BTreeMap<String, &Attempt> {
        let mut latest = BTreeMap::new();
        for attempt in &self.attempt_log {
            latest.insert(attempt.target.to_lowercase(), attempt);
        }
        latest
    }

    /// Targets whose latest outcome is final are carried over; the rest
    /// (never attempted, timed out, errored) run again.
    pub fn resume_plan(&self, targets: &[Target]) -> ResumePlan {
        let latest = self.latest_by_target();
        let mut plan = ResumePlan::default();
        for target in targets {
            match latest.get(&target.name.to_lowercase()) {
                Some(attempt) if !attempt.outcome.is_retryable() => {
                    plan.carried.push((*attempt).clone())
                }
                _ => plan.remaining.push(target.clone()),
            }
        }
        plan
    }

    pub fn attempts_with_outcome<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Attempt> {
        self.attempt_log
            .iter()
            .filter(move |attempt| attempt.outcome.label() == label)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv = csv::Writer::from_writer(writer);
        for attempt in &self.attempt_log {
            let detail = match &attempt.outcome {
                Outcome::Blocked(reason) => reason.as_str(),
                _ => attempt.message.as_str(),
            };
            csv.serialize(CsvRow {
                attempt_id: &attempt.id.0,
                target: &attempt.target,
                tier: attempt.tier.label(),
                outcome: attempt.outcome.label(),
                detail,
                fields_filled: attempt.fields_filled,
                started_at: attempt.started_at.to_rfc3339(),
                finished_at: attempt.finished_at.to_rfc3339(),
            })?;
        }
        csv.flush()?;
        Ok(())
    }
}
