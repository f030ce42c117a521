use std::path::PathBuf;

use chrono::Utc;

use super::domain::{
    ReconciliationRecord, TargetIdentity, UnmatchedEvent, UnmatchedReason, VerificationEvent,
};
use super::identity::IdentityTable;
use super::ledger::{LedgerError, VerificationLedger};
use crate::workflows::progress::ProgressStore;

/// What one pass over a batch of events changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationReport {
    pub reconciled: Vec<ReconciliationRecord>,
    pub unmatched: Vec<UnmatchedEvent>,
    pub duplicates: usize,
}

/// Matches verification mail to pending submission attempts and records the
/// decision in the ledger. One correlator owns the ledger for the duration of
/// a verify pass.
#[derive(Debug)]
pub struct VerificationCorrelator {
    table: IdentityTable,
    ledger: VerificationLedger,
    ledger_path: Option<PathBuf>,
}

impl VerificationCorrelator {
    pub fn new(table: IdentityTable, ledger: VerificationLedger) -> Self {
        Self {
            table,
            ledger,
            ledger_path: None,
        }
    }

    /// Loads the ledger at `path` and saves back to it after each batch.
    pub fn open(table: IdentityTable, path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let ledger = VerificationLedger::load(&path)?;
        Ok(Self {
            table,
            ledger,
            ledger_path: Some(path),
        })
    }

    pub fn ledger(&self) -> &VerificationLedger {
        &self.ledger
    }

    /// Correlates a single event. Returns the new reconciliation, or `None`
    /// when the event was a duplicate or could not be matched.
    pub fn correlate(
        &mut self,
        event: &VerificationEvent,
        progress: &ProgressStore,
    ) -> Option<ReconciliationRecord> {
        if self.ledger.is_processed(&event.message_id) {
            tracing::debug!(target: "correlator", message_id = %event.message_id, "already processed");
            return None;
        }
        self.ledger.processed_ids.insert(event.message_id.clone());

        let target = match self.table.resolve(&event.sender, &event.subject) {
            TargetIdentity::Known(target) => target,
            TargetIdentity::Unknown => {
                self.unmatched(event, TargetIdentity::Unknown, UnmatchedReason::UnknownSender);
                return None;
            }
        };

        let candidates: Vec<_> = progress
            .pending_for(&target)
            .into_iter()
            .filter(|attempt| !self.ledger.is_reconciled(&attempt.id))
            .collect();
        let anomaly = candidates.len() > 1;
        let Some(attempt) = candidates
            .into_iter()
            .max_by_key(|attempt| attempt.finished_at)
        else {
            self.unmatched(
                event,
                TargetIdentity::Known(target),
                UnmatchedReason::NoPendingAttempt,
            );
            return None;
        };

        if anomaly {
            tracing::warn!(
                target: "correlator",
                target_name = %target,
                attempt_id = %attempt.id,
                "several unreconciled pending attempts; using the latest"
            );
        }

        let record = ReconciliationRecord {
            message_id: event.message_id.clone(),
            target,
            attempt_id: attempt.id,
            payload: event.payload.clone(),
            reconciled_at: Utc::now(),
            anomaly,
        };
        tracing::info!(
            target: "correlator",
            target_name = %record.target,
            attempt_id = %record.attempt_id,
            "attempt verified"
        );
        self.ledger.reconciliations.push(record.clone());
        Some(record)
    }

    /// Correlates a batch and saves the ledger once at the end.
    pub fn correlate_all(
        &mut self,
        events: &[VerificationEvent],
        progress: &ProgressStore,
    ) -> Result<CorrelationReport, LedgerError> {
        let mut report = CorrelationReport::default();
        for event in events {
            if self.ledger.is_processed(&event.message_id) {
                report.duplicates += 1;
                continue;
            }
            let unmatched_before = self.ledger.unmatched.len();
            match self.correlate(event, progress) {
                Some(record) => report.reconciled.push(record),
                None => report
                    .unmatched
                    .extend(self.ledger.unmatched[unmatched_before..].iter().cloned()),
            }
        }

        if let Some(path) = &self.ledger_path {
            self.ledger.save(path)?;
        }
        Ok(report)
    }

    fn unmatched(
        &mut self,
        event: &VerificationEvent,
        identity: TargetIdentity,
        reason: UnmatchedReason,
    ) {
        tracing::info!(
            target: "correlator",
            message_id = %event.message_id,
            reason = ?reason,
            "verification email left unmatched"
        );
        self.ledger.unmatched.push(UnmatchedEvent {
            message_id: event.message_id.clone(),
            identity,
            reason,
            received_at: event.received_at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::submission::{Attempt, DifficultyTier, Outcome};
    use crate::workflows::verification::VerificationPayload;
    use chrono::Duration;

    fn record_attempt(store: &ProgressStore, target: &str, outcome: Outcome, minutes_ago: i64) {
        let finished = Utc::now() - Duration::minutes(minutes_ago);
        store.record(Attempt {
            id: store.next_attempt_id(),
            target: target.to_string(),
            tier: DifficultyTier::Easy,
            started_at: finished - Duration::seconds(20),
            finished_at: finished,
            outcome,
            message: String::new(),
            fields_filled: 6,
        });
    }

    fn event(id: &str, sender: &str, subject: &str) -> VerificationEvent {
        VerificationEvent {
            message_id: id.to_string(),
            sender: sender.to_string(),
            subject: subject.to_string(),
            payload: VerificationPayload::Link("https://www.hotfrog.com/confirm/abc".to_string()),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn hotfrog_confirmation_reconciles_and_duplicates_are_ignored() {
        let store = ProgressStore::new("run-v");
        record_attempt(&store, "Hotfrog", Outcome::PendingVerification, 30);
        record_attempt(&store, "Cylex", Outcome::Submitted, 25);

        let mut correlator =
            VerificationCorrelator::new(IdentityTable::standard(), VerificationLedger::default());
        let confirm = event("m-1", "noreply@hotfrog.com", "Confirm your listing");

        let record = correlator
            .correlate(&confirm, &store)
            .expect("pending hotfrog attempt reconciled");
        assert_eq!(record.target, "Hotfrog");
        assert_eq!(record.attempt_id.0, "run-v-0001");
        assert!(!record.anomaly);

        assert_eq!(correlator.correlate(&confirm, &store), None);
        assert_eq!(correlator.ledger().reconciliations.len(), 1);
        // The attempt log is never rewritten.
        assert_eq!(store.attempts()[0].outcome, Outcome::PendingVerification);
    }

    #[test]
    fn unknown_senders_and_missing_attempts_are_recorded_unmatched() {
        let store = ProgressStore::new("run-u");
        record_attempt(&store, "Manta", Outcome::Submitted, 5);

        let mut correlator =
            VerificationCorrelator::new(IdentityTable::standard(), VerificationLedger::default());
        let report = correlator
            .correlate_all(
                &[
                    event("m-1", "hello@newsletter.test", "Confirm your subscription"),
                    event("m-2", "noreply@manta.com", "Verify your business"),
                ],
                &store,
            )
            .expect("no ledger path to save");

        assert!(report.reconciled.is_empty());
        let reasons: Vec<_> = report.unmatched.iter().map(|event| event.reason).collect();
        assert_eq!(
            reasons,
            vec![UnmatchedReason::UnknownSender, UnmatchedReason::NoPendingAttempt]
        );
        assert!(correlator.ledger().is_processed("m-1"));
        assert!(correlator.ledger().is_processed("m-2"));
    }

    #[test]
    fn several_pending_attempts_pick_the_latest_and_flag_anomaly() {
        let store = ProgressStore::new("run-w");
        record_attempt(&store, "Hotfrog", Outcome::PendingVerification, 60);
        record_attempt(&store, "Hotfrog", Outcome::PendingVerification, 10);

        let mut correlator =
            VerificationCorrelator::new(IdentityTable::standard(), VerificationLedger::default());
        let first = correlator
            .correlate(&event("m-1", "noreply@hotfrog.com", "Confirm"), &store)
            .expect("reconciled");
        assert!(first.anomaly);
        assert_eq!(first.attempt_id.0, "run-w-0002");

        let second = correlator
            .correlate(&event("m-2", "noreply@hotfrog.com", "Confirm again"), &store)
            .expect("older attempt still pending");
        assert!(!second.anomaly);
        assert_eq!(second.attempt_id.0, "run-w-0001");
    }

    #[test]
    fn replaying_against_a_saved_ledger_changes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.json");
        let store = ProgressStore::new("run-r");
        record_attempt(&store, "Hotfrog", Outcome::PendingVerification, 15);
        let events = vec![event("m-1", "noreply@hotfrog.com", "Confirm your listing")];

        let mut first = VerificationCorrelator::open(IdentityTable::standard(), &path)
            .expect("ledger opened");
        let report = first.correlate_all(&events, &store).expect("saved");
        assert_eq!(report.reconciled.len(), 1);

        let mut second = VerificationCorrelator::open(IdentityTable::standard(), &path)
            .expect("ledger reopened");
        let replay = second.correlate_all(&events, &store).expect("saved");
        assert!(replay.reconciled.is_empty());
        assert_eq!(replay.duplicates, 1);
        assert_eq!(second.ledger(), first.ledger());
    }
}
