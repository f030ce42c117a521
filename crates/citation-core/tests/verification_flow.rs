//! Verification mail reconciled against a persisted progress snapshot, the way
//! the `verify` step runs after a submission run has exited.

use std::path::Path;

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

use citation_core::workflows::progress::{ProgressSnapshot, ProgressStore};
use citation_core::workflows::submission::{Attempt, DifficultyTier, Outcome};
use citation_core::workflows::verification::{
    IdentityTable, InboxClient, InboxQuery, JsonInboxExport, UnmatchedReason,
    VerificationCorrelator, VerificationLedger, VerificationPayload,
};

fn record(store: &ProgressStore, target: &str, outcome: Outcome, finished_hour: u32) {
    let finished_at = Utc
        .with_ymd_and_hms(2025, 3, 4, finished_hour, 0, 0)
        .single()
        .expect("valid time");
    store.record(Attempt {
        id: store.next_attempt_id(),
        target: target.to_string(),
        tier: DifficultyTier::Medium,
        started_at: finished_at - Duration::seconds(30),
        finished_at,
        outcome,
        message: String::new(),
        fields_filled: 7,
    });
}

fn write_inbox(path: &Path) {
    let messages = json!([
        {
            "id": "msg-hotfrog",
            "sender": "listings@hotfrog.com",
            "subject": "Confirm your listing",
            "body": "Almost there! https://www.hotfrog.com/verify/abc-123.",
            "receivedAt": "2025-03-04T11:30:00Z"
        },
        {
            "id": "msg-yelp",
            "sender": "no-reply@yelp.com",
            "subject": "Verify your business phone",
            "body": "Your verification code: 904417",
            "receivedAt": "2025-03-04T11:45:00Z"
        },
        {
            "id": "msg-stranger",
            "sender": "team@unknown-directory.test",
            "subject": "Please confirm your email",
            "body": "https://unknown-directory.test/confirm?u=1",
            "receivedAt": "2025-03-04T11:50:00Z"
        }
    ]);
    std::fs::write(path, messages.to_string()).expect("inbox written");
}

#[tokio::test]
async fn verify_pass_reconciles_from_disk_and_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let progress_path = dir.path().join("progress.json");
    let ledger_path = dir.path().join("ledger.json");
    let inbox_path = dir.path().join("inbox.json");

    {
        let store = ProgressStore::persisted("run-9", &progress_path);
        record(&store, "Hotfrog", Outcome::PendingVerification, 10);
        record(&store, "Yelp", Outcome::Blocked("captcha".to_string()), 10);
        record(&store, "Cylex", Outcome::Submitted, 11);
    }
    write_inbox(&inbox_path);

    let snapshot = ProgressSnapshot::load(&progress_path)
        .expect("readable")
        .expect("written");
    let progress = ProgressStore::from_snapshot(snapshot, None);

    let table = IdentityTable::standard();
    let inbox = JsonInboxExport::new(&inbox_path)
        .with_reference_time(Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).single().expect("valid"));
    let events = inbox
        .search_recent(&InboxQuery::standard(&table), Duration::hours(24))
        .await
        .expect("inbox readable");
    assert_eq!(events.len(), 3);

    let mut correlator =
        VerificationCorrelator::open(table.clone(), &ledger_path).expect("ledger opened");
    let report = correlator
        .correlate_all(&events, &progress)
        .expect("ledger saved");

    assert_eq!(report.reconciled.len(), 1);
    let hotfrog = &report.reconciled[0];
    assert_eq!(hotfrog.target, "Hotfrog");
    assert_eq!(hotfrog.attempt_id.0, "run-9-0001");
    assert_eq!(
        hotfrog.payload,
        VerificationPayload::Link("https://www.hotfrog.com/verify/abc-123".to_string())
    );

    let mut reasons: Vec<_> = report
        .unmatched
        .iter()
        .map(|event| (event.message_id.as_str(), event.reason))
        .collect();
    reasons.sort_by_key(|(message_id, _)| *message_id);
    assert_eq!(
        reasons,
        vec![
            ("msg-stranger", UnmatchedReason::UnknownSender),
            ("msg-yelp", UnmatchedReason::NoPendingAttempt),
        ]
    );

    let saved = VerificationLedger::load(&ledger_path).expect("ledger readable");
    assert_eq!(saved.processed_ids.len(), 3);

    let mut replay = VerificationCorrelator::open(table, &ledger_path).expect("ledger reopened");
    let again = replay
        .correlate_all(&events, &progress)
        .expect("ledger saved");
    assert!(again.reconciled.is_empty());
    assert!(again.unmatched.is_empty());
    assert_eq!(again.duplicates, 3);
    assert_eq!(
        VerificationLedger::load(&ledger_path).expect("ledger readable"),
        saved
    );

    // Reconciliation never rewrites the attempt log.
    let after = ProgressSnapshot::load(&progress_path)
        .expect("readable")
        .expect("written");
    assert_eq!(after.counters.pending, 1);
    assert!(after.is_consistent());
}
