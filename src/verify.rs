use crate::cli::VerifyArgs;
use citation_core::config::AppConfig;
use citation_core::error::AppError;
use citation_core::workflows::progress::{ProgressSnapshot, ProgressStore};
use citation_core::workflows::verification::{
    CorrelationReport, IdentityTable, InboxClient, InboxQuery, JsonInboxExport,
    VerificationCorrelator, VerificationPayload,
};
use tracing::{info, warn};

pub(crate) async fn verify(args: VerifyArgs, mut config: AppConfig) -> Result<(), AppError> {
    args.apply(&mut config);

    let progress_path = &config.storage.progress_path;
    let Some(snapshot) = ProgressSnapshot::load(progress_path)? else {
        warn!(path = %progress_path.display(), "no progress snapshot; nothing to verify against");
        println!("No progress snapshot at {}", progress_path.display());
        return Ok(());
    };
    let progress = ProgressStore::from_snapshot(snapshot, None);

    let table = IdentityTable::standard();
    let query = InboxQuery::standard(&table);
    let window = args.window();
    let events = JsonInboxExport::new(&args.events)
        .search_recent(&query, window)
        .await?;
    info!(events = events.len(), window_hours = window.num_hours(), "verification emails found");

    let mut correlator = VerificationCorrelator::open(table, &config.storage.ledger_path)?;
    let report = correlator.correlate_all(&events, &progress)?;

    render_report(&report, events.len());
    println!("\nLedger written to {}", config.storage.ledger_path.display());
    Ok(())
}

fn render_report(report: &CorrelationReport, found: usize) {
    println!("Verification emails in window: {found}");
    println!(
        "Reconciled {}, unmatched {}, already processed {}",
        report.reconciled.len(),
        report.unmatched.len(),
        report.duplicates
    );

    if !report.reconciled.is_empty() {
        println!("\nReconciled");
        for record in &report.reconciled {
            let action = match &record.payload {
                VerificationPayload::Link(url) => format!("open {url}"),
                VerificationPayload::Code(code) => format!("enter code {code}"),
            };
            let note = if record.anomaly {
                " (several pending attempts, latest used)"
            } else {
                ""
            };
            println!(
                "- {} [{}]: {}{}",
                record.target, record.attempt_id, action, note
            );
        }
    }

    if !report.unmatched.is_empty() {
        println!("\nUnmatched");
        for event in &report.unmatched {
            println!("- {}: {:?}", event.message_id, event.reason);
        }
    }
}
