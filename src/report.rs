use crate::cli::{ReportArgs, TargetsArgs};
use citation_core::config::AppConfig;
use citation_core::error::AppError;
use citation_core::workflows::progress::ProgressSnapshot;
use citation_core::workflows::submission::{DifficultyTier, TargetCatalog};
use citation_core::workflows::verification::VerificationLedger;
use std::fs::File;
use std::io::BufWriter;

pub(crate) fn report(args: ReportArgs, mut config: AppConfig) -> Result<(), AppError> {
    if let Some(progress) = args.progress {
        config.storage.progress_path = progress;
    }
    let progress_path = &config.storage.progress_path;
    let Some(snapshot) = ProgressSnapshot::load(progress_path)? else {
        println!("No progress snapshot at {}", progress_path.display());
        return Ok(());
    };
    let ledger = VerificationLedger::load(&config.storage.ledger_path)?;

    render_snapshot(&snapshot, &ledger, args.list_attempts);

    if let Some(path) = args.csv {
        let file = File::create(&path)?;
        snapshot
            .write_csv(BufWriter::new(file))
            .map_err(std::io::Error::from)?;
        println!("\nAttempt log written to {}", path.display());
    }
    Ok(())
}

fn render_snapshot(snapshot: &ProgressSnapshot, ledger: &VerificationLedger, list_attempts: bool) {
    let counters = snapshot.counters;
    println!("Citation run {} (as of {})", snapshot.run_id, snapshot.timestamp);
    println!(
        "Attempted {}, submitted {}, pending verification {}, failed {} ({:.1}% success)",
        counters.attempted,
        counters.successful,
        counters.pending,
        counters.failed,
        snapshot.success_rate_percent
    );
    if !snapshot.is_consistent() {
        println!("Warning: counters do not match the attempt log");
    }

    println!("\nLatest outcome by target");
    for attempt in snapshot.latest_by_target().values() {
        let verified = ledger
            .reconciled_for(&attempt.target)
            .any(|record| record.attempt_id == attempt.id);
        println!(
            "- {} ({}): {}{}",
            attempt.target,
            attempt.tier,
            attempt.outcome.label(),
            if verified { ", verified" } else { "" }
        );
    }

    println!(
        "\nVerification ledger: {} reconciled, {} unmatched",
        ledger.reconciliations.len(),
        ledger.unmatched.len()
    );

    if list_attempts {
        println!("\nAttempt log");
        for attempt in &snapshot.attempt_log {
            println!(
                "- {} | {} | {} | {} fields | {:.1}s | {}",
                attempt.id,
                attempt.target,
                attempt.outcome.label(),
                attempt.fields_filled,
                attempt.elapsed_seconds(),
                attempt.message
            );
        }
    }
}

pub(crate) fn targets(args: TargetsArgs) -> Result<(), AppError> {
    let catalog = match &args.targets {
        Some(path) => TargetCatalog::from_path(path)?,
        None => TargetCatalog::standard(),
    };
    let selected = catalog.select(&[], &args.tier)?;

    for tier in DifficultyTier::ORDERED {
        let names: Vec<&str> = selected
            .iter()
            .filter(|target| target.tier == tier)
            .map(|target| target.name.as_str())
            .collect();
        if names.is_empty() {
            continue;
        }
        println!("{} ({})", tier, names.len());
        for name in names {
            println!("- {name}");
        }
    }
    Ok(())
}
