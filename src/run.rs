use crate::cli::RunArgs;
use citation_core::config::AppConfig;
use citation_core::error::AppError;
use citation_core::session::{MemoryBrowser, SessionFactory, WebDriverSessionFactory};
use citation_core::workflows::progress::{new_run_id, ProgressSnapshot, ProgressStore};
use citation_core::workflows::submission::{
    AdapterRegistry, AttemptExecutor, AttemptRunner, ExecutorConfig, FieldMatcher, ProfileRecord,
    RunSummary, Scheduler, SchedulerConfig, Target, TargetCatalog,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Pause after clicking submit before the result page is read.
const SUBMIT_SETTLE: Duration = Duration::from_secs(3);

pub(crate) async fn run(args: RunArgs, mut config: AppConfig) -> Result<(), AppError> {
    args.apply(&mut config);

    let profile = ProfileRecord::from_path(&args.profile)?;
    let catalog = match &args.targets {
        Some(path) => TargetCatalog::from_path(path)?,
        None => TargetCatalog::standard(),
    };
    let selected = catalog.select(&args.only, &args.tier)?;

    let progress_path = config.storage.progress_path.clone();
    let run_id = new_run_id();
    let (store, targets) = if args.resume {
        match ProgressSnapshot::load(&progress_path)? {
            Some(previous) => {
                let plan = previous.resume_plan(&selected);
                info!(
                    previous_run = %previous.run_id,
                    carried = plan.carried.len(),
                    remaining = plan.remaining.len(),
                    "resuming from previous snapshot"
                );
                (
                    ProgressStore::resume(run_id, &progress_path, plan.carried),
                    plan.remaining,
                )
            }
            None => {
                warn!(path = %progress_path.display(), "no snapshot to resume from; starting fresh");
                (ProgressStore::persisted(run_id, &progress_path), selected)
            }
        }
    } else {
        (ProgressStore::persisted(run_id, &progress_path), selected)
    };
    let store = Arc::new(store);

    let sessions: Arc<dyn SessionFactory> = if args.dry_run {
        Arc::new(MemoryBrowser::new())
    } else {
        Arc::new(WebDriverSessionFactory::new(
            config.automation.webdriver_url.clone(),
            config.automation.headless,
        ))
    };
    let adapters = Arc::new(AdapterRegistry::standard(
        Arc::new(FieldMatcher::standard()),
        SUBMIT_SETTLE,
    ));
    let executor = AttemptExecutor::new(
        sessions,
        adapters,
        Arc::new(profile),
        ExecutorConfig::with_attempt_timeout(config.automation.attempt_timeout),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(interrupt_watcher(shutdown.clone()));

    let scheduler = Scheduler::new(
        Arc::new(executor),
        Arc::clone(&store),
        SchedulerConfig {
            batch_size: config.automation.batch_size,
            attempt_ceiling: config.automation.attempt_timeout,
            ..SchedulerConfig::default()
        },
    )
    .with_shutdown(shutdown);

    info!(
        run_id = %store.run_id(),
        targets = targets.len(),
        batch_size = config.automation.batch_size,
        headless = config.automation.headless,
        dry_run = args.dry_run,
        "submission run starting"
    );
    let summary = drive(&scheduler, &targets).await?;
    render_summary(&summary, &targets, &progress_path.display().to_string());
    Ok(())
}

/// Runs every target and writes the final snapshot. A failed preflight
/// returns before anything is written, so the previous snapshot survives.
async fn drive<R: AttemptRunner>(
    scheduler: &Scheduler<R>,
    targets: &[Target],
) -> Result<RunSummary, AppError> {
    let summary = scheduler.run(targets).await?;
    if let Err(err) = scheduler.store().flush() {
        warn!(target: "progress", error = %err, "failed to write final progress snapshot");
    }
    Ok(summary)
}

async fn interrupt_watcher(token: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received; finishing in-flight attempts");
        token.cancel();
    }
}

fn render_summary(summary: &RunSummary, targets: &[Target], progress_path: &str) {
    let snapshot = &summary.snapshot;
    let counters = snapshot.counters;

    println!("Citation run {}", snapshot.run_id);
    println!(
        "Targets this run: {} (elapsed {:.1}s)",
        targets.len(),
        snapshot.elapsed_seconds
    );
    println!(
        "Attempted {}, submitted {}, pending verification {}, failed {} ({:.1}% success)",
        counters.attempted,
        counters.successful,
        counters.pending,
        counters.failed,
        snapshot.success_rate_percent
    );

    if summary.interrupted {
        println!("\nInterrupted; not started: {}", summary.skipped.join(", "));
    }

    let pending: Vec<&str> = snapshot
        .attempts_with_outcome("pending_verification")
        .map(|attempt| attempt.target.as_str())
        .collect();
    if !pending.is_empty() {
        println!("\nAwaiting verification email: {}", pending.join(", "));
    }

    println!("\nProgress written to {progress_path}");
}
