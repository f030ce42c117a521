use citation_agent_api::ServeArgs;
use citation_core::config::AppConfig;
use citation_core::workflows::submission::DifficultyTier;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "citation-agent",
    about = "Submit a business profile to listing directories and track verification",
    version
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Submit the profile to every selected target, easy tier first
    Run(RunArgs),
    /// Match verification emails from an inbox export to pending attempts
    Verify(VerifyArgs),
    /// Summarize the last progress snapshot
    Report(ReportArgs),
    /// List the target catalog
    Targets(TargetsArgs),
    /// Serve progress and verification results over HTTP
    Serve(ServeArgs),
}

fn parse_tier(raw: &str) -> Result<DifficultyTier, String> {
    DifficultyTier::parse(raw).ok_or_else(|| format!("unknown tier '{raw}' (easy, medium, hard)"))
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Business profile JSON
    #[arg(long)]
    pub(crate) profile: PathBuf,
    /// Target catalog JSON (defaults to the built-in catalog)
    #[arg(long)]
    pub(crate) targets: Option<PathBuf>,
    /// Only these targets, comma separated
    #[arg(long, value_delimiter = ',')]
    pub(crate) only: Vec<String>,
    /// Only these tiers, comma separated
    #[arg(long, value_delimiter = ',', value_parser = parse_tier)]
    pub(crate) tier: Vec<DifficultyTier>,
    /// Concurrent attempts for easy and medium targets
    #[arg(long)]
    pub(crate) batch_size: Option<usize>,
    /// Run the browser without a window
    #[arg(long, conflicts_with = "headed")]
    pub(crate) headless: bool,
    /// Run the browser with a visible window
    #[arg(long)]
    pub(crate) headed: bool,
    /// Carry finished targets over from the previous snapshot and retry the rest
    #[arg(long)]
    pub(crate) resume: bool,
    /// Per-attempt ceiling in seconds
    #[arg(long)]
    pub(crate) attempt_timeout: Option<u64>,
    /// Progress snapshot path
    #[arg(long)]
    pub(crate) progress: Option<PathBuf>,
    /// Use an empty scripted browser instead of WebDriver
    #[arg(long)]
    pub(crate) dry_run: bool,
}

impl RunArgs {
    pub(crate) fn apply(&self, config: &mut AppConfig) {
        if let Some(batch_size) = self.batch_size.filter(|size| *size > 0) {
            config.automation.batch_size = batch_size;
        }
        if self.headless {
            config.automation.headless = true;
        }
        if self.headed {
            config.automation.headless = false;
        }
        if let Some(secs) = self.attempt_timeout.filter(|secs| *secs > 0) {
            config.automation.attempt_timeout = Duration::from_secs(secs);
        }
        if let Some(progress) = &self.progress {
            config.storage.progress_path = progress.clone();
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct VerifyArgs {
    /// Exported inbox messages (JSON array)
    #[arg(long)]
    pub(crate) events: PathBuf,
    /// Only messages received within this many hours
    #[arg(long, default_value_t = 72)]
    pub(crate) window_hours: i64,
    /// Progress snapshot holding the pending attempts
    #[arg(long)]
    pub(crate) progress: Option<PathBuf>,
    /// Verification ledger path
    #[arg(long)]
    pub(crate) ledger: Option<PathBuf>,
}

impl VerifyArgs {
    /// Search window, at least one hour. Values past chrono's range saturate.
    pub(crate) fn window(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.window_hours.max(1)).unwrap_or(chrono::Duration::MAX)
    }

    pub(crate) fn apply(&self, config: &mut AppConfig) {
        if let Some(progress) = &self.progress {
            config.storage.progress_path = progress.clone();
        }
        if let Some(ledger) = &self.ledger {
            config.storage.ledger_path = ledger.clone();
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Progress snapshot path
    #[arg(long)]
    pub(crate) progress: Option<PathBuf>,
    /// Also write the attempt log as CSV
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// List every attempt, not just the summary
    #[arg(long)]
    pub(crate) list_attempts: bool,
}

#[derive(Args, Debug)]
pub(crate) struct TargetsArgs {
    /// Target catalog JSON (defaults to the built-in catalog)
    #[arg(long)]
    pub(crate) targets: Option<PathBuf>,
    /// Only these tiers, comma separated
    #[arg(long, value_delimiter = ',', value_parser = parse_tier)]
    pub(crate) tier: Vec<DifficultyTier>,
}
