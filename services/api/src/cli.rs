use crate::server;
use clap::{Args, Parser};
use citation_core::config::AppConfig;
use citation_core::error::AppError;
use citation_core::telemetry;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "citation-status",
    about = "Serve run progress and verification results over HTTP",
    version
)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub port: Option<u16>,
    /// Progress snapshot to expose
    #[arg(long)]
    pub progress: Option<PathBuf>,
    /// Verification ledger to expose
    #[arg(long)]
    pub ledger: Option<PathBuf>,
}

impl ServeArgs {
    pub fn apply(self, config: &mut AppConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(progress) = self.progress {
            config.storage.progress_path = progress;
        }
        if let Some(ledger) = self.ledger {
            config.storage.ledger_path = ledger;
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    cli.serve.apply(&mut config);
    telemetry::init(&config.telemetry)?;
    server::serve(&config).await
}
