mod cli;
mod report;
mod run;
mod verify;

use citation_core::config::AppConfig;
use citation_core::error::AppError;
use citation_core::telemetry;
use clap::Parser;
use cli::{Cli, Command};

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Run(args) => run::run(args, config).await,
        Command::Verify(args) => verify::verify(args, config).await,
        Command::Report(args) => report::report(args, config),
        Command::Targets(args) => report::targets(args),
        Command::Serve(args) => {
            args.apply(&mut config);
            citation_agent_api::serve(&config).await
        }
    }
}
