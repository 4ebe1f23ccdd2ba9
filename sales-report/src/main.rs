use std::process::ExitCode;

use clap::Parser;
use sales_report::cli::{exit_code, run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    match run(cli).await {
        Ok(Some(outcome)) => {
            if outcome.is_success() {
                println!("{}", outcome.body());
            } else if !outcome.body().is_empty() {
                eprintln!("{}", outcome.body());
            }
            tracing::info!(status = outcome.status_code(), "CLI completed");
            ExitCode::from(exit_code(&outcome))
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
