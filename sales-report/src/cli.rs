//! Command-line interface of the `sales-report` binary.
//!
//! All report logic lives in `sales-report-core`; this module parses
//! arguments, wires the production collaborators (Key Vault, Postgres, Azure
//! Blob) into a [`ReportPipeline`] and hands control to it.
//!
//! - `generate` runs one invocation and maps its outcome to an exit code.
//! - `serve` starts the HTTP trigger.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sales_report_core::config::PipelineConfig;
use sales_report_core::period::ReportRequest;
use sales_report_core::pipeline::{ReportOutcome, ReportPipeline};

use crate::blob::AzureBlobConnector;
use crate::load_config::load_config;
use crate::server::{self, DEFAULT_PORT};
use crate::store::PgRecordStore;
use crate::vault::KeyVaultClient;

/// Monthly sales report: PDF and spreadsheet published to blob storage.
#[derive(Debug, Parser)]
#[clap(
    name = "sales-report",
    version,
    about = "Generate the monthly sales report and publish it to Azure Blob Storage"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate the report once and exit
    Generate {
        /// Report year; defaults to the current year
        #[clap(long)]
        year: Option<i32>,
        /// Report month (1-12); defaults to the current month
        #[clap(long)]
        month: Option<u32>,
        /// Optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Serve the HTTP trigger
    Serve {
        #[clap(long, env = "FUNCTIONS_CUSTOMHANDLER_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

pub fn build_pipeline(config: PipelineConfig) -> ReportPipeline {
    ReportPipeline::new(
        config,
        Arc::new(KeyVaultClient::from_env()),
        Arc::new(PgRecordStore),
        Arc::new(AzureBlobConnector),
    )
}

/// Process exit code for an invocation outcome.
pub fn exit_code(outcome: &ReportOutcome) -> u8 {
    match outcome {
        ReportOutcome::Success(_) => 0,
        ReportOutcome::ClientError(_) => 2,
        ReportOutcome::ServerError => 1,
    }
}

/// Entrypoint shared by `main` and the tests. Returns the outcome of a
/// `generate` run, or `None` once the server stops.
pub async fn run(cli: Cli) -> Result<Option<ReportOutcome>> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Generate {
            year,
            month,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            tracing::info!(command = "generate", ?year, ?month, "Starting report generation");
            let pipeline = build_pipeline(config);
            let outcome = pipeline
                .run_request(&ReportRequest::new(year, month))
                .await;
            tracing::info!(
                command = "generate",
                status = outcome.status_code(),
                "Report generation finished"
            );
            Ok(Some(outcome))
        }
        Commands::Serve { port, config } => {
            let config = load_config(config.as_deref())?;
            tracing::info!(command = "serve", port, "Starting HTTP trigger");
            server::serve(Arc::new(build_pipeline(config)), port).await?;
            Ok(None)
        }
    }
}
