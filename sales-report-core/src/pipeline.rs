//! Orchestration of one report invocation.
//!
//! A run is strictly sequential: resolve the period, resolve both connection
//! strings from the vault, fetch the records, fetch the branding image, render
//! the PDF and the spreadsheet to temporary files, upload both, delete the
//! temporary files. The first failure aborts the run. Nothing is rolled back:
//! a PDF uploaded before a failed spreadsheet upload stays in the container.
//!
//! # Outcomes
//! Errors are caught once, in [`ReportPipeline::run_request`], logged with full
//! detail and mapped to a [`ReportOutcome`]. Callers only ever see a success
//! message, a client-error message, or an empty server error.
//!
//! # Collaborators
//! Secret vault, record store and blob store are injected as trait objects
//! (see [`crate::contract`]); a fresh database connection and blob client are
//! made for every run and nothing is cached between runs.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::artifact::GeneratedArtifact;
use crate::config::PipelineConfig;
use crate::contract::{BlobStoreConnector, RecordStore, SecretProvider};
use crate::error::{RenderError, ReportError, SecretError};
use crate::period::{ReportPeriod, ReportRequest};
use crate::publish::ArtifactPublisher;
use crate::render::DocumentRenderer;

pub const SUCCESS_MESSAGE: &str = "Reporte generado y subido a Blob Storage.";
pub const MISSING_VAULT_MESSAGE: &str = "Falta el URL.";

/// What the trigger answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Success(String),
    ClientError(String),
    /// Detail is only logged, never returned.
    ServerError,
}

impl ReportOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            ReportOutcome::Success(_) => 200,
            ReportOutcome::ClientError(_) => 400,
            ReportOutcome::ServerError => 500,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            ReportOutcome::Success(message) | ReportOutcome::ClientError(message) => message,
            ReportOutcome::ServerError => "",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ReportOutcome::Success(_))
    }

    pub fn from_error(err: &ReportError) -> Self {
        match err {
            ReportError::Configuration(message) => ReportOutcome::ClientError(message.clone()),
            e if e.is_client_error() => ReportOutcome::ClientError(e.to_string()),
            _ => ReportOutcome::ServerError,
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReport {
    pub period: ReportPeriod,
    pub record_count: usize,
    pub pdf_blob: String,
    pub spreadsheet_blob: String,
}

/// Source of the current local date and time.
pub type Clock = fn() -> NaiveDateTime;

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub struct ReportPipeline {
    config: PipelineConfig,
    secrets: Arc<dyn SecretProvider>,
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStoreConnector>,
    renderer: DocumentRenderer,
    clock: Clock,
}

impl ReportPipeline {
    pub fn new(
        config: PipelineConfig,
        secrets: Arc<dyn SecretProvider>,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStoreConnector>,
    ) -> Self {
        let renderer = DocumentRenderer::from_config(&config);
        Self {
            config,
            secrets,
            records,
            blobs,
            renderer,
            clock: local_now,
        }
    }

    /// Replace the clock used for default periods and file timestamps.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Handle a raw trigger body. Each call runs inside its own
    /// `report{invocation_id=…}` span.
    pub async fn handle(&self, body: &[u8]) -> ReportOutcome {
        let invocation_id = Uuid::new_v4();
        let span = info_span!("report", %invocation_id);
        async move {
            info!(body_len = body.len(), "[REPORT] Invocation received");
            match ReportRequest::from_body(body) {
                Ok(request) => self.run_request(&request).await,
                Err(e) => {
                    warn!(error = %e, "[REPORT][ERROR] Rejected request body");
                    ReportOutcome::from_error(&e)
                }
            }
        }
        .instrument(span)
        .await
    }

    pub async fn run_request(&self, request: &ReportRequest) -> ReportOutcome {
        match self.generate(request).await {
            Ok(report) => {
                info!(
                    period_start = %report.period.start_iso(),
                    period_end = %report.period.end_iso(),
                    records = report.record_count,
                    pdf = %report.pdf_blob,
                    spreadsheet = %report.spreadsheet_blob,
                    "[REPORT] Report generated and uploaded"
                );
                ReportOutcome::Success(SUCCESS_MESSAGE.to_string())
            }
            Err(e) => {
                let outcome = ReportOutcome::from_error(&e);
                if e.is_client_error() {
                    warn!(error = %e, "[REPORT][ERROR] Report request rejected");
                } else {
                    error!(error = %e, error_debug = ?e, "[REPORT][ERROR] Report generation failed");
                }
                outcome
            }
        }
    }

    /// Run every stage and return what was published. Errors are returned
    /// unmapped.
    pub async fn generate(&self, request: &ReportRequest) -> Result<GeneratedReport, ReportError> {
        let now = (self.clock)();
        let period = request.resolve(now.date())?;
        info!(
            year = period.year(),
            month = period.month(),
            start = %period.start_iso(),
            end = %period.end_iso(),
            "[REPORT] Resolved report period"
        );

        let vault_url = self
            .config
            .vault_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ReportError::Configuration(MISSING_VAULT_MESSAGE.to_string()))?;

        let db_connection = self.secret(vault_url, &self.config.db_secret_name).await?;
        let blob_connection = self.secret(vault_url, &self.config.blob_secret_name).await?;

        let records = self.records.fetch_sales(&db_connection, &period).await?;
        info!(records = records.len(), "[REPORT] Fetched sale records");

        let publisher =
            ArtifactPublisher::connect(Arc::clone(&self.blobs), blob_connection, &self.config.container)?;
        let logo = publisher
            .download_image(&self.config.container, &self.config.logo_blob)
            .await
            .map_err(RenderError::BrandingImage)?;

        let pdf_bytes = self.renderer.render_pdf(&period, &records, &logo)?;
        let pdf = GeneratedArtifact::pdf(&self.config.work_dir, &period, now, &pdf_bytes)?;
        let spreadsheet_bytes = self.renderer.render_spreadsheet(&records)?;
        let spreadsheet =
            GeneratedArtifact::spreadsheet(&self.config.work_dir, &period, now, &spreadsheet_bytes)?;

        for artifact in [&pdf, &spreadsheet] {
            info!(
                blob = %artifact.blob_name(),
                content_type = artifact.content_type(),
                "[REPORT][UPLOAD] Uploading artifact"
            );
            publisher.upload(artifact.path(), artifact.blob_name()).await?;
        }

        let report = GeneratedReport {
            period,
            record_count: records.len(),
            pdf_blob: pdf.blob_name().to_string(),
            spreadsheet_blob: spreadsheet.blob_name().to_string(),
        };
        for artifact in [pdf, spreadsheet] {
            discard(artifact);
        }
        Ok(report)
    }

    async fn secret(&self, vault_url: &str, name: &str) -> Result<String, SecretError> {
        let value = self.secrets.resolve(vault_url, name).await?;
        if value.trim().is_empty() {
            return Err(SecretError::Empty(name.to_string()));
        }
        debug!(secret = %name, len = value.len(), "[REPORT][SECRET] Resolved secret");
        Ok(value)
    }
}

/// Remove the local file of a published artifact. A failure leaves a stray
/// file behind but does not fail the run; returns whether the file is gone.
fn discard(artifact: GeneratedArtifact) -> bool {
    let path = artifact.path().to_path_buf();
    match artifact.delete() {
        Ok(()) => {
            debug!(path = %path.display(), "[REPORT] Removed local artifact");
            true
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "[REPORT] Could not remove local artifact after upload"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn outcomes_map_to_status_codes() {
        let success = ReportOutcome::Success(SUCCESS_MESSAGE.to_string());
        assert_eq!(success.status_code(), 200);
        assert_eq!(success.body(), SUCCESS_MESSAGE);
        assert!(success.is_success());

        let server = ReportOutcome::from_error(&ReportError::Store(StoreError::Connect(
            "password=hunter2".into(),
        )));
        assert_eq!(server, ReportOutcome::ServerError);
        assert_eq!(server.status_code(), 500);
        assert_eq!(server.body(), "");
    }

    #[test]
    fn client_errors_carry_a_message() {
        let missing = ReportOutcome::from_error(&ReportError::Configuration(
            MISSING_VAULT_MESSAGE.to_string(),
        ));
        assert_eq!(missing.status_code(), 400);
        assert_eq!(missing.body(), MISSING_VAULT_MESSAGE);

        let period = ReportOutcome::from_error(&ReportError::InvalidPeriod {
            year: 2024,
            month: 13,
        });
        assert_eq!(period.status_code(), 400);
        assert!(period.body().contains("13"));
    }

    #[test]
    fn failed_local_cleanup_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let period = ReportPeriod::for_month(2024, 3).unwrap();
        let now = chrono::NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();

        let removed = GeneratedArtifact::pdf(dir.path(), &period, now, b"%PDF-").unwrap();
        let removed_path = removed.path().to_path_buf();
        assert!(discard(removed));
        assert!(!removed_path.exists());

        let vanished = GeneratedArtifact::pdf(dir.path(), &period, now, b"%PDF-").unwrap();
        std::fs::remove_file(vanished.path()).unwrap();
        assert!(!discard(vanished));
    }
}
