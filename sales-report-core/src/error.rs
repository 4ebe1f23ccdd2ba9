//! Error types for every stage of a report run.
//!
//! Each collaborator has its own error enum so failures can be logged with
//! stage-specific detail; [`ReportError`] is what the pipeline returns and what
//! gets mapped to a caller-facing [`crate::pipeline::ReportOutcome`].

use thiserror::Error;

/// Failure resolving a secret from the vault.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("could not obtain a vault access token: {0}")]
    Credential(String),

    #[error("secret '{name}' could not be resolved: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("secret '{0}' resolved to an empty value")]
    Empty(String),
}

/// Failure reading sale records from the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not connect to the record store: {0}")]
    Connect(String),

    #[error("sales query failed: {0}")]
    Query(String),

    #[error("invalid sale record {product_id}: {reason}")]
    InvalidRecord { product_id: i32, reason: String },
}

/// Failure talking to the blob store.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("blob store connection failed: {0}")]
    Connect(String),

    #[error("failed to upload '{blob}' to container '{container}': {reason}")]
    Upload {
        container: String,
        blob: String,
        reason: String,
    },

    #[error("failed to download '{blob}' from container '{container}': {reason}")]
    Download {
        container: String,
        blob: String,
        reason: String,
    },
}

/// Failure producing one of the documents.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("branding image unavailable: {0}")]
    BrandingImage(#[source] PublishError),

    #[error("branding image could not be decoded: {0}")]
    ImageDecode(String),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("spreadsheet rendering failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
}

/// Any failure of a report run.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid request body: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    #[error("invalid report period: year {year}, month {month}")]
    InvalidPeriod { year: i32, month: u32 },

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("local artifact file error: {0}")]
    Artifact(#[from] std::io::Error),
}

impl ReportError {
    /// Errors the caller can fix by changing the request or the deployment
    /// configuration. Everything else is an opaque server error.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ReportError::Configuration(_)
                | ReportError::InvalidRequest(_)
                | ReportError::InvalidPeriod { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
