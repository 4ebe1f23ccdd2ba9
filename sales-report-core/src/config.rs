use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_CONTAINER: &str = "reporteventas";
pub const DEFAULT_LOGO_BLOB: &str = "logo.png";
pub const DEFAULT_DB_SECRET: &str = "DbConnectionString";
pub const DEFAULT_BLOB_SECRET: &str = "ConectarBS";
pub const DEFAULT_CURRENCY_SYMBOL: &str = "S/";

/// Static company block printed under the logo of the PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Default for CompanyInfo {
    fn default() -> Self {
        Self {
            name: "Kellysolution".to_string(),
            email: "kelly@gmail.com".to_string(),
            phone: "926261263".to_string(),
        }
    }
}

/// Everything the pipeline needs besides its collaborators. Built once by the
/// caller and injected into [`crate::pipeline::ReportPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Secret vault endpoint. `None` makes every run a client error.
    pub vault_url: Option<String>,
    pub db_secret_name: String,
    pub blob_secret_name: String,
    pub container: String,
    pub logo_blob: String,
    /// Where the temporary PDF and spreadsheet are written before upload.
    pub work_dir: PathBuf,
    pub currency_symbol: String,
    pub company: CompanyInfo,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vault_url: None,
            db_secret_name: DEFAULT_DB_SECRET.to_string(),
            blob_secret_name: DEFAULT_BLOB_SECRET.to_string(),
            container: DEFAULT_CONTAINER.to_string(),
            logo_blob: DEFAULT_LOGO_BLOB.to_string(),
            work_dir: std::env::temp_dir(),
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            company: CompanyInfo::default(),
        }
    }
}

impl PipelineConfig {
    pub fn trace_loaded(&self) {
        info!(
            vault_configured = self.vault_url.is_some(),
            container = %self.container,
            work_dir = %self.work_dir.display(),
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}
