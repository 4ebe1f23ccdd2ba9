//! Builds the [`PipelineConfig`] from an optional YAML file and the
//! environment.
//!
//! The YAML file only carries non-secret settings, every key optional:
//!
//! ```yaml
//! container: reporteventas
//! logo_blob: logo.png
//! db_secret_name: DbConnectionString
//! blob_secret_name: ConectarBS
//! work_dir: /tmp/reportes
//! currency_symbol: "S/"
//! company:
//!   name: Kellysolution
//!   email: kelly@gmail.com
//!   phone: "926261263"
//! ```
//!
//! The vault endpoint comes from `KEY_VAULT_URL` (or `KeyVaultURL`). Its
//! absence is not a load error; the pipeline answers it with a client error.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use sales_report_core::config::PipelineConfig;
use serde::Deserialize;
use tracing::{error, info};

pub const VAULT_URL_ENV: &str = "KEY_VAULT_URL";
pub const VAULT_URL_ENV_ALIAS: &str = "KeyVaultURL";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub container: Option<String>,
    pub logo_blob: Option<String>,
    pub db_secret_name: Option<String>,
    pub blob_secret_name: Option<String>,
    pub work_dir: Option<PathBuf>,
    pub currency_symbol: Option<String>,
    pub company: Option<CompanySection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompanySection {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl FileConfig {
    fn apply(self, config: &mut PipelineConfig) {
        let set = |target: &mut String, value: Option<String>| {
            if let Some(value) = value {
                *target = value;
            }
        };
        set(&mut config.container, self.container);
        set(&mut config.logo_blob, self.logo_blob);
        set(&mut config.db_secret_name, self.db_secret_name);
        set(&mut config.blob_secret_name, self.blob_secret_name);
        set(&mut config.currency_symbol, self.currency_symbol);
        if let Some(work_dir) = self.work_dir {
            config.work_dir = work_dir;
        }
        if let Some(company) = self.company {
            set(&mut config.company.name, company.name);
            set(&mut config.company.email, company.email);
            set(&mut config.company.phone, company.phone);
        }
    }
}

/// Read and parse the YAML file at `path`.
pub fn read_file_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    // An empty file parses to YAML null; treat it as "all defaults".
    let parsed: Option<FileConfig> = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;
    info!(config_path = ?path_ref, "Parsed config YAML successfully");
    Ok(parsed.unwrap_or_default())
}

/// First non-empty value of `KEY_VAULT_URL`, then `KeyVaultURL`.
pub fn vault_url_from_env() -> Option<String> {
    [VAULT_URL_ENV, VAULT_URL_ENV_ALIAS]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Defaults, overlaid with the file (if any), plus the vault endpoint from the
/// environment.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::default();
    if let Some(path) = path {
        read_file_config(path)?.apply(&mut config);
    }
    config.vault_url = vault_url_from_env();
    config.trace_loaded();
    Ok(config)
}
