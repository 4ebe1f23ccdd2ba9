//! Azure Blob Storage connector built on `object_store::azure`.

use std::str::FromStr;
use std::sync::Arc;

use object_store::azure::MicrosoftAzureBuilder;
use object_store::ObjectStore;
use sales_report_core::contract::BlobStoreConnector;
use sales_report_core::error::PublishError;
use tracing::debug;

/// The parts of an Azure storage connection string the connector uses.
///
/// Accepts the `Key=Value;Key=Value` form issued by the portal
/// (`DefaultEndpointsProtocol`, `AccountName`, `AccountKey`, `EndpointSuffix`,
/// `BlobEndpoint`) and the emulator shorthand `UseDevelopmentStorage=true`.
/// Keys are matched case-insensitively; unknown keys are ignored.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BlobConnectionString {
    pub protocol: Option<String>,
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub endpoint_suffix: Option<String>,
    pub blob_endpoint: Option<String>,
    pub use_development_storage: bool,
}

impl std::fmt::Debug for BlobConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobConnectionString")
            .field("protocol", &self.protocol)
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint_suffix", &self.endpoint_suffix)
            .field("blob_endpoint", &self.blob_endpoint)
            .field("use_development_storage", &self.use_development_storage)
            .finish()
    }
}

impl FromStr for BlobConnectionString {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parsed = BlobConnectionString::default();
        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                PublishError::Connect(format!("malformed connection string segment without '=' ({} chars)", part.len()))
            })?;
            let value = value.trim().to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "defaultendpointsprotocol" => parsed.protocol = Some(value),
                "accountname" => parsed.account_name = Some(value),
                "accountkey" => parsed.account_key = Some(value),
                "endpointsuffix" => parsed.endpoint_suffix = Some(value),
                "blobendpoint" => parsed.blob_endpoint = Some(value),
                "usedevelopmentstorage" => {
                    parsed.use_development_storage = value.eq_ignore_ascii_case("true")
                }
                _ => {}
            }
        }

        if !parsed.use_development_storage && parsed.account_name.is_none() {
            return Err(PublishError::Connect(
                "connection string has neither AccountName nor UseDevelopmentStorage".to_string(),
            ));
        }
        Ok(parsed)
    }
}

impl BlobConnectionString {
    /// Explicit blob endpoint, or one derived from protocol and suffix when
    /// either differs from the public cloud defaults.
    pub fn endpoint(&self) -> Option<String> {
        if let Some(endpoint) = &self.blob_endpoint {
            return Some(endpoint.trim_end_matches('/').to_string());
        }
        let account = self.account_name.as_ref()?;
        let protocol = self.protocol.as_deref().unwrap_or("https");
        let suffix = self.endpoint_suffix.as_deref().unwrap_or("core.windows.net");
        if protocol == "https" && suffix == "core.windows.net" {
            return None;
        }
        Some(format!("{protocol}://{account}.blob.{suffix}"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AzureBlobConnector;

impl BlobStoreConnector for AzureBlobConnector {
    fn container(
        &self,
        connection_string: &str,
        container: &str,
    ) -> Result<Arc<dyn ObjectStore>, PublishError> {
        let parsed: BlobConnectionString = connection_string.parse()?;
        let mut builder = MicrosoftAzureBuilder::new().with_container_name(container);

        if parsed.use_development_storage {
            builder = builder.with_use_emulator(true);
        } else {
            if let Some(account) = &parsed.account_name {
                builder = builder.with_account(account);
            }
            if let Some(key) = &parsed.account_key {
                builder = builder.with_access_key(key);
            }
            if let Some(endpoint) = parsed.endpoint() {
                builder = builder
                    .with_allow_http(endpoint.starts_with("http://"))
                    .with_endpoint(endpoint);
            }
        }

        let store = builder
            .build()
            .map_err(|e| PublishError::Connect(e.to_string()))?;
        debug!(
            container = %container,
            account = ?parsed.account_name,
            emulator = parsed.use_development_storage,
            "Built Azure blob store client"
        );
        Ok(Arc::new(store))
    }
}
