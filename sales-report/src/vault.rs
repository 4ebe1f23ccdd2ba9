//! Azure Key Vault secret provider over the REST API.
//!
//! Tokens come from the App Service managed identity endpoint when
//! `IDENTITY_ENDPOINT`/`IDENTITY_HEADER` are set, otherwise from the
//! client-credentials flow (`AZURE_TENANT_ID`, `AZURE_CLIENT_ID`,
//! `AZURE_CLIENT_SECRET`). Construction never fails and never touches the
//! network; a missing credential surfaces on the first `resolve`.

use std::env;

use async_trait::async_trait;
use sales_report_core::contract::SecretProvider;
use sales_report_core::error::SecretError;
use serde::Deserialize;
use tracing::{debug, error, info};

pub const KEY_VAULT_API_VERSION: &str = "7.4";
pub const KEY_VAULT_RESOURCE: &str = "https://vault.azure.net";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const MANAGED_IDENTITY_API_VERSION: &str = "2019-08-01";

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    ManagedIdentity {
        endpoint: String,
        header: String,
    },
    ClientSecret {
        authority_host: String,
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    Missing,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ManagedIdentity { endpoint, .. } => f
                .debug_struct("ManagedIdentity")
                .field("endpoint", endpoint)
                .finish_non_exhaustive(),
            Credential::ClientSecret {
                tenant_id,
                client_id,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Credential::Missing => f.write_str("Missing"),
        }
    }
}

impl Credential {
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let (Some(endpoint), Some(header)) = (var("IDENTITY_ENDPOINT"), var("IDENTITY_HEADER")) {
            return Credential::ManagedIdentity { endpoint, header };
        }
        match (
            var("AZURE_TENANT_ID"),
            var("AZURE_CLIENT_ID"),
            var("AZURE_CLIENT_SECRET"),
        ) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Credential::ClientSecret {
                authority_host: var("AZURE_AUTHORITY_HOST")
                    .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
                tenant_id,
                client_id,
                client_secret,
            },
            _ => Credential::Missing,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Credential::ManagedIdentity { .. } => "managed_identity",
            Credential::ClientSecret { .. } => "client_secret",
            Credential::Missing => "missing",
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SecretBundle {
    value: String,
}

#[derive(Debug, Clone)]
pub struct KeyVaultClient {
    http: reqwest::Client,
    credential: Credential,
}

impl KeyVaultClient {
    pub fn new(http: reqwest::Client, credential: Credential) -> Self {
        Self { http, credential }
    }

    pub fn from_env() -> Self {
        let credential = Credential::from_env();
        info!(credential = credential.kind(), "Initialised KeyVaultClient from environment");
        Self::new(reqwest::Client::new(), credential)
    }

    async fn access_token(&self) -> Result<String, SecretError> {
        let request = match &self.credential {
            Credential::ManagedIdentity { endpoint, header } => self
                .http
                .get(endpoint)
                .query(&[
                    ("resource", KEY_VAULT_RESOURCE),
                    ("api-version", MANAGED_IDENTITY_API_VERSION),
                ])
                .header("X-IDENTITY-HEADER", header),
            Credential::ClientSecret {
                authority_host,
                tenant_id,
                client_id,
                client_secret,
            } => {
                let url = format!(
                    "{}/{tenant_id}/oauth2/v2.0/token",
                    authority_host.trim_end_matches('/')
                );
                let scope = format!("{KEY_VAULT_RESOURCE}/.default");
                self.http.post(url).form(&[
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("scope", scope.as_str()),
                ])
            }
            Credential::Missing => {
                return Err(SecretError::Credential(
                    "no managed identity or client credentials in the environment".to_string(),
                ))
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| SecretError::Credential(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            error!(%status, credential = self.credential.kind(), "Token request rejected");
            return Err(SecretError::Credential(format!(
                "token endpoint returned {status}"
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SecretError::Credential(e.to_string()))?;
        debug!(credential = self.credential.kind(), "Obtained vault access token");
        Ok(token.access_token)
    }
}

#[async_trait]
impl SecretProvider for KeyVaultClient {
    async fn resolve(&self, vault_url: &str, name: &str) -> Result<String, SecretError> {
        let unavailable = |reason: String| SecretError::Unavailable {
            name: name.to_string(),
            reason,
        };

        let token = self.access_token().await?;
        let url = format!("{}/secrets/{name}", vault_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .query(&[("api-version", KEY_VAULT_API_VERSION)])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            error!(secret = %name, %status, "Key Vault rejected secret request");
            return Err(unavailable(format!("vault returned {status}")));
        }
        let bundle: SecretBundle = response
            .json()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        info!(secret = %name, len = bundle.value.len(), "Resolved secret from Key Vault");
        Ok(bundle.value)
    }
}
