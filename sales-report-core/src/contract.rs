//! # contract: data model and collaborator seams of the report pipeline
//!
//! The pipeline talks to three external systems: a secret vault, a relational
//! store and a blob store. Each is reached through a trait defined here so the
//! orchestration in [`crate::pipeline`] can run against real clients (see the
//! `sales-report` binary crate) or against deterministic mocks in tests.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; the generated `Mock*` types are
//!   exported under the `test-export-mocks` feature so downstream crates can
//!   use them in their own tests.
//! - Blob stores are `object_store` trait objects, so tests can plug in
//!   `object_store::memory::InMemory` through a mocked [`BlobStoreConnector`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::automock;
use rust_decimal::Decimal;

use crate::error::{PublishError, SecretError, StoreError};
use crate::period::ReportPeriod;

/// One row of the sales query.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub product_id: i32,
    pub name: String,
    pub description: String,
    pub category: String,
    pub unit_price: Decimal,
    pub stock_quantity: u32,
    pub intake_date: NaiveDate,
    /// Always within the queried [`ReportPeriod`].
    pub sale_date: NaiveDate,
    pub supplier: String,
    pub storage_location: String,
    pub active: bool,
}

/// Resolves named secrets from a vault.
///
/// The vault endpoint is passed on every call rather than held by the
/// implementor, so the pipeline can refuse to run before any client is
/// contacted when the endpoint is not configured.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Return the current value of secret `name` from the vault at `vault_url`.
    async fn resolve(&self, vault_url: &str, name: &str) -> Result<String, SecretError>;
}

/// Read access to the sale records.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch every sale whose sale date falls inside `period`, in the order the
    /// store returns them.
    ///
    /// Implementors open their connection from `connection_string` and must
    /// release it before returning, on success and on error.
    async fn fetch_sales(
        &self,
        connection_string: &str,
        period: &ReportPeriod,
    ) -> Result<Vec<SaleRecord>, StoreError>;
}

/// Turns a blob-service connection string into a store scoped to one container.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait BlobStoreConnector: Send + Sync {
    /// Build a client for `container`. Must not perform network I/O.
    fn container(
        &self,
        connection_string: &str,
        container: &str,
    ) -> Result<Arc<dyn object_store::ObjectStore>, PublishError>;
}
