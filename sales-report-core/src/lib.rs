#![doc = "sales-report-core: period resolution, document rendering, blob publishing and orchestration of the monthly sales report."]

//! This crate holds everything that does not depend on a concrete cloud
//! vendor or database driver. The `sales-report` binary crate supplies the
//! Key Vault, Postgres and Azure Blob implementations of the traits in
//! [`contract`].
//!
//! # Usage
//! Build a [`pipeline::ReportPipeline`] from a [`config::PipelineConfig`] and
//! the three collaborators, then call `handle` with the raw trigger body.

pub mod artifact;
pub mod config;
pub mod contract;
pub mod error;
pub mod period;
pub mod pipeline;
pub mod publish;
pub mod render;
