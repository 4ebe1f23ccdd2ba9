mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use futures::TryStreamExt;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload};
use tempfile::tempdir;

use common::{march_records, pdf_page_texts, xlsx_cell, xlsx_part, LOGO_PNG};
use sales_report_core::config::PipelineConfig;
use sales_report_core::contract::{MockBlobStoreConnector, MockRecordStore, MockSecretProvider};
use sales_report_core::error::{SecretError, StoreError};
use sales_report_core::pipeline::{ReportOutcome, ReportPipeline, MISSING_VAULT_MESSAGE, SUCCESS_MESSAGE};

const VAULT: &str = "https://ventas-vault.vault.azure.net";

fn july_2024() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 7, 15)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn config(work_dir: &Path, vault_url: Option<&str>) -> PipelineConfig {
    PipelineConfig {
        vault_url: vault_url.map(str::to_string),
        work_dir: work_dir.to_path_buf(),
        ..PipelineConfig::default()
    }
}

fn secrets() -> MockSecretProvider {
    let mut secrets = MockSecretProvider::new();
    secrets
        .expect_resolve()
        .times(2)
        .returning(|vault, name| {
            assert_eq!(vault, VAULT);
            match name {
                "DbConnectionString" => Ok("postgres://ventas".to_string()),
                "ConectarBS" => Ok("UseDevelopmentStorage=true".to_string()),
                other => Err(SecretError::Unavailable {
                    name: other.to_string(),
                    reason: "unknown secret".to_string(),
                }),
            }
        });
    secrets
}

fn connector(store: &Arc<dyn ObjectStore>) -> MockBlobStoreConnector {
    let store = Arc::clone(store);
    let mut connector = MockBlobStoreConnector::new();
    connector
        .expect_container()
        .withf(|conn, container| conn == "UseDevelopmentStorage=true" && container == "reporteventas")
        .returning(move |_, _| Ok(Arc::clone(&store)));
    connector
}

async fn store_with_logo() -> Arc<dyn ObjectStore> {
    let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
    store
        .put(&ObjectPath::from("logo.png"), PutPayload::from(LOGO_PNG.to_vec()))
        .await
        .unwrap();
    store
}

async fn blob_names(store: &Arc<dyn ObjectStore>) -> Vec<String> {
    let mut names: Vec<String> = store
        .list(None)
        .map_ok(|meta| meta.location.to_string())
        .try_collect()
        .await
        .unwrap();
    names.sort();
    names
}

async fn blob(store: &Arc<dyn ObjectStore>, name: &str) -> Vec<u8> {
    store
        .get(&ObjectPath::from(name))
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap()
        .to_vec()
}

fn leftover_files(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn test_report_for_march_is_rendered_and_uploaded() {
    let work = tempdir().unwrap();
    let store = store_with_logo().await;

    let mut records = MockRecordStore::new();
    records
        .expect_fetch_sales()
        .times(1)
        .withf(|conn, period| {
            conn == "postgres://ventas"
                && period.start_iso() == "2024-03-01"
                && period.end_iso() == "2024-03-31"
        })
        .returning(|_, _| Ok(march_records()));

    let pipeline = ReportPipeline::new(
        config(work.path(), Some(VAULT)),
        Arc::new(secrets()),
        Arc::new(records),
        Arc::new(connector(&store)),
    )
    .with_clock(july_2024);

    let outcome = pipeline.handle(br#"{"mes": 3}"#).await;

    assert_eq!(outcome, ReportOutcome::Success(SUCCESS_MESSAGE.to_string()));
    assert_eq!(outcome.status_code(), 200);
    assert_eq!(
        blob_names(&store).await,
        vec!["Reporte_3_2024.pdf", "Reporte_3_2024.xlsx", "logo.png"]
    );

    let pdf = blob(&store, "Reporte_3_2024.pdf").await;
    assert!(pdf.starts_with(b"%PDF"));
    let pdf_text = pdf_page_texts(&pdf).concat();
    assert!(pdf_text.contains("Laptop") && pdf_text.contains("Mouse"));

    let sheet = xlsx_part(
        &blob(&store, "Reporte_3_2024.xlsx").await,
        "xl/worksheets/sheet1.xml",
    );
    assert!(xlsx_cell(&sheet, "A3").contains("<v>1</v>"));
    assert!(xlsx_cell(&sheet, "A4").contains("<v>2</v>"));
    assert!(!sheet.contains("<row r=\"5\""), "Only the two fetched records are written");
    assert!(
        leftover_files(work.path()).is_empty(),
        "Temporary artifacts should be deleted after upload"
    );
}

#[tokio::test]
async fn test_empty_body_reports_current_month() {
    let work = tempdir().unwrap();
    let store = store_with_logo().await;

    let mut records = MockRecordStore::new();
    records
        .expect_fetch_sales()
        .withf(|_, period| period.year() == 2024 && period.month() == 7)
        .returning(|_, _| Ok(Vec::new()));

    let pipeline = ReportPipeline::new(
        config(work.path(), Some(VAULT)),
        Arc::new(secrets()),
        Arc::new(records),
        Arc::new(connector(&store)),
    )
    .with_clock(july_2024);

    let outcome = pipeline.handle(b"").await;
    assert!(outcome.is_success());
    assert!(blob_names(&store).await.contains(&"Reporte_7_2024.pdf".to_string()));
}

#[tokio::test]
async fn test_rerun_overwrites_previous_artifacts() {
    let work = tempdir().unwrap();
    let store = store_with_logo().await;

    let mut records = MockRecordStore::new();
    records
        .expect_fetch_sales()
        .times(2)
        .returning(|_, _| Ok(march_records()));
    let mut secrets = MockSecretProvider::new();
    secrets
        .expect_resolve()
        .times(4)
        .returning(|_, name| Ok(format!("value-of-{name}")));
    let mut connector = MockBlobStoreConnector::new();
    let shared = Arc::clone(&store);
    connector
        .expect_container()
        .returning(move |_, _| Ok(Arc::clone(&shared)));

    let pipeline = ReportPipeline::new(
        config(work.path(), Some(VAULT)),
        Arc::new(secrets),
        Arc::new(records),
        Arc::new(connector),
    )
    .with_clock(july_2024);

    for _ in 0..2 {
        assert!(pipeline.handle(br#"{"year": 2024, "month": 3}"#).await.is_success());
    }
    assert_eq!(blob_names(&store).await.len(), 3, "No duplicate blobs on rerun");
}

#[tokio::test]
async fn test_missing_vault_url_is_a_client_error_without_any_calls() {
    let work = tempdir().unwrap();

    let mut secrets = MockSecretProvider::new();
    secrets.expect_resolve().never();
    let mut records = MockRecordStore::new();
    records.expect_fetch_sales().never();
    let mut connector = MockBlobStoreConnector::new();
    connector.expect_container().never();

    let pipeline = ReportPipeline::new(
        config(work.path(), None),
        Arc::new(secrets),
        Arc::new(records),
        Arc::new(connector),
    )
    .with_clock(july_2024);

    let outcome = pipeline.handle(br#"{"mes": 3}"#).await;
    assert_eq!(outcome, ReportOutcome::ClientError(MISSING_VAULT_MESSAGE.to_string()));
    assert_eq!(outcome.status_code(), 400);
}

#[tokio::test]
async fn test_invalid_month_and_malformed_body_are_client_errors() {
    let work = tempdir().unwrap();

    let mut secrets = MockSecretProvider::new();
    secrets.expect_resolve().never();
    let mut records = MockRecordStore::new();
    records.expect_fetch_sales().never();
    let mut connector = MockBlobStoreConnector::new();
    connector.expect_container().never();

    let pipeline = ReportPipeline::new(
        config(work.path(), Some(VAULT)),
        Arc::new(secrets),
        Arc::new(records),
        Arc::new(connector),
    )
    .with_clock(july_2024);

    assert_eq!(pipeline.handle(br#"{"mes": 13}"#).await.status_code(), 400);
    assert_eq!(pipeline.handle(b"{\"mes\":").await.status_code(), 400);
}

#[tokio::test]
async fn test_store_failure_is_opaque_server_error_with_no_side_effects() {
    let work = tempdir().unwrap();
    let store = store_with_logo().await;

    let mut records = MockRecordStore::new();
    records
        .expect_fetch_sales()
        .times(1)
        .returning(|_, _| Err(StoreError::Connect("connection refused".to_string())));
    let mut connector = MockBlobStoreConnector::new();
    connector.expect_container().never();

    let pipeline = ReportPipeline::new(
        config(work.path(), Some(VAULT)),
        Arc::new(secrets()),
        Arc::new(records),
        Arc::new(connector),
    )
    .with_clock(july_2024);

    let outcome = pipeline.handle(br#"{"mes": 3}"#).await;

    assert_eq!(outcome, ReportOutcome::ServerError);
    assert_eq!(outcome.body(), "");
    assert_eq!(blob_names(&store).await, vec!["logo.png"]);
    assert!(leftover_files(work.path()).is_empty());
}

#[tokio::test]
async fn test_secret_failure_stops_before_the_store() {
    let work = tempdir().unwrap();

    let mut secrets = MockSecretProvider::new();
    secrets.expect_resolve().times(1).returning(|_, name| {
        Err(SecretError::Unavailable {
            name: name.to_string(),
            reason: "403 Forbidden".to_string(),
        })
    });
    let mut records = MockRecordStore::new();
    records.expect_fetch_sales().never();
    let mut connector = MockBlobStoreConnector::new();
    connector.expect_container().never();

    let pipeline = ReportPipeline::new(
        config(work.path(), Some(VAULT)),
        Arc::new(secrets),
        Arc::new(records),
        Arc::new(connector),
    );

    assert_eq!(pipeline.handle(b"{}").await, ReportOutcome::ServerError);
}

#[tokio::test]
async fn test_empty_secret_value_is_a_server_error() {
    let work = tempdir().unwrap();

    let mut secrets = MockSecretProvider::new();
    secrets
        .expect_resolve()
        .times(1)
        .returning(|_, _| Ok("   ".to_string()));
    let mut records = MockRecordStore::new();
    records.expect_fetch_sales().never();
    let mut connector = MockBlobStoreConnector::new();
    connector.expect_container().never();

    let pipeline = ReportPipeline::new(
        config(work.path(), Some(VAULT)),
        Arc::new(secrets),
        Arc::new(records),
        Arc::new(connector),
    );

    assert_eq!(pipeline.handle(b"").await, ReportOutcome::ServerError);
}

#[tokio::test]
async fn test_missing_logo_aborts_before_any_upload() {
    let work = tempdir().unwrap();
    let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());

    let mut records = MockRecordStore::new();
    records
        .expect_fetch_sales()
        .returning(|_, _| Ok(march_records()));

    let pipeline = ReportPipeline::new(
        config(work.path(), Some(VAULT)),
        Arc::new(secrets()),
        Arc::new(records),
        Arc::new(connector(&store)),
    )
    .with_clock(july_2024);

    assert_eq!(pipeline.handle(br#"{"mes": 3}"#).await, ReportOutcome::ServerError);
    assert!(blob_names(&store).await.is_empty());
    assert!(leftover_files(work.path()).is_empty());
}

#[tokio::test]
async fn test_failed_spreadsheet_upload_keeps_pdf_and_removes_local_files() {
    let work = tempdir().unwrap();
    let container = tempdir().unwrap();
    std::fs::write(container.path().join("logo.png"), LOGO_PNG).unwrap();
    // A directory where the spreadsheet blob should land makes that put fail.
    std::fs::create_dir(container.path().join("Reporte_3_2024.xlsx")).unwrap();
    let store: Arc<dyn ObjectStore> =
        Arc::new(LocalFileSystem::new_with_prefix(container.path()).unwrap());

    let mut records = MockRecordStore::new();
    records
        .expect_fetch_sales()
        .times(1)
        .returning(|_, _| Ok(march_records()));

    let pipeline = ReportPipeline::new(
        config(work.path(), Some(VAULT)),
        Arc::new(secrets()),
        Arc::new(records),
        Arc::new(connector(&store)),
    )
    .with_clock(july_2024);

    let outcome = pipeline.handle(br#"{"mes": 3}"#).await;

    assert_eq!(outcome, ReportOutcome::ServerError);
    assert_eq!(
        blob_names(&store).await,
        vec!["Reporte_3_2024.pdf", "logo.png"],
        "The PDF uploaded before the failure stays in the container"
    );
    assert!(leftover_files(work.path()).is_empty());
}
