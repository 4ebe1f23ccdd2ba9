//! HTTP trigger. Serves the report route in the shape an Azure Functions
//! custom handler expects, so the same binary runs locally and in a
//! Function App.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use sales_report_core::pipeline::ReportPipeline;
use tokio::net::TcpListener;
use tracing::info;

pub const REPORT_ROUTE: &str = "/api/ReporteVenta";
pub const DEFAULT_PORT: u16 = 7071;

pub fn router(pipeline: Arc<ReportPipeline>) -> Router {
    Router::new()
        .route(REPORT_ROUTE, get(report).post(report))
        .with_state(pipeline)
}

async fn report(State(pipeline): State<Arc<ReportPipeline>>, body: Bytes) -> Response {
    let outcome = pipeline.handle(&body).await;
    let status =
        StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, outcome.body().to_string()).into_response()
}

/// Serve on an already bound listener until the process is stopped.
pub async fn serve_on(listener: TcpListener, pipeline: Arc<ReportPipeline>) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!(%addr, route = REPORT_ROUTE, "HTTP trigger listening");
    axum::serve(listener, router(pipeline))
        .await
        .context("HTTP server stopped with an error")
}

pub async fn serve(pipeline: Arc<ReportPipeline>, port: u16) -> Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    serve_on(listener, pipeline).await
}
