//! HTTP API
//!
//! `POST /upload`, `GET /download/:filename`, `GET /status`, `GET /objects`,
//! plus health and version endpoints.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::error::{GatewayError, GatewayResult};
use crate::health::{probe_all, NodeStatus};
use crate::metadata::ObjectMeta;
use crate::state::AppState;

/// Multipart field carrying the upload
const FILE_FIELD: &str = "file";

/// Response body for a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub filename: String,
    pub size: u64,
    pub fragments_stored: usize,
    pub fragments_failed: usize,
    pub degraded: bool,
}

/// Gateway routes without middleware
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(upload))
        .route("/download/:filename", get(download))
        .route("/status", get(status))
        .route("/objects", get(list_objects))
        .route("/health", get(health))
        .route("/version", get(version))
}

/// Complete application with CORS, tracing and the upload size limit
pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.config().max_upload_bytes();
    routes()
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn version() -> &'static str {
    concat!("ecstore-gateway/", env!("CARGO_PKG_VERSION"))
}

/// POST /upload - multipart form with a `file` field
#[instrument(skip(state, multipart))]
async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> GatewayResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| GatewayError::BadRequest("file field has no filename".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| GatewayError::BadRequest(e.to_string()))?;

        let report = state.uploads().upload(&filename, data).await?;
        info!(
            filename = %report.name,
            size = report.size,
            stored = report.stored,
            failed = report.failed.len(),
            "File uploaded"
        );

        return Ok(Json(UploadResponse {
            message: "File uploaded successfully",
            filename: report.name.clone(),
            size: report.size,
            fragments_stored: report.stored,
            fragments_failed: report.failed.len(),
            degraded: report.is_degraded(),
        }));
    }

    Err(GatewayError::MissingFile)
}

/// GET /download/:filename - reconstructed file as an attachment
#[instrument(skip(state))]
async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> GatewayResult<Response> {
    let mut payload = Vec::new();
    state.downloads().download(&filename, &mut payload).await?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename={}", filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let mut response = Response::new(Body::from(payload));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

/// GET /status - liveness of every configured node
async fn status(State(state): State<Arc<AppState>>) -> Json<Vec<NodeStatus>> {
    let addresses = state.registry().addresses();
    Json(probe_all(&addresses, state.config().probe_timeout()).await)
}

/// GET /objects - everything in the metadata table
async fn list_objects(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json::<Vec<ObjectMeta>>(state.metadata().list())
}
