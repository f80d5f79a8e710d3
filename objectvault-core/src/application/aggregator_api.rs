// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Aggregator API (§6): the HTTP surface the load balancer forwards to.
//! Request entry points map directly to `AggregatorPipeline` calls, plus
//! the audit-log ingestion endpoint (§4.15) and `/metrics`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;

use objectvault_bootstrap::CancellationToken;
use objectvault_domain::entities::AuditLogEntry;
use objectvault_domain::repositories::MetadataStore;
use objectvault_domain::value_objects::{CipherTag, EventKind, FileId, Severity};
use objectvault_domain::ObjectVaultError;

use crate::application::aggregator_pipeline::{AggregatorPipeline, UploadRequest};
use crate::application::ApiError;
use crate::infrastructure::metrics::Metrics;

#[derive(Clone)]
pub struct AggregatorApiState {
    pub pipeline: Arc<AggregatorPipeline>,
    pub metadata: Arc<dyn MetadataStore>,
    pub metrics: Arc<Metrics>,
    /// Cancelled on graceful shutdown, so an in-flight upload takes the
    /// same rollback path as any other mid-stream failure instead of
    /// being severed mid-chunk.
    pub shutdown: CancellationToken,
}

pub fn router(state: AggregatorApiState) -> Router {
    Router::new()
        .route("/api/files/upload", post(upload))
        .route("/api/files/{file_id}/download", get(download))
        .route("/api/files/{file_id}", delete(delete_file))
        .route("/api/system-logs", post(system_logs))
        .route("/api/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn upload(
    State(state): State<AggregatorApiState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, ApiError> {
    let file_name = headers
        .get("X-File-Name")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ObjectVaultError::validation("X-File-Name", "header is required"))?
        .to_string();
    let declared_size: u64 = headers
        .get("X-File-Size")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ObjectVaultError::validation("X-File-Size", "header is required"))?
        .parse()
        .map_err(|_| ObjectVaultError::validation("X-File-Size", "must be a decimal integer"))?;
    if declared_size != body.len() as u64 {
        return Err(ObjectVaultError::validation("X-File-Size", "does not match the body length received").into());
    }
    let client_file_id = headers.get("X-File-ID").and_then(|v| v.to_str().ok()).map(String::from);

    let file = state
        .pipeline
        .upload(UploadRequest {
            display_name: file_name.clone(),
            owner: "anonymous".into(),
            cipher_tag: CipherTag::Aes256Gcm,
            client_file_id,
            bytes: body.to_vec(),
        }, state.shutdown.clone())
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "fileId": file.file_id.to_string(),
            "status": "queued",
            "fileName": file_name,
            "size": file.total_length,
        })),
    )
        .into_response())
}

async fn download(
    State(state): State<AggregatorApiState>,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let file_id = FileId::parse(&file_id)?;
    let bytes = state.pipeline.download(file_id, CipherTag::Aes256Gcm).await?;
    Ok((
        StatusCode::OK,
        [("Content-Type", "application/octet-stream")],
        bytes,
    )
        .into_response())
}

async fn delete_file(
    State(state): State<AggregatorApiState>,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let file_id = FileId::parse(&file_id)?;
    state.pipeline.delete(file_id).await?;
    Ok((StatusCode::OK, Json(json!({"status": "OK"}))).into_response())
}

#[derive(Debug, Deserialize)]
struct SystemLogPayload {
    event_type: Option<String>,
    description: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    service_name: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

async fn system_logs(
    State(state): State<AggregatorApiState>,
    Json(payload): Json<SystemLogPayload>,
) -> Result<Response, ApiError> {
    let event_type = payload
        .event_type
        .ok_or_else(|| ObjectVaultError::validation("event_type", "field is required"))?;
    let description = payload
        .description
        .ok_or_else(|| ObjectVaultError::validation("description", "field is required"))?;

    let event_kind = match event_type.as_str() {
        "upload_start" => EventKind::UploadStart,
        "upload_complete" => EventKind::UploadComplete,
        "upload_fail" => EventKind::UploadFail,
        "download_start" => EventKind::DownloadStart,
        "download_complete" => EventKind::DownloadComplete,
        "download_fail" => EventKind::DownloadFail,
        "crc_mismatch" => EventKind::CrcMismatch,
        "rollback" => EventKind::Rollback,
        "scale_request" => EventKind::ScaleRequest,
        _ => EventKind::HealthTransition,
    };
    let severity = match payload.severity.as_deref() {
        Some("WARNING") => Severity::Warning,
        Some("ERROR") => Severity::Error,
        _ => Severity::Info,
    };

    let mut entry = AuditLogEntry::new(
        event_kind,
        payload.service_name.unwrap_or_else(|| "load-balancer".into()),
        description,
    )
    .with_severity(severity);
    if let Some(user_id) = payload.user_id {
        entry = entry.with_owner(user_id);
    }
    state.metadata.log(entry).await;

    Ok((StatusCode::OK, Json(json!({"status": "OK"}))).into_response())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "HEALTHY" })
}

async fn metrics_endpoint(State(state): State<AggregatorApiState>) -> String {
    state.metrics.render()
}
