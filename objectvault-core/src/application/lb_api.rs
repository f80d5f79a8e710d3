// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Load Balancer API (§6): the client-facing HTTP surface. Every request
//! is wrapped in a domain `Request` for the priority queue, bridged to
//! the actual body/path via `PendingForward`, and awaited through a
//! oneshot channel once the `LoadBalancerWorker` has forwarded it to a
//! selected node.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

use objectvault_domain::entities::Request;
use objectvault_domain::value_objects::OperationKind;
use objectvault_domain::ObjectVaultError;

use crate::application::ApiError;
use crate::infrastructure::lb::{LoadBalancerWorker, PendingForward};
use crate::infrastructure::metrics::Metrics;
use crate::infrastructure::queue::RequestQueue;

const FORWARD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct LoadBalancerApiState {
    pub queue: Arc<RequestQueue>,
    pub worker: Arc<LoadBalancerWorker>,
    pub metrics: Arc<Metrics>,
}

pub fn router(state: LoadBalancerApiState) -> Router {
    Router::new()
        .route("/api/files/upload", axum::routing::post(upload))
        .route("/api/files/{file_id}/download", get(download))
        .route("/api/files/{file_id}", delete(delete_file))
        .route("/api/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Headers that must never be copied onto the forwarded request: they
/// describe this connection, not the payload, and `reqwest` sets its own
/// when it builds the request to the selected node.
const HOP_BY_HOP_HEADERS: &[&str] = &["host", "content-length", "connection"];

fn forwardable_headers(mut headers: HeaderMap) -> HeaderMap {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
    headers
}

async fn forward(
    state: &LoadBalancerApiState,
    operation: OperationKind,
    method: reqwest::Method,
    size_bytes: u64,
    path: String,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<bytes::Bytes, ObjectVaultError> {
    let request = Request::new(operation, size_bytes);
    let (tx, rx) = oneshot::channel();
    state.worker.register_forward(
        request.id,
        PendingForward {
            method,
            path,
            headers: forwardable_headers(headers),
            body,
            respond_to: tx,
        },
    );
    state.queue.enqueue(request);
    state.metrics.queue_depth.set(state.queue.size() as i64);

    match tokio::time::timeout(FORWARD_TIMEOUT, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(ObjectVaultError::Internal("forwarding worker dropped the response channel".into())),
        Err(_) => Err(ObjectVaultError::Transport("forward timed out waiting for a node".into())),
    }
}

async fn upload(
    State(state): State<LoadBalancerApiState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, ApiError> {
    let declared_size: u64 = headers
        .get("X-File-Size")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ObjectVaultError::validation("X-File-Size", "header is required"))?
        .parse()
        .map_err(|_| ObjectVaultError::validation("X-File-Size", "must be a decimal integer"))?;
    if declared_size != body.len() as u64 {
        return Err(ObjectVaultError::validation("X-File-Size", "does not match the body length received").into());
    }

    let response = forward(
        &state,
        OperationKind::Upload,
        reqwest::Method::POST,
        declared_size,
        "/api/files/upload".into(),
        headers,
        body,
    )
    .await?;
    Ok((StatusCode::OK, response).into_response())
}

async fn download(
    State(state): State<LoadBalancerApiState>,
    Path(file_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let path = format!("/api/files/{file_id}/download");
    let response = forward(
        &state,
        OperationKind::Download,
        reqwest::Method::GET,
        0,
        path,
        headers,
        axum::body::Bytes::new(),
    )
    .await?;
    Ok((
        StatusCode::OK,
        [("Content-Type", "application/octet-stream")],
        response,
    )
        .into_response())
}

async fn delete_file(
    State(state): State<LoadBalancerApiState>,
    Path(file_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let path = format!("/api/files/{file_id}");
    let request = Request::new(OperationKind::Download, 0);
    let (tx, rx) = oneshot::channel();
    state.worker.register_forward(
        request.id,
        PendingForward {
            method: reqwest::Method::DELETE,
            path,
            headers: forwardable_headers(headers),
            body: axum::body::Bytes::new(),
            respond_to: tx,
        },
    );
    state.queue.enqueue(request);

    match tokio::time::timeout(FORWARD_TIMEOUT, rx).await {
        Ok(Ok(Ok(_))) => Ok((StatusCode::OK, Json(json!({"status": "OK"}))).into_response()),
        Ok(Ok(Err(e))) => Err(e.into()),
        Ok(Err(_)) => Err(ObjectVaultError::Internal("forwarding worker dropped the response channel".into()).into()),
        Err(_) => Err(ObjectVaultError::Transport("forward timed out waiting for a node".into()).into()),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    queue_size: usize,
}

async fn health(State(state): State<LoadBalancerApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "HEALTHY",
        queue_size: state.queue.size(),
    })
}

async fn metrics_endpoint(State(state): State<LoadBalancerApiState>) -> String {
    state.metrics.render()
}
