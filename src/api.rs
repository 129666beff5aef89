//! Read-only status API plus start/stop controls for the scanning pipeline.
//!
//! Every handler reads a snapshot of shared state and returns; none of them
//! ever wait on the poller or a scanner tick, so a slow or stalled chain
//! can't make this endpoint hang. `running` is shared with every scanner and
//! the attestation poller: `/stop` pauses their ticks at the next tick
//! boundary without tearing the tasks down, `/start` resumes them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::instrument;

use crate::chain::ChainRegistry;
use crate::error::RelayerError;
use crate::store::PendingStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<PendingStore>,
    pub registry: Arc<ChainRegistry>,
    pub running: Arc<AtomicBool>,
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/health", get(get_health))
        .route("/status", get(get_status))
        .route("/pending", get(get_pending))
        .route("/start", post(post_start))
        .route("/stop", post(post_stop))
}

#[instrument(skip_all)]
async fn get_health(State(state): State<ApiState>) -> impl IntoResponse {
    let timestamp = unix_timestamp();
    let cctp = status_snapshot(&state).await;
    Json(json!({
        "status": "ok",
        "timestamp": timestamp,
        "cctp": cctp,
    }))
}

#[instrument(skip_all)]
async fn get_status(State(state): State<ApiState>) -> impl IntoResponse {
    Json(status_snapshot(&state).await)
}

async fn status_snapshot(state: &ApiState) -> serde_json::Value {
    let pending_count = state.store.len().await;
    let chains: Vec<_> = state
        .registry
        .configs()
        .map(|c| {
            json!({
                "name": c.display_name,
                "chainId": c.chain_id,
                "domainId": c.domain_id,
                "bridge": c.bridge_address,
            })
        })
        .collect();

    json!({
        "isRunning": state.running.load(Ordering::SeqCst),
        "pendingCount": pending_count,
        "chains": chains,
    })
}

fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[instrument(skip_all)]
async fn get_pending(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;
    let transfers: Vec<_> = snapshot
        .iter()
        .map(|t| {
            let (source_domain, burn_nonce) = t.key();
            json!({
                "key": format!("{source_domain}:{burn_nonce}"),
                "source": t.source_domain,
                "destination": t.destination_domain,
                "nonce": t.burn_nonce,
                "messageHash": t.message_hash,
                "enqueuedAt": t.enqueued_at.elapsed().as_secs(),
                "retries": t.retries,
                "state": t.state.as_str(),
            })
        })
        .collect();

    Json(json!({
        "count": transfers.len(),
        "transfers": transfers,
    }))
}

#[instrument(skip_all)]
async fn post_start(State(state): State<ApiState>) -> impl IntoResponse {
    if state.running.swap(true, Ordering::SeqCst) {
        return error_response(RelayerError::AlreadyRunning);
    }
    (StatusCode::OK, Json(json!({ "isRunning": true }))).into_response()
}

#[instrument(skip_all)]
async fn post_stop(State(state): State<ApiState>) -> impl IntoResponse {
    if !state.running.swap(false, Ordering::SeqCst) {
        return error_response(RelayerError::AlreadyStopped);
    }
    (StatusCode::OK, Json(json!({ "isRunning": false }))).into_response()
}

fn error_response(err: RelayerError) -> axum::response::Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": err.to_string() }))).into_response()
}
