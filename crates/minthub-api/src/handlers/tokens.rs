//! Token operation producer routes.
//!
//! Each route enqueues a job of a fixed kind with the request body as
//! payload and answers `202 Accepted` with the full job record.
//! Execution happens asynchronously in the worker; clients poll the
//! job endpoints for the outcome.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value as JsonValue;

use minthub_core::{Job, JobKind, JobStore};

use super::AppState;
use crate::error::ApiError;

async fn enqueue(
    state: &AppState,
    kind: JobKind,
    payload: Option<Json<JsonValue>>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let payload = payload.map(|Json(value)| value);
    let job = state.db.jobs.enqueue(kind.as_str(), payload).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

pub async fn mint(
    State(state): State<AppState>,
    payload: Option<Json<JsonValue>>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    enqueue(&state, JobKind::Mint, payload).await
}

pub async fn burn(
    State(state): State<AppState>,
    payload: Option<Json<JsonValue>>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    enqueue(&state, JobKind::Burn, payload).await
}

pub async fn distribute(
    State(state): State<AppState>,
    payload: Option<Json<JsonValue>>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    enqueue(&state, JobKind::Distribute, payload).await
}

pub async fn freeze(
    State(state): State<AppState>,
    payload: Option<Json<JsonValue>>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    enqueue(&state, JobKind::FreezeWallet, payload).await
}

pub async fn transfer(
    State(state): State<AppState>,
    payload: Option<Json<JsonValue>>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    enqueue(&state, JobKind::Transfer, payload).await
}
