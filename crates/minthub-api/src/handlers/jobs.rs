//! Job inspection and generic enqueue routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use minthub_core::defaults::{JOB_LIST_LIMIT, JOB_LIST_LIMIT_MAX};
use minthub_core::{Error, Job, JobStore, QueueStats};

use super::AppState;
use crate::error::ApiError;

/// Body of the generic enqueue endpoint.
#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub payload: Option<JsonValue>,
}

pub async fn create_job(
    State(state): State<AppState>,
    body: Option<Json<CreateJobRequest>>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let (kind, payload) = match body {
        Some(Json(request)) => (request.kind.unwrap_or_default(), request.payload),
        None => (String::new(), None),
    };

    // An absent kind falls through to the store's InvalidInput.
    let job = state.db.jobs.enqueue(&kind, payload).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(JOB_LIST_LIMIT)
        .clamp(1, JOB_LIST_LIMIT_MAX);
    let jobs = state.db.jobs.list_recent(limit).await?;
    Ok(Json(jobs))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
    let job = state
        .db
        .jobs
        .get(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("job {id}")))?;
    Ok(Json(job))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.db.jobs.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound(format!("job {id}")).into())
    }
}

pub async fn queue_stats(
    State(state): State<AppState>,
) -> Result<Json<QueueStats>, ApiError> {
    Ok(Json(state.db.jobs.queue_stats().await?))
}
