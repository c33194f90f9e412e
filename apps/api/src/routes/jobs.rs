use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::errors::AppError;
use crate::models::job::{Job, JobCreate};
use crate::state::AppState;

/// GET /api/v1/jobs
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.store.list_jobs())
}

/// GET /api/v1/jobs/:job_id
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<u64>,
) -> Result<Json<Job>, AppError> {
    state
        .store
        .get_job(job_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))
}

/// POST /api/v1/jobs
pub async fn create_job(
    State(state): State<AppState>,
    Json(payload): Json<JobCreate>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    payload.validate()?;
    let job = state
        .store
        .create_job(payload.title, payload.description, payload.required_skills);
    Ok((StatusCode::CREATED, Json(job)))
}
