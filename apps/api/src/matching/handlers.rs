use axum::extract::{Path, State};
use axum::Json;

use crate::errors::AppError;
use crate::matching::scoring::MatchResult;
use crate::state::AppState;

/// POST /api/v1/resumes/match/:job_id
pub async fn handle_match_job(
    State(state): State<AppState>,
    Path(job_id): Path<u64>,
) -> Result<Json<Vec<MatchResult>>, AppError> {
    let job = state
        .store
        .get_job(job_id)
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let resumes = state.store.list_resumes();
    let ranked = state.matcher.rank(&job, &resumes).await;
    Ok(Json(ranked))
}
