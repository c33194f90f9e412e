use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::imports::orchestrator::{
    import_combined, import_from_mailbox, import_from_profile, CombinedImportReport,
    MailboxImportReport, ProfileImportError,
};
use crate::models::resume::Resume;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ImportQuery {
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,
    pub query: Option<String>,
    pub label: Option<String>,
}

fn default_max_messages() -> u32 {
    20
}

impl ImportQuery {
    fn validate(&self) -> Result<(), AppError> {
        if !(1..=100).contains(&self.max_messages) {
            return Err(AppError::Validation(
                "max_messages must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

/// POST /api/v1/resumes/import/gmail
pub async fn handle_import_gmail(
    State(state): State<AppState>,
    Query(params): Query<ImportQuery>,
) -> Result<Json<MailboxImportReport>, AppError> {
    params.validate()?;
    let report = import_from_mailbox(
        &state.gmail,
        &state.store,
        params.max_messages,
        params.query.as_deref(),
        params.label.as_deref(),
    )
    .await?;
    Ok(Json(report))
}

/// POST /api/v1/resumes/import/linkedin
pub async fn handle_import_linkedin(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    match import_from_profile(&state.linkedin, &state.store, false).await {
        Ok(Some(resume)) => Ok((StatusCode::CREATED, Json(resume))),
        Ok(None) | Err(ProfileImportError::Duplicate) => Err(AppError::Conflict(
            "LinkedIn profile already imported.".to_string(),
        )),
        Err(ProfileImportError::Auth(err)) => Err(err.into()),
    }
}

/// POST /api/v1/resumes/import/combined
pub async fn handle_import_combined(
    State(state): State<AppState>,
    Query(params): Query<ImportQuery>,
) -> Result<Json<CombinedImportReport>, AppError> {
    params.validate()?;
    let report = import_combined(
        &state.gmail,
        &state.linkedin,
        &state.store,
        params.max_messages,
        params.query.as_deref(),
        params.label.as_deref(),
    )
    .await?;
    Ok(Json(report))
}
