use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;

use crate::errors::AppError;
use crate::extract::extract_text_from_bytes;
use crate::models::resume::{Resume, ResumeCreate};
use crate::state::AppState;

/// GET /api/v1/resumes
pub async fn list_resumes(State(state): State<AppState>) -> Json<Vec<Resume>> {
    Json(state.store.list_resumes())
}

/// POST /api/v1/resumes
pub async fn create_resume(
    State(state): State<AppState>,
    Json(payload): Json<ResumeCreate>,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    payload.validate()?;
    let resume = state
        .store
        .create_resume(payload.candidate_name, payload.text, payload.skills);
    Ok((StatusCode::CREATED, Json(resume)))
}

/// POST /api/v1/resumes/upload
/// Multipart form: `file` (required), `candidate_name` and `skills` (csv)
/// optional. The candidate name falls back to the filename stem.
pub async fn upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    let mut file: Option<(Bytes, String, Option<String>)> = None;
    let mut candidate_name: Option<String> = None;
    let mut skills_csv: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::Validation(format!("invalid multipart payload: {err}")))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::Validation(format!("could not read file: {err}")))?;
                file = Some((bytes, filename, content_type));
            }
            Some("candidate_name") => {
                candidate_name = Some(field.text().await.map_err(|err| {
                    AppError::Validation(format!("could not read candidate_name: {err}"))
                })?);
            }
            Some("skills") => {
                skills_csv = Some(field.text().await.map_err(|err| {
                    AppError::Validation(format!("could not read skills: {err}"))
                })?);
            }
            _ => {}
        }
    }

    let Some((bytes, filename, content_type)) = file else {
        return Err(AppError::Validation("file field is required".to_string()));
    };

    let text = extract_text_from_bytes(&bytes, &filename, content_type.as_deref())
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let inferred_name = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename.as_str());
    let inferred_name = if inferred_name.is_empty() {
        "Unknown Candidate"
    } else {
        inferred_name
    };
    let name = candidate_name
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| inferred_name.to_string());

    let resume = state
        .store
        .create_resume(name, text, parse_skill_csv(skills_csv.as_deref()));
    Ok((StatusCode::CREATED, Json(resume)))
}

fn parse_skill_csv(csv: Option<&str>) -> Vec<String> {
    csv.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|skill| !skill.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skill_csv_trims_and_drops_blanks() {
        assert_eq!(
            parse_skill_csv(Some(" rust , sql ,, tokio ")),
            vec!["rust", "sql", "tokio"]
        );
    }

    #[test]
    fn test_parse_skill_csv_none_is_empty() {
        assert!(parse_skill_csv(None).is_empty());
    }
}
