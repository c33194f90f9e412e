use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A stored candidate resume. Never mutated after creation, regardless of
/// which import path produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub id: u64,
    pub candidate_name: String,
    pub text: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeCreate {
    pub candidate_name: String,
    pub text: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl ResumeCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        let name_len = self.candidate_name.chars().count();
        if !(2..=120).contains(&name_len) {
            return Err(AppError::Validation(
                "candidate_name must be between 2 and 120 characters".to_string(),
            ));
        }
        if self.text.chars().count() < 30 {
            return Err(AppError::Validation(
                "text must be at least 30 characters".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_rejected() {
        let payload = ResumeCreate {
            candidate_name: "Jane Doe".to_string(),
            text: "too short".to_string(),
            skills: vec![],
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_valid_resume_passes() {
        let payload = ResumeCreate {
            candidate_name: "Jane Doe".to_string(),
            text: "Seasoned engineer with a decade of backend experience.".to_string(),
            skills: vec!["rust".to_string()],
        };
        assert!(payload.validate().is_ok());
    }
}
