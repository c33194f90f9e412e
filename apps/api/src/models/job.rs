use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A job posting. Immutable after creation; lives in the record store for
/// process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobCreate {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
}

impl JobCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        let title_len = self.title.chars().count();
        if !(2..=120).contains(&title_len) {
            return Err(AppError::Validation(
                "title must be between 2 and 120 characters".to_string(),
            ));
        }
        if self.description.chars().count() < 20 {
            return Err(AppError::Validation(
                "description must be at least 20 characters".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: &str, description: &str) -> JobCreate {
        JobCreate {
            title: title.to_string(),
            description: description.to_string(),
            required_skills: vec![],
        }
    }

    #[test]
    fn test_valid_job_passes() {
        assert!(payload("Backend Engineer", "Build and operate the ingest pipeline.")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_short_title_rejected() {
        assert!(payload("X", "Build and operate the ingest pipeline.")
            .validate()
            .is_err());
    }

    #[test]
    fn test_short_description_rejected() {
        assert!(payload("Backend Engineer", "too short").validate().is_err());
    }
}
