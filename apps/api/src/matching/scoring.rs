use serde::Serialize;
use tracing::warn;

use crate::matching::embedder::{cosine_similarity, EmbedderState, EmbeddingClient, EmbeddingConfig};
use crate::matching::tfidf;
use crate::models::job::Job;
use crate::models::resume::Resume;

/// The fixed blend: final = 0.75 × semantic + 0.25 × skill. Exact linear
/// combination, no further normalization.
pub const SEMANTIC_WEIGHT: f64 = 0.75;
pub const SKILL_WEIGHT: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct MatchScore {
    pub semantic_score: f64,
    pub skill_score: f64,
    pub final_score: f64,
    pub missing_skills: Vec<String>,
}

/// One row of a ranking response. Scores are rounded to 4 decimal places at
/// this boundary only; ordering uses the unrounded values.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub resume_id: u64,
    pub candidate_name: String,
    pub semantic_score: f64,
    pub skill_score: f64,
    pub final_score: f64,
    pub missing_skills: Vec<String>,
}

/// Computes hybrid relevance for (job, resume) pairs.
///
/// The semantic side prefers the configured embedding service; on first-use
/// failure it permanently downgrades to the two-document TF-IDF fallback for
/// the remaining process lifetime. The downgrade is invisible to callers:
/// same signature, same [0, 1] range.
pub struct JobMatcher {
    config: EmbeddingConfig,
    embedder: tokio::sync::Mutex<EmbedderState>,
}

impl JobMatcher {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            embedder: tokio::sync::Mutex::new(EmbedderState::Untried),
        }
    }

    /// Cosine similarity in [0, 1] between the two texts.
    pub async fn semantic_similarity(&self, job_text: &str, resume_text: &str) -> f64 {
        let mut state = self.embedder.lock().await;

        if let EmbedderState::Untried = *state {
            *state = match EmbeddingClient::from_config(&self.config) {
                Some(client) => EmbedderState::Ready(client),
                None => EmbedderState::Unavailable,
            };
        }

        if let EmbedderState::Ready(client) = &*state {
            match client.embed_pair(job_text, resume_text).await {
                Ok((job_vec, resume_vec)) => {
                    return cosine_similarity(&job_vec, &resume_vec).clamp(0.0, 1.0);
                }
                Err(err) => {
                    warn!(%err, "embedding service unusable; falling back to tf-idf for the rest of the process");
                    *state = EmbedderState::Unavailable;
                }
            }
        }

        tfidf::pairwise_similarity(job_text, resume_text)
    }

    /// Fraction of required skills the resume satisfies, plus the normalized
    /// unmatched skills in the job's original declared order. No requirements
    /// means full satisfaction, not zero.
    pub fn skill_overlap(
        required_skills: &[String],
        resume_skills: &[String],
        resume_text: &str,
    ) -> (f64, Vec<String>) {
        let required: Vec<String> = required_skills
            .iter()
            .map(|skill| normalize_skill(skill))
            .filter(|skill| !skill.is_empty())
            .collect();
        if required.is_empty() {
            return (1.0, vec![]);
        }

        let resume_skill_set: std::collections::HashSet<String> =
            resume_skills.iter().map(|skill| normalize_skill(skill)).collect();
        let resume_text_lower = resume_text.to_lowercase();

        let mut matched = 0usize;
        let mut missing_skills = Vec::new();
        for skill in &required {
            if resume_skill_set.contains(skill) || resume_text_lower.contains(skill.as_str()) {
                matched += 1;
            } else {
                missing_skills.push(skill.clone());
            }
        }

        (matched as f64 / required.len() as f64, missing_skills)
    }

    pub async fn match_resume(&self, job: &Job, resume: &Resume) -> MatchScore {
        let semantic_score = self.semantic_similarity(&job.description, &resume.text).await;
        let (skill_score, missing_skills) =
            Self::skill_overlap(&job.required_skills, &resume.skills, &resume.text);
        let final_score = SEMANTIC_WEIGHT * semantic_score + SKILL_WEIGHT * skill_score;
        MatchScore {
            semantic_score,
            skill_score,
            final_score,
            missing_skills,
        }
    }

    /// Scores every resume against the job and sorts descending by final
    /// score. The sort is stable, so ties keep their storage order.
    pub async fn rank(&self, job: &Job, resumes: &[Resume]) -> Vec<MatchResult> {
        let mut results = Vec::with_capacity(resumes.len());
        for resume in resumes {
            let scored = self.match_resume(job, resume).await;
            results.push((scored.final_score, MatchResult {
                resume_id: resume.id,
                candidate_name: resume.candidate_name.clone(),
                semantic_score: round4(scored.semantic_score),
                skill_score: round4(scored.skill_score),
                final_score: round4(scored.final_score),
                missing_skills: scored.missing_skills,
            }));
        }

        results.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        results.into_iter().map(|(_, result)| result).collect()
    }
}

fn normalize_skill(value: &str) -> String {
    value.trim().to_lowercase()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher_without_embeddings() -> JobMatcher {
        JobMatcher::new(EmbeddingConfig {
            endpoint: String::new(),
            model: "text-embedding-3-small".to_string(),
            api_key: String::new(),
        })
    }

    fn job(description: &str, required_skills: &[&str]) -> Job {
        Job {
            id: 1,
            title: "Backend Engineer".to_string(),
            description: description.to_string(),
            required_skills: required_skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn resume(id: u64, name: &str, text: &str, skills: &[&str]) -> Resume {
        Resume {
            id,
            candidate_name: name.to_string(),
            text: text.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_no_required_skills_is_full_satisfaction() {
        let (score, missing) = JobMatcher::skill_overlap(&[], &["python".to_string()], "text");
        assert_eq!(score, 1.0);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_blank_required_skills_are_dropped() {
        let required = vec!["  ".to_string(), String::new()];
        let (score, missing) = JobMatcher::skill_overlap(&required, &[], "text");
        assert_eq!(score, 1.0);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_half_matched_skills_reports_missing_in_order() {
        let required = vec!["Python".to_string(), "SQL".to_string()];
        let resume_skills = vec!["python".to_string()];
        let (score, missing) = JobMatcher::skill_overlap(&required, &resume_skills, "...");
        assert_eq!(score, 0.5);
        assert_eq!(missing, vec!["sql"]);
    }

    #[test]
    fn test_skill_matches_via_text_substring() {
        let required = vec!["Kubernetes".to_string()];
        let (score, missing) =
            JobMatcher::skill_overlap(&required, &[], "Operated Kubernetes clusters at scale");
        assert_eq!(score, 1.0);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_missing_skills_preserve_declared_order() {
        let required = vec!["Go".to_string(), "Kafka".to_string(), "Terraform".to_string()];
        let (_, missing) = JobMatcher::skill_overlap(&required, &[], "unrelated text");
        assert_eq!(missing, vec!["go", "kafka", "terraform"]);
    }

    #[test]
    fn test_final_score_is_exact_linear_blend() {
        let final_score = SEMANTIC_WEIGHT * 0.8 + SKILL_WEIGHT * 0.4;
        assert!((final_score - 0.70).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_semantic_score_in_unit_range_without_embedding_service() {
        let matcher = matcher_without_embeddings();
        let score = matcher
            .semantic_similarity(
                "Rust engineer for distributed storage",
                "Built storage engines in Rust",
            )
            .await;
        assert!((0.0..=1.0).contains(&score), "score was {score}");
    }

    #[tokio::test]
    async fn test_fallback_decision_is_cached_for_process_lifetime() {
        let matcher = matcher_without_embeddings();
        matcher.semantic_similarity("a b", "a b").await;
        let state = matcher.embedder.lock().await;
        assert!(matches!(*state, EmbedderState::Unavailable));
    }

    #[tokio::test]
    async fn test_match_resume_blends_components() {
        let matcher = matcher_without_embeddings();
        let job = job("Rust services", &["rust"]);
        let candidate = resume(1, "Jane", "Rust services", &["rust"]);

        let scored = matcher.match_resume(&job, &candidate).await;
        let expected = SEMANTIC_WEIGHT * scored.semantic_score + SKILL_WEIGHT * scored.skill_score;
        assert!((scored.final_score - expected).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_rank_sorts_descending_and_ties_keep_storage_order() {
        let matcher = matcher_without_embeddings();
        let job = job("Rust backend services", &[]);
        // Two identical resumes tie exactly; the third scores lower.
        let resumes = vec![
            resume(1, "First", "Rust backend services", &[]),
            resume(2, "Second", "Rust backend services", &[]),
            resume(3, "Third", "watercolor painting", &[]),
        ];

        let ranked = matcher.rank(&job, &resumes).await;
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].resume_id, 1);
        assert_eq!(ranked[1].resume_id, 2);
        assert_eq!(ranked[2].resume_id, 3);
        assert!(ranked[0].final_score >= ranked[2].final_score);
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(1.0), 1.0);
    }
}
