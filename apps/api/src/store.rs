use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::models::job::Job;
use crate::models::resume::Resume;

/// In-memory record store for jobs and resumes.
///
/// Ids are monotonic per entity type, starting at 1. Records are append-only
/// and live for the process lifetime. Handlers must not hold the locks across
/// await points; every method clones out what it returns.
pub struct RecordStore {
    jobs: RwLock<Vec<Job>>,
    resumes: RwLock<Vec<Resume>>,
    next_job_id: AtomicU64,
    next_resume_id: AtomicU64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(Vec::new()),
            resumes: RwLock::new(Vec::new()),
            next_job_id: AtomicU64::new(1),
            next_resume_id: AtomicU64::new(1),
        }
    }

    pub fn create_job(&self, title: String, description: String, required_skills: Vec<String>) -> Job {
        let job = Job {
            id: self.next_job_id.fetch_add(1, Ordering::SeqCst),
            title,
            description,
            required_skills,
        };
        self.jobs.write().expect("jobs lock poisoned").push(job.clone());
        job
    }

    pub fn list_jobs(&self) -> Vec<Job> {
        self.jobs.read().expect("jobs lock poisoned").clone()
    }

    pub fn get_job(&self, id: u64) -> Option<Job> {
        self.jobs
            .read()
            .expect("jobs lock poisoned")
            .iter()
            .find(|job| job.id == id)
            .cloned()
    }

    pub fn create_resume(&self, candidate_name: String, text: String, skills: Vec<String>) -> Resume {
        let resume = Resume {
            id: self.next_resume_id.fetch_add(1, Ordering::SeqCst),
            candidate_name,
            text,
            skills,
        };
        self.resumes
            .write()
            .expect("resumes lock poisoned")
            .push(resume.clone());
        resume
    }

    pub fn list_resumes(&self) -> Vec<Resume> {
        self.resumes.read().expect("resumes lock poisoned").clone()
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_are_monotonic_from_one() {
        let store = RecordStore::new();
        let a = store.create_job("Engineer".into(), "desc".into(), vec![]);
        let b = store.create_job("Analyst".into(), "desc".into(), vec![]);
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn test_resume_ids_independent_of_job_ids() {
        let store = RecordStore::new();
        store.create_job("Engineer".into(), "desc".into(), vec![]);
        let resume = store.create_resume("Jane".into(), "text".into(), vec![]);
        assert_eq!(resume.id, 1);
    }

    #[test]
    fn test_get_job_returns_none_for_unknown_id() {
        let store = RecordStore::new();
        assert!(store.get_job(42).is_none());
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let store = RecordStore::new();
        store.create_resume("A".into(), "a".into(), vec![]);
        store.create_resume("B".into(), "b".into(), vec![]);
        let names: Vec<_> = store
            .list_resumes()
            .into_iter()
            .map(|r| r.candidate_name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
