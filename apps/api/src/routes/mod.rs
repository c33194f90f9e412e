pub mod health;
pub mod jobs;
pub mod resumes;

use axum::{
    routing::{get, post},
    Router,
};

use crate::imports::handlers as import_handlers;
use crate::matching::handlers as match_handlers;
use crate::oauth::handlers as oauth_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs
        .route("/api/v1/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/api/v1/jobs/:job_id", get(jobs::get_job))
        // Resumes
        .route(
            "/api/v1/resumes",
            get(resumes::list_resumes).post(resumes::create_resume),
        )
        .route("/api/v1/resumes/upload", post(resumes::upload_resume))
        .route(
            "/api/v1/resumes/import/gmail",
            post(import_handlers::handle_import_gmail),
        )
        .route(
            "/api/v1/resumes/import/linkedin",
            post(import_handlers::handle_import_linkedin),
        )
        .route(
            "/api/v1/resumes/import/combined",
            post(import_handlers::handle_import_combined),
        )
        .route(
            "/api/v1/resumes/match/:job_id",
            post(match_handlers::handle_match_job),
        )
        // Connector status + browser OAuth legs
        .route("/api/v1/gmail/status", get(oauth_handlers::gmail_status))
        .route(
            "/api/v1/gmail/oauth/start",
            get(oauth_handlers::gmail_oauth_start),
        )
        .route(
            "/api/v1/gmail/oauth/callback",
            get(oauth_handlers::gmail_oauth_callback),
        )
        .route(
            "/api/v1/linkedin/status",
            get(oauth_handlers::linkedin_status),
        )
        .route(
            "/api/v1/linkedin/oauth/start",
            get(oauth_handlers::linkedin_oauth_start),
        )
        .route(
            "/api/v1/linkedin/oauth/callback",
            get(oauth_handlers::linkedin_oauth_callback),
        )
        .with_state(state)
}
