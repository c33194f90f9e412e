use std::sync::Arc;

use crate::config::Config;
use crate::gmail_client::GmailClient;
use crate::linkedin_client::LinkedInClient;
use crate::matching::scoring::JobMatcher;
use crate::store::RecordStore;

/// Shared application state injected into all route handlers via Axum
/// extractors. Connectors, store, and matcher are single-owner service
/// objects constructed once in `main` — no ambient globals; tests build
/// fresh instances per case.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub gmail: Arc<GmailClient>,
    pub linkedin: Arc<LinkedInClient>,
    pub matcher: Arc<JobMatcher>,
    pub config: Config,
}
