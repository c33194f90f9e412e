mod config;
mod errors;
mod extract;
mod gmail_client;
mod imports;
mod linkedin_client;
mod matching;
mod models;
mod oauth;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::gmail_client::{GmailClient, GmailSettings};
use crate::linkedin_client::{LinkedInClient, LinkedInSettings};
use crate::matching::embedder::EmbeddingConfig;
use crate::matching::scoring::JobMatcher;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::RecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting {} v{}", config.app_name, env!("CARGO_PKG_VERSION"));

    let store = Arc::new(RecordStore::new());

    let gmail = Arc::new(GmailClient::new(GmailSettings {
        credentials_path: config.gmail_credentials_path.clone(),
        token_path: config.gmail_token_path.clone(),
        default_label: config.gmail_resume_label.clone(),
    }));
    info!("Gmail connector initialized (token: {})", config.gmail_token_path);

    let linkedin = Arc::new(LinkedInClient::new(LinkedInSettings {
        client_id: config.linkedin_client_id.clone(),
        client_secret: config.linkedin_client_secret.clone(),
        token_path: config.linkedin_token_path.clone(),
        scopes: config.linkedin_scopes.clone(),
    }));
    info!(
        "LinkedIn connector initialized (token: {})",
        config.linkedin_token_path
    );

    // The matcher decides lazily, on first use, whether the embedding service
    // is usable; an unusable service downgrades it to tf-idf for good.
    let matcher = Arc::new(JobMatcher::new(EmbeddingConfig {
        endpoint: config.embedding_endpoint.clone(),
        model: config.embedding_model.clone(),
        api_key: config.embedding_api_key.clone(),
    }));

    let state = AppState {
        store,
        gmail,
        linkedin,
        matcher,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
