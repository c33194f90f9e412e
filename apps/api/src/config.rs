use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every provider setting has a default so the server can boot unconfigured;
/// the connectors themselves surface `AuthRequired` when asked to operate
/// without credentials.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub gmail_credentials_path: String,
    pub gmail_token_path: String,
    pub gmail_resume_label: String,
    pub linkedin_client_id: String,
    pub linkedin_client_secret: String,
    pub linkedin_token_path: String,
    pub linkedin_scopes: String,
    pub embedding_endpoint: String,
    pub embedding_model: String,
    pub embedding_api_key: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            app_name: env_or("APP_NAME", "AI Resume Screening and Job Matching Engine"),
            gmail_credentials_path: env_or("GMAIL_CREDENTIALS_PATH", "credentials.json"),
            gmail_token_path: env_or("GMAIL_TOKEN_PATH", "token.json"),
            gmail_resume_label: env_or("GMAIL_RESUME_LABEL", ""),
            linkedin_client_id: env_or("LINKEDIN_CLIENT_ID", ""),
            linkedin_client_secret: env_or("LINKEDIN_CLIENT_SECRET", ""),
            linkedin_token_path: env_or("LINKEDIN_TOKEN_PATH", "linkedin_token.json"),
            linkedin_scopes: env_or("LINKEDIN_SCOPES", "openid profile email"),
            embedding_endpoint: env_or("EMBEDDING_ENDPOINT", ""),
            embedding_model: env_or("EMBEDDING_MODEL", "text-embedding-3-small"),
            embedding_api_key: env_or("EMBEDDING_API_KEY", ""),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
