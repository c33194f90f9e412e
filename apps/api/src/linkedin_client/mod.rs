//! LinkedIn connector — the profile OAuth client and the harvester that
//! synthesizes a resume from the userinfo endpoint.
//!
//! LinkedIn's standard flow has no refresh capability, so an expired token is
//! a flat requirement to re-run the browser flow.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::oauth::pending::PendingAuthRegistry;
use crate::oauth::tokens::{epoch_now, expiry_with_margin, TokenLoadError, TokenStore};
use crate::oauth::{AuthRequired, OAuthConnector};

const LINKEDIN_AUTH_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
const LINKEDIN_TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
const LINKEDIN_USERINFO_URL: &str = "https://api.linkedin.com/v2/userinfo";
const PROVIDER_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

const DEFAULT_SCOPES: &str = "openid profile email";
const FALLBACK_CANDIDATE_NAME: &str = "LinkedIn Candidate";

#[derive(Debug, Clone)]
pub struct LinkedInSettings {
    pub client_id: String,
    pub client_secret: String,
    pub token_path: String,
    pub scopes: String,
}

/// A synthetic resume harvested from the profile endpoint.
#[derive(Debug, Clone)]
pub struct ProfileResume {
    pub candidate_name: String,
    pub text: String,
    pub skills: Vec<String>,
}

/// The persisted profile token: the provider's token response verbatim, plus
/// the bookkeeping fields this side adds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileToken {
    pub access_token: String,
    pub created_at: u64,
    pub expires_at: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ProfileToken {
    fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

pub struct LinkedInClient {
    settings: LinkedInSettings,
    http: reqwest::Client,
    registry: PendingAuthRegistry,
    tokens: TokenStore<ProfileToken>,
    /// Serializes token reads and the exchange-persist step.
    token_lock: tokio::sync::Mutex<()>,
}

impl LinkedInClient {
    pub fn new(settings: LinkedInSettings) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(PROVIDER_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            registry: PendingAuthRegistry::new("LinkedIn"),
            tokens: TokenStore::new(&settings.token_path),
            token_lock: tokio::sync::Mutex::new(()),
            settings,
        }
    }

    fn scopes(&self) -> &str {
        let configured = self.settings.scopes.trim();
        if configured.is_empty() {
            DEFAULT_SCOPES
        } else {
            configured
        }
    }

    fn validate_client_config(&self) -> Result<(), AuthRequired> {
        if self.settings.client_id.trim().is_empty() || self.settings.client_secret.trim().is_empty()
        {
            return Err(AuthRequired(
                "LinkedIn OAuth client is not configured. \
                 Set LINKEDIN_CLIENT_ID and LINKEDIN_CLIENT_SECRET."
                    .to_string(),
            ));
        }
        Ok(())
    }

    async fn access_token(&self) -> Result<String, AuthRequired> {
        let _guard = self.token_lock.lock().await;

        let token = match self.tokens.load() {
            Ok(token) => token,
            Err(TokenLoadError::Missing) => {
                return Err(AuthRequired(
                    "LinkedIn is not connected yet. Click `Connect LinkedIn` in the app."
                        .to_string(),
                ))
            }
            Err(TokenLoadError::Invalid(_)) => {
                return Err(AuthRequired(format!(
                    "Invalid LinkedIn token file at `{}`. Reconnect LinkedIn.",
                    self.settings.token_path
                )))
            }
        };

        if token.is_expired(epoch_now()) {
            return Err(AuthRequired(
                "LinkedIn token expired. Click `Connect LinkedIn` again.".to_string(),
            ));
        }
        if token.access_token.trim().is_empty() {
            return Err(AuthRequired(
                "LinkedIn token is missing access token.".to_string(),
            ));
        }
        Ok(token.access_token)
    }

    /// Harvests one synthetic resume from the profile endpoint.
    pub async fn fetch_profile_resume(&self) -> Result<ProfileResume, AuthRequired> {
        let access_token = self.access_token().await?;

        let response = self
            .http
            .get(LINKEDIN_USERINFO_URL)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|_| {
                AuthRequired("Could not reach LinkedIn profile endpoint.".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AuthRequired(format!(
                "LinkedIn profile request failed ({}): {detail}",
                status.as_u16()
            )));
        }

        let payload: Value = response.json().await.map_err(|_| {
            AuthRequired("LinkedIn profile response was unreadable.".to_string())
        })?;
        debug!("LinkedIn profile fetched");
        Ok(synthesize_profile(&payload))
    }
}

#[async_trait]
impl OAuthConnector for LinkedInClient {
    fn provider_name(&self) -> &'static str {
        "LinkedIn"
    }

    async fn is_connected(&self) -> bool {
        self.access_token().await.is_ok()
    }

    async fn start_browser_oauth(&self, redirect_uri: &str) -> Result<String, AuthRequired> {
        self.validate_client_config()?;
        let state = self.registry.issue(redirect_uri);

        Ok(format!(
            "{LINKEDIN_AUTH_URL}?response_type=code&client_id={}&redirect_uri={}&state={}&scope={}",
            urlencoding::encode(self.settings.client_id.trim()),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&state),
            urlencoding::encode(self.scopes()),
        ))
    }

    async fn finish_browser_oauth(
        &self,
        state: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<(), AuthRequired> {
        self.validate_client_config()?;
        self.registry.consume(state, redirect_uri)?;

        let _guard = self.token_lock.lock().await;
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.settings.client_id.trim()),
            ("client_secret", self.settings.client_secret.trim()),
        ];

        let response = self
            .http
            .post(LINKEDIN_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|_| {
                AuthRequired("LinkedIn token exchange failed due to network issue.".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AuthRequired(format!(
                "LinkedIn token exchange failed ({}): {detail}",
                status.as_u16()
            )));
        }

        let mut token_data: serde_json::Map<String, Value> = response.json().await.map_err(|_| {
            AuthRequired("LinkedIn token response was unreadable.".to_string())
        })?;

        // access_token moves into its own field; the rest of the provider
        // response is kept verbatim alongside it.
        let access_token = token_data
            .remove("access_token")
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default();
        if access_token.is_empty() {
            return Err(AuthRequired(
                "LinkedIn token response did not include access token.".to_string(),
            ));
        }
        let expires_in = token_data
            .get("expires_in")
            .and_then(Value::as_i64)
            .unwrap_or(3600);

        let now = epoch_now();
        let token = ProfileToken {
            access_token,
            created_at: now,
            expires_at: expiry_with_margin(now, expires_in),
            extra: token_data,
        };
        self.tokens
            .persist(&token)
            .map_err(|err| AuthRequired(format!("Could not persist LinkedIn token: {err}")))?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Profile synthesis
// ────────────────────────────────────────────────────────────────────────────

fn string_field(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Builds a deterministic multi-line resume text from a userinfo payload.
/// Line order is fixed regardless of which fields are present; absent fields
/// omit their line entirely.
fn synthesize_profile(payload: &Value) -> ProfileResume {
    let mut full_name = string_field(payload, "name");
    if full_name.is_empty() {
        let given_name = string_field(payload, "given_name");
        let family_name = string_field(payload, "family_name");
        let joined: Vec<&str> = [given_name.as_str(), family_name.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();
        full_name = if joined.is_empty() {
            FALLBACK_CANDIDATE_NAME.to_string()
        } else {
            joined.join(" ")
        };
    }

    let mut lines = vec![
        "LinkedIn Profile Snapshot".to_string(),
        format!("Name: {full_name}"),
    ];
    let email = string_field(payload, "email");
    if !email.is_empty() {
        lines.push(format!("Email: {email}"));
    }
    let locale = payload.get("locale").filter(|v| !v.is_null());
    if let Some(locale) = locale {
        lines.push(format!("Locale: {}", json_scalar(locale)));
    }
    let subject_id = payload.get("sub").filter(|v| !v.is_null());
    if let Some(subject_id) = subject_id {
        lines.push(format!("LinkedIn ID: {}", json_scalar(subject_id)));
    }

    ProfileResume {
        candidate_name: full_name,
        text: lines.join("\n"),
        skills: vec![],
    }
}

/// Renders a JSON scalar without surrounding quotes; non-scalars fall back to
/// their compact JSON form (LinkedIn has shipped `locale` both as a string
/// and as an object).
fn json_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
