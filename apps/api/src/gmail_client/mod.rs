//! Gmail connector — the mailbox OAuth client and the attachment harvester
//! that turns a mailbox search into raw candidate-document bytes.
//!
//! The browser flow, pending-state lifecycle, and token persistence follow
//! the shared pieces in `crate::oauth`; everything Gmail-specific (client
//! secrets file, refresh grant, message/part traversal) lives here.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::oauth::pending::PendingAuthRegistry;
use crate::oauth::tokens::{epoch_now, expiry_with_margin, TokenLoadError, TokenStore};
use crate::oauth::{AuthRequired, OAuthConnector};

const GMAIL_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GMAIL_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const PROVIDER_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

pub const GMAIL_SCOPES: &[&str] = &["https://www.googleapis.com/auth/gmail.readonly"];

/// Extension → canonical mime type for the attachment kinds worth importing.
/// A part qualifies when its filename carries the extension, or when its
/// declared mime type is canonical and the filename merely contains the
/// extension token — tolerating parts where one of the two is wrong.
const SUPPORTED_ATTACHMENTS: &[(&str, &str)] = &[
    (".txt", "text/plain"),
    (".pdf", "application/pdf"),
    (
        ".docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
];

#[derive(Debug, Clone)]
pub struct GmailSettings {
    pub credentials_path: String,
    pub token_path: String,
    pub default_label: String,
}

/// One harvested attachment, with the message context it came from.
#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub message_id: String,
    pub subject: String,
    pub sender: String,
    pub filename: String,
    pub mime_type: String,
    pub raw_bytes: Bytes,
}

/// The persisted mailbox token carries the full credential payload so silent
/// refresh works without re-reading the client secrets file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
    pub scopes: Vec<String>,
    pub expires_at: u64,
}

impl MailboxToken {
    fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Provider wire types
// ────────────────────────────────────────────────────────────────────────────

/// Google OAuth client file, as downloaded from the cloud console.
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    GMAIL_TOKEN_URL.to_string()
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Deserialize)]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageDetail {
    #[serde(default)]
    payload: Option<MessagePart>,
}

/// A node in the message part tree. Parts nest inside parts to unbounded
/// depth; attachments can appear at any level.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MessagePart {
    filename: Option<String>,
    mime_type: Option<String>,
    headers: Vec<MessageHeader>,
    body: Option<PartBody>,
    parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct MessageHeader {
    name: String,
    value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PartBody {
    data: Option<String>,
    attachment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentBody {
    #[serde(default)]
    data: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

struct CachedSession {
    access_token: String,
    expires_at: u64,
}

pub struct GmailClient {
    settings: GmailSettings,
    http: reqwest::Client,
    registry: PendingAuthRegistry,
    tokens: TokenStore<MailboxToken>,
    /// Serializes token load-refresh-persist so two concurrent requests
    /// cannot race a refresh against the same token file.
    token_lock: tokio::sync::Mutex<()>,
    /// Cached bearer credentials; invalidated after a completed browser flow
    /// so the next resource fetch re-reads fresh credentials.
    session: std::sync::Mutex<Option<CachedSession>>,
}

impl GmailClient {
    pub fn new(settings: GmailSettings) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(PROVIDER_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            registry: PendingAuthRegistry::new("Gmail"),
            tokens: TokenStore::new(&settings.token_path),
            token_lock: tokio::sync::Mutex::new(()),
            session: std::sync::Mutex::new(None),
            settings,
        }
    }

    fn load_client_secrets(&self) -> Result<ClientSecrets, AuthRequired> {
        let path = &self.settings.credentials_path;
        let raw = std::fs::read_to_string(path).map_err(|_| {
            AuthRequired(format!(
                "Missing Gmail OAuth client file at `{path}`. \
                 Place your downloaded Google OAuth JSON there, then connect Gmail."
            ))
        })?;
        let file: ClientSecretsFile = serde_json::from_str(&raw)
            .map_err(|_| AuthRequired(format!("Gmail OAuth client file at `{path}` is malformed.")))?;
        file.installed
            .or(file.web)
            .ok_or_else(|| AuthRequired(format!("Gmail OAuth client file at `{path}` is malformed.")))
    }

    /// Non-interactive credential load. Refreshes silently when the stored
    /// token is expired and a refresh credential is present; otherwise the
    /// caller is instructed to re-run the browser flow.
    async fn access_token(&self) -> Result<String, AuthRequired> {
        let _guard = self.token_lock.lock().await;
        let now = epoch_now();

        if let Some(cached) = self.session.lock().expect("session lock poisoned").as_ref() {
            if now < cached.expires_at {
                return Ok(cached.access_token.clone());
            }
        }

        let token = match self.tokens.load() {
            Ok(token) => token,
            Err(TokenLoadError::Missing) => {
                return Err(AuthRequired(
                    "Gmail is not connected yet. Click `Connect Gmail` in the app.".to_string(),
                ))
            }
            Err(TokenLoadError::Invalid(_)) => {
                return Err(AuthRequired(format!(
                    "Gmail token exists but is invalid. Delete `{}` and reconnect Gmail.",
                    self.settings.token_path
                )))
            }
        };

        let token = if token.is_expired(now) {
            match token.refresh_token.as_deref() {
                Some(refresh) if !refresh.is_empty() => self.refresh(&token).await?,
                _ => {
                    return Err(AuthRequired(
                        "Gmail token expired. Reconnect Gmail to re-authorize.".to_string(),
                    ))
                }
            }
        } else {
            token
        };

        *self.session.lock().expect("session lock poisoned") = Some(CachedSession {
            access_token: token.access_token.clone(),
            expires_at: token.expires_at,
        });
        Ok(token.access_token)
    }

    async fn refresh(&self, token: &MailboxToken) -> Result<MailboxToken, AuthRequired> {
        let reauth = || {
            AuthRequired(
                "Could not refresh Gmail token. Reconnect Gmail to re-authorize.".to_string(),
            )
        };
        let refresh_token = token.refresh_token.clone().unwrap_or_default();
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", token.client_id.as_str()),
            ("client_secret", token.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&token.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|_| reauth())?;
        if !response.status().is_success() {
            return Err(reauth());
        }
        let refreshed: GoogleTokenResponse = response.json().await.map_err(|_| reauth())?;

        let updated = MailboxToken {
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token.or_else(|| token.refresh_token.clone()),
            client_id: token.client_id.clone(),
            client_secret: token.client_secret.clone(),
            token_uri: token.token_uri.clone(),
            scopes: token.scopes.clone(),
            expires_at: expiry_with_margin(epoch_now(), refreshed.expires_in),
        };
        self.tokens
            .persist(&updated)
            .map_err(|err| AuthRequired(format!("Could not persist refreshed Gmail token: {err}")))?;
        debug!("Gmail token refreshed");
        Ok(updated)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AuthRequired> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|_| {
                AuthRequired("Could not reach Gmail. Check the connection and retry.".to_string())
            })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(AuthRequired(
                "Gmail rejected the stored credentials. Reconnect Gmail.".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(AuthRequired(format!(
                "Gmail request failed ({status}). Reconnect Gmail and retry."
            )));
        }
        response.json().await.map_err(|_| {
            AuthRequired("Gmail returned an unreadable response. Retry the import.".to_string())
        })
    }

    /// Harvests supported resume attachments from the most recent matching
    /// messages. `max_messages` is bounded to 1..=100; `label` overrides the
    /// configured default label, and a blank effective label means no label
    /// filter at all.
    pub async fn fetch_recent_resume_attachments(
        &self,
        max_messages: u32,
        query: Option<&str>,
        label: Option<&str>,
    ) -> Result<Vec<MailAttachment>, AuthRequired> {
        let max_messages = max_messages.clamp(1, 100);
        let access_token = self.access_token().await?;
        let search_query = build_query(&self.settings.default_label, query, label);
        debug!(query = %search_query, "Gmail attachment search");

        let list: MessageListResponse = self
            .get_json(
                &access_token,
                &format!("{GMAIL_API_BASE}/messages"),
                &[
                    ("q", search_query.as_str()),
                    ("maxResults", &max_messages.to_string()),
                ],
            )
            .await?;

        let mut attachments = Vec::new();
        for message in list.messages {
            let Some(message_id) = message.id else { continue };

            let detail: MessageDetail = self
                .get_json(
                    &access_token,
                    &format!("{GMAIL_API_BASE}/messages/{message_id}"),
                    &[("format", "full")],
                )
                .await?;
            let Some(payload) = detail.payload else { continue };

            let subject = find_header(&payload.headers, "Subject");
            let sender = find_header(&payload.headers, "From");

            for part in collect_supported_parts(&payload) {
                let data = match (part.data, part.attachment_id) {
                    (Some(data), _) => Some(data),
                    (None, Some(attachment_id)) => {
                        let body: AttachmentBody = self
                            .get_json(
                                &access_token,
                                &format!(
                                    "{GMAIL_API_BASE}/messages/{message_id}/attachments/{attachment_id}"
                                ),
                                &[],
                            )
                            .await?;
                        body.data
                    }
                    (None, None) => None,
                };
                let Some(data) = data else { continue };

                let raw_bytes = match decode_base64_url(&data) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(filename = %part.filename, %err, "skipping undecodable attachment payload");
                        continue;
                    }
                };

                attachments.push(MailAttachment {
                    message_id: message_id.clone(),
                    subject: subject.clone(),
                    sender: sender.clone(),
                    filename: part.filename,
                    mime_type: part.mime_type,
                    raw_bytes,
                });
            }
        }

        Ok(attachments)
    }
}

#[async_trait]
impl OAuthConnector for GmailClient {
    fn provider_name(&self) -> &'static str {
        "Gmail"
    }

    async fn is_connected(&self) -> bool {
        self.access_token().await.is_ok()
    }

    async fn start_browser_oauth(&self, redirect_uri: &str) -> Result<String, AuthRequired> {
        let secrets = self.load_client_secrets()?;
        let state = self.registry.issue(redirect_uri);
        let scope = GMAIL_SCOPES.join(" ");

        // access_type=offline + prompt=consent so the exchange yields a
        // refresh token even for repeat authorizations.
        Ok(format!(
            "{GMAIL_AUTH_URL}?response_type=code&client_id={}&redirect_uri={}&state={}&scope={}&access_type=offline&prompt=consent",
            urlencoding::encode(&secrets.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&state),
            urlencoding::encode(&scope),
        ))
    }

    async fn finish_browser_oauth(
        &self,
        state: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<(), AuthRequired> {
        let secrets = self.load_client_secrets()?;
        self.registry.consume(state, redirect_uri)?;

        let _guard = self.token_lock.lock().await;
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&secrets.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|_| {
                AuthRequired("Gmail token exchange failed due to network issue.".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AuthRequired(format!(
                "Gmail token exchange failed ({}): {detail}",
                status.as_u16()
            )));
        }

        let exchanged: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|_| AuthRequired("Gmail token response was unreadable.".to_string()))?;
        if exchanged.access_token.trim().is_empty() {
            return Err(AuthRequired(
                "Gmail token response did not include access token.".to_string(),
            ));
        }

        let token = MailboxToken {
            access_token: exchanged.access_token,
            refresh_token: exchanged.refresh_token,
            client_id: secrets.client_id,
            client_secret: secrets.client_secret,
            token_uri: secrets.token_uri,
            scopes: GMAIL_SCOPES.iter().map(|s| s.to_string()).collect(),
            expires_at: expiry_with_margin(epoch_now(), exchanged.expires_in),
        };
        self.tokens
            .persist(&token)
            .map_err(|err| AuthRequired(format!("Could not persist Gmail token: {err}")))?;

        *self.session.lock().expect("session lock poisoned") = None;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pure harvesting helpers
// ────────────────────────────────────────────────────────────────────────────

/// Search query: conjunction of the attachment requirement, the extension
/// allow-list, an optional label term, and an optional free-text term.
fn build_query(default_label: &str, extra_query: Option<&str>, label: Option<&str>) -> String {
    let mut parts = vec![
        "has:attachment".to_string(),
        "(filename:pdf OR filename:docx OR filename:txt)".to_string(),
    ];

    let scoped_label = label.unwrap_or(default_label).trim();
    if !scoped_label.is_empty() {
        parts.push(format!("label:{scoped_label}"));
    }
    if let Some(extra) = extra_query {
        let extra = extra.trim();
        if !extra.is_empty() {
            parts.push(extra.to_string());
        }
    }
    parts.join(" ")
}

fn find_header(headers: &[MessageHeader], key: &str) -> String {
    headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(key))
        .map(|header| header.value.clone())
        .unwrap_or_default()
}

fn is_supported_attachment(filename: &str, mime_type: &str) -> bool {
    if filename.is_empty() {
        return false;
    }
    let lower_filename = filename.to_lowercase();
    let lower_mime = mime_type.to_lowercase();
    SUPPORTED_ATTACHMENTS.iter().any(|(extension, canonical_mime)| {
        lower_filename.ends_with(extension)
            || (lower_mime == *canonical_mime && lower_filename.contains(extension))
    })
}

struct SupportedPart {
    filename: String,
    mime_type: String,
    data: Option<String>,
    attachment_id: Option<String>,
}

/// Walks the part tree (iteratively, depth is unbounded) and collects every
/// part matching the supported-attachment rule. Non-matching parts are
/// silently skipped.
fn collect_supported_parts(payload: &MessagePart) -> Vec<SupportedPart> {
    let mut found = Vec::new();
    let mut stack = vec![payload];

    while let Some(part) = stack.pop() {
        for child in &part.parts {
            stack.push(child);
        }

        let filename = part.filename.clone().unwrap_or_default();
        let mime_type = part
            .mime_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        if !is_supported_attachment(&filename, &mime_type) {
            continue;
        }

        let body = part.body.clone().unwrap_or_default();
        found.push(SupportedPart {
            filename,
            mime_type,
            data: body.data,
            attachment_id: body.attachment_id,
        });
    }

    found
}

/// Gmail body payloads are URL-safe base64 without guaranteed padding; pad to
/// a multiple of 4 before decoding.
fn decode_base64_url(encoded: &str) -> Result<Bytes, base64::DecodeError> {
    let mut padded = encoded.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    URL_SAFE.decode(padded.as_bytes()).map(Bytes::from)
}
