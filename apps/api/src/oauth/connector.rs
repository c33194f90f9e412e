use async_trait::async_trait;

use crate::oauth::AuthRequired;

/// The capability contract every provider connector implements. The two
/// providers diverge in handshake details (refresh support, token shape), so
/// callers that only need the authorization lifecycle — the OAuth endpoints
/// and the combined-import precondition — work against this trait and stay
/// provider-agnostic. Resource fetches (mailbox search, profile read) are
/// variant-specific methods on the concrete clients.
#[async_trait]
pub trait OAuthConnector: Send + Sync {
    /// Human-readable provider name used in error messages and the combined
    /// import precondition.
    fn provider_name(&self) -> &'static str;

    /// Non-interactive connectivity probe: true only if a valid, non-expired
    /// token is obtainable right now. `AuthRequired` is swallowed into
    /// `false`, never surfaced.
    async fn is_connected(&self) -> bool;

    /// Issues a fresh pending authorization and returns the provider
    /// authorization URL to send the browser to.
    async fn start_browser_oauth(&self, redirect_uri: &str) -> Result<String, AuthRequired>;

    /// Completes the browser flow: validates the state against the pending
    /// registry, exchanges the code, persists the token. Any failure surfaces
    /// as `AuthRequired` and leaves no token behind.
    async fn finish_browser_oauth(
        &self,
        state: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<(), AuthRequired>;
}
