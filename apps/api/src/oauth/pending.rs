use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

use crate::oauth::AuthRequired;

/// Default lifetime of a pending authorization before it becomes unusable.
pub const DEFAULT_STATE_TTL: Duration = Duration::from_secs(900);

/// Random bytes per state token, before base64url encoding.
const STATE_TOKEN_BYTES: usize = 24;

struct PendingAuthorization {
    redirect_uri: String,
    created_at: Instant,
}

/// TTL-bounded map from an opaque state token to the redirect target that
/// issued it. Each connector owns one registry; all mutation goes through a
/// single mutex so two concurrent callback deliveries cannot consume the same
/// state twice. Expired entries are purged opportunistically on every access,
/// bounding memory without a background timer.
pub struct PendingAuthRegistry {
    provider: &'static str,
    ttl: Duration,
    entries: Mutex<HashMap<String, PendingAuthorization>>,
}

impl PendingAuthRegistry {
    pub fn new(provider: &'static str) -> Self {
        Self::with_ttl(provider, DEFAULT_STATE_TTL)
    }

    pub fn with_ttl(provider: &'static str, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Records a fresh cryptographically random state for `redirect_uri` and
    /// returns it.
    pub fn issue(&self, redirect_uri: &str) -> String {
        let mut entries = self.entries.lock().expect("pending registry lock poisoned");
        Self::purge_expired(&mut entries, self.ttl);

        let state = generate_state_token();
        entries.insert(
            state.clone(),
            PendingAuthorization {
                redirect_uri: redirect_uri.to_string(),
                created_at: Instant::now(),
            },
        );
        state
    }

    /// Single-use lookup: on a match the entry is removed and the callback may
    /// proceed to the code exchange. Unknown or expired states fail
    /// `AuthRequired`; a redirect mismatch also discards the entry so the
    /// state cannot be replayed with the recorded target afterwards.
    pub fn consume(&self, state: &str, redirect_uri: &str) -> Result<(), AuthRequired> {
        let mut entries = self.entries.lock().expect("pending registry lock poisoned");
        Self::purge_expired(&mut entries, self.ttl);

        let pending = entries.get(state).ok_or_else(|| {
            AuthRequired(format!(
                "{} OAuth session expired. Try connecting again.",
                self.provider
            ))
        })?;

        if pending.redirect_uri != redirect_uri {
            entries.remove(state);
            return Err(AuthRequired(format!(
                "{} OAuth redirect mismatch.",
                self.provider
            )));
        }

        entries.remove(state);
        Ok(())
    }

    fn purge_expired(entries: &mut HashMap<String, PendingAuthorization>, ttl: Duration) {
        let now = Instant::now();
        entries.retain(|_, pending| now.duration_since(pending.created_at) <= ttl);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().expect("pending registry lock poisoned").len()
    }
}

fn generate_state_token() -> String {
    let mut bytes = [0u8; STATE_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_then_consume_succeeds_once() {
        let registry = PendingAuthRegistry::new("LinkedIn");
        let state = registry.issue("http://localhost:8000/callback");

        assert!(registry
            .consume(&state, "http://localhost:8000/callback")
            .is_ok());
        // Second delivery of the same callback must fail: single-use.
        assert!(registry
            .consume(&state, "http://localhost:8000/callback")
            .is_err());
    }

    #[test]
    fn test_unknown_state_fails() {
        let registry = PendingAuthRegistry::new("LinkedIn");
        assert!(registry.consume("nope", "http://localhost:8000/callback").is_err());
    }

    #[test]
    fn test_redirect_mismatch_discards_entry() {
        let registry = PendingAuthRegistry::new("Gmail");
        let state = registry.issue("http://localhost:8000/callback");

        assert!(registry.consume(&state, "http://evil.example/callback").is_err());
        // The entry is gone: replaying with the recorded target also fails.
        assert!(registry
            .consume(&state, "http://localhost:8000/callback")
            .is_err());
    }

    #[test]
    fn test_expired_entries_unusable_after_next_access() {
        let registry = PendingAuthRegistry::with_ttl("Gmail", Duration::ZERO);
        let state = registry.issue("http://localhost:8000/callback");
        std::thread::sleep(Duration::from_millis(5));

        assert!(registry
            .consume(&state, "http://localhost:8000/callback")
            .is_err());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_issue_purges_stale_entries() {
        let registry = PendingAuthRegistry::with_ttl("Gmail", Duration::ZERO);
        registry.issue("http://localhost:8000/callback");
        std::thread::sleep(Duration::from_millis(5));

        registry.issue("http://localhost:8000/callback");
        // Only the freshly issued state survives the opportunistic purge.
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_state_tokens_are_urlsafe_and_distinct() {
        let a = generate_state_token();
        let b = generate_state_token();
        assert_ne!(a, b);
        assert!(!a.contains('+'));
        assert!(!a.contains('/'));
        assert!(!a.contains('='));
    }
}
