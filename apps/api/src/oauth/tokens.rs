use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Why a stored token could not be loaded. Connectors translate these into
/// provider-specific `AuthRequired` instructions.
#[derive(Debug, Error)]
pub enum TokenLoadError {
    #[error("token file not found")]
    Missing,

    #[error("token file is invalid: {0}")]
    Invalid(String),
}

/// JSON-file persistence for one provider's token.
///
/// Writes are commit-or-nothing: the payload is serialized to a temp file in
/// the destination directory and atomically renamed over the old token, so a
/// failed exchange or a crash mid-write never leaves a partial token behind.
pub struct TokenStore<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> TokenStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn load(&self) -> Result<T, TokenLoadError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(TokenLoadError::Missing)
            }
            Err(err) => return Err(TokenLoadError::Invalid(err.to_string())),
        };
        serde_json::from_str(&raw).map_err(|err| TokenLoadError::Invalid(err.to_string()))
    }

    pub fn persist(&self, token: &T) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating token directory {}", parent.display()))?;
        }

        let payload = serde_json::to_vec_pretty(token).context("serializing token")?;
        let mut tmp = tempfile::NamedTempFile::new_in(
            if parent.as_os_str().is_empty() { Path::new(".") } else { parent },
        )
        .context("creating temp token file")?;
        tmp.write_all(&payload).context("writing token")?;
        tmp.persist(&self.path)
            .with_context(|| format!("committing token to {}", self.path.display()))?;
        Ok(())
    }
}

/// Current time as whole seconds since the Unix epoch.
pub fn epoch_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Expiry instant for a token that reports `expires_in` seconds of validity,
/// with a safety margin subtracted so the token is retired before the
/// provider actually rejects it: `now + max(60, expires_in - 60)`.
pub fn expiry_with_margin(now: u64, expires_in: i64) -> u64 {
    now + (expires_in - 60).max(60) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct FakeToken {
        access_token: String,
        expires_at: u64,
    }

    #[test]
    fn test_persist_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store: TokenStore<FakeToken> = TokenStore::new(dir.path().join("token.json"));

        let token = FakeToken {
            access_token: "abc".to_string(),
            expires_at: 1234,
        };
        store.persist(&token).unwrap();
        assert_eq!(store.load().unwrap(), token);
    }

    #[test]
    fn test_missing_file_is_distinct_from_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let store: TokenStore<FakeToken> = TokenStore::new(&path);
        assert!(matches!(store.load(), Err(TokenLoadError::Missing)));

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(store.load(), Err(TokenLoadError::Invalid(_))));
    }

    #[test]
    fn test_persist_overwrites_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let store: TokenStore<FakeToken> = TokenStore::new(dir.path().join("token.json"));

        store
            .persist(&FakeToken { access_token: "old".into(), expires_at: 1 })
            .unwrap();
        store
            .persist(&FakeToken { access_token: "new".into(), expires_at: 2 })
            .unwrap();
        assert_eq!(store.load().unwrap().access_token, "new");
    }

    #[test]
    fn test_expiry_margin_subtracts_sixty_seconds() {
        assert_eq!(expiry_with_margin(1000, 3600), 1000 + 3540);
    }

    #[test]
    fn test_expiry_margin_floors_at_sixty_seconds() {
        assert_eq!(expiry_with_margin(1000, 30), 1060);
        assert_eq!(expiry_with_margin(1000, -10), 1060);
    }
}
