//! Shared OAuth plumbing: the connector capability contract, the TTL-bounded
//! pending-authorization registry, and commit-or-nothing token persistence.
//! One connector instance exists per provider; both are built from the same
//! pieces here.

pub mod connector;
pub mod handlers;
pub mod pending;
pub mod tokens;

use thiserror::Error;

pub use connector::OAuthConnector;

/// Provider credentials are missing, expired, or invalid. Carries a
/// human-readable instruction; always recoverable by re-running the
/// authorization flow. Transport failures during provider calls fold into
/// this error rather than leaking raw network errors.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct AuthRequired(pub String);
