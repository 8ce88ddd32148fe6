//! Error types for Tollgate.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Signed credential errors
    #[error("token parse error: {0}")]
    Parse(String),

    #[error("unable to resolve signing key: {0}")]
    KeyResolution(String),

    #[error("signature verification failed: {0}")]
    Signature(String),

    #[error("token missing 'exp' field")]
    MissingExpiry,

    #[error("token expired at {}", rfc3339(.expired_at))]
    Expired { expired_at: DateTime<Utc> },

    // Key set errors
    #[error("failed to load JWKS: {0}")]
    Fetch(String),

    // License errors
    #[error("empty token")]
    EmptyCredential,

    #[error("license server unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("{0}")]
    InvalidLicense(String),

    // Host integration errors
    #[error("no license token was provided")]
    MissingCredential,

    #[error("license claims are not available: {0}")]
    MissingClaims(String),

    // Configuration errors
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error came out of a credential check, as opposed to
    /// configuration or infrastructure.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(
            self,
            Error::Parse(_)
                | Error::KeyResolution(_)
                | Error::Signature(_)
                | Error::MissingExpiry
                | Error::Expired { .. }
                | Error::EmptyCredential
                | Error::InvalidLicense(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Formats a timestamp the way every expiry message reports it.
pub fn rfc3339(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
