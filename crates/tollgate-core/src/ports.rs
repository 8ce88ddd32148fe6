//! Port traits between the host integration and the validators.

use crate::Result;
use crate::claims::LicenseClaims;
use async_trait::async_trait;

/// Validates a raw bearer credential and yields its license claims.
///
/// Implemented by the signed-credential validator and by test doubles, so
/// hosts can swap the real check out without touching their own code.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    /// Validate a credential.
    async fn validate(&self, credential: &str) -> Result<LicenseClaims>;
}
