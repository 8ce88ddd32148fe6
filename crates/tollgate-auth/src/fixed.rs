//! Credential validator backed by a fixed table, for tests and local setups.

use async_trait::async_trait;
use std::collections::HashMap;
use tollgate_core::{CredentialValidator, Error, LicenseClaims, Result};

/// Accepts exactly the credentials it was given and rejects everything else.
#[derive(Debug, Clone, Default)]
pub struct FixedCredentialValidator {
    accepted: HashMap<String, LicenseClaims>,
}

impl FixedCredentialValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `credential`, answering with `claims`.
    pub fn accept(mut self, credential: impl Into<String>, claims: LicenseClaims) -> Self {
        self.accepted.insert(credential.into(), claims);
        self
    }
}

#[async_trait]
impl CredentialValidator for FixedCredentialValidator {
    async fn validate(&self, credential: &str) -> Result<LicenseClaims> {
        self.accepted
            .get(credential)
            .cloned()
            .ok_or_else(|| Error::Parse("unrecognised credential".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_validator() {
        let validator = FixedCredentialValidator::new()
            .accept("valid-token", LicenseClaims::new("test-org", "gate", "pro"));

        let claims = validator.validate("valid-token").await.unwrap();
        assert_eq!(claims.org_id, "test-org");
        assert_eq!(claims.tier, "pro");

        assert!(matches!(
            validator.validate("malformed-token").await,
            Err(Error::Parse(_))
        ));
    }
}
