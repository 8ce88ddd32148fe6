//! Signed license credential validation.

use crate::jwk::VerificationKey;
use crate::key_set::KeySource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Header, Validation, decode, decode_header};
use std::sync::Arc;
use tollgate_core::{CredentialValidator, Error, LicenseClaims, Result, token_prefix};
use tracing::{debug, info};

/// Verifies signed license credentials against a key source.
///
/// Runs parse, key resolution, signature verification and expiry checks in
/// that order and stops at the first failure. Registered claims are not
/// validated by the signature step; expiry is checked separately so each
/// failure maps to exactly one error.
#[derive(Clone)]
pub struct SignedCredentialValidator {
    keys: Arc<dyn KeySource>,
}

impl SignedCredentialValidator {
    pub fn new(keys: Arc<dyn KeySource>) -> Self {
        Self { keys }
    }

    /// Verify a credential against the current time.
    pub async fn verify(&self, token: &str) -> Result<LicenseClaims> {
        self.verify_at(token, Utc::now()).await
    }

    /// Verify a credential, judging expiry against `now`.
    pub async fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<LicenseClaims> {
        let header = parse(token)?;

        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| Error::KeyResolution("credential header has no 'kid'".to_string()))?;
        let key = self.keys.lookup(kid).await?;

        let claims = verify_signature(token, &header, &key)?;
        let expires_at = claims.check_expiry(now)?;

        info!(
            token_prefix = token_prefix(token),
            org_id = %claims.org_id,
            tier = %claims.tier,
            expires_at = %expires_at,
            "License credential verified"
        );
        Ok(claims)
    }
}

#[async_trait]
impl CredentialValidator for SignedCredentialValidator {
    async fn validate(&self, credential: &str) -> Result<LicenseClaims> {
        self.verify(credential).await.inspect_err(|e| {
            debug!(token_prefix = token_prefix(credential), error = %e, "License credential rejected");
        })
    }
}

fn parse(token: &str) -> Result<Header> {
    let segments = token.split('.').count();
    if segments != 3 {
        return Err(Error::Parse(format!(
            "expected 3 dot-separated segments, found {}",
            segments
        )));
    }
    decode_header(token).map_err(|e| Error::Parse(e.to_string()))
}

fn verify_signature(token: &str, header: &Header, key: &VerificationKey) -> Result<LicenseClaims> {
    if header.alg != key.algorithm() {
        return Err(Error::Signature(format!(
            "credential declares {:?} but key '{}' is {:?}",
            header.alg,
            key.kid(),
            key.algorithm()
        )));
    }

    let mut validation = Validation::new(key.algorithm());
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<LicenseClaims>(token, key.decoding_key(), &validation)
        .map(|data| data.claims)
        .map_err(classify)
}

fn classify(err: jsonwebtoken::errors::Error) -> Error {
    match err.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::InvalidKeyFormat => Error::Signature(err.to_string()),
        _ => Error::Parse(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_wrong_segment_count() {
        assert!(matches!(parse("not-a-token"), Err(Error::Parse(_))));
        assert!(matches!(parse("a.b.c.d"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_rejects_garbage_header() {
        assert!(matches!(parse("%%%.e30.sig"), Err(Error::Parse(_))));
        // "e30" is base64url for "{}": valid JSON, but no "alg".
        assert!(matches!(parse("e30.e30.sig"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_classify() {
        let signature = jsonwebtoken::errors::Error::from(ErrorKind::InvalidSignature);
        assert!(matches!(classify(signature), Error::Signature(_)));

        let token = jsonwebtoken::errors::Error::from(ErrorKind::InvalidToken);
        assert!(matches!(classify(token), Error::Parse(_)));
    }
}
