//! License claims carried by signed credentials.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Decoded payload of a verified license credential.
///
/// Timestamps are Unix-epoch seconds, exactly as they travel on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseClaims {
    /// Organization the license was issued to.
    #[serde(default)]
    pub org_id: String,
    /// Licensed product.
    #[serde(default)]
    pub product: String,
    /// Subscription tier (e.g. `pro`, `enterprise`).
    #[serde(default)]
    pub tier: String,
    #[serde(rename = "iat", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,
    /// Required; a credential without it is rejected.
    #[serde(rename = "exp", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// End of the grace period. Carried through, not enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_until: Option<i64>,
}

impl LicenseClaims {
    /// Create claims issued now, without an expiry.
    pub fn new(org_id: impl Into<String>, product: impl Into<String>, tier: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            product: product.into(),
            tier: tier.into(),
            issued_at: Some(Utc::now().timestamp()),
            expires_at: None,
            grace_until: None,
        }
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at.timestamp());
        self
    }

    pub fn expires_in(self, ttl: Duration) -> Self {
        self.expires_at(Utc::now() + ttl)
    }

    pub fn grace_until(mut self, at: DateTime<Utc>) -> Self {
        self.grace_until = Some(at.timestamp());
        self
    }

    pub fn issued_at_utc(&self) -> Option<DateTime<Utc>> {
        self.issued_at.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        self.expires_at.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    pub fn grace_until_utc(&self) -> Option<DateTime<Utc>> {
        self.grace_until.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Enforce the expiry claim against `now`.
    ///
    /// The claim must be present; a credential is expired once `now` is
    /// strictly after it.
    pub fn check_expiry(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let secs = self.expires_at.ok_or(Error::MissingExpiry)?;
        let expired_at = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| Error::Parse(format!("'exp' out of range: {}", secs)))?;

        if now > expired_at {
            return Err(Error::Expired { expired_at });
        }
        Ok(expired_at)
    }
}

/// Minimal license facts handed to downstream checks once a credential has
/// been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseMetadata {
    pub org_id: String,
    pub tier: String,
}

impl From<&LicenseClaims> for LicenseMetadata {
    fn from(claims: &LicenseClaims) -> Self {
        Self {
            org_id: claims.org_id.clone(),
            tier: claims.tier.clone(),
        }
    }
}

/// Leading characters of a credential that are safe to log.
pub fn token_prefix(token: &str) -> &str {
    match token.char_indices().nth(6) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wire_names() {
        let claims: LicenseClaims = serde_json::from_str(
            r#"{"org_id":"acme","product":"gate","tier":"pro","iat":1700000000,"exp":1700003600}"#,
        )
        .unwrap();

        assert_eq!(claims.org_id, "acme");
        assert_eq!(claims.issued_at, Some(1_700_000_000));
        assert_eq!(claims.expires_at, Some(1_700_003_600));
        assert_eq!(claims.grace_until, None);
    }

    #[test]
    fn test_missing_expiry_is_rejected() {
        let claims = LicenseClaims::new("acme", "gate", "pro");
        assert!(matches!(claims.check_expiry(Utc::now()), Err(Error::MissingExpiry)));
    }

    #[test]
    fn test_expired_carries_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let claims = LicenseClaims::new("acme", "gate", "pro").expires_at(at);

        match claims.check_expiry(at + Duration::seconds(1)) {
            Err(Error::Expired { expired_at }) => assert_eq!(expired_at, at),
            other => panic!("expected expiry error, got {:?}", other),
        }
    }

    #[test]
    fn test_expiry_boundary_is_still_valid() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let claims = LicenseClaims::new("acme", "gate", "pro").expires_at(at);
        assert_eq!(claims.check_expiry(at).unwrap(), at);
    }

    #[test]
    fn test_out_of_range_expiry() {
        let mut claims = LicenseClaims::new("acme", "gate", "pro");
        claims.expires_at = Some(i64::MAX);
        assert!(matches!(claims.check_expiry(Utc::now()), Err(Error::Parse(_))));
    }

    #[test]
    fn test_metadata_from_claims() {
        let claims = LicenseClaims::new("acme", "gate", "pro");
        let metadata = LicenseMetadata::from(&claims);
        assert_eq!(
            metadata,
            LicenseMetadata {
                org_id: "acme".to_string(),
                tier: "pro".to_string()
            }
        );
    }

    #[test]
    fn test_token_prefix() {
        assert_eq!(token_prefix("valid-license-token"), "valid-");
        assert_eq!(token_prefix("abc"), "abc");
        assert_eq!(token_prefix("ééééééééé"), "éééééé");
    }
}
