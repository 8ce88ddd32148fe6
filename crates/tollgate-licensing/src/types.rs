//! License validation result types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tollgate_core::{Error, Result};

/// Which trust source produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationSource {
    /// The remote license server answered.
    #[default]
    Remote,
    /// The remote server could not be used; the fallback table answered.
    Fallback,
}

/// Outcome of a license validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the license is valid.
    pub valid: bool,
    /// Subscription level, when known (also on some failures).
    #[serde(default)]
    pub subscription_level: String,
    /// Reason for a failed validation.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(skip)]
    pub source: ValidationSource,
}

impl ValidationResult {
    pub fn success(subscription_level: impl Into<String>, source: ValidationSource) -> Self {
        Self {
            valid: true,
            subscription_level: subscription_level.into(),
            error: None,
            source,
        }
    }

    pub fn failure(error: impl Into<String>, source: ValidationSource) -> Self {
        Self {
            valid: false,
            subscription_level: String::new(),
            error: Some(error.into()),
            source,
        }
    }

    /// Turn a negative result into [`Error::InvalidLicense`].
    pub fn ensure_valid(self) -> Result<Self> {
        if self.valid {
            return Ok(self);
        }
        Err(Error::InvalidLicense(
            self.error
                .unwrap_or_else(|| crate::remote::INVALID_LICENSE.to_string()),
        ))
    }
}

/// Response body of the license server.
///
/// Every field is optional on the wire; absent ones take their zero value.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RemoteVerdict {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub subscription_level: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RemoteVerdict {
    /// Parse a response body.
    ///
    /// A literal `null` is an empty verdict and object keys match without
    /// regard to case; a later key overrides an earlier one. Any other JSON
    /// shape is an error.
    pub fn from_body(body: &[u8]) -> serde_json::Result<Self> {
        match serde_json::from_slice(body)? {
            Value::Null => Ok(Self::default()),
            Value::Object(fields) => {
                let folded: Map<String, Value> = fields
                    .into_iter()
                    .map(|(key, value)| (key.to_lowercase(), value))
                    .collect();
                serde_json::from_value(Value::Object(folded))
            }
            other => serde_json::from_value(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_valid() {
        let ok = ValidationResult::success("basic", ValidationSource::Fallback);
        assert_eq!(ok.clone().ensure_valid().unwrap(), ok);

        let err = ValidationResult::failure("license revoked", ValidationSource::Remote)
            .ensure_valid()
            .unwrap_err();
        assert_eq!(err.to_string(), "license revoked");
    }

    #[test]
    fn test_serialized_shape() {
        let result = ValidationResult::failure("invalid or expired license token", ValidationSource::Fallback);
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "valid": false,
                "subscription_level": "",
                "error": "invalid or expired license token"
            })
        );
    }

    #[test]
    fn test_verdict_is_lenient() {
        let verdict: RemoteVerdict = serde_json::from_str("{}").unwrap();
        assert!(!verdict.valid);
        assert!(verdict.subscription_level.is_none());

        let verdict: RemoteVerdict =
            serde_json::from_str(r#"{"valid":true,"subscription_level":null,"extra":1}"#).unwrap();
        assert!(verdict.valid);

        assert!(serde_json::from_str::<RemoteVerdict>(r#"{"valid":"yes"}"#).is_err());
        assert!(serde_json::from_str::<RemoteVerdict>("[]").is_err());
    }

    #[test]
    fn test_null_body_is_empty_verdict() {
        let verdict = RemoteVerdict::from_body(b"null").unwrap();
        assert!(!verdict.valid);
        assert!(verdict.subscription_level.is_none());
        assert!(verdict.error.is_none());

        let verdict = RemoteVerdict::from_body(b"  null\n").unwrap();
        assert!(!verdict.valid);
    }

    #[test]
    fn test_body_keys_match_any_case() {
        let verdict = RemoteVerdict::from_body(
            br#"{"Valid":true,"SUBSCRIPTION_LEVEL":"pro","Error":"ignored"}"#,
        )
        .unwrap();
        assert!(verdict.valid);
        assert_eq!(verdict.subscription_level.as_deref(), Some("pro"));
        assert_eq!(verdict.error.as_deref(), Some("ignored"));

        let verdict = RemoteVerdict::from_body(br#"{"valid":true,"VALID":false}"#).unwrap();
        assert!(!verdict.valid);
    }

    #[test]
    fn test_other_bodies_are_rejected() {
        let bodies: [&str; 7] = ["", "[]", "true", "42", r#""ok""#, "<html></html>", r#"{"valid":"yes"}"#];
        for body in bodies {
            assert!(
                RemoteVerdict::from_body(body.as_bytes()).is_err(),
                "body {:?}",
                body
            );
        }
    }
}
