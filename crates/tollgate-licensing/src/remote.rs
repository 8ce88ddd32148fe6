//! License server client with a static fallback.

use crate::fallback::FallbackTable;
use crate::types::{RemoteVerdict, ValidationResult, ValidationSource};
use reqwest::header::AUTHORIZATION;
use tollgate_core::{Error, LicenseServerConfig, Result, token_prefix};
use tracing::{debug, info, warn};

/// Failure message when the server rejects a token without saying why.
pub const INVALID_LICENSE: &str = "invalid license";

/// Failure message when neither the server nor the fallback table accept a token.
pub const INVALID_OR_EXPIRED: &str = "invalid or expired license token";

/// Client for the remote license server.
///
/// The server is best-effort: when it cannot be reached or answers with a
/// body that does not parse, the token is looked up in the fallback table
/// instead. Results are never cached.
pub struct RemoteLicenseClient {
    config: LicenseServerConfig,
    client: reqwest::Client,
    fallback: &'static FallbackTable,
}

impl RemoteLicenseClient {
    /// Create a new license client.
    pub fn new(config: LicenseServerConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            fallback: FallbackTable::builtin(),
        })
    }

    pub fn config(&self) -> &LicenseServerConfig {
        &self.config
    }

    /// Validate a license token.
    ///
    /// Only an empty token is an `Err`; every other outcome, including an
    /// unknown token, is a [`ValidationResult`] with `valid` set accordingly.
    pub async fn validate(&self, token: &str) -> Result<ValidationResult> {
        if token.is_empty() {
            return Err(Error::EmptyCredential);
        }

        info!(key_prefix = token_prefix(token), "Validating license");

        match self.ask_server(token).await {
            Ok(verdict) => Ok(self.judge(verdict)),
            Err(e) => {
                warn!(error = %e, "License server unusable, using fallback table");
                Ok(self.lookup_fallback(token))
            }
        }
    }

    /// One round trip to the license server.
    ///
    /// Any transport failure or unparsable body is `RemoteUnavailable`. The
    /// status code is not consulted; a parsable body, `null` included, is a
    /// verdict.
    async fn ask_server(&self, token: &str) -> Result<RemoteVerdict> {
        let response = self
            .client
            .get(&self.config.api_url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| Error::RemoteUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::RemoteUnavailable(format!("reading response: {}", e)))?;

        RemoteVerdict::from_body(&body).map_err(|e| {
            Error::RemoteUnavailable(format!("unrecognised response (status {}): {}", status, e))
        })
    }

    fn judge(&self, verdict: RemoteVerdict) -> ValidationResult {
        let subscription_level = verdict.subscription_level.unwrap_or_default();

        if verdict.valid {
            info!(subscription_level = %subscription_level, "License validated");
            return ValidationResult::success(subscription_level, ValidationSource::Remote);
        }

        let error = verdict
            .error
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| INVALID_LICENSE.to_string());
        warn!(error = %error, "License rejected by server");

        ValidationResult {
            valid: false,
            subscription_level,
            error: Some(error),
            source: ValidationSource::Remote,
        }
    }

    fn lookup_fallback(&self, token: &str) -> ValidationResult {
        match self.fallback.lookup(token) {
            Some(level) => {
                debug!(subscription_level = %level, "Token matched fallback table");
                ValidationResult::success(level, ValidationSource::Fallback)
            }
            None => ValidationResult::failure(INVALID_OR_EXPIRED, ValidationSource::Fallback),
        }
    }
}
