//! License gate for a host application.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tollgate_auth::{KeySetCache, SignedCredentialValidator};
use tollgate_core::{
    CredentialValidator, Error, GateConfig, LicenseMetadata, Result, token_prefix,
};
use tollgate_licensing::RemoteLicenseClient;
use tracing::{info, warn};

/// License details reported for one module of the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleLicense {
    pub org_id: String,
    pub tier: String,
    pub module: String,
}

/// Answer to an access check for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub module_name: String,
    pub access_granted: bool,
    /// Level reported by the license server, when any.
    pub subscription_level: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Default)]
struct GateState {
    token: Option<String>,
    metadata: Option<LicenseMetadata>,
}

/// Validates the host's license once and answers per-module questions.
///
/// [`configure`](Self::configure) checks the signed credential and keeps the
/// resulting metadata; [`check_access`](Self::check_access) asks the license
/// server on every call.
pub struct LicenseGate {
    config: GateConfig,
    validator: Arc<dyn CredentialValidator>,
    licenses: RemoteLicenseClient,
    state: RwLock<GateState>,
}

impl LicenseGate {
    /// Build a gate backed by the configured JWKS endpoint.
    ///
    /// Fails if the configuration is invalid or the first key set fetch
    /// fails. The key set is refreshed in the background while the gate
    /// lives.
    pub async fn connect(config: GateConfig) -> Result<Self> {
        config.validate()?;

        let keys = KeySetCache::connect(config.key_set.clone()).await?;
        let validator = Arc::new(SignedCredentialValidator::new(keys));

        Self::build(config, validator)
    }

    /// Build a gate around any credential validator.
    pub fn with_validator(
        config: GateConfig,
        validator: Arc<dyn CredentialValidator>,
    ) -> Result<Self> {
        config.validate()?;
        Self::build(config, validator)
    }

    // Expects a validated config.
    fn build(config: GateConfig, validator: Arc<dyn CredentialValidator>) -> Result<Self> {
        let licenses = RemoteLicenseClient::new(config.license_server.clone())?;

        Ok(Self {
            config,
            validator,
            licenses,
            state: RwLock::new(GateState::default()),
        })
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Resolve and validate the license token.
    ///
    /// On success the metadata and token are kept for later checks. A failed
    /// attempt leaves any earlier configuration in place.
    pub async fn configure(&self, explicit_token: Option<&str>) -> Result<LicenseMetadata> {
        let token = self.config.resolve_token(explicit_token)?;
        let prefix = token_prefix(&token);

        info!(
            token_prefix = prefix,
            jwks_url = %self.config.key_set.jwks_url,
            "Validating license token"
        );

        let claims = match self.validator.validate(&token).await {
            Ok(claims) => claims,
            Err(e) => {
                warn!(token_prefix = prefix, error = %e, "License token rejected");
                return Err(e);
            }
        };

        let metadata = LicenseMetadata::from(&claims);
        info!(org_id = %metadata.org_id, tier = %metadata.tier, "License token valid");

        let mut state = self.state.write().await;
        state.token = Some(token);
        state.metadata = Some(metadata.clone());

        Ok(metadata)
    }

    /// The metadata from the last successful [`configure`](Self::configure).
    pub async fn metadata(&self) -> Option<LicenseMetadata> {
        self.state.read().await.metadata.clone()
    }

    /// License details for a module. Requires a configured gate.
    pub async fn license_check(&self, module: &str) -> Result<ModuleLicense> {
        let state = self.state.read().await;
        let metadata = state.metadata.as_ref().ok_or_else(|| {
            Error::MissingClaims(
                "the license token could not be validated or no claims were passed".to_string(),
            )
        })?;

        Ok(ModuleLicense {
            org_id: metadata.org_id.clone(),
            tier: metadata.tier.clone(),
            module: module.to_string(),
        })
    }

    /// Ask the license server whether `module` may be used.
    ///
    /// `token_override` replaces the gate's own token. Without either the
    /// token is empty and access is denied. Never fails: every problem is
    /// reported in the decision.
    pub async fn check_access(&self, module: &str, token_override: Option<&str>) -> AccessDecision {
        let token = match token_override {
            Some(token) => token.to_string(),
            None => self.state.read().await.token.clone().unwrap_or_default(),
        };

        let (access_granted, subscription_level, error_message) =
            match self.licenses.validate(&token).await {
                Ok(result) => {
                    let level = Some(result.subscription_level).filter(|l| !l.is_empty());
                    if result.valid {
                        (true, level, None)
                    } else {
                        (false, level, result.error)
                    }
                }
                Err(e) => (false, None, Some(e.to_string())),
            };

        info!(module = module, access_granted, "Access checked");

        AccessDecision {
            module_name: module.to_string(),
            access_granted,
            subscription_level,
            error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_auth::FixedCredentialValidator;
    use tollgate_core::LicenseClaims;

    fn gate(validator: FixedCredentialValidator) -> LicenseGate {
        LicenseGate::with_validator(GateConfig::default(), Arc::new(validator)).unwrap()
    }

    #[tokio::test]
    async fn test_license_check_requires_configuration() {
        let gate = gate(FixedCredentialValidator::new());

        let err = gate.license_check("network").await.unwrap_err();
        assert!(matches!(err, Error::MissingClaims(_)));
        assert!(gate.metadata().await.is_none());
    }

    #[tokio::test]
    async fn test_configure_then_license_check() {
        let claims = LicenseClaims::new("acme", "tollgate", "pro");
        let gate = gate(FixedCredentialValidator::new().accept("tok-123", claims));

        let metadata = gate.configure(Some("tok-123")).await.unwrap();
        assert_eq!(metadata.org_id, "acme");
        assert_eq!(metadata.tier, "pro");

        let license = gate.license_check("network").await.unwrap();
        assert_eq!(
            license,
            ModuleLicense {
                org_id: "acme".to_string(),
                tier: "pro".to_string(),
                module: "network".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_failed_configure_keeps_gate_unconfigured() {
        let gate = gate(FixedCredentialValidator::new());

        assert!(gate.configure(Some("tok-unknown")).await.is_err());
        assert!(gate.license_check("network").await.is_err());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = GateConfig::default()
            .with_license_server(tollgate_core::LicenseServerConfig::new("not a url"));
        let result = LicenseGate::with_validator(config, Arc::new(FixedCredentialValidator::new()));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
