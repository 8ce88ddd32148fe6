//! Configuration for the validators and the host-facing gate.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable holding the license token.
pub const ENV_TOKEN: &str = "TOLLGATE_TOKEN";
/// Environment variable overriding the JWKS endpoint.
pub const ENV_JWKS_URL: &str = "TOLLGATE_JWKS_URL";
/// Environment variable overriding the license validation endpoint.
pub const ENV_LICENSE_URL: &str = "TOLLGATE_LICENSE_URL";
/// Environment variable overriding the network timeout, in seconds.
pub const ENV_FETCH_TIMEOUT_SECS: &str = "TOLLGATE_FETCH_TIMEOUT_SECS";
/// Environment variable overriding the key set refresh interval, in seconds.
pub const ENV_REFRESH_INTERVAL_SECS: &str = "TOLLGATE_REFRESH_INTERVAL_SECS";

/// Configuration for the key set cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySetConfig {
    /// JWKS document URL.
    #[serde(default = "default_jwks_url")]
    pub jwks_url: String,
    /// Timeout for a single key set fetch.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub fetch_timeout: Duration,
    /// Interval between background refreshes.
    #[serde(default = "default_refresh_interval", with = "duration_secs")]
    pub refresh_interval: Duration,
    /// Refresh once on demand when a credential names an unknown key.
    #[serde(default = "default_true")]
    pub refresh_unknown_kid: bool,
}

fn default_jwks_url() -> String {
    "https://license.tollgate.dev/.well-known/jwks.json".to_string()
}

fn default_license_url() -> String {
    "https://license.tollgate.dev/validate".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(3600)
}

fn default_true() -> bool {
    true
}

impl Default for KeySetConfig {
    fn default() -> Self {
        Self {
            jwks_url: default_jwks_url(),
            fetch_timeout: default_timeout(),
            refresh_interval: default_refresh_interval(),
            refresh_unknown_kid: true,
        }
    }
}

impl KeySetConfig {
    /// Create a config for the given JWKS URL.
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            ..Default::default()
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_refresh_unknown_kid(mut self, enable: bool) -> Self {
        self.refresh_unknown_kid = enable;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_url("jwks_url", &self.jwks_url)?;
        check_nonzero("fetch_timeout", self.fetch_timeout)?;
        check_nonzero("refresh_interval", self.refresh_interval)
    }
}

/// Configuration for the remote license server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseServerConfig {
    /// Validation endpoint URL.
    #[serde(default = "default_license_url")]
    pub api_url: String,
    /// Request timeout.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for LicenseServerConfig {
    fn default() -> Self {
        Self {
            api_url: default_license_url(),
            timeout: default_timeout(),
        }
    }
}

impl LicenseServerConfig {
    /// Create a config for the given validation endpoint.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_url("api_url", &self.api_url)?;
        check_nonzero("timeout", self.timeout)
    }
}

/// Top-level configuration of a license gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// License token. Falls back to `TOLLGATE_TOKEN` when unset.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub key_set: KeySetConfig,
    #[serde(default)]
    pub license_server: LicenseServerConfig,
}

impl GateConfig {
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_key_set(mut self, key_set: KeySetConfig) -> Self {
        self.key_set = key_set;
        self
    }

    pub fn with_license_server(mut self, license_server: LicenseServerConfig) -> Self {
        self.license_server = license_server;
        self
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Override fields from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(token) = var(ENV_TOKEN) {
            self.token = Some(token);
        }
        if let Some(url) = var(ENV_JWKS_URL) {
            self.key_set.jwks_url = url;
        }
        if let Some(url) = var(ENV_LICENSE_URL) {
            self.license_server.api_url = url;
        }
        if let Some(raw) = var(ENV_FETCH_TIMEOUT_SECS) {
            let timeout = parse_secs(ENV_FETCH_TIMEOUT_SECS, &raw)?;
            self.key_set.fetch_timeout = timeout;
            self.license_server.timeout = timeout;
        }
        if let Some(raw) = var(ENV_REFRESH_INTERVAL_SECS) {
            self.key_set.refresh_interval = parse_secs(ENV_REFRESH_INTERVAL_SECS, &raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.key_set.validate()?;
        self.license_server.validate()
    }

    /// Pick the token to validate: an explicit value wins over the
    /// configured one, which wins over `TOLLGATE_TOKEN`.
    pub fn resolve_token(&self, explicit: Option<&str>) -> Result<String> {
        self.resolve_token_from(explicit, |name| std::env::var(name).ok())
    }

    pub fn resolve_token_from<F>(&self, explicit: Option<&str>, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        explicit
            .map(str::to_string)
            .or_else(|| self.token.clone())
            .or_else(|| lookup(ENV_TOKEN))
            .filter(|token| !token.is_empty())
            .ok_or(Error::MissingCredential)
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| Error::InvalidConfig(format!("{} '{}': {}", field, value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidConfig(format!(
            "{} must be http or https, got '{}'",
            field, other
        ))),
    }
}

fn check_nonzero(field: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(Error::InvalidConfig(format!("{} must be greater than zero", field)));
    }
    Ok(())
}

fn parse_secs(name: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| Error::InvalidConfig(format!("{}='{}': {}", name, raw, e)))
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
