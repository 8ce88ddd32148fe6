//! Immutable key sets and the key source port.

use crate::jwk::{Jwks, VerificationKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tollgate_core::{Error, Result};
use tracing::warn;

/// Resolves a key identifier to verification key material.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Look up a key by its `kid`.
    async fn lookup(&self, kid: &str) -> Result<Arc<VerificationKey>>;
}

/// A published set of verification keys.
///
/// Never modified after construction; a refresh builds a new set and
/// replaces the old one wholesale.
#[derive(Debug, Clone)]
pub struct KeySet {
    keys: HashMap<String, Arc<VerificationKey>>,
    fetched_at: Option<DateTime<Utc>>,
    refresh_interval: Duration,
}

impl KeySet {
    /// An empty set that has never been fetched.
    pub fn empty(refresh_interval: Duration) -> Self {
        Self {
            keys: HashMap::new(),
            fetched_at: None,
            refresh_interval,
        }
    }

    /// Build a set from a key document fetched now.
    ///
    /// Keys that cannot be used for verification are skipped; the first key
    /// wins when a `kid` is repeated.
    pub fn from_jwks(jwks: &Jwks, refresh_interval: Duration) -> Self {
        let mut keys = HashMap::with_capacity(jwks.keys.len());

        for jwk in &jwks.keys {
            match jwk.to_verification_key() {
                Ok(key) => {
                    if keys.contains_key(key.kid()) {
                        warn!(kid = %key.kid(), "Duplicate key id in key set, keeping the first");
                        continue;
                    }
                    keys.insert(key.kid().to_string(), Arc::new(key));
                }
                Err(e) => warn!(error = %e, "Skipping key"),
            }
        }

        Self {
            keys,
            fetched_at: Some(Utc::now()),
            refresh_interval,
        }
    }

    pub fn get(&self, kid: &str) -> Option<Arc<VerificationKey>> {
        self.keys.get(kid).cloned()
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key identifiers in this set, sorted.
    pub fn key_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// When the next scheduled refresh is due, if the set was ever fetched.
    pub fn next_refresh_at(&self) -> Option<DateTime<Utc>> {
        let interval = chrono::Duration::from_std(self.refresh_interval).ok()?;
        self.fetched_at.map(|at| at + interval)
    }
}

/// A fixed set never refreshes; an unknown `kid` fails straight away.
#[async_trait]
impl KeySource for KeySet {
    async fn lookup(&self, kid: &str) -> Result<Arc<VerificationKey>> {
        self.get(kid)
            .ok_or_else(|| Error::KeyResolution(format!("key '{}' not found in key set", kid)))
    }
}
