//! Remote key set cache with background refresh.
//!
//! The current [`KeySet`] lives in a `watch` channel as an `Arc`. Readers
//! clone the `Arc` and never wait on the network; a refresh builds a whole
//! new set and publishes it with a single replace, so a lookup sees either
//! the old set or the new one.
//!
//! Refreshes are serialized by a mutex. A failed refresh leaves the last
//! good set in place and is handed to the refresh error handler.

use crate::jwk::{Jwks, VerificationKey};
use crate::key_set::{KeySet, KeySource};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tollgate_core::{Error, KeySetConfig, Result};
use tracing::{debug, info, warn};

/// Callback receiving refresh failures.
pub type RefreshErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// Key set cache backed by a remote JWKS endpoint.
pub struct KeySetCache {
    config: KeySetConfig,
    client: reqwest::Client,
    current: watch::Sender<Arc<KeySet>>,
    refresh_lock: Mutex<()>,
    on_refresh_error: RefreshErrorHandler,
    shutdown: watch::Sender<bool>,
}

impl KeySetCache {
    /// Create an empty cache. Nothing is fetched until [`start`](Self::start)
    /// or [`refresh`](Self::refresh) is called.
    pub fn new(config: KeySetConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("HTTP client: {}", e)))?;

        let (current, _) = watch::channel(Arc::new(KeySet::empty(config.refresh_interval)));
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            config,
            client,
            current,
            refresh_lock: Mutex::new(()),
            on_refresh_error: Arc::new(|e: &Error| {
                warn!(error = %e, "JWKS refresh error");
            }),
            shutdown,
        })
    }

    /// Create a cache, load the key set and start the background refresh.
    pub async fn connect(config: KeySetConfig) -> Result<Arc<Self>> {
        Self::new(config)?.start().await
    }

    /// Replace the refresh error handler.
    pub fn on_refresh_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_refresh_error = Arc::new(handler);
        self
    }

    /// Load the initial key set and start the background refresh.
    ///
    /// Fails when the initial fetch fails; there is nothing stale to fall
    /// back on yet.
    pub async fn start(self) -> Result<Arc<Self>> {
        let cache = Arc::new(self);
        let set = cache.refresh().await?;
        info!(
            url = %cache.config.jwks_url,
            keys = set.len(),
            "Key set loaded"
        );
        cache.spawn_refresh();
        Ok(cache)
    }

    // Called once, from `start`. The task holds only a weak reference and
    // exits once the cache is dropped or `shutdown` is called.
    fn spawn_refresh(self: &Arc<Self>) {
        let cache = Arc::downgrade(self);
        let period = self.config.refresh_interval;
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            debug!(interval_secs = period.as_secs(), "Starting key set refresh");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(cache) = cache.upgrade() else {
                            break;
                        };
                        if let Err(e) = cache.refresh().await {
                            (cache.on_refresh_error)(&e);
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("Key set refresh shutting down");
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Stop the background refresh. The cached set stays readable.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn config(&self) -> &KeySetConfig {
        &self.config
    }

    /// The currently published key set.
    pub fn snapshot(&self) -> Arc<KeySet> {
        self.current.borrow().clone()
    }

    /// Observe key set replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<KeySet>> {
        self.current.subscribe()
    }

    /// Fetch the key set document without publishing it.
    pub async fn fetch(&self) -> Result<KeySet> {
        let url = &self.config.jwks_url;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("GET {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("GET {} returned {}", url, status)));
        }

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("invalid key set document from {}: {}", url, e)))?;

        let set = KeySet::from_jwks(&jwks, self.config.refresh_interval);
        if set.is_empty() {
            warn!(url = %url, "Key set document contains no usable keys");
        }
        Ok(set)
    }

    /// Fetch and publish a new key set.
    ///
    /// On failure the previously published set is left untouched.
    pub async fn refresh(&self) -> Result<Arc<KeySet>> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<Arc<KeySet>> {
        let set = Arc::new(self.fetch().await?);
        self.current.send_replace(set.clone());
        debug!(keys = set.len(), "Key set published");
        Ok(set)
    }

    /// Resolve a key, refreshing once on demand when the `kid` is unknown.
    pub async fn lookup(&self, kid: &str) -> Result<Arc<VerificationKey>> {
        let seen = self.snapshot();
        if let Some(key) = seen.get(kid) {
            return Ok(key);
        }

        if !self.config.refresh_unknown_kid {
            return Err(not_found(kid));
        }

        debug!(kid = %kid, "Unknown key id, refreshing key set");

        // Bounded wait for a refresh already in flight.
        let Ok(_guard) = timeout(self.config.fetch_timeout, self.refresh_lock.lock()).await else {
            warn!(kid = %kid, "Timed out waiting for key set refresh");
            return Err(Error::KeyResolution(format!(
                "key '{}' not found; timed out waiting for key set refresh",
                kid
            )));
        };

        let latest = self.snapshot();
        let latest = if Arc::ptr_eq(&seen, &latest) {
            match self.refresh_locked().await {
                Ok(set) => set,
                Err(e) => {
                    (self.on_refresh_error)(&e);
                    return Err(Error::KeyResolution(format!(
                        "key '{}' not found; refresh failed: {}",
                        kid, e
                    )));
                }
            }
        } else {
            // Another refresh published while we waited.
            latest
        };

        latest.get(kid).ok_or_else(|| not_found(kid))
    }
}

fn not_found(kid: &str) -> Error {
    Error::KeyResolution(format!("key '{}' not found in key set", kid))
}

impl Drop for KeySetCache {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

#[async_trait]
impl KeySource for KeySetCache {
    async fn lookup(&self, kid: &str) -> Result<Arc<VerificationKey>> {
        KeySetCache::lookup(self, kid).await
    }
}
