//! Fixtures on top of `tollgate-tests` that need this crate's types.

#![allow(dead_code)]

use std::time::Duration;
use tollgate_auth::{Jwks, KeySet};
use tollgate_core::KeySetConfig;
use wiremock::MockServer;

pub use tollgate_tests::{JWKS_PATH, TestKey, jwks_document, jwks_response, mount_jwks};

/// A static key set holding `keys`.
pub fn key_set(keys: &[&TestKey]) -> KeySet {
    let jwks: Jwks = serde_json::from_value(jwks_document(keys)).expect("valid JWKS");
    KeySet::from_jwks(&jwks, Duration::from_secs(3600))
}

pub fn config_for(server: &MockServer) -> KeySetConfig {
    tollgate_tests::key_set_config(server)
}
