//! Mock JWKS endpoint.

use crate::keys::TestKey;
use serde_json::{Value, json};
use std::time::Duration;
use tollgate_core::KeySetConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const JWKS_PATH: &str = "/.well-known/jwks.json";

pub fn jwks_document(keys: &[&TestKey]) -> Value {
    json!({ "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>() })
}

pub fn jwks_response(keys: &[&TestKey]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(jwks_document(keys))
}

/// Serve `keys` for the first `times` requests.
pub async fn mount_jwks(server: &MockServer, keys: &[&TestKey], times: u64) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(jwks_response(keys))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

/// Key set config pointing at `server`, with a short fetch timeout.
pub fn key_set_config(server: &MockServer) -> KeySetConfig {
    KeySetConfig::new(format!("{}{}", server.uri(), JWKS_PATH))
        .with_fetch_timeout(Duration::from_secs(2))
}
