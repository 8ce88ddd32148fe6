//! Shared test fixtures for Tollgate.
//!
//! Throwaway Ed25519 signing keys and a mock JWKS endpoint, used by the
//! integration tests of the other crates.

pub mod jwks;
pub mod keys;

pub use jwks::{JWKS_PATH, jwks_document, jwks_response, key_set_config, mount_jwks};
pub use keys::TestKey;

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,tollgate=debug")),
        )
        .with_test_writer()
        .try_init();
}
