//! Tollgate Core
//!
//! Shared vocabulary for the Tollgate crates: the error taxonomy, license
//! claims, the credential validator port and configuration.

pub mod claims;
pub mod config;
pub mod error;
pub mod ports;

pub use claims::{LicenseClaims, LicenseMetadata, token_prefix};
pub use config::{GateConfig, KeySetConfig, LicenseServerConfig};
pub use error::{Error, Result};
pub use ports::CredentialValidator;
