//! Signed license credentials for Tollgate.
//!
//! This crate keeps a JWKS key set fresh and verifies license credentials
//! signed by the license authority against it.

pub mod cache;
pub mod fixed;
pub mod jwk;
pub mod jwt;
pub mod key_set;

pub use cache::{KeySetCache, RefreshErrorHandler};
pub use fixed::FixedCredentialValidator;
pub use jwk::{Jwk, Jwks, VerificationKey};
pub use jwt::SignedCredentialValidator;
pub use key_set::{KeySet, KeySource};
