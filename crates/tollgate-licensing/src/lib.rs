//! Remote license validation for Tollgate.
//!
//! Flat license tokens are checked against the license server, with a
//! static fallback table when the server cannot be used.

pub mod fallback;
pub mod remote;
pub mod types;

pub use fallback::FallbackTable;
pub use remote::{INVALID_LICENSE, INVALID_OR_EXPIRED, RemoteLicenseClient};
pub use types::{ValidationResult, ValidationSource};
