//! Host-facing license gate for Tollgate.
//!
//! Ties the signed-credential validator and the remote license client to a
//! resolved configuration, and answers per-module license and access
//! questions for the host application.

pub mod gate;
pub mod telemetry;

pub use gate::{AccessDecision, LicenseGate, ModuleLicense};
pub use telemetry::init_tracing;
