//! Structured logging setup.
//!
//! # Telemetry invariants
//!
//! - **No PII or key material** may appear in any span attribute or log field.
//!   Crypto failures are logged by category (`FieldCryptError::kind`) and
//!   layer message only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::init_tracing;
