//! Field-level encryption for personally identifiable columns.
//!
//! Protected columns (cover-letter content, company and position names, job
//! descriptions, resume text, target job) are stored as
//! `ENC:<base64(salt ‖ iv ‖ tag ‖ ciphertext)>` tokens. Each token carries its
//! own 32-byte salt; the AES-256-GCM key is scrypt(secret, salt) and is cached
//! per salt for a bounded time.
//!
//! Startup sequence for a host process:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured logging ([`telemetry::init_tracing`]).
//! 3. Build one [`FieldEncryptor`] and share it with every handler.
//!
//! [`init_from_env`] performs all three.

pub mod config;
pub mod crypto;
pub mod encryptor;
pub mod error;
pub mod fields;
pub mod kdf;
pub mod telemetry;

use anyhow::{Context, Result};
use tracing::info;

pub use crate::config::{Config, Secret};
pub use crypto::{is_encrypted, is_encrypted_str, MARKER};
pub use encryptor::FieldEncryptor;
pub use error::{FailureCause, FieldCryptError};
pub use fields::{FieldSlot, SensitiveFields};

/// Load configuration, install the tracing subscriber and build the encryptor.
///
/// # Errors
///
/// Returns an error if configuration is missing or invalid, or if a global
/// tracing subscriber is already installed.
pub fn init_from_env() -> Result<FieldEncryptor> {
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    telemetry::init_tracing(&cfg.log_level)?;

    let encryptor =
        FieldEncryptor::new(&cfg).context("failed to initialise field encryptor")?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        key_cache_capacity = cfg.key_cache_capacity,
        key_cache_ttl_secs = cfg.key_cache_ttl_secs,
        "field encryption ready"
    );
    Ok(encryptor)
}
