//! Per-salt key derivation and the in-memory key cache.
//!
//! # Lifecycle
//!
//! 1. Every encryption mints a fresh 32-byte salt, so the write path always
//!    derives a new key through [`KeyDerivation::derive`].
//! 2. Derived keys are kept in [`KeyCache`] keyed by the base64 of their salt,
//!    so repeated reads of the same stored value skip the slow derivation.
//! 3. Entries expire a fixed TTL after insertion and are evicted oldest-first
//!    once the cache grows past its capacity.
//!
//! # Security invariants
//!
//! - Derived keys are **never** written to disk, logged, or included in traces.
//! - Reading an entry never extends its lifetime: a key leaves memory at most
//!   one TTL after it was derived (plus the next cleanup pass).

pub mod cache;

pub use cache::KeyCache;

use scrypt::Params;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{KEY_LEN, SALT_LEN};

/// scrypt block size.
pub const SCRYPT_R: u32 = 8;

/// scrypt parallelism.
pub const SCRYPT_P: u32 = 1;

/// Errors produced by the key-derivation layer.
#[derive(Debug, Error)]
pub enum KdfError {
    /// The process secret is unset or empty.
    #[error("encryption secret is not configured")]
    MissingSecret,

    /// The scrypt cost parameters are out of range.
    #[error("invalid scrypt parameters")]
    InvalidParams,

    /// The derivation itself failed.
    #[error("key derivation failed")]
    Derivation,
}

/// A 32-byte symmetric key derived from the secret and one salt.
///
/// Cloned out of the cache into the caller's stack frame; every copy is wiped
/// on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// The slow, memory-hard function turning (secret, salt) into a key.
#[cfg_attr(test, mockall::automock)]
pub trait KeyDerivation: Send + Sync {
    /// Derive the key for `salt`.
    ///
    /// # Errors
    ///
    /// Returns a [`KdfError`] if the parameters are invalid or derivation fails.
    fn derive(&self, secret: &[u8], salt: &[u8; SALT_LEN]) -> Result<DerivedKey, KdfError>;
}

/// scrypt with `r = 8`, `p = 1` and a configurable `log2(N)`.
///
/// [`ScryptKdf::default`] uses `N = 2^14`, the cost every stored envelope was
/// written with. Changing it makes existing ciphertext undecryptable.
#[derive(Debug, Clone, Copy)]
pub struct ScryptKdf {
    log_n: u8,
}

impl ScryptKdf {
    /// `log2(N)` used for stored envelopes.
    pub const DEFAULT_LOG_N: u8 = 14;

    /// scrypt with a custom work factor. Only meant for tests and benchmarks.
    pub fn with_log_n(log_n: u8) -> Self {
        Self { log_n }
    }
}

impl Default for ScryptKdf {
    fn default() -> Self {
        Self::with_log_n(Self::DEFAULT_LOG_N)
    }
}

impl KeyDerivation for ScryptKdf {
    fn derive(&self, secret: &[u8], salt: &[u8; SALT_LEN]) -> Result<DerivedKey, KdfError> {
        let params = Params::new(self.log_n, SCRYPT_R, SCRYPT_P, KEY_LEN)
            .map_err(|_| KdfError::InvalidParams)?;
        let mut key = DerivedKey([0u8; KEY_LEN]);
        scrypt::scrypt(secret, salt, &params, &mut key.0).map_err(|_| KdfError::Derivation)?;
        Ok(key)
    }
}
