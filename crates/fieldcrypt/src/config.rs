//! Configuration loading and validation for field encryption.
//!
//! All values are read from environment variables once, at startup. Loading
//! fails with a clear error message if any required variable is missing or invalid.

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Operator-supplied secret that every field key is derived from.
///
/// Never logged: the `Debug` impl is redacted and the bytes are wiped on drop.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns `true` if no secret was supplied.
    ///
    /// Only the empty string counts: a secret made of spaces is still a secret.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw bytes fed into the key-derivation function.
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// Validated field-encryption configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Secret all field keys are derived from (`ENCRYPTION_SECRET`). **Required.**
    pub encryption_secret: Secret,

    /// Maximum number of derived keys kept in memory.
    #[serde(default = "default_key_cache_capacity")]
    pub key_cache_capacity: usize,

    /// How long (seconds) a derived key may be served from the cache.
    #[serde(default = "default_key_cache_ttl")]
    pub key_cache_ttl_secs: u64,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_key_cache_capacity() -> usize {
    100
}
fn default_key_cache_ttl() -> u64 {
    300
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Configuration with the given secret and every other value defaulted.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            encryption_secret: Secret::new(secret),
            key_cache_capacity: default_key_cache_capacity(),
            key_cache_ttl_secs: default_key_cache_ttl(),
            log_level: default_log_level(),
        }
    }

    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Cache TTL as a [`Duration`].
    pub fn key_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.key_cache_ttl_secs)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    pub fn validate(&self) -> Result<()> {
        if self.encryption_secret.is_empty() {
            anyhow::bail!("ENCRYPTION_SECRET is required and must not be empty");
        }
        if self.key_cache_capacity == 0 {
            anyhow::bail!("KEY_CACHE_CAPACITY must be > 0");
        }
        if self.key_cache_ttl_secs == 0 {
            anyhow::bail!("KEY_CACHE_TTL_SECS must be > 0");
        }
        ensure_non_empty(&self.log_level, "LOG_LEVEL")?;
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
