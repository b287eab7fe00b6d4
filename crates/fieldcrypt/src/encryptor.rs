//! [`FieldEncryptor`]: the single entry point route handlers use to protect
//! columns before writing them and to recover them after reading.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::crypto::{cipher, envelope, IV_LEN, SALT_LEN};
use crate::error::{FailureCause, FieldCryptError};
use crate::fields::{json, SensitiveFields};
use crate::kdf::{KeyCache, KeyDerivation, ScryptKdf};

/// Encrypts and decrypts individual field values.
///
/// Cheap to clone: clones share one [`KeyCache`]. Build one at startup and
/// hand it to every handler.
#[derive(Clone, Debug)]
pub struct FieldEncryptor {
    keys: Arc<KeyCache>,
}

impl FieldEncryptor {
    /// Build an encryptor using scrypt at the production work factor.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptError::Configuration`] if the secret is empty.
    pub fn new(cfg: &Config) -> Result<Self, FieldCryptError> {
        Self::with_kdf(cfg, Box::new(ScryptKdf::default()))
    }

    /// Build an encryptor around a custom [`KeyDerivation`].
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptError::Configuration`] if the secret is empty.
    pub fn with_kdf(cfg: &Config, kdf: Box<dyn KeyDerivation>) -> Result<Self, FieldCryptError> {
        if cfg.encryption_secret.is_empty() {
            return Err(FieldCryptError::Configuration(
                "ENCRYPTION_SECRET is not set".into(),
            ));
        }
        let keys = KeyCache::new(
            cfg.encryption_secret.clone(),
            kdf,
            cfg.key_cache_capacity,
            cfg.key_cache_ttl(),
        );
        debug!(
            capacity = keys.capacity(),
            ttl_secs = keys.ttl().as_secs(),
            "field encryptor ready"
        );
        Ok(Self {
            keys: Arc::new(keys),
        })
    }

    /// The key cache backing this encryptor.
    pub fn key_cache(&self) -> &KeyCache {
        &self.keys
    }

    /// Encrypt one value into an `ENC:` token.
    ///
    /// An empty input is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptError::Encryption`] if key derivation or the cipher fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, FieldCryptError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        self.seal(plaintext.as_bytes()).map_err(|cause| {
            warn!(error = %cause, "field encryption failed");
            FieldCryptError::Encryption(cause)
        })
    }

    /// Decrypt one stored value.
    ///
    /// Empty values and values without the `ENC:` marker (rows written before
    /// encryption was introduced) are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptError::Decryption`] if the envelope is malformed or the
    /// authentication tag does not verify. No partial plaintext is ever returned.
    pub fn decrypt(&self, value: &str) -> Result<String, FieldCryptError> {
        if value.is_empty() || !envelope::is_encrypted_str(value) {
            return Ok(value.to_owned());
        }
        self.open(value).map_err(|cause| {
            warn!(error = %cause, "field decryption failed");
            FieldCryptError::Decryption(cause)
        })
    }

    /// [`encrypt`](Self::encrypt) for nullable columns. `None` stays `None`.
    ///
    /// # Errors
    ///
    /// Same as [`encrypt`](Self::encrypt).
    pub fn encrypt_opt(&self, value: Option<&str>) -> Result<Option<String>, FieldCryptError> {
        value.map(|v| self.encrypt(v)).transpose()
    }

    /// [`decrypt`](Self::decrypt) for nullable columns. `None` stays `None`.
    ///
    /// # Errors
    ///
    /// Same as [`decrypt`](Self::decrypt).
    pub fn decrypt_opt(&self, value: Option<&str>) -> Result<Option<String>, FieldCryptError> {
        value.map(|v| self.decrypt(v)).transpose()
    }

    /// Return a copy of `record` with every sensitive column encrypted.
    ///
    /// # Errors
    ///
    /// Returns the first [`FieldCryptError`] raised; `record` itself is never modified.
    pub fn encrypt_fields<T>(&self, record: &T) -> Result<T, FieldCryptError>
    where
        T: SensitiveFields + Clone,
    {
        let mut out = record.clone();
        for slot in out.sensitive_fields_mut() {
            slot.apply(|v| self.encrypt(v))?;
        }
        Ok(out)
    }

    /// Return a copy of `record` with every sensitive column decrypted.
    ///
    /// # Errors
    ///
    /// Returns the first [`FieldCryptError`] raised; `record` itself is never modified.
    pub fn decrypt_fields<T>(&self, record: &T) -> Result<T, FieldCryptError>
    where
        T: SensitiveFields + Clone,
    {
        let mut out = record.clone();
        for slot in out.sensitive_fields_mut() {
            slot.apply(|v| self.decrypt(v))?;
        }
        Ok(out)
    }

    /// Return a copy of a JSON row with the string fields at `paths` encrypted.
    ///
    /// Absent, non-string and empty fields are left as they are.
    ///
    /// # Errors
    ///
    /// Returns the first [`FieldCryptError`] raised.
    pub fn encrypt_json_fields(
        &self,
        record: &Value,
        paths: &[&str],
    ) -> Result<Value, FieldCryptError> {
        let mut out = record.clone();
        json::transform_fields(&mut out, paths, |v| self.encrypt(v))?;
        Ok(out)
    }

    /// Return a copy of a JSON row with the string fields at `paths` decrypted.
    ///
    /// # Errors
    ///
    /// Returns the first [`FieldCryptError`] raised.
    pub fn decrypt_json_fields(
        &self,
        record: &Value,
        paths: &[&str],
    ) -> Result<Value, FieldCryptError> {
        let mut out = record.clone();
        json::transform_fields(&mut out, paths, |v| self.decrypt(v))?;
        Ok(out)
    }

    /// [`encrypt`](Self::encrypt) on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Same as [`encrypt`](Self::encrypt), plus [`FailureCause::Worker`] if the
    /// blocking task is cancelled.
    pub async fn encrypt_async(&self, plaintext: String) -> Result<String, FieldCryptError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.encrypt(&plaintext))
            .await
            .map_err(|e| FieldCryptError::Encryption(FailureCause::Worker(e.to_string())))?
    }

    /// [`decrypt`](Self::decrypt) on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Same as [`decrypt`](Self::decrypt), plus [`FailureCause::Worker`] if the
    /// blocking task is cancelled.
    pub async fn decrypt_async(&self, value: String) -> Result<String, FieldCryptError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.decrypt(&value))
            .await
            .map_err(|e| FieldCryptError::Decryption(FailureCause::Worker(e.to_string())))?
    }

    /// [`decrypt_fields`](Self::decrypt_fields) over a batch of rows on the
    /// blocking thread pool. Used when listing records.
    ///
    /// # Errors
    ///
    /// Returns the first [`FieldCryptError`] raised.
    pub async fn decrypt_all_async<T>(&self, records: Vec<T>) -> Result<Vec<T>, FieldCryptError>
    where
        T: SensitiveFields + Clone + Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            records
                .iter()
                .map(|record| this.decrypt_fields(record))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| FieldCryptError::Decryption(FailureCause::Worker(e.to_string())))?
    }

    fn seal(&self, plaintext: &[u8]) -> Result<String, FailureCause> {
        let salt = cipher::random_bytes::<SALT_LEN>();
        let iv = cipher::random_bytes::<IV_LEN>();
        let key = self.keys.get_or_derive(&salt)?;
        let sealed = cipher::seal(key.as_bytes(), &iv, plaintext)?;
        Ok(envelope::pack(&salt, &iv, &sealed.tag, &sealed.ciphertext))
    }

    fn open(&self, token: &str) -> Result<String, FailureCause> {
        let env = envelope::unpack(token)?;
        let key = self.keys.get_or_derive(&env.salt)?;
        let plaintext = cipher::open(key.as_bytes(), &env.iv, &env.tag, &env.ciphertext)?;
        String::from_utf8(plaintext).map_err(|_| FailureCause::InvalidUtf8)
    }
}
