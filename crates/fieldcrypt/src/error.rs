//! Error taxonomy of the field encryptor.

use common::ServiceError;
use thiserror::Error;

use crate::crypto::{cipher::CipherError, EnvelopeError};
use crate::kdf::KdfError;

/// Why a single encrypt or decrypt call failed.
///
/// Display strings describe the failing layer only. None of them carry
/// plaintext, key bytes or the secret.
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error(transparent)]
    Kdf(#[from] KdfError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// Decrypted bytes were not UTF-8 (only reachable with a colliding tag).
    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,

    /// The blocking worker running the operation panicked or was cancelled.
    #[error("crypto worker failed: {0}")]
    Worker(String),
}

/// Error returned by every [`FieldEncryptor`](crate::FieldEncryptor) operation.
#[derive(Debug, Error)]
pub enum FieldCryptError {
    /// The secret is unset or empty. Fatal: there is no safe fallback key.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The write path failed (key derivation or cipher).
    #[error("data encryption failed")]
    Encryption(#[source] FailureCause),

    /// The read path failed: malformed envelope, tag mismatch, wrong key.
    #[error("data decryption failed")]
    Decryption(#[source] FailureCause),
}

impl FieldCryptError {
    /// Short category label, safe for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldCryptError::Configuration(_) => "configuration",
            FieldCryptError::Encryption(_) => "encryption",
            FieldCryptError::Decryption(_) => "decryption",
        }
    }

    /// The underlying cause, if any.
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            FieldCryptError::Configuration(_) => None,
            FieldCryptError::Encryption(cause) | FieldCryptError::Decryption(cause) => Some(cause),
        }
    }

    /// `true` if the value claimed to be encrypted but could not be parsed.
    pub fn is_malformed_envelope(&self) -> bool {
        matches!(
            self,
            FieldCryptError::Decryption(FailureCause::Envelope(_))
        )
    }
}

impl From<FieldCryptError> for ServiceError {
    fn from(err: FieldCryptError) -> Self {
        match err {
            FieldCryptError::Configuration(msg) => ServiceError::Unavailable(msg),
            other => ServiceError::EncryptionFailure(other.kind().to_owned()),
        }
    }
}
