//! AES-256-GCM field encryption primitives and the persisted envelope format.
//!
//! This module is intentionally free of key-derivation and configuration
//! dependencies. It provides the low-level seal/open operations and the codec
//! used by [`FieldEncryptor`](crate::FieldEncryptor).
//!
//! # Envelope format
//!
//! ```text
//! ENC:<base64-standard-padded(salt[32] ‖ iv[16] ‖ tag[16] ‖ ciphertext)>
//! ```
//!
//! Values without the `ENC:` marker are legacy plaintext and pass through
//! untouched.

pub mod cipher;
pub mod envelope;

pub use cipher::{IV_LEN, KEY_LEN, TAG_LEN};
pub use envelope::{is_encrypted, is_encrypted_str, Envelope, EnvelopeError, MARKER, SALT_LEN};
