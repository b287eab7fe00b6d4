//! Packing and unpacking of the `ENC:` envelope.
//!
//! Component boundaries are recovered from fixed lengths only: salt (32), IV
//! (16) and tag (16) form a 64-byte header, the ciphertext is the remainder.
//! There are no separators and no length prefixes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

use super::cipher::{IV_LEN, TAG_LEN};

/// Literal prefix that marks a value as encrypted.
pub const MARKER: &str = "ENC:";

/// Byte length of the per-value key-derivation salt.
pub const SALT_LEN: usize = 32;

/// Minimum decoded length of an envelope: salt + IV + tag.
pub const HEADER_LEN: usize = SALT_LEN + IV_LEN + TAG_LEN;

/// Errors from [`unpack`]. All of them mean "claims to be encrypted but isn't
/// structurally valid".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The value does not start with [`MARKER`].
    #[error("value is not an encrypted envelope")]
    MissingMarker,

    /// The text after the marker is not valid standard base64.
    #[error("envelope body is not valid base64")]
    InvalidBase64,

    /// The decoded body is shorter than [`HEADER_LEN`].
    #[error("envelope too short: expected at least {HEADER_LEN} bytes, got {0}")]
    TooShort(usize),
}

/// The four components of a persisted envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Encode this envelope to its `ENC:` string form.
    pub fn to_token(&self) -> String {
        pack(&self.salt, &self.iv, &self.tag, &self.ciphertext)
    }
}

/// Concatenate `salt ‖ iv ‖ tag ‖ ciphertext`, base64 it and prepend [`MARKER`].
pub fn pack(
    salt: &[u8; SALT_LEN],
    iv: &[u8; IV_LEN],
    tag: &[u8; TAG_LEN],
    ciphertext: &[u8],
) -> String {
    let mut combined = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    combined.extend_from_slice(salt);
    combined.extend_from_slice(iv);
    combined.extend_from_slice(tag);
    combined.extend_from_slice(ciphertext);

    let mut token = String::with_capacity(MARKER.len() + combined.len().div_ceil(3) * 4);
    token.push_str(MARKER);
    STANDARD.encode_string(&combined, &mut token);
    token
}

/// Split an `ENC:` token back into its components.
///
/// # Errors
///
/// Returns [`EnvelopeError::MissingMarker`], [`EnvelopeError::InvalidBase64`] or
/// [`EnvelopeError::TooShort`] depending on which structural check fails.
pub fn unpack(token: &str) -> Result<Envelope, EnvelopeError> {
    let body = token
        .strip_prefix(MARKER)
        .ok_or(EnvelopeError::MissingMarker)?;
    let combined = STANDARD
        .decode(body)
        .map_err(|_| EnvelopeError::InvalidBase64)?;
    if combined.len() < HEADER_LEN {
        return Err(EnvelopeError::TooShort(combined.len()));
    }

    let (salt, rest) = combined.split_at(SALT_LEN);
    let (iv, rest) = rest.split_at(IV_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let mut envelope = Envelope {
        salt: [0u8; SALT_LEN],
        iv: [0u8; IV_LEN],
        tag: [0u8; TAG_LEN],
        ciphertext: ciphertext.to_vec(),
    };
    envelope.salt.copy_from_slice(salt);
    envelope.iv.copy_from_slice(iv);
    envelope.tag.copy_from_slice(tag);
    Ok(envelope)
}

/// `true` iff `value` is present and starts with [`MARKER`]. Never panics.
pub fn is_encrypted(value: Option<&str>) -> bool {
    value.is_some_and(is_encrypted_str)
}

/// `true` iff `value` starts with [`MARKER`].
pub fn is_encrypted_str(value: &str) -> bool {
    value.starts_with(MARKER)
}
