//! AES-256-GCM sealing and opening of individual field values.
//!
//! **IV size:** the IV is 16 bytes, not the usual 12. GCM folds non-96-bit IVs
//! through GHASH; stored envelopes were written with 16-byte IVs, so the
//! cipher is instantiated with a `U16` nonce size to keep reading them.
//!
//! **Tag placement:** the tag is produced detached so the envelope can store it
//! ahead of the ciphertext.

use aes_gcm::{
    aead::{
        consts::U16,
        rand_core::RngCore,
        AeadInPlace, KeyInit, OsRng,
    },
    aes::Aes256,
    AesGcm, Nonce, Tag,
};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of the GCM initialisation vector.
pub const IV_LEN: usize = 16;

/// Byte length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// AES-256-GCM with a 128-bit IV and 128-bit tag.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Output of [`seal`]: the detached tag and the ciphertext.
///
/// The ciphertext is exactly as long as the plaintext (GCM is a stream mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// AES-GCM encryption failed, or decryption failed tag verification.
    #[error("aead operation failed")]
    AeadFailure,
}

/// Fill an `N`-byte array from the OS CSPRNG.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Encrypt `plaintext` under `key` and `iv`.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error (only reachable
/// for plaintexts beyond the GCM length limit).
pub fn seal(key: &[u8], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Sealed, CipherError> {
    let cipher = build_cipher(key)?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(iv), b"", &mut buffer)
        .map_err(|_| CipherError::AeadFailure)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);
    Ok(Sealed {
        tag: tag_bytes,
        ciphertext: buffer,
    })
}

/// Verify `tag` and decrypt `ciphertext` back to plaintext bytes.
///
/// Nothing is returned unless the tag verifies.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AeadFailure`] if authentication fails (wrong key or tampered data).
pub fn open(
    key: &[u8],
    iv: &[u8; IV_LEN],
    tag: &[u8; TAG_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(iv),
            b"",
            &mut buffer,
            Tag::<U16>::from_slice(tag),
        )
        .map_err(|_| CipherError::AeadFailure)?;
    Ok(buffer)
}

fn build_cipher(key: &[u8]) -> Result<Aes256Gcm16, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }
    Aes256Gcm16::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_key() -> [u8; KEY_LEN] {
        random_bytes::<KEY_LEN>()
    }

    #[test]
    fn seal_open_round_trip() {
        let key = random_key();
        let iv = random_bytes::<IV_LEN>();
        let sealed = seal(&key, &iv, "자기소개서 본문".as_bytes()).unwrap();
        let opened = open(&key, &iv, &sealed.tag, &sealed.ciphertext).unwrap();
        assert_eq!(opened, "자기소개서 본문".as_bytes());
    }

    #[test]
    fn ciphertext_length_matches_plaintext() {
        let key = random_key();
        let iv = random_bytes::<IV_LEN>();
        let sealed = seal(&key, &iv, b"frontend engineer").unwrap();
        assert_eq!(sealed.ciphertext.len(), b"frontend engineer".len());
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let iv = random_bytes::<IV_LEN>();
        let sealed = seal(&random_key(), &iv, b"secret").unwrap();
        assert!(open(&random_key(), &iv, &sealed.tag, &sealed.ciphertext).is_err());
    }

    #[test]
    fn invalid_key_length_rejected() {
        let iv = random_bytes::<IV_LEN>();
        assert!(matches!(
            seal(&[0u8; 16], &iv, b"x"),
            Err(CipherError::InvalidKeyLength)
        ));
    }

    #[test]
    fn tampered_tag_fails_auth() {
        let key = random_key();
        let iv = random_bytes::<IV_LEN>();
        let mut sealed = seal(&key, &iv, b"tamper me").unwrap();
        sealed.tag[0] ^= 0x01;
        assert!(matches!(
            open(&key, &iv, &sealed.tag, &sealed.ciphertext),
            Err(CipherError::AeadFailure)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let key = random_key();
        let iv = random_bytes::<IV_LEN>();
        let mut sealed = seal(&key, &iv, b"tamper me").unwrap();
        // Flip a byte in the ciphertext to simulate tampering.
        sealed.ciphertext[0] ^= 0xFF;
        assert!(open(&key, &iv, &sealed.tag, &sealed.ciphertext).is_err());
    }

    #[test]
    fn random_bytes_differ() {
        assert_ne!(random_bytes::<32>(), random_bytes::<32>());
    }
}
