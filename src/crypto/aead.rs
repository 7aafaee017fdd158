//! AES-256-GCM authenticated encryption.
//!
//! Each call to `seal` generates a fresh random 12-byte nonce and
//! prepends it to the ciphertext.  `open` splits the nonce back out
//! before decrypting.
//!
//! Layout of a sealed buffer:
//!   [ 12-byte nonce | ciphertext | 16-byte auth tag ]
//!
//! There is no padding, so the overhead is always exactly
//! `NONCE_LEN + TAG_LEN` bytes.  The envelope header size depends on this.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{LockboxError, Result};

/// Length of every symmetric key handled by Lockbox (256 bits).
pub const KEY_LEN: usize = 32;

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Fixed number of bytes `seal` adds to any plaintext.
pub const OVERHEAD: usize = NONCE_LEN + TAG_LEN;

/// Exact length of the output of `seal` for a plaintext of `plaintext_len` bytes.
pub const fn sealed_len(plaintext_len: usize) -> usize {
    plaintext_len + OVERHEAD
}

/// Encrypt and authenticate `plaintext` under a 32-byte `key`.
///
/// Returns `nonce || ciphertext || tag`.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| LockboxError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // aes-gcm appends the tag to the ciphertext body.
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| LockboxError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    debug_assert_eq!(output.len(), sealed_len(plaintext.len()));
    Ok(output)
}

/// Verify and decrypt a buffer produced by `seal`.
///
/// Anything shorter than `nonce + tag` is rejected before a cipher is
/// built from `key`.  Truncation, corruption and a wrong key all surface
/// as `AuthenticationFailed`; no partial plaintext is ever returned.
pub fn open(key: &[u8; KEY_LEN], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < OVERHEAD {
        return Err(LockboxError::AuthenticationFailed);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| LockboxError::AuthenticationFailed)?;

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| LockboxError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_length_is_exact() {
        let key = [0x01u8; KEY_LEN];
        for len in [0usize, 1, 36, 1000] {
            let sealed = seal(&key, &vec![0x5Au8; len]).unwrap();
            assert_eq!(sealed.len(), NONCE_LEN + len + TAG_LEN);
        }
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let key = [0x02u8; KEY_LEN];
        let sealed = seal(&key, b"").unwrap();
        assert_eq!(sealed.len(), OVERHEAD);
        assert!(open(&key, &sealed).unwrap().is_empty());
    }

    #[test]
    fn open_rejects_input_shorter_than_overhead() {
        let key = [0x03u8; KEY_LEN];
        let err = open(&key, &[0u8; OVERHEAD - 1]).unwrap_err();
        assert!(matches!(err, LockboxError::AuthenticationFailed));
    }

    #[test]
    fn truncated_tag_fails() {
        let key = [0x04u8; KEY_LEN];
        let mut sealed = seal(&key, b"payload").unwrap();
        sealed.pop();
        assert!(matches!(
            open(&key, &sealed),
            Err(LockboxError::AuthenticationFailed)
        ));
    }
}
