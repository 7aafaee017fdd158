//! In-memory key material.
//!
//! - `MasterKey` is the single top-level secret that seals key records
//!   and envelope headers.
//! - `DataKey` is the per-key secret that seals caller data.
//!
//! Both zero their bytes on drop and redact themselves in `Debug`.

use std::fmt;

use aes_gcm::aead::{KeyInit, OsRng};
use aes_gcm::Aes256Gcm;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::aead::KEY_LEN;
use crate::errors::{LockboxError, Result};

/// Domain separator for the master key check value.
const FINGERPRINT_CONTEXT: &[u8] = b"lockbox-master-key-check:v1";

/// A wrapper around the 32-byte master key that automatically zeroes
/// its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a new `MasterKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Build a `MasterKey` from a slice handed back by a provider.
    ///
    /// Anything other than exactly 32 bytes is a provider fault.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            LockboxError::ProviderError(format!(
                "master key must be exactly {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self::new(array))
    }

    /// Generate a fresh random master key (used when provisioning).
    pub fn generate() -> Self {
        let mut key = Aes256Gcm::generate_key(&mut OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&key);
        key.as_mut_slice().zeroize();
        Self::new(bytes)
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Key check value: base64 of `SHA-256(context || key)`.
    ///
    /// Safe to store in configuration; it identifies the key without
    /// revealing it.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_CONTEXT);
        hasher.update(self.bytes);
        BASE64.encode(hasher.finalize())
    }

    /// Compare this key's fingerprint against an expected one in constant time.
    pub fn verify_fingerprint(&self, expected: &str) -> Result<()> {
        let actual = self.fingerprint();
        if actual.as_bytes().ct_eq(expected.as_bytes()).into() {
            Ok(())
        } else {
            Err(LockboxError::ProviderError(
                "master key does not match the configured fingerprint".into(),
            ))
        }
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A 256-bit data key belonging to one key record.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct DataKey {
    bytes: [u8; KEY_LEN],
}

impl DataKey {
    /// Generate a fresh data key from the OS random source.
    pub fn generate() -> Self {
        let mut key = Aes256Gcm::generate_key(&mut OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&key);
        key.as_mut_slice().zeroize();
        Self { bytes }
    }

    /// Rebuild a data key from decoded record bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            LockboxError::SerializationError(format!(
                "data key must be exactly {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl PartialEq for DataKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes[..].ct_eq(&other.bytes[..]).into()
    }
}

impl Eq for DataKey {}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DataKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_key_from_slice_enforces_length() {
        assert!(MasterKey::from_slice(&[0u8; 32]).is_ok());
        let err = MasterKey::from_slice(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, LockboxError::ProviderError(_)));
    }

    #[test]
    fn fingerprint_is_stable_and_key_specific() {
        let a = MasterKey::new([0x11u8; 32]);
        let b = MasterKey::new([0x22u8; 32]);
        assert_eq!(a.fingerprint(), MasterKey::new([0x11u8; 32]).fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert!(a.verify_fingerprint(&a.fingerprint()).is_ok());
        assert!(a.verify_fingerprint(&b.fingerprint()).is_err());
    }

    #[test]
    fn debug_output_is_redacted() {
        let mk = MasterKey::new([0xABu8; 32]);
        let dk = DataKey::from_slice(&[0xCDu8; 32]).unwrap();
        assert!(!format!("{mk:?}").contains("171"));
        assert_eq!(format!("{dk:?}"), "DataKey([REDACTED])");
    }

    #[test]
    fn generated_data_keys_differ() {
        assert_ne!(DataKey::generate(), DataKey::generate());
    }
}
