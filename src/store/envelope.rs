//! Envelope wire format.
//!
//! ```text
//! [0 .. HEADER_LEN)   seal(master_key, KeyID string)
//! [HEADER_LEN .. end) seal(data_key, plaintext)
//! ```
//!
//! There is no length prefix.  The header is always the sealed form of
//! a canonical `KeyId`, so its length is fixed and the split point is a
//! constant.  Changing `KeyId::ENCODED_LEN` or the AEAD overhead changes
//! `HEADER_LEN` and breaks every envelope already handed out; the
//! assertion below turns that into a build failure.

use super::record::KeyId;
use crate::crypto::aead::{self, KEY_LEN};
use crate::errors::{LockboxError, Result};

/// Header length every deployed envelope uses.
pub const COMPATIBLE_HEADER_LEN: usize = 64;

/// Length of the sealed KeyID at the front of every envelope.
pub const HEADER_LEN: usize = aead::sealed_len(KeyId::ENCODED_LEN);

const _: () = assert!(
    HEADER_LEN == COMPATIBLE_HEADER_LEN,
    "envelope header length changed: KeyId encoding or AEAD overhead no longer matches existing envelopes"
);

/// Smallest possible envelope: a header plus a sealed empty plaintext.
pub const MIN_ENVELOPE_LEN: usize = HEADER_LEN + aead::OVERHEAD;

/// An envelope split at the header boundary.  Nothing has been
/// decrypted yet.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    header: &'a [u8],
    body: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Split `bytes` into header and body.
    ///
    /// Input shorter than the header is rejected before any key
    /// material is touched.  A body that is too short to be sealed data
    /// is left for `open` to reject as an authentication failure.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(LockboxError::MalformedEnvelope(format!(
                "envelope is {} bytes, shorter than the {HEADER_LEN}-byte header",
                bytes.len()
            )));
        }
        let (header, body) = bytes.split_at(HEADER_LEN);
        Ok(Self { header, body })
    }

    /// Recover the key id from the header.
    pub fn open_key_id(&self, master_key: &[u8; KEY_LEN]) -> Result<KeyId> {
        let plaintext = aead::open(master_key, self.header)?;

        // Authentic under the master key but not a key id: some other
        // master-key-sealed blob was passed in as an envelope.
        let text = std::str::from_utf8(&plaintext).map_err(|_| {
            LockboxError::MalformedEnvelope("header does not contain a key id".into())
        })?;
        KeyId::parse(text).map_err(|_| {
            LockboxError::MalformedEnvelope("header does not contain a key id".into())
        })
    }

    /// Decrypt the body under the data key named by the header.
    pub fn open_body(&self, data_key: &[u8; KEY_LEN]) -> Result<Vec<u8>> {
        aead::open(data_key, self.body)
    }
}

/// Build an envelope for `plaintext` under `data_key`, tagged with `id`.
pub fn seal(
    master_key: &[u8; KEY_LEN],
    id: &KeyId,
    data_key: &[u8; KEY_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let header = aead::seal(master_key, id.as_str().as_bytes())?;
    if header.len() != HEADER_LEN {
        return Err(LockboxError::EncryptionFailed(format!(
            "sealed key id is {} bytes, expected {HEADER_LEN}",
            header.len()
        )));
    }
    let body = aead::seal(data_key, plaintext)?;

    let mut envelope = Vec::with_capacity(header.len() + body.len());
    envelope.extend_from_slice(&header);
    envelope.extend_from_slice(&body);
    Ok(envelope)
}
