//! Key records as they are persisted in the key root.
//!
//! A record is serialized to JSON with the field names below, then
//! sealed whole under the master key.  `AESKey` is stored as a base64
//! string.
//!
//! ```text
//! {"KeyMetadata":{"KeyID":"…","Description":"…","CreationDate":"…","Enabled":true},"AESKey":"…"}
//! ```

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::DataKey;
use crate::errors::{LockboxError, Result};

// ---------------------------------------------------------------------------
// KeyId
// ---------------------------------------------------------------------------

/// Unique identifier of a key: a random (v4) UUID in its canonical
/// lowercase hyphenated form.
///
/// The string length is part of the envelope format.  See
/// `store::envelope::HEADER_LEN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyId(String);

impl KeyId {
    /// Length of the canonical string form, in bytes.
    pub const ENCODED_LEN: usize = 36;

    /// Generate a fresh random key id.
    ///
    /// Only the key store should call this.
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    /// Parse a key id, accepting only the canonical form.
    ///
    /// Braced, URN, simple and uppercase spellings are rejected so that
    /// every id maps to exactly one file name and one header length.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != Self::ENCODED_LEN {
            return Err(LockboxError::InvalidKeyId(s.to_string()));
        }
        let uuid = Uuid::try_parse(s).map_err(|_| LockboxError::InvalidKeyId(s.to_string()))?;
        let canonical = uuid.hyphenated().to_string();
        if canonical != s {
            return Err(LockboxError::InvalidKeyId(s.to_string()));
        }
        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for KeyId {
    type Err = LockboxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KeyId {
    type Error = LockboxError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<KeyId> for String {
    fn from(id: KeyId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// KeyMetadata / Key
// ---------------------------------------------------------------------------

/// Public description of a key.  `enabled` is the only field that
/// changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    #[serde(rename = "KeyID")]
    pub key_id: KeyId,

    #[serde(rename = "Description")]
    pub description: String,

    /// When the key was created (UTC).
    #[serde(rename = "CreationDate")]
    pub creation_date: DateTime<Utc>,

    /// Disabled keys refuse every encrypt and decrypt.
    #[serde(rename = "Enabled")]
    pub enabled: bool,
}

/// A full key record: metadata plus the secret data key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    #[serde(rename = "KeyMetadata")]
    pub metadata: KeyMetadata,

    #[serde(
        rename = "AESKey",
        serialize_with = "data_key_encode",
        deserialize_with = "data_key_decode"
    )]
    pub data_key: DataKey,
}

impl Key {
    /// Build a brand-new enabled key with a fresh id and data key.
    pub(crate) fn generate(description: &str) -> Self {
        Self {
            metadata: KeyMetadata {
                key_id: KeyId::generate(),
                description: description.to_string(),
                creation_date: Utc::now(),
                enabled: true,
            },
            data_key: DataKey::generate(),
        }
    }

    pub fn key_id(&self) -> &KeyId {
        &self.metadata.key_id
    }

    /// Serialize to the JSON bytes that get sealed on disk.
    pub fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        serde_json::to_vec(self)
            .map(Zeroizing::new)
            .map_err(|e| LockboxError::SerializationError(format!("key record: {e}")))
    }

    /// Parse the JSON bytes recovered from an opened key file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| LockboxError::SerializationError(format!("key record: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for the base64-encoded data key
// ---------------------------------------------------------------------------

fn data_key_encode<S>(key: &DataKey, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let encoded = Zeroizing::new(BASE64.encode(key.as_bytes()));
    serializer.serialize_str(&encoded)
}

fn data_key_decode<'de, D>(deserializer: D) -> std::result::Result<DataKey, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = Zeroizing::new(String::deserialize(deserializer)?);
    let mut bytes = BASE64.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)?;
    let key = DataKey::from_slice(&bytes).map_err(serde::de::Error::custom);
    bytes.zeroize();
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_ID: &str = "0f8e2c1a-7b3d-4e5f-9a6b-1c2d3e4f5a6b";

    #[test]
    fn generated_ids_are_canonical() {
        let id = KeyId::generate();
        assert_eq!(id.as_str().len(), KeyId::ENCODED_LEN);
        assert_eq!(KeyId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn parse_rejects_non_canonical_forms() {
        assert!(KeyId::parse(SAMPLE_ID).is_ok());
        assert!(KeyId::parse(&SAMPLE_ID.to_uppercase()).is_err());
        assert!(KeyId::parse(&SAMPLE_ID.replace('-', "")).is_err());
        assert!(KeyId::parse(&format!("{{{SAMPLE_ID}}}")).is_err());
        assert!(KeyId::parse("../../etc/passwd").is_err());
        assert!(KeyId::parse("").is_err());
    }

    #[test]
    fn record_json_uses_tagged_field_names() {
        let key = Key {
            metadata: KeyMetadata {
                key_id: KeyId::parse(SAMPLE_ID).unwrap(),
                description: "billing".into(),
                creation_date: Utc::now(),
                enabled: true,
            },
            data_key: DataKey::from_slice(&[7u8; 32]).unwrap(),
        };

        let json: serde_json::Value = serde_json::from_slice(&key.to_bytes().unwrap()).unwrap();
        assert_eq!(json["KeyMetadata"]["KeyID"], SAMPLE_ID);
        assert_eq!(json["KeyMetadata"]["Description"], "billing");
        assert_eq!(json["KeyMetadata"]["Enabled"], true);
        assert_eq!(json["AESKey"], BASE64.encode([7u8; 32]));

        let back = Key::from_bytes(&key.to_bytes().unwrap()).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn record_with_short_data_key_is_rejected() {
        let json = format!(
            r#"{{"KeyMetadata":{{"KeyID":"{SAMPLE_ID}","Description":"","CreationDate":"2024-01-01T00:00:00Z","Enabled":true}},"AESKey":"{}"}}"#,
            BASE64.encode([1u8; 16])
        );
        let err = Key::from_bytes(json.as_bytes()).unwrap_err();
        assert!(matches!(err, LockboxError::SerializationError(_)));
    }

    #[test]
    fn record_with_invalid_key_id_is_rejected() {
        let json = format!(
            r#"{{"KeyMetadata":{{"KeyID":"not-a-key","Description":"","CreationDate":"2024-01-01T00:00:00Z","Enabled":true}},"AESKey":"{}"}}"#,
            BASE64.encode([1u8; 32])
        );
        assert!(Key::from_bytes(json.as_bytes()).is_err());
    }
}
