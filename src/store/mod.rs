//! Key store module: persisted key records and the envelope engine.
//!
//! This module provides:
//! - `KeyId`, `KeyMetadata` and `Key` record types (`record`)
//! - Key file I/O with atomic, owner-only writes (`persist`)
//! - The envelope wire format (`envelope`)
//! - The `KeyStore` engine tying them together (`engine`)

pub mod engine;
pub mod envelope;
pub mod persist;
pub mod record;

pub use engine::{GeneratedDataKey, KeyStore, StoreConfig};
pub use record::{Key, KeyId, KeyMetadata};
