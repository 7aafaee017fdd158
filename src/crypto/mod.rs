//! Cryptographic primitives for Lockbox.
//!
//! This module provides:
//! - AES-256-GCM `seal` / `open` (`aead`)
//! - Zeroizing `MasterKey` and `DataKey` wrappers (`keys`)
//! - Argon2id passphrase stretching (`kdf`)
//! - Raw 32-byte master keyfiles (`keyfile`)

pub mod aead;
pub mod kdf;
pub mod keyfile;
pub mod keys;

pub use aead::{open, seal, KEY_LEN, NONCE_LEN, OVERHEAD, TAG_LEN};
pub use kdf::{derive_master_key, generate_salt, Argon2Params};
pub use keyfile::{generate_keyfile, load_keyfile};
pub use keys::{DataKey, MasterKey};
