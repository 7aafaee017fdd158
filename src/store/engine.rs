//! The envelope-encryption key store.
//!
//! `KeyStore` owns a key root directory and the master key.  It creates
//! and toggles key records, and seals caller data into envelopes under
//! those keys.  All calls are synchronous; the store is `Send + Sync`
//! and can be shared behind an `Arc` by a multi-threaded caller.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::envelope::{self, Envelope};
use super::persist;
use super::record::{Key, KeyId, KeyMetadata};
use crate::config::Settings;
use crate::crypto::{aead, DataKey, MasterKey};
use crate::errors::{LockboxError, Result};
use crate::provider::MasterKeyProvider;

/// Everything the key store needs from configuration, resolved up front.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding one `<KeyID>.key` file per key.  Must exist.
    pub key_root: PathBuf,

    /// When set, the provider's key must match this check value.
    pub master_key_fingerprint: Option<String>,
}

impl StoreConfig {
    pub fn new(key_root: impl Into<PathBuf>) -> Self {
        Self {
            key_root: key_root.into(),
            master_key_fingerprint: None,
        }
    }

    /// Resolve the store config from project settings.
    pub fn from_settings(settings: &Settings, project_dir: &Path) -> Self {
        Self {
            key_root: settings.key_root_path(project_dir),
            master_key_fingerprint: settings.master_key_fingerprint.clone(),
        }
    }
}

/// A fresh data key for client-side encryption, in plaintext and wrapped.
pub struct GeneratedDataKey {
    /// The raw 32-byte key.  Use it, then drop it.
    pub plaintext: Zeroizing<Vec<u8>>,

    /// The same bytes sealed as an envelope; `KeyStore::decrypt` returns them.
    pub envelope: Vec<u8>,

    pub key_id: KeyId,
}

pub struct KeyStore {
    root: PathBuf,
    master_key: MasterKey,

    /// One mutex per key id, serializing read-modify-write of a record.
    key_locks: Mutex<HashMap<KeyId, Arc<Mutex<()>>>>,
}

impl KeyStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open the store at `config.key_root`, fetching the master key once.
    ///
    /// A missing key root and any provider failure are fatal: there is no
    /// unencrypted fallback.
    pub fn open(config: StoreConfig, provider: &dyn MasterKeyProvider) -> Result<Self> {
        let root = config.key_root;
        match std::fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(LockboxError::ConfigError(format!(
                    "key root {} is not a directory",
                    root.display()
                )))
            }
            Err(e) => {
                return Err(LockboxError::ConfigError(format!(
                    "cannot use key root {}: {e}",
                    root.display()
                )))
            }
        }

        let master_key = provider.master_key().map_err(|e| match e {
            LockboxError::ProviderError(_) => e,
            other => LockboxError::ProviderError(format!("{}: {other}", provider.name())),
        })?;

        if let Some(expected) = config.master_key_fingerprint.as_deref() {
            master_key.verify_fingerprint(expected)?;
        }

        info!(
            key_root = %root.display(),
            provider = provider.name(),
            "key store opened"
        );

        Ok(Self {
            root,
            master_key,
            key_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn key_root(&self) -> &Path {
        &self.root
    }

    // ------------------------------------------------------------------
    // Key lifecycle
    // ------------------------------------------------------------------

    /// Create a new enabled key with a fresh id and data key.
    pub fn create_key(&self, description: &str) -> Result<KeyMetadata> {
        let key = Key::generate(description);
        self.save_key(&key, true)?;

        info!(key_id = %key.key_id(), "created key");
        Ok(key.metadata.clone())
    }

    /// Read and decrypt the full record for `id`.
    pub fn get_key_record(&self, id: &KeyId) -> Result<Key> {
        let sealed = persist::read_key_file(&self.root, id)?;
        let plaintext = Zeroizing::new(aead::open(self.master_key.as_bytes(), &sealed)?);
        let key = Key::from_bytes(&plaintext)?;

        // A valid record copied over another key's file.
        if key.key_id() != id {
            return Err(LockboxError::SerializationError(format!(
                "key file for {id} holds the record of {}",
                key.key_id()
            )));
        }

        debug!(key_id = %id, enabled = key.metadata.enabled, "loaded key record");
        Ok(key)
    }

    pub fn enable_key(&self, id: &KeyId) -> Result<KeyMetadata> {
        self.set_enabled(id, true)
    }

    pub fn disable_key(&self, id: &KeyId) -> Result<KeyMetadata> {
        self.set_enabled(id, false)
    }

    fn set_enabled(&self, id: &KeyId, enabled: bool) -> Result<KeyMetadata> {
        let lock = self.key_lock(id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.write_enabled(id, enabled)
        };
        self.release_key_lock(id, lock);
        result
    }

    fn write_enabled(&self, id: &KeyId, enabled: bool) -> Result<KeyMetadata> {
        let mut key = self.get_key_record(id)?;
        key.metadata.enabled = enabled;
        self.save_key(&key, false)?;

        info!(key_id = %id, enabled, "updated key state");
        Ok(key.metadata.clone())
    }

    /// Metadata of every readable key in the key root, oldest first.
    ///
    /// A key file that cannot be read, authenticated or parsed is logged
    /// and skipped; it never fails the listing.
    pub fn list_keys(&self) -> Result<Vec<KeyMetadata>> {
        let mut keys = Vec::new();

        for id in persist::list_key_ids(&self.root)? {
            match self.get_key_record(&id) {
                Ok(key) => keys.push(key.metadata.clone()),
                Err(e) => warn!(key_id = %id, error = %e, "skipping unreadable key file"),
            }
        }

        keys.sort_by(|a, b| {
            a.creation_date
                .cmp(&b.creation_date)
                .then_with(|| a.key_id.cmp(&b.key_id))
        });
        Ok(keys)
    }

    // ------------------------------------------------------------------
    // Envelope operations
    // ------------------------------------------------------------------

    /// Seal `plaintext` under key `id`.
    pub fn encrypt(&self, plaintext: &[u8], id: &KeyId) -> Result<Vec<u8>> {
        let key = self.enabled_key(id)?;
        envelope::seal(
            self.master_key.as_bytes(),
            key.key_id(),
            key.data_key.as_bytes(),
            plaintext,
        )
    }

    /// Open an envelope, returning the plaintext and the key it was sealed under.
    pub fn decrypt(&self, envelope: &[u8]) -> Result<(Vec<u8>, KeyId)> {
        let envelope = Envelope::parse(envelope)?;
        let id = envelope.open_key_id(self.master_key.as_bytes())?;
        let key = self.enabled_key(&id)?;
        let plaintext = envelope.open_body(key.data_key.as_bytes())?;
        Ok((plaintext, id))
    }

    /// Move an envelope to `new_id`.  Returns the new envelope and the
    /// id of the key it was previously sealed under.
    pub fn re_encrypt(&self, envelope: &[u8], new_id: &KeyId) -> Result<(Vec<u8>, KeyId)> {
        let (plaintext, old_id) = self.decrypt(envelope)?;
        let plaintext = Zeroizing::new(plaintext);
        let envelope = self.encrypt(&plaintext, new_id)?;

        debug!(from = %old_id, to = %new_id, "re-encrypted envelope");
        Ok((envelope, old_id))
    }

    /// Generate a random 256-bit key for the caller, wrapped under `id`.
    pub fn generate_data_key(&self, id: &KeyId) -> Result<GeneratedDataKey> {
        let fresh = DataKey::generate();
        let envelope = self.encrypt(fresh.as_bytes(), id)?;
        Ok(GeneratedDataKey {
            plaintext: Zeroizing::new(fresh.as_bytes().to_vec()),
            envelope,
            key_id: id.clone(),
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Fetch a record and refuse it if disabled.
    fn enabled_key(&self, id: &KeyId) -> Result<Key> {
        let key = self.get_key_record(id)?;
        if !key.metadata.enabled {
            return Err(LockboxError::KeyDisabled(id.to_string()));
        }
        Ok(key)
    }

    /// Seal the whole record under the master key and write it.
    fn save_key(&self, key: &Key, create_new: bool) -> Result<()> {
        let plaintext = key.to_bytes()?;
        let sealed = aead::seal(self.master_key.as_bytes(), &plaintext)?;
        persist::write_key_file(&self.root, key.key_id(), &sealed, create_new)
    }

    fn key_lock(&self, id: &KeyId) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(id.clone()).or_default())
    }

    /// Drop the map entry for `id` once no other caller holds its lock.
    fn release_key_lock(&self, id: &KeyId, lock: Arc<Mutex<()>>) {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Two references left: the map's and ours.
        let idle = locks
            .get(id)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(&lock) == 2);
        if idle {
            locks.remove(id);
        }
    }
}
