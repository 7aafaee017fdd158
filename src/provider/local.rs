//! The local master key provider.

use std::path::PathBuf;

use zeroize::Zeroizing;

use super::MasterKeyProvider;
use crate::crypto::{derive_master_key, load_keyfile, Argon2Params, MasterKey};
use crate::errors::{LockboxError, Result};

/// Where the local provider gets its key from.
pub enum LocalSource {
    /// A 32-byte keyfile whose contents are the master key.
    Keyfile(PathBuf),

    /// A passphrase stretched with Argon2id over a persisted salt.
    Passphrase {
        passphrase: Zeroizing<String>,
        salt: Vec<u8>,
        params: Argon2Params,
    },
}

/// Master key from local storage reachable by this process.
pub struct LocalProvider {
    source: LocalSource,
}

impl LocalProvider {
    pub fn new(source: LocalSource) -> Self {
        Self { source }
    }

    pub fn keyfile(path: impl Into<PathBuf>) -> Self {
        Self::new(LocalSource::Keyfile(path.into()))
    }
}

impl MasterKeyProvider for LocalProvider {
    fn name(&self) -> &str {
        match self.source {
            LocalSource::Keyfile(_) => "local-keyfile",
            LocalSource::Passphrase { .. } => "local-passphrase",
        }
    }

    fn master_key(&self) -> Result<MasterKey> {
        let result = match &self.source {
            LocalSource::Keyfile(path) => load_keyfile(path),
            LocalSource::Passphrase {
                passphrase,
                salt,
                params,
            } => {
                if passphrase.is_empty() {
                    return Err(LockboxError::ProviderError("passphrase is empty".into()));
                }
                derive_master_key(passphrase.as_bytes(), salt, params)
            }
        };

        result.map_err(|e| match e {
            LockboxError::ProviderError(_) => e,
            other => LockboxError::ProviderError(format!("{}: {other}", self.name())),
        })
    }
}
