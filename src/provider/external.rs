//! Master key from an external secure module.
//!
//! The module itself is opaque: Lockbox only needs it to hand back 32
//! bytes or fail.

use zeroize::Zeroizing;

use super::MasterKeyProvider;
use crate::crypto::MasterKey;
use crate::errors::{LockboxError, Result};

/// A secure module that holds the master key (HSM, OS keyring, …).
pub trait ExternalModule: Send + Sync {
    /// Human-readable label for logs and errors.
    fn label(&self) -> &str;

    /// Return the raw master key bytes.
    fn fetch_master_key(&self) -> Result<Zeroizing<Vec<u8>>>;
}

pub struct ExternalModuleProvider {
    module: Box<dyn ExternalModule>,
}

impl ExternalModuleProvider {
    pub fn new(module: Box<dyn ExternalModule>) -> Self {
        Self { module }
    }
}

impl MasterKeyProvider for ExternalModuleProvider {
    fn name(&self) -> &str {
        self.module.label()
    }

    fn master_key(&self) -> Result<MasterKey> {
        let bytes = self.module.fetch_master_key().map_err(|e| match e {
            LockboxError::ProviderError(_) => e,
            other => LockboxError::ProviderError(format!("{}: {other}", self.module.label())),
        })?;
        MasterKey::from_slice(&bytes)
    }
}
