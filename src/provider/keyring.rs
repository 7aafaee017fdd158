//! OS keyring as an external master key module.
//!
//! The master key is stored base64-encoded in the operating system's
//! secure credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KDE Wallet)

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroizing;

use super::ExternalModule;
use crate::crypto::MasterKey;
use crate::errors::{LockboxError, Result};

/// Service name used in the OS keyring.
const SERVICE_NAME: &str = "lockbox";

fn entry(account: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(SERVICE_NAME, &format!("master-key:{account}"))
        .map_err(|e| LockboxError::KeyringError(format!("failed to create keyring entry: {e}")))
}

/// Keyring-backed module for one account label.
pub struct KeyringModule {
    account: String,
    label: String,
}

impl KeyringModule {
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            label: format!("keyring:{account}"),
        }
    }
}

impl ExternalModule for KeyringModule {
    fn label(&self) -> &str {
        &self.label
    }

    fn fetch_master_key(&self) -> Result<Zeroizing<Vec<u8>>> {
        let encoded = match entry(&self.account)?.get_password() {
            Ok(secret) => Zeroizing::new(secret),
            Err(keyring::Error::NoEntry) => {
                return Err(LockboxError::ProviderError(format!(
                    "no master key stored in the keyring for account '{}'",
                    self.account
                )))
            }
            Err(e) => {
                return Err(LockboxError::KeyringError(format!(
                    "failed to read from keyring: {e}"
                )))
            }
        };

        BASE64
            .decode(encoded.as_bytes())
            .map(Zeroizing::new)
            .map_err(|e| LockboxError::KeyringError(format!("stored master key is not base64: {e}")))
    }
}

/// Store `master_key` in the keyring under `account` (provisioning).
pub fn store_master_key(account: &str, master_key: &MasterKey) -> Result<()> {
    let encoded = Zeroizing::new(BASE64.encode(master_key.as_bytes()));
    entry(account)?.set_password(&encoded).map_err(|e| {
        LockboxError::KeyringError(format!("failed to store master key in keyring: {e}"))
    })
}
