//! Master key providers.
//!
//! A provider hands the key store its master key exactly once, when
//! the store is opened.  Two variants exist:
//!
//! - `LocalProvider` reads a keyfile or stretches a passphrase.
//! - `ExternalModuleProvider` asks an opaque secure module (the OS
//!   keyring is bundled behind the `keyring-store` feature).
//!
//! The choice is made once, from configuration, by `Provider::from_settings`.
//! Nothing downstream branches on provider names.

pub mod external;
pub mod local;

#[cfg(feature = "keyring-store")]
pub mod keyring;

use std::path::Path;

use zeroize::Zeroizing;

use crate::config::{LocalSourceKind, ProviderKind, Settings};
use crate::crypto::MasterKey;
use crate::errors::{LockboxError, Result};

pub use external::{ExternalModule, ExternalModuleProvider};
pub use local::{LocalProvider, LocalSource};

/// Anything that can produce the master key.
///
/// Implementations must fail with `ProviderError` rather than return a
/// placeholder key.  A call may block (e.g. on a hardware module); any
/// timeout policy belongs to the caller.
pub trait MasterKeyProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn master_key(&self) -> Result<MasterKey>;
}

/// The provider selected at startup.
pub enum Provider {
    Local(LocalProvider),
    External(ExternalModuleProvider),
}

impl Provider {
    /// Build the provider named by `settings`.
    ///
    /// `passphrase` is only consulted for the local passphrase source;
    /// the caller decides where it comes from (env var, prompt).
    pub fn from_settings(
        settings: &Settings,
        project_dir: &Path,
        passphrase: Option<Zeroizing<String>>,
    ) -> Result<Self> {
        match settings.provider_kind()? {
            ProviderKind::Local => {
                let local = &settings.local;
                let source = match local.source {
                    LocalSourceKind::Keyfile => {
                        LocalSource::Keyfile(project_dir.join(&local.master_keyfile))
                    }
                    LocalSourceKind::Passphrase => {
                        let passphrase = passphrase.ok_or_else(|| {
                            LockboxError::ConfigError(
                                "the passphrase source needs a passphrase (set LOCKBOX_PASSPHRASE)"
                                    .into(),
                            )
                        })?;
                        LocalSource::Passphrase {
                            passphrase,
                            salt: local.salt_bytes()?,
                            params: local.argon2_params(),
                        }
                    }
                };
                Ok(Self::Local(LocalProvider::new(source)))
            }
            ProviderKind::External => Self::external_from_settings(settings),
        }
    }

    #[cfg(feature = "keyring-store")]
    fn external_from_settings(settings: &Settings) -> Result<Self> {
        let module = keyring::KeyringModule::new(&settings.external.account);
        Ok(Self::External(ExternalModuleProvider::new(Box::new(module))))
    }

    #[cfg(not(feature = "keyring-store"))]
    fn external_from_settings(_settings: &Settings) -> Result<Self> {
        Err(LockboxError::ConfigError(
            "the external provider needs a build with the `keyring-store` feature".into(),
        ))
    }
}

impl MasterKeyProvider for Provider {
    fn name(&self) -> &str {
        match self {
            Self::Local(p) => p.name(),
            Self::External(p) => p.name(),
        }
    }

    fn master_key(&self) -> Result<MasterKey> {
        match self {
            Self::Local(p) => p.master_key(),
            Self::External(p) => p.master_key(),
        }
    }
}
