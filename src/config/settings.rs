use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::Argon2Params;
use crate::errors::{LockboxError, Result};

/// Which master key provider variant to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Keyfile or passphrase on local storage.
    Local,
    /// External secure module (OS keyring).
    External,
}

/// Where the local provider reads its secret from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalSourceKind {
    #[default]
    Keyfile,
    Passphrase,
}

/// Project-level configuration, loaded from `.lockbox.toml`.
///
/// Every field except `provider` has a default.  A missing `provider`
/// is an error when the store is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to the project dir) holding the key files.
    #[serde(default = "default_key_root")]
    pub key_root: String,

    /// Master key provider variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,

    /// Base64 key check value of the expected master key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_key_fingerprint: Option<String>,

    #[serde(default)]
    pub local: LocalSettings,

    #[serde(default)]
    pub external: ExternalSettings,
}

/// `[local]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSettings {
    #[serde(default)]
    pub source: LocalSourceKind,

    /// Path (relative to the project dir) of the 32-byte master keyfile.
    #[serde(default = "default_master_keyfile")]
    pub master_keyfile: String,

    /// Base64 Argon2id salt for the passphrase source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

/// `[external]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalSettings {
    /// Account label the master key is stored under in the module.
    #[serde(default = "default_account")]
    pub account: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_key_root() -> String {
    ".lockbox/keys".to_string()
}

fn default_master_keyfile() -> String {
    ".lockbox/master.key".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_account() -> String {
    "default".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            key_root: default_key_root(),
            provider: None,
            master_key_fingerprint: None,
            local: LocalSettings::default(),
            external: ExternalSettings::default(),
        }
    }
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            source: LocalSourceKind::default(),
            master_keyfile: default_master_keyfile(),
            salt: None,
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Default for ExternalSettings {
    fn default() -> Self {
        Self {
            account: default_account(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project dir.
    pub const FILE_NAME: &'static str = ".lockbox.toml";

    /// Path of the config file inside `project_dir`.
    pub fn file_path(project_dir: &Path) -> PathBuf {
        project_dir.join(Self::FILE_NAME)
    }

    /// Load settings from `<project_dir>/.lockbox.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = Self::file_path(project_dir);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        toml::from_str(&contents).map_err(|e| {
            LockboxError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })
    }

    /// Write these settings to `<project_dir>/.lockbox.toml`.
    pub fn save(&self, project_dir: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| LockboxError::SerializationError(format!("settings: {e}")))?;
        std::fs::write(Self::file_path(project_dir), contents)?;
        Ok(())
    }

    /// The configured provider.  Unset is an error, never a default.
    pub fn provider_kind(&self) -> Result<ProviderKind> {
        self.provider.ok_or_else(|| {
            LockboxError::ConfigError(format!(
                "no master key provider selected; set `provider` in {} or LOCKBOX_PROVIDER",
                Self::FILE_NAME
            ))
        })
    }

    /// Absolute key root for a given project dir.
    pub fn key_root_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.key_root)
    }
}

impl LocalSettings {
    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    /// Decode the stored passphrase salt.
    pub fn salt_bytes(&self) -> Result<Vec<u8>> {
        let encoded = self.salt.as_deref().ok_or_else(|| {
            LockboxError::ConfigError("the passphrase source needs `local.salt`".into())
        })?;
        BASE64
            .decode(encoded)
            .map_err(|e| LockboxError::ConfigError(format!("`local.salt` is not base64: {e}")))
    }
}

// ── Tests ────────────────────────────────────────────────────────────
