//! `lockbox init`: provision a master key and write `.lockbox.toml`.
//!
//! 1. Create the key root (mode 0700).
//! 2. Provision the master key for the selected provider.
//! 3. Record the provider and the master key fingerprint in the config.
//! 4. Re-open the store through the normal startup path as a check.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::cli::output;
use crate::cli::{load_settings, project_dir, prompt_new_passphrase, Cli};
use crate::config::{LocalSourceKind, ProviderKind, Settings};
use crate::crypto::{derive_master_key, generate_keyfile, generate_salt, MasterKey};
use crate::errors::{LockboxError, Result};
use crate::provider::Provider;
use crate::store::persist::list_key_ids;
use crate::store::{KeyStore, StoreConfig};

/// Execute the `init` command.
pub fn execute(cli: &Cli, use_passphrase: bool) -> Result<()> {
    let dir = project_dir(cli)?;
    let config_path = Settings::file_path(&dir);

    // 1. Refuse to clobber an existing setup.
    if config_path.exists() {
        output::tip("Delete it first if you really want to start over.");
        return Err(LockboxError::ConfigError(format!(
            "already initialized: {} exists",
            config_path.display()
        )));
    }

    let mut settings = load_settings(cli)?;
    let kind = settings.provider_kind()?;
    if use_passphrase && kind != ProviderKind::Local {
        return Err(LockboxError::CommandFailed(
            "--passphrase only applies to the local provider".into(),
        ));
    }

    // 2. Create the key root.  Existing keys would be orphaned by a new master key.
    let key_root = settings.key_root_path(&dir);
    if key_root.exists() && !list_key_ids(&key_root)?.is_empty() {
        return Err(LockboxError::ConfigError(format!(
            "{} already contains keys sealed under another master key",
            key_root.display()
        )));
    }
    create_private_dir(&key_root)?;
    output::info(&format!("Key root: {}", key_root.display()));

    // 3. Provision the master key.
    let mut passphrase = None;
    let master = match kind {
        ProviderKind::Local if use_passphrase => {
            let pw = prompt_new_passphrase()?;
            let salt = generate_salt();
            settings.local.source = LocalSourceKind::Passphrase;
            settings.local.salt = Some(BASE64.encode(salt));
            let key = derive_master_key(pw.as_bytes(), &salt, &settings.local.argon2_params())?;
            passphrase = Some(pw);
            key
        }
        ProviderKind::Local => {
            settings.local.source = LocalSourceKind::Keyfile;
            let path = dir.join(&settings.local.master_keyfile);
            let key = generate_keyfile(&path)?;
            output::info(&format!("Master keyfile: {}", path.display()));
            key
        }
        ProviderKind::External => provision_external(&settings)?,
    };

    // 4. Save the config with the key check value.
    settings.provider = Some(kind);
    settings.master_key_fingerprint = Some(master.fingerprint());
    drop(master);
    settings.save(&dir)?;

    // 5. Open the store exactly as later commands will.
    let provider = Provider::from_settings(&settings, &dir, passphrase)?;
    KeyStore::open(StoreConfig::from_settings(&settings, &dir), &provider)?;

    output::success(&format!(
        "Initialized lockbox with the {} provider at {}",
        provider_label(kind, settings.local.source),
        config_path.display()
    ));
    output::tip("Run `lockbox keys create -d <description>` to create your first key.");
    output::tip("Back up the master key: without it no key file can be opened.");

    Ok(())
}

fn provider_label(kind: ProviderKind, source: LocalSourceKind) -> &'static str {
    match (kind, source) {
        (ProviderKind::Local, LocalSourceKind::Keyfile) => "local keyfile",
        (ProviderKind::Local, LocalSourceKind::Passphrase) => "local passphrase",
        (ProviderKind::External, _) => "external keyring",
    }
}

/// Generate a master key and hand it to the keyring.
#[cfg(feature = "keyring-store")]
fn provision_external(settings: &Settings) -> Result<MasterKey> {
    let master = MasterKey::generate();
    crate::provider::keyring::store_master_key(&settings.external.account, &master)?;
    output::info(&format!(
        "Master key stored in the OS keyring (account '{}')",
        settings.external.account
    ));
    Ok(master)
}

#[cfg(not(feature = "keyring-store"))]
fn provision_external(_settings: &Settings) -> Result<MasterKey> {
    Err(LockboxError::ConfigError(
        "keyring support not compiled; rebuild with `cargo build --features keyring-store`".into(),
    ))
}

/// Create `path` (and parents) and restrict it to the owner.
fn create_private_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}
