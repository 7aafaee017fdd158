//! CLI module: Clap argument parser, output helpers, and command implementations.
//!
//! The CLI drives a local `KeyStore` directly; it is an administration
//! tool, not a network client.

pub mod commands;
pub mod output;

use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::Parser;
use zeroize::Zeroizing;

use crate::config::{LocalSourceKind, ProviderKind, Settings};
use crate::errors::{LockboxError, Result};
use crate::provider::Provider;
use crate::store::{KeyId, KeyStore, StoreConfig};

/// Minimum passphrase length to prevent trivially weak passphrases.
const MIN_PASSPHRASE_LEN: usize = 8;

/// Environment variable consulted before prompting for a passphrase.
pub const PASSPHRASE_ENV: &str = "LOCKBOX_PASSPHRASE";

/// Lockbox CLI: local envelope-encryption key manager.
#[derive(Parser)]
#[command(name = "lockbox", about = "Envelope-encryption key manager", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project directory holding .lockbox.toml (default: current directory)
    #[arg(long, env = "LOCKBOX_CONFIG_DIR", default_value = ".", global = true)]
    pub config_dir: String,

    /// Key root directory, overriding the config file
    #[arg(long, env = "LOCKBOX_KEY_ROOT", global = true)]
    pub key_root: Option<String>,

    /// Master key provider, overriding the config file
    #[arg(long, env = "LOCKBOX_PROVIDER", value_enum, global = true)]
    pub provider: Option<ProviderKind>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Set up a key root, master key and .lockbox.toml
    Init {
        /// Derive the local master key from a passphrase instead of a keyfile
        #[arg(long)]
        passphrase: bool,
    },

    /// Manage keys (list, create, show, enable, disable)
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Encrypt data under a key
    Encrypt {
        /// Key to encrypt under
        #[arg(short, long)]
        key_id: String,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Decrypt an envelope produced by `encrypt`
    Decrypt {
        #[command(flatten)]
        io: IoArgs,
    },

    /// Re-encrypt an envelope under a different key
    ReEncrypt {
        /// Key to move the data to
        #[arg(short, long)]
        key_id: String,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Generate a data key for client-side encryption
    GenerateDataKey {
        /// Key to wrap the data key under
        #[arg(short, long)]
        key_id: String,
    },
}

/// Key management subcommands.
#[derive(clap::Subcommand)]
pub enum KeysAction {
    /// List all keys
    List,

    /// Create a new key
    Create {
        /// Description for the new key
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Show one key's metadata
    Show {
        /// Key id
        key_id: String,
    },

    /// Enable a key
    Enable {
        /// Key id
        key_id: String,
    },

    /// Disable a key
    Disable {
        /// Key id
        key_id: String,
    },
}

/// Input/output options shared by the data commands.
#[derive(clap::Args)]
pub struct IoArgs {
    /// Read from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<String>,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Envelopes are base64 text instead of raw bytes
    #[arg(long)]
    pub base64: bool,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the project directory from `--config-dir`.
pub fn project_dir(cli: &Cli) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(&cli.config_dir))
}

/// Load `.lockbox.toml` and apply command-line / env overrides.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(&project_dir(cli)?)?;
    if let Some(root) = &cli.key_root {
        settings.key_root.clone_from(root);
    }
    if let Some(kind) = cli.provider {
        settings.provider = Some(kind);
    }
    Ok(settings)
}

/// Open the key store described by the settings.
///
/// The master key is fetched here, once per command.
pub fn open_store(cli: &Cli) -> Result<KeyStore> {
    let dir = project_dir(cli)?;
    let settings = load_settings(cli)?;

    let passphrase = if settings.provider == Some(ProviderKind::Local)
        && settings.local.source == LocalSourceKind::Passphrase
    {
        Some(prompt_passphrase()?)
    } else {
        None
    };

    let provider = Provider::from_settings(&settings, &dir, passphrase)?;
    KeyStore::open(StoreConfig::from_settings(&settings, &dir), &provider)
}

/// Get the master passphrase, trying `LOCKBOX_PASSPHRASE` first and
/// then an interactive prompt.
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory on drop.
pub fn prompt_passphrase() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSPHRASE_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter master passphrase")
        .interact()
        .map_err(|e| LockboxError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new passphrase with confirmation (used during `init`).
///
/// Also respects `LOCKBOX_PASSPHRASE` for scripted usage.
pub fn prompt_new_passphrase() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSPHRASE_ENV) {
        if !pw.is_empty() {
            if pw.len() < MIN_PASSPHRASE_LEN {
                return Err(LockboxError::CommandFailed(format!(
                    "passphrase must be at least {MIN_PASSPHRASE_LEN} characters"
                )));
            }
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let passphrase = dialoguer::Password::new()
            .with_prompt("Choose master passphrase")
            .with_confirmation(
                "Confirm master passphrase",
                "Passphrases do not match, try again",
            )
            .interact()
            .map_err(|e| LockboxError::CommandFailed(format!("passphrase prompt: {e}")))?;

        if passphrase.len() < MIN_PASSPHRASE_LEN {
            output::warning(&format!(
                "Passphrase must be at least {MIN_PASSPHRASE_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(passphrase));
    }
}

/// Parse a key id argument.
pub fn parse_key_id(raw: &str) -> Result<KeyId> {
    KeyId::parse(raw.trim())
}

/// Read command input from `--input` or stdin.
///
/// With `armored`, the input is base64 text and is decoded.
pub fn read_input(io: &IoArgs, armored: bool) -> Result<Vec<u8>> {
    let raw = match &io.input {
        Some(path) => fs::read(path)?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    if !armored {
        return Ok(raw);
    }

    let text = String::from_utf8(raw)
        .map_err(|_| LockboxError::CommandFailed("base64 input is not valid UTF-8".into()))?;
    BASE64
        .decode(text.trim())
        .map_err(|e| LockboxError::CommandFailed(format!("invalid base64 input: {e}")))
}

/// Write command output to `--output` or stdout.
///
/// With `armored`, the bytes are written as one line of base64.
pub fn write_output(io: &IoArgs, data: &[u8], armored: bool) -> Result<()> {
    let bytes = if armored {
        let mut line = BASE64.encode(data).into_bytes();
        line.push(b'\n');
        line
    } else {
        data.to_vec()
    };

    match &io.output {
        Some(path) => fs::write(path, &bytes)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
