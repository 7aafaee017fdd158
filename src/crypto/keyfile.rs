//! Master keyfiles for the local provider.
//!
//! A keyfile is exactly 32 random bytes written with owner-only
//! permissions.  Its contents *are* the master key, so anyone who can
//! read it can open every key record in the key root.

use std::fs;
use std::io::Write;
use std::path::Path;

use zeroize::Zeroizing;

use super::aead::KEY_LEN;
use super::keys::MasterKey;
use crate::errors::{LockboxError, Result};

/// Generate a new random master keyfile at `path`.
///
/// Refuses to overwrite an existing file.  Returns the key so the
/// caller can fingerprint it immediately.
pub fn generate_keyfile(path: &Path) -> Result<MasterKey> {
    if path.exists() {
        return Err(LockboxError::KeyfileError(format!(
            "keyfile already exists at {}",
            path.display()
        )));
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| {
        LockboxError::KeyfileError(format!("cannot create keyfile directory: {e}"))
    })?;

    let master = MasterKey::generate();
    write_new_keyfile(parent, path, master.as_bytes())?;
    Ok(master)
}

/// Write `bytes` to a temp file beside `path`, then move it into place.
///
/// On any failure the temp file is deleted and `path` is left untouched,
/// so a half-written keyfile never blocks the next attempt.
fn write_new_keyfile(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".master-key.")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| LockboxError::KeyfileError(format!("failed to create keyfile: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| LockboxError::KeyfileError(format!("failed to create keyfile: {e}")))?;
    }

    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| LockboxError::KeyfileError(format!("failed to write keyfile: {e}")))?;

    tmp.persist_noclobber(path).map_err(|e| {
        LockboxError::KeyfileError(format!("failed to create keyfile: {}", e.error))
    })?;
    Ok(())
}

/// Load a master keyfile from disk and validate its length.
///
/// A group- or world-readable keyfile still loads, but is reported.
pub fn load_keyfile(path: &Path) -> Result<MasterKey> {
    if !path.exists() {
        return Err(LockboxError::KeyfileError(format!(
            "keyfile not found at {}",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = fs::metadata(path) {
            let mode = meta.permissions().mode();
            if mode & 0o077 != 0 {
                tracing::warn!(
                    path = %path.display(),
                    mode = format_args!("{:o}", mode & 0o777),
                    "master keyfile is accessible by other users"
                );
            }
        }
    }

    let data = Zeroizing::new(
        fs::read(path)
            .map_err(|e| LockboxError::KeyfileError(format!("failed to read keyfile: {e}")))?,
    );

    if data.len() != KEY_LEN {
        return Err(LockboxError::KeyfileError(format!(
            "keyfile must be exactly {} bytes, got {}",
            KEY_LEN,
            data.len()
        )));
    }

    MasterKey::from_slice(&data)
}
