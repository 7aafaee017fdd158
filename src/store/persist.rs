//! Key file I/O.
//!
//! One file per key: `<key_root>/<KeyID>.key`, mode 0600, containing
//! the sealed JSON record and nothing else.
//!
//! Writes go through a uniquely named temp file in the same directory
//! followed by a rename, so readers see either the old record or the
//! new one, never a torn write.  A failed write removes its temp file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::record::KeyId;
use crate::errors::{LockboxError, Result};

/// Extension of every key file.
pub const KEY_FILE_EXT: &str = "key";

/// Path of the key file for `id` under `root`.
pub fn key_file_path(root: &Path, id: &KeyId) -> PathBuf {
    root.join(format!("{id}.{KEY_FILE_EXT}"))
}

/// Write `sealed` as the complete contents of the key file for `id`.
///
/// With `create_new` set, an existing file for `id` is an error
/// instead of being replaced.
pub fn write_key_file(root: &Path, id: &KeyId, sealed: &[u8], create_new: bool) -> Result<()> {
    let path = key_file_path(root, id);
    let persist_err = |e: io::Error| {
        LockboxError::PersistenceError(format!("{}: {e}", path.display()))
    };

    if create_new && path.exists() {
        return Err(LockboxError::PersistenceError(format!(
            "key file already exists at {}",
            path.display()
        )));
    }

    // Each write gets its own randomly named temp file; it is deleted on drop
    // unless persisted.
    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{id}."))
        .suffix(".tmp")
        .tempfile_in(root)
        .map_err(persist_err)?;
    write_owner_only(tmp.as_file_mut(), sealed).map_err(persist_err)?;

    if create_new {
        tmp.persist_noclobber(&path).map_err(|e| persist_err(e.error))?;
    } else {
        tmp.persist(&path).map_err(|e| persist_err(e.error))?;
    }
    Ok(())
}

/// Restrict `file` to the owner, write `data` and fsync it.
fn write_owner_only(file: &mut fs::File, data: &[u8]) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(data)?;
    file.sync_all()
}

/// Read the raw sealed bytes of the key file for `id`.
pub fn read_key_file(root: &Path, id: &KeyId) -> Result<Vec<u8>> {
    let path = key_file_path(root, id);
    match fs::read(&path) {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(LockboxError::KeyNotFound(id.to_string()))
        }
        Err(e) => Err(LockboxError::Io(e)),
    }
}

/// Enumerate the key ids that have a key file under `root`, sorted.
///
/// Only regular files named `<canonical KeyID>.key` count; temp files,
/// directories and anything else are ignored.
pub fn list_key_ids(root: &Path) -> Result<Vec<KeyId>> {
    let mut ids: Vec<KeyId> = fs::read_dir(root)?.filter_map(key_id_of_entry).collect();
    ids.sort();
    Ok(ids)
}

/// The key id named by one directory entry, if it is a key file.
///
/// An entry that cannot be inspected is logged and skipped.
fn key_id_of_entry(entry: io::Result<fs::DirEntry>) -> Option<KeyId> {
    let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
            warn!(error = %e, "skipping unreadable entry in key root");
            return None;
        }
    };
    let file_type = match entry.file_type() {
        Ok(file_type) => file_type,
        Err(e) => {
            warn!(path = %entry.path().display(), error = %e, "skipping unreadable entry in key root");
            return None;
        }
    };
    if !file_type.is_file() {
        return None;
    }

    let file_name = entry.file_name();
    let name = file_name.to_str()?;
    let stem = name.strip_suffix(&format!(".{KEY_FILE_EXT}"))?;

    match KeyId::parse(stem) {
        Ok(id) => Some(id),
        Err(_) => {
            debug!(file = name, "ignoring non-key file in key root");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    #[test]
    fn write_then_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let id = KeyId::generate();

        write_key_file(dir.path(), &id, b"sealed-bytes", true).unwrap();
        assert_eq!(read_key_file(dir.path(), &id).unwrap(), b"sealed-bytes");
    }

    #[test]
    fn create_new_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let id = KeyId::generate();

        write_key_file(dir.path(), &id, b"first", true).unwrap();
        let err = write_key_file(dir.path(), &id, b"second", true).unwrap_err();
        assert!(matches!(err, LockboxError::PersistenceError(_)));

        // Replacing is allowed when asked for.
        write_key_file(dir.path(), &id, b"second", false).unwrap();
        assert_eq!(read_key_file(dir.path(), &id).unwrap(), b"second");
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let id = KeyId::generate();
        write_key_file(dir.path(), &id, b"data", true).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![format!("{id}.key")]);
    }

    #[test]
    fn failed_write_is_a_persistence_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let err = write_key_file(&missing, &KeyId::generate(), b"x", true).unwrap_err();
        assert!(matches!(err, LockboxError::PersistenceError(_)));
    }

    #[cfg(unix)]
    #[test]
    fn key_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let id = KeyId::generate();
        write_key_file(dir.path(), &id, b"data", true).unwrap();

        let mode = fs::metadata(key_file_path(dir.path(), &id))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn missing_file_is_key_not_found() {
        let dir = TempDir::new().unwrap();
        let err = read_key_file(dir.path(), &KeyId::generate()).unwrap_err();
        assert!(matches!(err, LockboxError::KeyNotFound(_)));
    }

    #[test]
    fn listing_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        let a = KeyId::generate();
        let b = KeyId::generate();
        write_key_file(dir.path(), &a, b"a", true).unwrap();
        write_key_file(dir.path(), &b, b"b", true).unwrap();

        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        fs::write(dir.path().join("not-a-uuid.key"), b"junk").unwrap();
        fs::write(dir.path().join(format!(".{a}.key.1.tmp")), b"tmp").unwrap();
        fs::create_dir(dir.path().join(format!("{}.key", KeyId::generate()))).unwrap();

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(list_key_ids(dir.path()).unwrap(), expected);
    }

    #[test]
    #[traced_test]
    fn unreadable_entry_is_skipped_and_logged() {
        let failed = Err(io::Error::new(io::ErrorKind::PermissionDenied, "entry vanished"));
        assert!(key_id_of_entry(failed).is_none());
        assert!(logs_contain("skipping unreadable entry in key root"));
        assert!(logs_contain("entry vanished"));
    }

    #[test]
    fn concurrent_writers_never_share_a_temp_file() {
        let dir = TempDir::new().unwrap();
        let id = KeyId::generate();
        write_key_file(dir.path(), &id, &[0u8; 4096], true).unwrap();

        let writers: Vec<_> = (0..4u8)
            .map(|n| {
                let root = dir.path().to_path_buf();
                let id = id.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        write_key_file(&root, &id, &[n; 4096], false).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        // The file holds exactly one writer's payload, never a mix.
        let data = read_key_file(dir.path(), &id).unwrap();
        assert_eq!(data.len(), 4096);
        assert!(data.iter().all(|&b| b == data[0]));
        assert_eq!(list_key_ids(dir.path()).unwrap(), vec![id]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
