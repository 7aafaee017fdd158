//! Integration tests for the Lockbox CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.
//! Everything runs non-interactively: the keyfile provider needs no
//! prompt, and the passphrase flow reads `LOCKBOX_PASSPHRASE`.

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;

/// Helper: get a Command pointing at the lockbox binary, isolated from
/// any LOCKBOX_* variables in the caller's environment.
fn lockbox(dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("lockbox").expect("binary should exist");
    for var in [
        "LOCKBOX_CONFIG_DIR",
        "LOCKBOX_KEY_ROOT",
        "LOCKBOX_PROVIDER",
        "LOCKBOX_PASSPHRASE",
        "LOCKBOX_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.current_dir(dir.path());
    cmd
}

/// Helper: `init` with the local keyfile provider.
fn init_local(dir: &TempDir) {
    lockbox(dir)
        .args(["--provider", "local", "init"])
        .assert()
        .success();
}

/// Helper: create a key and return its id, scraped from the status line.
fn create_key(dir: &TempDir, description: &str) -> String {
    let out = lockbox(dir)
        .args(["keys", "create", "-d", description])
        .output()
        .unwrap();
    assert!(out.status.success(), "keys create failed: {out:?}");

    let stderr = String::from_utf8_lossy(&out.stderr);
    stderr
        .split_whitespace()
        .find(|token| token.len() == 36 && token.matches('-').count() == 4)
        .expect("key id in output")
        .to_string()
}

/// Helper: encrypt `plaintext` under `key_id`, returning base64 text.
fn encrypt_b64(dir: &TempDir, key_id: &str, plaintext: &str) -> String {
    let out = lockbox(dir)
        .args(["encrypt", "--base64", "-k", key_id])
        .write_stdin(plaintext)
        .output()
        .unwrap();
    assert!(out.status.success(), "encrypt failed: {out:?}");
    String::from_utf8(out.stdout).unwrap()
}

/// Helper: the bare binary, for flags that touch no project state.
fn bin() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("lockbox").expect("binary should exist")
}

#[test]
fn help_flag_shows_usage() {
    bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Envelope-encryption key manager"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("keys"))
        .stdout(predicate::str::contains("encrypt"))
        .stdout(predicate::str::contains("decrypt"))
        .stdout(predicate::str::contains("re-encrypt"))
        .stdout(predicate::str::contains("generate-data-key"));
}

#[test]
fn no_args_shows_help() {
    bin()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn init_without_provider_fails_closed() {
    let dir = TempDir::new().unwrap();

    lockbox(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("provider"));

    assert!(!dir.path().join(".lockbox.toml").exists());
}

#[test]
fn init_creates_config_keyfile_and_key_root() {
    let dir = TempDir::new().unwrap();
    init_local(&dir);

    let config = std::fs::read_to_string(dir.path().join(".lockbox.toml")).unwrap();
    assert!(config.contains("provider = \"local\""));
    assert!(config.contains("master_key_fingerprint"));
    assert!(dir.path().join(".lockbox/master.key").is_file());
    assert!(dir.path().join(".lockbox/keys").is_dir());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(dir.path().join(".lockbox/master.key"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn init_twice_fails() {
    let dir = TempDir::new().unwrap();
    init_local(&dir);

    lockbox(&dir)
        .args(["--provider", "local", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn commands_before_init_fail() {
    let dir = TempDir::new().unwrap();
    lockbox(&dir).args(["keys", "list"]).assert().failure();
}

#[test]
fn create_and_list_keys() {
    let dir = TempDir::new().unwrap();
    init_local(&dir);

    let id = create_key(&dir, "billing");
    assert!(dir
        .path()
        .join(".lockbox/keys")
        .join(format!("{id}.key"))
        .is_file());

    lockbox(&dir)
        .args(["keys", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()))
        .stdout(predicate::str::contains("billing"));
}

#[test]
fn encrypt_then_decrypt_roundtrip() {
    let dir = TempDir::new().unwrap();
    init_local(&dir);
    let id = create_key(&dir, "data");

    let envelope = encrypt_b64(&dir, &id, "hello");

    lockbox(&dir)
        .args(["decrypt", "--base64"])
        .write_stdin(envelope)
        .assert()
        .success()
        .stdout("hello");
}

#[test]
fn disabled_key_blocks_decrypt_until_enabled() {
    let dir = TempDir::new().unwrap();
    init_local(&dir);
    let id = create_key(&dir, "toggle");
    let envelope = encrypt_b64(&dir, &id, "guarded");

    lockbox(&dir)
        .args(["keys", "disable", &id])
        .assert()
        .success();

    lockbox(&dir)
        .args(["decrypt", "--base64"])
        .write_stdin(envelope.clone())
        .assert()
        .failure()
        .stderr(predicate::str::contains("disabled"));

    lockbox(&dir)
        .args(["keys", "enable", &id])
        .assert()
        .success();

    lockbox(&dir)
        .args(["decrypt", "--base64"])
        .write_stdin(envelope)
        .assert()
        .success()
        .stdout("guarded");
}

#[test]
fn re_encrypt_moves_envelope_to_new_key() {
    let dir = TempDir::new().unwrap();
    init_local(&dir);
    let old = create_key(&dir, "old");
    let new = create_key(&dir, "new");
    let envelope = encrypt_b64(&dir, &old, "rotate");

    let out = lockbox(&dir)
        .args(["re-encrypt", "--base64", "-k", &new])
        .write_stdin(envelope)
        .output()
        .unwrap();
    assert!(out.status.success(), "re-encrypt failed: {out:?}");
    let rotated = String::from_utf8(out.stdout).unwrap();

    lockbox(&dir)
        .args(["keys", "disable", &old])
        .assert()
        .success();

    lockbox(&dir)
        .args(["decrypt", "--base64"])
        .write_stdin(rotated)
        .assert()
        .success()
        .stdout("rotate");
}

#[test]
fn tampered_envelope_is_rejected() {
    let dir = TempDir::new().unwrap();
    init_local(&dir);
    let id = create_key(&dir, "t");

    let input = dir.path().join("plain.txt");
    let sealed = dir.path().join("sealed.bin");
    std::fs::write(&input, b"binary mode").unwrap();

    lockbox(&dir)
        .args(["encrypt", "-k", &id, "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&sealed)
        .assert()
        .success();

    let mut bytes = std::fs::read(&sealed).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x80;
    std::fs::write(&sealed, bytes).unwrap();

    lockbox(&dir)
        .args(["decrypt", "-i"])
        .arg(&sealed)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authentication failed"));
}

#[test]
fn unknown_key_id_is_rejected() {
    let dir = TempDir::new().unwrap();
    init_local(&dir);

    lockbox(&dir)
        .args(["keys", "show", "00000000-0000-4000-8000-000000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    lockbox(&dir)
        .args(["keys", "show", "../../etc/passwd"])
        .assert()
        .failure();
}

#[test]
fn generate_data_key_prints_key_and_envelope() {
    let dir = TempDir::new().unwrap();
    init_local(&dir);
    let id = create_key(&dir, "dk");

    lockbox(&dir)
        .args(["generate-data-key", "-k", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("KeyID:     {id}")))
        .stdout(predicate::str::contains("Plaintext:"))
        .stdout(predicate::str::contains("Envelope:"));
}

#[test]
fn passphrase_provider_via_env() {
    let dir = TempDir::new().unwrap();

    lockbox(&dir)
        .args(["--provider", "local", "init", "--passphrase"])
        .env("LOCKBOX_PASSPHRASE", "correct horse battery")
        .assert()
        .success();

    let config = std::fs::read_to_string(dir.path().join(".lockbox.toml")).unwrap();
    assert!(config.contains("source = \"passphrase\""));
    assert!(config.contains("salt"));

    lockbox(&dir)
        .args(["keys", "list"])
        .env("LOCKBOX_PASSPHRASE", "correct horse battery")
        .assert()
        .success();

    lockbox(&dir)
        .args(["keys", "list"])
        .env("LOCKBOX_PASSPHRASE", "wrong horse battery")
        .assert()
        .failure()
        .stderr(predicate::str::contains("master key"));
}
