//! `lockbox re-encrypt`: move an envelope to another key (rotation).
//!
//! The plaintext never leaves the process.

use crate::cli::output;
use crate::cli::{open_store, parse_key_id, read_input, write_output, Cli, IoArgs};
use crate::errors::Result;

/// Execute the `re-encrypt` command.
pub fn execute(cli: &Cli, key_id: &str, io: &IoArgs) -> Result<()> {
    let new_key_id = parse_key_id(key_id)?;
    let store = open_store(cli)?;

    let envelope = read_input(io, io.base64)?;
    let (rotated, old_key_id) = store.re_encrypt(&envelope, &new_key_id)?;

    write_output(io, &rotated, io.base64)?;
    output::success(&format!("Re-encrypted from {old_key_id} to {new_key_id}"));
    Ok(())
}
