//! `lockbox decrypt`: open an envelope and write the plaintext.

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{open_store, read_input, write_output, Cli, IoArgs};
use crate::errors::Result;

/// Execute the `decrypt` command.
pub fn execute(cli: &Cli, io: &IoArgs) -> Result<()> {
    let store = open_store(cli)?;

    let envelope = read_input(io, io.base64)?;
    let (plaintext, key_id) = store.decrypt(&envelope)?;
    let plaintext = Zeroizing::new(plaintext);

    write_output(io, &plaintext, false)?;

    if io.output.is_some() {
        output::success(&format!("Decrypted with key {key_id}"));
    }
    Ok(())
}
