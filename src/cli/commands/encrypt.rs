//! `lockbox encrypt`: seal data from a file or stdin under a key.

use crate::cli::{open_store, parse_key_id, read_input, write_output, Cli, IoArgs};
use crate::errors::Result;

/// Execute the `encrypt` command.
pub fn execute(cli: &Cli, key_id: &str, io: &IoArgs) -> Result<()> {
    let key_id = parse_key_id(key_id)?;
    let store = open_store(cli)?;

    // Plaintext is always raw; only the envelope can be armored.
    let plaintext = zeroize::Zeroizing::new(read_input(io, false)?);
    let envelope = store.encrypt(&plaintext, &key_id)?;

    write_output(io, &envelope, io.base64)
}
