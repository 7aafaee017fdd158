//! `lockbox generate-data-key`: mint a data key for client-side use.
//!
//! Prints the plaintext key and its envelope, both base64.  Store the
//! envelope next to your data; recover the key later with `decrypt`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroizing;

use crate::cli::{open_store, parse_key_id, Cli};
use crate::errors::Result;

/// Execute the `generate-data-key` command.
pub fn execute(cli: &Cli, key_id: &str) -> Result<()> {
    let key_id = parse_key_id(key_id)?;
    let store = open_store(cli)?;

    let generated = store.generate_data_key(&key_id)?;
    let plaintext = Zeroizing::new(BASE64.encode(generated.plaintext.as_slice()));

    println!("KeyID:     {}", generated.key_id);
    println!("Plaintext: {}", plaintext.as_str());
    println!("Envelope:  {}", BASE64.encode(&generated.envelope));
    Ok(())
}
