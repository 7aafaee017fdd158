//! `lockbox keys`: list, create, show, enable and disable keys.

use crate::cli::output;
use crate::cli::{open_store, parse_key_id, Cli, KeysAction};
use crate::errors::Result;

/// Execute a `keys` subcommand.
pub fn execute(cli: &Cli, action: &KeysAction) -> Result<()> {
    let store = open_store(cli)?;

    match action {
        KeysAction::List => {
            let keys = store.list_keys()?;
            output::info(&format!("{} key(s) in {}", keys.len(), store.key_root().display()));
            output::print_keys_table(&keys);
        }
        KeysAction::Create { description } => {
            let metadata = store.create_key(description)?;
            output::success(&format!("Created key {}", metadata.key_id));
            output::print_keys_table(&[metadata]);
        }
        KeysAction::Show { key_id } => {
            let key = store.get_key_record(&parse_key_id(key_id)?)?;
            output::print_keys_table(&[key.metadata.clone()]);
        }
        KeysAction::Enable { key_id } => {
            let metadata = store.enable_key(&parse_key_id(key_id)?)?;
            output::success(&format!("Enabled key {}", metadata.key_id));
            output::print_keys_table(&[metadata]);
        }
        KeysAction::Disable { key_id } => {
            let metadata = store.disable_key(&parse_key_id(key_id)?)?;
            output::success(&format!("Disabled key {}", metadata.key_id));
            output::print_keys_table(&[metadata]);
        }
    }

    Ok(())
}
