//! Colored terminal output helpers.
//!
//! Status messages go to stderr so that `encrypt`/`decrypt` can stream
//! data on stdout.  Tables go to stdout.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::store::KeyMetadata;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    eprintln!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    eprintln!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    eprintln!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of key metadata (KeyID, Created, Enabled, Description).
pub fn print_keys_table(keys: &[KeyMetadata]) {
    if keys.is_empty() {
        info("No keys in this key root yet.");
        tip("Run `lockbox keys create -d <description>` to create one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["KeyID", "Created", "Enabled", "Description"]);

    for k in keys {
        let enabled = if k.enabled {
            style("yes").green().to_string()
        } else {
            style("no").red().to_string()
        };
        table.add_row(vec![
            k.key_id.to_string(),
            k.creation_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            enabled,
            k.description.clone(),
        ]);
    }

    println!("{table}");
}
