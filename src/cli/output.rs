//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so styling is
//! consistent across commands.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::model::entry::{TITLE, URL, USERNAME};
use crate::model::Entry;

pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Table of entries (Title, UserName, URL).  Passwords are never shown.
pub fn print_entries_table(entries: &[Entry]) {
    if entries.is_empty() {
        info("No entries in this database yet.");
        tip("Run `kdbx set <FILE> <TITLE>` to add one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Title", "UserName", "URL"]);

    for e in entries {
        let cell = |key: &str| {
            e.field(key)
                .map(|v| v.reveal().to_string())
                .unwrap_or_default()
        };
        table.add_row(vec![cell(TITLE), cell(USERNAME), cell(URL)]);
    }

    println!("{table}");
}

/// Key/value table used by `info`.
pub fn print_properties(rows: &[(&str, String)]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    for (k, v) in rows {
        table.add_row(vec![k.to_string(), v.clone()]);
    }
    println!("{table}");
}
