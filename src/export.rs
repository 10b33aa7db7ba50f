//! Backup and transfer of guest data as JSON.
//!
//! `guestbox export` writes the whole guest store as a pretty-printed JSON
//! document (`{}` when there is no guest data); `guestbox import` replaces the
//! store with such a document. Imports that fail to parse or do not fit the
//! quota leave the existing data untouched.

use anyhow::{Context, Result};
use guestbox_core::GuestStore;
use std::path::Path;

/// Export guest data as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub fn run_export(store: &GuestStore, output: Option<&Path>) -> Result<()> {
    let json = store.export();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write export file: {}", path.display()))?;
            let data = store.read();
            eprintln!(
                "Exported {} tasks, {} results, {} notes, {} templates to {}",
                data.as_ref().map_or(0, |d| d.tasks.len()),
                data.as_ref().map_or(0, |d| d.results.len()),
                data.as_ref().map_or(0, |d| d.notes.len()),
                data.as_ref().map_or(0, |d| d.templates.len()),
                path.display()
            );
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

/// Replace the guest store with the document at `input` (`-` reads stdin).
pub fn run_import(store: &GuestStore, input: &Path) -> Result<()> {
    let text = if input == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read import file: {}", input.display()))?
    };

    store
        .import(&text)
        .with_context(|| format!("Import of {} failed; existing guest data kept", input.display()))?;

    let data = store.read().unwrap_or_else(guestbox_core::models::GuestData::empty);
    println!(
        "Imported {} tasks, {} results, {} notes, {} templates.",
        data.tasks.len(),
        data.results.len(),
        data.notes.len(),
        data.templates.len()
    );
    Ok(())
}
