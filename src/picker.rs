//! Folder selection and one-shot notices shown through native dialogs.

use std::path::PathBuf;

use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use tracing::info;

use crate::error::Error;

/// Roots to scan: the folders given on the command line, or the folders the
/// user picks in a native dialog when none were given.
///
/// # Errors
/// Returns [`Error::NoSelection`] when the dialog is dismissed without a
/// choice.
pub fn select_roots(cli_roots: Vec<PathBuf>) -> Result<Vec<PathBuf>, Error> {
    if !cli_roots.is_empty() {
        return Ok(cli_roots);
    }
    let picked = FileDialog::new()
        .set_title("Select folders with images")
        .pick_folders()
        .unwrap_or_default();
    if picked.is_empty() {
        return Err(Error::NoSelection);
    }
    info!(count = picked.len(), "folders selected");
    Ok(picked)
}

/// Tell the user the scan found nothing to show.
pub fn notify_empty_catalog(roots: &[PathBuf]) {
    let listed = roots
        .iter()
        .map(|r| r.display().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    MessageDialog::new()
        .set_level(MessageLevel::Warning)
        .set_title("No images found")
        .set_description(format!(
            "{}.\n\n{listed}",
            capitalise(&Error::EmptyCatalog.to_string())
        ))
        .set_buttons(MessageButtons::Ok)
        .show();
}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}
