//! `pg_hba.conf` entry management

use super::{append_line, rewrite};
use crate::error::Result;
use std::path::Path;
use tracing::info;

/// Whitespace-separated fields of an entry, comments stripped.
fn fields(line: &str) -> Vec<&str> {
    line.split('#')
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .collect()
}

/// Whether an active entry with the same fields exists.
pub fn has_hba_entry(content: &str, entry: &str) -> bool {
    let wanted = fields(entry);
    !wanted.is_empty() && content.lines().any(|line| fields(line) == wanted)
}

/// Append `entry` unless it is already present. Returns None if unchanged.
pub fn append_hba_entry(content: &str, entry: &str) -> Option<String> {
    if fields(entry).is_empty() || has_hba_entry(content, entry) {
        None
    } else {
        Some(append_line(content, entry.trim()))
    }
}

/// Add an entry to `pg_hba.conf` once.
pub fn set_hba_param(hba: &Path, entry: &str) -> Result<bool> {
    let changed = rewrite(hba, |content| append_hba_entry(content, entry))?;
    if changed {
        info!(entry, "Adding pg_hba.conf entry");
    }
    Ok(changed)
}
