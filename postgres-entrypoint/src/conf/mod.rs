//! Line-oriented editing of PostgreSQL configuration files
//!
//! - `postgresql.conf` parameters are replaced in place (commented defaults included)
//! - `pg_hba.conf` entries are appended once
//! - `recovery.conf` conninfo pairs are patched one key at a time

mod conninfo;
mod hba;
mod postgresql;
mod recovery;

pub use conninfo::Conninfo;
pub use hba::{append_hba_entry, has_hba_entry, set_hba_param};
pub use postgresql::{
    apply_param, get_param, get_postgresql_param, quote_value, set_postgresql_param,
};
pub use recovery::{apply_recovery_param, render_recovery_conf, set_recovery_param};

use crate::error::{EntrypointError, Result};
use std::fs;
use std::path::Path;

/// Read a config file, apply `edit` and write it back if it returned new content.
///
/// Returns whether the file changed.
pub(crate) fn rewrite(path: &Path, edit: impl FnOnce(&str) -> Option<String>) -> Result<bool> {
    let content =
        fs::read_to_string(path).map_err(|e| EntrypointError::config_file(path, e))?;

    match edit(&content) {
        Some(updated) => {
            fs::write(path, updated).map_err(|e| EntrypointError::config_file(path, e))?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Append a line, adding the missing newline at the end of `content` first.
pub(crate) fn append_line(content: &str, line: &str) -> String {
    let mut updated = String::with_capacity(content.len() + line.len() + 2);
    updated.push_str(content);
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(line);
    updated.push('\n');
    updated
}
