//! `recovery.conf` rendering and `primary_conninfo` patching

use super::conninfo::Conninfo;
use super::postgresql::{apply_param, get_param, quote_value};
use super::rewrite;
use crate::error::Result;
use std::path::Path;
use tracing::info;

const PRIMARY_CONNINFO: &str = "primary_conninfo";

/// Initial `recovery.conf` for a streaming replica.
pub fn render_recovery_conf(conninfo: &Conninfo) -> String {
    format!(
        "standby_mode = 'on'\n{} = {}\n",
        PRIMARY_CONNINFO,
        quote_value(&conninfo.to_string())
    )
}

/// Set one conninfo pair inside `primary_conninfo`. Returns None if unchanged.
pub fn apply_recovery_param(content: &str, key: &str, value: &str) -> Option<String> {
    let mut conninfo = get_param(content, PRIMARY_CONNINFO)
        .map(|current| Conninfo::parse(&current))
        .unwrap_or_default();

    if !conninfo.set(key, value) {
        return None;
    }
    apply_param(content, PRIMARY_CONNINFO, &conninfo.to_string())
}

/// Patch a `primary_conninfo` pair in `recovery.conf`. Empty values are
/// skipped; with `hide` the value is kept out of the logs.
pub fn set_recovery_param(recovery: &Path, key: &str, value: &str, hide: bool) -> Result<bool> {
    if value.is_empty() {
        return Ok(false);
    }

    let changed = rewrite(recovery, |content| apply_recovery_param(content, key, value))?;
    if changed {
        if hide {
            info!(key, "Setting primary_conninfo parameter");
        } else {
            info!(key, value, "Setting primary_conninfo parameter");
        }
    }
    Ok(changed)
}
