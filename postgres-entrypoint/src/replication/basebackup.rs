//! Cloning the upstream data directory with pg_basebackup

use crate::config::Config;
use crate::error::Result;
use anyhow::Context;
use common::command::run_with_env;
use nix::sys::stat::{umask, Mode};
use std::path::Path;
use std::time::Instant;
use tokio::fs;
use tracing::info;

/// Clear all contents of a directory without removing the directory itself
pub async fn clear_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let mut entries = fs::read_dir(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    while let Some(entry) = entries.next_entry().await.context("Failed to list directory")? {
        let path = entry.path();
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_file(&path).await
        };
        removed.with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// `pg_basebackup` arguments for the configured mode.
pub fn basebackup_args(config: &Config, host: &str, user: &str) -> Vec<String> {
    vec![
        "-D".to_string(),
        config.data_dir.display().to_string(),
        "-h".to_string(),
        host.to_string(),
        "-p".to_string(),
        config.replication.port.to_string(),
        "-U".to_string(),
        user.to_string(),
        "-X".to_string(),
        config.mode.wal_method().to_string(),
        "-w".to_string(),
    ]
}

/// Clone the upstream into PGDATA. Returns the elapsed time in milliseconds.
///
/// Anything left in PGDATA by an interrupted clone is removed first, since
/// pg_basebackup refuses a non-empty target.
pub async fn clone_from_upstream(config: &Config) -> Result<u64> {
    let host = config.replication_host()?;
    let (user, password) = config.replication_credentials()?;

    clear_directory(&config.data_dir).await?;
    fs::create_dir_all(&config.data_dir)
        .await
        .context("Failed to create data directory")?;

    // pg_basebackup must create files PostgreSQL accepts (0600/0700)
    umask(Mode::from_bits_truncate(0o077));

    info!(
        host,
        port = config.replication.port,
        mode = %config.mode,
        wal_method = config.mode.wal_method(),
        "Cloning data from upstream"
    );

    let start = Instant::now();
    let args = basebackup_args(config, host, user);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    run_with_env("pg_basebackup", &args, &[("PGPASSWORD", password)])
        .await?
        .into_checked("pg_basebackup")?;

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(duration_ms, "pg_basebackup finished");
    Ok(duration_ms)
}
