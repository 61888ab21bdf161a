//! Root-to-postgres hand-off
//!
//! The container starts as root so PGDATA and the log directory can be
//! created on freshly mounted volumes. Everything else runs as `postgres`.

use crate::config::Config;
use crate::error::Result;
use anyhow::{anyhow, Context};
use common::command::run_checked;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;
use tracing::info;

pub const POSTGRES_OWNER: &str = "postgres:postgres";

pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// PostgreSQL refuses to start unless PGDATA is private to its owner.
pub const PGDATA_MODE: u32 = 0o700;

/// Directories handed to `postgres`, with the mode forced on each (if any).
pub fn owned_directories(config: &Config) -> Vec<(&Path, Option<u32>)> {
    vec![
        (config.data_dir.as_path(), Some(PGDATA_MODE)),
        (config.log_dir.as_path(), None),
    ]
}

/// Create and hand over ownership of the directories the server writes to.
pub async fn prepare_directories(config: &Config) -> Result<()> {
    for (dir, mode) in owned_directories(config) {
        prepare_directory(dir, mode).await?;
    }
    Ok(())
}

async fn prepare_directory(dir: &Path, mode: Option<u32>) -> Result<()> {
    info!(path = %dir.display(), "Setting directory ownership");
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.display().to_string();
    run_checked("chown", &["-R", POSTGRES_OWNER, &path]).await?;

    if let Some(mode) = mode {
        set_mode(dir, mode).await?;
    }
    Ok(())
}

async fn set_mode(dir: &Path, mode: u32) -> Result<()> {
    tokio::fs::set_permissions(dir, std::fs::Permissions::from_mode(mode))
        .await
        .with_context(|| format!("Failed to chmod {}", dir.display()))?;
    Ok(())
}

/// Arguments for re-running this binary as `postgres` through gosu.
pub fn gosu_args(exe: &Path, args: &[String]) -> Vec<String> {
    let mut argv = vec!["postgres".to_string(), exe.display().to_string()];
    argv.extend(args.iter().cloned());
    argv
}

/// Replace the current process with this binary running as `postgres`.
///
/// Only returns on failure.
pub fn exec_as_postgres(args: &[String]) -> anyhow::Error {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => return anyhow!("Failed to resolve entrypoint path: {}", e),
    };

    info!("Dropping privileges to postgres");
    let err = Command::new("gosu").args(gosu_args(&exe, args)).exec();
    anyhow!("Failed to exec gosu: {}", err)
}

/// Command line the server is started with.
///
/// No arguments run `postgres`; leading flags are passed to `postgres`.
pub fn server_command(args: &[String]) -> Vec<String> {
    match args.first() {
        None => vec!["postgres".to_string()],
        Some(first) if first.starts_with('-') => {
            let mut argv = vec!["postgres".to_string()];
            argv.extend(args.iter().cloned());
            argv
        }
        Some(_) => args.to_vec(),
    }
}

/// Replace the current process with the server command.
///
/// Only returns on failure.
pub fn exec_server(args: &[String]) -> anyhow::Error {
    let argv = server_command(args);
    info!(command = %argv.join(" "), "Starting server");
    let err = Command::new(&argv[0]).args(&argv[1..]).exec();
    anyhow!("Failed to exec {}: {}", argv[0], err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_server_command_defaults_to_postgres() {
        assert_eq!(server_command(&[]), vec!["postgres"]);
    }

    #[test]
    fn test_server_command_prefixes_flags() {
        assert_eq!(
            server_command(&strings(&["-c", "max_connections=50"])),
            vec!["postgres", "-c", "max_connections=50"]
        );
    }

    #[test]
    fn test_server_command_keeps_explicit_program() {
        assert_eq!(
            server_command(&strings(&["bash", "-l"])),
            vec!["bash", "-l"]
        );
    }

    #[test]
    fn test_gosu_args() {
        assert_eq!(
            gosu_args(Path::new("/usr/local/bin/pg-entrypoint"), &strings(&["-c", "fsync=off"])),
            vec!["postgres", "/usr/local/bin/pg-entrypoint", "-c", "fsync=off"]
        );
    }

    #[test]
    fn test_only_pgdata_is_restricted() {
        let mut config = Config::from_vars(|_| None).unwrap();
        config.data_dir = "/data/pg".into();
        config.log_dir = "/data/log".into();

        assert_eq!(
            owned_directories(&config),
            vec![
                (Path::new("/data/pg"), Some(0o700)),
                (Path::new("/data/log"), None),
            ]
        );
    }

    #[tokio::test]
    async fn test_set_mode() {
        let dir = TempDir::new().unwrap();
        tokio::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755))
            .await
            .unwrap();

        set_mode(dir.path(), PGDATA_MODE).await.unwrap();

        let mode = std::fs::metadata(dir.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
