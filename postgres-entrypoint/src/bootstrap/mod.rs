//! Startup bootstrap
//!
//! Runs the fixed configuration sequence for the selected replication mode:
//! - Clone from the upstream (replica modes) or initdb (primary) on first start
//! - Standby and hot standby settings
//! - Data/log paths and pg_hba.conf access rules
//! - Roles, databases and extensions on a primary

mod database;
mod sql;
mod users;

pub use database::{create_database, load_extensions};
pub use sql::{quote_ident, quote_literal, Psql};
pub use users::{create_database_user, create_replication_user, set_superuser_password};

use crate::conf::{set_hba_param, set_postgresql_param};
use crate::config::{Config, ReplicationMode};
use crate::error::{EntrypointError, Result};
use crate::paths::DataPaths;
use crate::replication::{
    clone_from_upstream, configure_hot_standby, configure_recovery, wait_for_host,
};
use crate::server::{detect_version, PgCtl};
use crate::version::PgVersion;
use anyhow::Context;
use common::{Telemetry, TelemetryEvent};
use std::time::Instant;
use tracing::{info, warn};

/// What the entrypoint does once bootstrap finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Hand over to the server process
    StartServer,
    /// Backup mode: the data is on disk, exit successfully
    Exit,
}

/// Result of a successful bootstrap.
///
/// `event` is the final lifecycle event. Deliver it with `send_sync` before
/// exiting or exec'ing the server.
#[derive(Debug)]
pub struct Completion {
    pub outcome: Outcome,
    pub event: Option<TelemetryEvent>,
}

impl Completion {
    fn new(outcome: Outcome, event: Option<TelemetryEvent>) -> Self {
        Self { outcome, event }
    }
}

/// Event reported when bootstrap fails with `err`.
pub fn failure_event(config: &Config, err: &EntrypointError) -> TelemetryEvent {
    match err {
        EntrypointError::UpstreamTimeout {
            host,
            port,
            waited_secs,
        } => TelemetryEvent::UpstreamTimeout {
            host: host.clone(),
            port: *port,
            waited_secs: *waited_secs,
        },
        other => TelemetryEvent::BootstrapFailed {
            mode: config.mode.to_string(),
            error: other.to_string(),
        },
    }
}

/// pg_hba.conf entries every node gets, in order.
pub fn access_hba_entries(config: &Config) -> Vec<&'static str> {
    let mut entries = Vec::new();
    if config.trust_localnet {
        entries.push("host all all samenet trust");
    }
    entries.push("host all all 0.0.0.0/0 md5");
    entries
}

/// Server log file name for `version`.
pub fn log_filename(version: PgVersion) -> String {
    format!("postgresql-{}-main.log", version)
}

/// Resolve the server version from config or the installed binaries.
pub async fn resolve_version(config: &Config) -> Result<PgVersion> {
    match config.pg_version {
        Some(version) => Ok(version),
        None => {
            let version = detect_version().await?;
            info!(version = %version, "Detected PostgreSQL version");
            Ok(version)
        }
    }
}

/// Point the server at PGDATA and the log directory.
pub fn configure_paths(config: &Config, paths: &DataPaths, version: PgVersion) -> Result<()> {
    let conf = paths.postgresql_conf();
    set_postgresql_param(&conf, "data_directory", &config.data_dir.display().to_string())?;

    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory {}", config.log_dir.display()))?;
    set_postgresql_param(&conf, "log_directory", &config.log_dir.display().to_string())?;
    set_postgresql_param(&conf, "log_filename", &log_filename(version))?;
    Ok(())
}

/// Allow remote access in pg_hba.conf.
pub fn configure_access(config: &Config, paths: &DataPaths) -> Result<()> {
    let hba = paths.pg_hba_conf();
    for entry in access_hba_entries(config) {
        set_hba_param(&hba, entry)?;
    }
    Ok(())
}

/// Bring a fresh data directory into existence for the configured mode.
///
/// Returns the completion once a backup has been pulled, None otherwise.
async fn populate_data_dir(
    config: &Config,
    paths: &DataPaths,
    ctl: &PgCtl,
    telemetry: &Telemetry,
) -> Result<Option<Completion>> {
    if !config.mode.is_replica() {
        ctl.initdb(&config.superuser).await?;
        telemetry.send(TelemetryEvent::DatabaseInitialized {
            data_dir: paths.data_dir().display().to_string(),
        });
        return Ok(None);
    }

    let host = config.replication_host()?;
    let port = config.replication.port;
    let attempts = wait_for_host(host, port, config.replication.wait_timeout).await?;
    telemetry.send(TelemetryEvent::UpstreamReady {
        host: host.to_string(),
        port,
        attempts,
    });

    let duration_ms = clone_from_upstream(config).await?;
    telemetry.send(TelemetryEvent::DataCloned {
        host: host.to_string(),
        mode: config.mode.to_string(),
        duration_ms,
    });

    if config.mode == ReplicationMode::Backup {
        let event = TelemetryEvent::BackupCompleted {
            host: host.to_string(),
            data_dir: paths.data_dir().display().to_string(),
        };
        return Ok(Some(Completion::new(Outcome::Exit, Some(event))));
    }
    Ok(None)
}

/// Roles, databases and extensions, run against a temporary local server.
async fn bootstrap_primary(config: &Config, paths: &DataPaths, ctl: &PgCtl) -> Result<Vec<String>> {
    let psql = Psql::new(&config.superuser);

    ctl.start_local().await?;
    let result = async {
        set_superuser_password(config, &psql).await?;
        create_replication_user(config, paths, &psql).await?;
        create_database_user(config, &psql).await?;
        create_database(config, &psql).await
    }
    .await;

    // The server is stopped even when a step failed so PGDATA is left clean
    let stopped = ctl.stop().await;
    let databases = result?;
    stopped?;
    Ok(databases)
}

/// Configure PGDATA for the selected mode.
///
/// Intermediate events go through `telemetry`. The final one is returned in
/// the `Completion` for the caller to deliver synchronously.
pub async fn initialize_database(config: &Config, telemetry: &Telemetry) -> Result<Completion> {
    let start = Instant::now();
    config.validate()?;

    let version = resolve_version(config).await?;
    let paths = DataPaths::new(&config.data_dir);
    let ctl = PgCtl::new(&config.data_dir);

    info!(
        mode = %config.mode,
        version = %version,
        data_dir = %config.data_dir.display(),
        "Initializing database"
    );

    if !paths.is_initialized() {
        if let Some(done) = populate_data_dir(config, &paths, &ctl, telemetry).await? {
            return Ok(done);
        }
    } else if config.mode == ReplicationMode::Backup {
        warn!(data_dir = %config.data_dir.display(), "Backup already present, nothing to pull");
        return Ok(Completion::new(Outcome::Exit, None));
    }

    configure_recovery(config, &paths, version)?;
    configure_hot_standby(config, &paths, version)?;
    configure_paths(config, &paths, version)?;
    configure_access(config, &paths)?;

    let databases = if config.mode.is_replica() {
        if !config.database.names.is_empty() {
            info!(mode = %config.mode, "Database cannot be created on a replica node, skipping");
        }
        Vec::new()
    } else {
        bootstrap_primary(config, &paths, &ctl).await?
    };

    let event = TelemetryEvent::BootstrapCompleted {
        mode: config.mode.to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
        databases,
    };
    Ok(Completion::new(Outcome::StartServer, Some(event)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{get_param, has_hba_entry};
    use tempfile::TempDir;

    fn setup() -> (TempDir, DataPaths, Config) {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        let paths = DataPaths::new(&data);
        std::fs::write(paths.postgresql_conf(), "#data_directory = 'ConfigDir'\n").unwrap();
        std::fs::write(paths.pg_hba_conf(), "local all all trust\n").unwrap();

        let mut config = Config::from_vars(|_| None).unwrap();
        config.data_dir = data;
        config.log_dir = dir.path().join("log");
        (dir, paths, config)
    }

    #[test]
    fn test_log_filename() {
        assert_eq!(log_filename(PgVersion::new(9, 6)), "postgresql-9.6-main.log");
        assert_eq!(log_filename(PgVersion::new(14, 0)), "postgresql-14-main.log");
    }

    #[test]
    fn test_access_entries() {
        let (_dir, _paths, mut config) = setup();
        assert_eq!(access_hba_entries(&config), vec!["host all all 0.0.0.0/0 md5"]);

        config.trust_localnet = true;
        assert_eq!(
            access_hba_entries(&config),
            vec!["host all all samenet trust", "host all all 0.0.0.0/0 md5"]
        );
    }

    #[test]
    fn test_configure_paths_creates_log_dir() {
        let (_dir, paths, config) = setup();
        configure_paths(&config, &paths, PgVersion::new(11, 0)).unwrap();

        assert!(config.log_dir.is_dir());
        let content = std::fs::read_to_string(paths.postgresql_conf()).unwrap();
        assert_eq!(
            get_param(&content, "data_directory"),
            Some(config.data_dir.display().to_string())
        );
        assert_eq!(
            get_param(&content, "log_directory"),
            Some(config.log_dir.display().to_string())
        );
        assert_eq!(
            get_param(&content, "log_filename").as_deref(),
            Some("postgresql-11-main.log")
        );
    }

    #[test]
    fn test_configure_access_is_idempotent() {
        let (_dir, paths, config) = setup();
        configure_access(&config, &paths).unwrap();
        configure_access(&config, &paths).unwrap();

        let content = std::fs::read_to_string(paths.pg_hba_conf()).unwrap();
        assert!(has_hba_entry(&content, "host all all 0.0.0.0/0 md5"));
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_existing_backup_exits_without_touching_files() {
        let (_dir, paths, mut config) = setup();
        std::fs::write(paths.pg_version(), "11\n").unwrap();
        config.mode = ReplicationMode::Backup;
        config.pg_version = Some(PgVersion::new(11, 0));
        config.replication.host = Some("pg-primary".to_string());
        config.replication.user = Some("repl".to_string());
        config.replication.password = Some("s3cret".to_string());

        let before = std::fs::read_to_string(paths.postgresql_conf()).unwrap();
        let telemetry = Telemetry::new("test", None);
        let done = initialize_database(&config, &telemetry).await.unwrap();

        assert_eq!(done.outcome, Outcome::Exit);
        assert!(done.event.is_none());
        assert_eq!(std::fs::read_to_string(paths.postgresql_conf()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_existing_slave_is_reconfigured_without_server() {
        let (_dir, paths, mut config) = setup();
        std::fs::write(paths.pg_version(), "11\n").unwrap();
        config.mode = ReplicationMode::Slave;
        config.pg_version = Some(PgVersion::new(11, 0));
        config.replication.host = Some("pg-primary".to_string());
        config.replication.user = Some("repl".to_string());
        config.replication.password = Some("s3cret".to_string());
        config.database.names = vec!["app".to_string()];

        let telemetry = Telemetry::new("test", None);
        let done = initialize_database(&config, &telemetry).await.unwrap();

        assert_eq!(done.outcome, Outcome::StartServer);
        match done.event {
            Some(TelemetryEvent::BootstrapCompleted {
                mode, databases, ..
            }) => {
                assert_eq!(mode, "slave");
                assert!(databases.is_empty());
            }
            other => panic!("expected BootstrapCompleted, got {:?}", other),
        }
        assert!(paths.recovery_conf().exists());
        let hba = std::fs::read_to_string(paths.pg_hba_conf()).unwrap();
        assert!(has_hba_entry(&hba, "host all all 0.0.0.0/0 md5"));
    }

    #[test]
    fn test_failure_event_for_upstream_timeout() {
        let (_dir, _paths, config) = setup();
        let err = EntrypointError::UpstreamTimeout {
            host: "pg-primary".to_string(),
            port: 5432,
            waited_secs: 60,
        };

        match failure_event(&config, &err) {
            TelemetryEvent::UpstreamTimeout {
                host,
                port,
                waited_secs,
            } => {
                assert_eq!(host, "pg-primary");
                assert_eq!(port, 5432);
                assert_eq!(waited_secs, 60);
            }
            other => panic!("expected UpstreamTimeout, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_event_for_other_errors() {
        let (_dir, _paths, mut config) = setup();
        config.mode = ReplicationMode::Snapshot;
        let err = EntrypointError::InvalidMode("hot".to_string());

        match failure_event(&config, &err) {
            TelemetryEvent::BootstrapFailed { mode, error } => {
                assert_eq!(mode, "snapshot");
                assert!(error.contains("hot"));
            }
            other => panic!("expected BootstrapFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_replica_without_upstream_fails_early() {
        let (_dir, _paths, mut config) = setup();
        config.mode = ReplicationMode::Slave;
        config.pg_version = Some(PgVersion::new(11, 0));

        let telemetry = Telemetry::new("test", None);
        assert!(initialize_database(&config, &telemetry).await.is_err());
    }
}
