//! Standby configuration for streaming replicas

use crate::conf::{self, render_recovery_conf, set_recovery_param, Conninfo};
use crate::config::{Config, ReplicationMode};
use crate::error::{EntrypointError, Result};
use crate::paths::DataPaths;
use crate::version::PgVersion;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

/// Connection string a replica uses to reach its upstream.
pub fn upstream_conninfo(config: &Config) -> Result<Conninfo> {
    let host = config.replication_host()?;
    let (user, password) = config.replication_credentials()?;

    Ok(Conninfo::new()
        .with("host", host)
        .with("port", &config.replication.port.to_string())
        .with("user", user)
        .with("password", password)
        .with("sslmode", &config.replication.sslmode))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "Removed standby marker");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EntrypointError::config_file(path, e)),
    }
}

/// Make PGDATA a standby of the upstream in slave mode, and make sure no
/// standby marker is left behind in every other mode.
pub fn configure_recovery(config: &Config, paths: &DataPaths, version: PgVersion) -> Result<()> {
    if config.mode != ReplicationMode::Slave {
        // A leftover marker would keep a primary or snapshot in recovery
        remove_if_exists(&paths.recovery_conf())?;
        return remove_if_exists(&paths.standby_signal());
    }

    info!(version = %version, "Configuring recovery");
    let conninfo = upstream_conninfo(config)?;

    if version.uses_standby_signal() {
        // recovery.conf prevents a 12+ server from starting
        remove_if_exists(&paths.recovery_conf())?;

        let signal = paths.standby_signal();
        if !signal.exists() {
            fs::write(&signal, "").map_err(|e| EntrypointError::config_file(&signal, e))?;
        }

        let rendered = conninfo.to_string();
        let changed = conf::rewrite(&paths.postgresql_conf(), |content| {
            conf::apply_param(content, "primary_conninfo", &rendered)
        })?;
        if changed {
            info!(key = "primary_conninfo", "Setting postgresql.conf parameter");
        }
        return Ok(());
    }

    remove_if_exists(&paths.standby_signal())?;

    let recovery = paths.recovery_conf();
    if !recovery.exists() {
        fs::write(&recovery, render_recovery_conf(&conninfo))
            .map_err(|e| EntrypointError::config_file(&recovery, e))?;
        info!(path = %recovery.display(), "Created recovery.conf");
        return Ok(());
    }

    for key in ["host", "port", "user", "password", "sslmode"] {
        let value = conninfo.get(key).unwrap_or_default();
        set_recovery_param(&recovery, key, value, key == "password")?;
    }
    Ok(())
}
