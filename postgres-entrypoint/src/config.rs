//! Entrypoint configuration from environment variables

use crate::error::{EntrypointError, Result};
use crate::paths::{DEFAULT_LOG_DIR, DEFAULT_PGDATA};
use crate::version::PgVersion;
use common::config::{env_opt, ConfigExt};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// How this node relates to an upstream PostgreSQL host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplicationMode {
    #[default]
    Primary,
    /// Streaming replica that follows the upstream
    Slave,
    /// One-shot copy of the upstream that then runs standalone
    Snapshot,
    /// Copy of the upstream data directory; no server is started
    Backup,
}

impl ReplicationMode {
    pub fn is_replica(&self) -> bool {
        !matches!(self, Self::Primary)
    }

    /// `pg_basebackup -X` method used to fetch WAL for this mode.
    pub fn wal_method(&self) -> &'static str {
        match self {
            Self::Slave => "stream",
            _ => "fetch",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Slave => "slave",
            Self::Snapshot => "snapshot",
            Self::Backup => "backup",
        }
    }
}

impl FromStr for ReplicationMode {
    type Err = EntrypointError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "primary" | "master" => Ok(Self::Primary),
            "slave" => Ok(Self::Slave),
            "snapshot" => Ok(Self::Snapshot),
            "backup" => Ok(Self::Backup),
            _ => Err(EntrypointError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for ReplicationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream connection settings.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub sslmode: String,
    /// Number of one-second readiness probes before giving up
    pub wait_timeout: u64,
}

/// Default database/role/extension set created on a primary.
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    pub names: Vec<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub template: String,
    pub extensions: Vec<String>,
}

/// Configuration for the entrypoint
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: ReplicationMode,
    pub replication: ReplicationConfig,
    pub database: DatabaseConfig,
    pub superuser: String,
    pub superuser_password: Option<String>,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    /// None until detected from `pg_ctl --version`
    pub pg_version: Option<PgVersion>,
    pub trust_localnet: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(env_opt)
    }

    /// Load configuration through a variable lookup. Empty values must be
    /// reported as None.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mode = lookup("REPLICATION_MODE")
            .map(|m| m.parse::<ReplicationMode>())
            .transpose()?
            .unwrap_or_default();

        let pg_version = lookup("PG_MAJOR").map(|v| v.parse::<PgVersion>()).transpose()?;

        Ok(Self {
            mode,
            replication: ReplicationConfig {
                host: lookup("REPLICATION_HOST"),
                port: lookup
                    .env_parse("REPLICATION_PORT", 5432)
                    .map_err(EntrypointError::InvalidSetting)?,
                user: lookup("REPLICATION_USER"),
                password: lookup("REPLICATION_PASS"),
                sslmode: lookup.env_or("REPLICATION_SSLMODE", "prefer"),
                wait_timeout: lookup
                    .env_parse("REPLICATION_WAIT_TIMEOUT", 60)
                    .map_err(EntrypointError::InvalidSetting)?,
            },
            database: DatabaseConfig {
                names: lookup.env_list("POSTGRES_DB_NAME"),
                user: lookup("POSTGRES_DB_USER"),
                password: lookup("POSTGRES_DB_PASSWORD"),
                template: lookup.env_or("POSTGRES_DB_TEMPLATE", "template1"),
                extensions: lookup.env_list("POSTGRES_DB_EXTENSION"),
            },
            superuser: lookup.env_or("POSTGRES_USER", "postgres"),
            superuser_password: lookup("POSTGRES_PASSWORD"),
            data_dir: PathBuf::from(lookup.env_or("PGDATA", DEFAULT_PGDATA)),
            log_dir: PathBuf::from(lookup.env_or("PG_LOGDIR", DEFAULT_LOG_DIR)),
            pg_version,
            trust_localnet: lookup.env_bool("PG_TRUST_LOCALNET", false),
        })
    }

    /// Upstream host, required by every replica mode.
    pub fn replication_host(&self) -> Result<&str> {
        self.replication
            .host
            .as_deref()
            .ok_or(EntrypointError::MissingSetting {
                setting: "REPLICATION_HOST",
                mode: self.mode.as_str(),
            })
    }

    /// Replication credentials, required by every replica mode.
    pub fn replication_credentials(&self) -> Result<(&str, &str)> {
        let user = self
            .replication
            .user
            .as_deref()
            .ok_or(EntrypointError::MissingSetting {
                setting: "REPLICATION_USER",
                mode: self.mode.as_str(),
            })?;
        let password =
            self.replication
                .password
                .as_deref()
                .ok_or(EntrypointError::MissingSetting {
                    setting: "REPLICATION_PASS",
                    mode: self.mode.as_str(),
                })?;
        Ok((user, password))
    }

    /// Fail before touching anything if a replica mode lacks upstream settings.
    pub fn validate(&self) -> Result<()> {
        if self.mode.is_replica() {
            self.replication_host()?;
            self.replication_credentials()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned().filter(|v| !v.is_empty()))
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("".parse::<ReplicationMode>().unwrap(), ReplicationMode::Primary);
        assert_eq!("master".parse::<ReplicationMode>().unwrap(), ReplicationMode::Primary);
        assert_eq!("SLAVE".parse::<ReplicationMode>().unwrap(), ReplicationMode::Slave);
        assert_eq!("snapshot".parse::<ReplicationMode>().unwrap(), ReplicationMode::Snapshot);
        assert_eq!("backup".parse::<ReplicationMode>().unwrap(), ReplicationMode::Backup);
        assert!(matches!(
            "replica".parse::<ReplicationMode>(),
            Err(EntrypointError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_wal_method_per_mode() {
        assert_eq!(ReplicationMode::Slave.wal_method(), "stream");
        assert_eq!(ReplicationMode::Snapshot.wal_method(), "fetch");
        assert_eq!(ReplicationMode::Backup.wal_method(), "fetch");
        assert!(!ReplicationMode::Primary.is_replica());
        assert!(ReplicationMode::Backup.is_replica());
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.mode, ReplicationMode::Primary);
        assert_eq!(config.replication.port, 5432);
        assert_eq!(config.replication.sslmode, "prefer");
        assert_eq!(config.replication.wait_timeout, 60);
        assert_eq!(config.superuser, "postgres");
        assert_eq!(config.database.template, "template1");
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_PGDATA));
        assert!(config.pg_version.is_none());
        assert!(config.database.names.is_empty());
        assert!(!config.trust_localnet);
    }

    #[test]
    fn test_full_environment() {
        let config = config_from(&[
            ("REPLICATION_MODE", "slave"),
            ("REPLICATION_HOST", "pg-primary"),
            ("REPLICATION_PORT", "6543"),
            ("REPLICATION_USER", "repluser"),
            ("REPLICATION_PASS", "replpass"),
            ("POSTGRES_DB_NAME", "app, analytics"),
            ("POSTGRES_DB_EXTENSION", "pg_trgm,hstore"),
            ("PG_MAJOR", "9.6"),
            ("PGDATA", "/data/pg"),
            ("PG_TRUST_LOCALNET", "true"),
        ])
        .unwrap();

        assert_eq!(config.mode, ReplicationMode::Slave);
        assert_eq!(config.replication_host().unwrap(), "pg-primary");
        assert_eq!(config.replication.port, 6543);
        assert_eq!(
            config.replication_credentials().unwrap(),
            ("repluser", "replpass")
        );
        assert_eq!(config.database.names, vec!["app", "analytics"]);
        assert_eq!(config.database.extensions, vec!["pg_trgm", "hstore"]);
        assert_eq!(config.pg_version, Some(PgVersion::new(9, 6)));
        assert_eq!(config.data_dir, PathBuf::from("/data/pg"));
        assert!(config.trust_localnet);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_replica_requires_upstream_settings() {
        let config = config_from(&[("REPLICATION_MODE", "snapshot")]).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EntrypointError::MissingSetting {
                setting: "REPLICATION_HOST",
                ..
            })
        ));

        let config = config_from(&[
            ("REPLICATION_MODE", "backup"),
            ("REPLICATION_HOST", "pg-primary"),
            ("REPLICATION_USER", "repluser"),
        ])
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(EntrypointError::MissingSetting {
                setting: "REPLICATION_PASS",
                ..
            })
        ));
    }

    #[test]
    fn test_primary_needs_no_upstream() {
        assert!(config_from(&[]).unwrap().validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config_from(&[("REPLICATION_MODE", "hot")]).is_err());
        assert!(config_from(&[("PG_MAJOR", "latest")]).is_err());
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        assert!(matches!(
            config_from(&[("REPLICATION_PORT", "54322x")]),
            Err(EntrypointError::InvalidSetting(_))
        ));
        assert!(matches!(
            config_from(&[("REPLICATION_PORT", "70000")]),
            Err(EntrypointError::InvalidSetting(_))
        ));

        let err = config_from(&[("REPLICATION_WAIT_TIMEOUT", "soon")]).unwrap_err();
        assert!(err.to_string().contains("REPLICATION_WAIT_TIMEOUT"));
    }
}
