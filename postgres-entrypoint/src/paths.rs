//! Path utilities for PostgreSQL data directories
//!
//! Provides consistent path resolution for the configuration files the
//! entrypoint edits inside PGDATA.

use std::path::{Path, PathBuf};

/// Default PGDATA used by the official images
pub const DEFAULT_PGDATA: &str = "/var/lib/postgresql/data";

/// Default directory for server log files
pub const DEFAULT_LOG_DIR: &str = "/var/log/postgresql";

/// Files inside a data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub data_dir: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn postgresql_conf(&self) -> PathBuf {
        self.data_dir.join("postgresql.conf")
    }

    pub fn pg_hba_conf(&self) -> PathBuf {
        self.data_dir.join("pg_hba.conf")
    }

    pub fn recovery_conf(&self) -> PathBuf {
        self.data_dir.join("recovery.conf")
    }

    pub fn standby_signal(&self) -> PathBuf {
        self.data_dir.join("standby.signal")
    }

    pub fn pg_version(&self) -> PathBuf {
        self.data_dir.join("PG_VERSION")
    }

    /// A data directory is initialized once `PG_VERSION` exists.
    pub fn is_initialized(&self) -> bool {
        self.pg_version().exists()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
