//! Error types for the entrypoint library

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EntrypointError {
    #[error("invalid REPLICATION_MODE '{0}' (expected slave, snapshot, backup or primary)")]
    InvalidMode(String),

    #[error("invalid PostgreSQL version '{0}'")]
    InvalidVersion(String),

    #[error("invalid configuration: {0}")]
    InvalidSetting(anyhow::Error),

    #[error("{setting} is required in {mode} mode")]
    MissingSetting {
        setting: &'static str,
        mode: &'static str,
    },

    #[error("timed out after {waited_secs}s waiting for {host}:{port} to accept connections")]
    UpstreamTimeout {
        host: String,
        port: u16,
        waited_secs: u64,
    },

    #[error("failed to update {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Command(#[from] anyhow::Error),
}

impl EntrypointError {
    pub(crate) fn config_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigFile {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = EntrypointError> = std::result::Result<T, E>;
