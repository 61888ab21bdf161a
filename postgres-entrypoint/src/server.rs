//! pg_ctl wrappers for initializing and briefly running the local server

use crate::error::Result;
use crate::version::PgVersion;
use common::command::run_inherited;
use common::pg_ctl;
use std::path::{Path, PathBuf};
use tracing::info;

/// Control handle for the server owning one data directory.
pub struct PgCtl {
    data_dir: PathBuf,
}

impl PgCtl {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn data_dir_arg(&self) -> String {
        self.data_dir.display().to_string()
    }

    pub fn initdb_args(&self, superuser: &str) -> Vec<String> {
        vec![
            "initdb".to_string(),
            "-D".to_string(),
            self.data_dir_arg(),
            "-o".to_string(),
            format!("--username={} --encoding=UTF8 --auth=trust", superuser),
        ]
    }

    /// Only the unix socket is opened while bootstrap SQL runs.
    pub fn start_local_args(&self) -> Vec<String> {
        vec![
            "-D".to_string(),
            self.data_dir_arg(),
            "-o".to_string(),
            "-c listen_addresses=''".to_string(),
            "-w".to_string(),
            "start".to_string(),
        ]
    }

    pub fn stop_args(&self) -> Vec<String> {
        vec![
            "-D".to_string(),
            self.data_dir_arg(),
            "-m".to_string(),
            "fast".to_string(),
            "-w".to_string(),
            "stop".to_string(),
        ]
    }

    /// Create a new cluster owned by `superuser`.
    pub async fn initdb(&self, superuser: &str) -> Result<()> {
        info!(data_dir = %self.data_dir.display(), superuser, "Initializing database");
        let args = self.initdb_args(superuser);
        pg_ctl(&as_strs(&args)).await?;
        Ok(())
    }

    pub async fn start_local(&self) -> Result<()> {
        info!("Starting temporary local server");
        let args = self.start_local_args();
        run_inherited("pg_ctl", &as_strs(&args)).await?;
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping temporary local server");
        let args = self.stop_args();
        pg_ctl(&as_strs(&args)).await?;
        Ok(())
    }
}

/// Version of the installed server binaries.
pub async fn detect_version() -> Result<PgVersion> {
    let output = pg_ctl(&["--version"]).await?;
    PgVersion::from_version_output(&output)
}

fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}
