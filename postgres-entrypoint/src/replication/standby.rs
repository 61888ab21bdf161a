//! Primary-side settings that let replicas stream from this node

use crate::conf::set_postgresql_param;
use crate::config::Config;
use crate::error::Result;
use crate::paths::DataPaths;
use crate::version::PgVersion;
use tracing::info;

/// Parameters a primary needs to serve hot standbys on `version`.
pub fn hot_standby_params(version: PgVersion) -> Vec<(&'static str, &'static str)> {
    let mut params = vec![("wal_level", version.wal_level()), ("max_wal_senders", "16")];

    if version.has_checkpoint_segments() {
        params.push(("checkpoint_segments", "8"));
    }
    if version.has_wal_keep_size() {
        // 32 segments of 16MB
        params.push(("wal_keep_size", "512MB"));
    } else {
        params.push(("wal_keep_segments", "32"));
    }

    params.push(("hot_standby", "on"));
    params
}

/// Enable WAL shipping on a primary. Replica modes are left untouched.
pub fn configure_hot_standby(config: &Config, paths: &DataPaths, version: PgVersion) -> Result<()> {
    if config.mode.is_replica() {
        return Ok(());
    }

    info!("Configuring hot standby");
    let conf = paths.postgresql_conf();
    for (key, value) in hot_standby_params(version) {
        set_postgresql_param(&conf, key, value)?;
    }
    Ok(())
}
