//! Role creation on a primary

use super::sql::{quote_ident, quote_literal, Psql};
use crate::conf::set_hba_param;
use crate::config::Config;
use crate::error::{EntrypointError, Result};
use crate::paths::DataPaths;
use tracing::info;

pub fn role_exists_sql(role: &str) -> String {
    format!(
        "SELECT 1 FROM pg_catalog.pg_roles WHERE rolname = {}",
        quote_literal(role)
    )
}

pub fn create_role_sql(role: &str, password: &str, replication: bool) -> String {
    format!(
        "CREATE ROLE {} WITH {}LOGIN ENCRYPTED PASSWORD {};",
        quote_ident(role),
        if replication { "REPLICATION " } else { "" },
        quote_literal(password)
    )
}

pub fn alter_password_sql(role: &str, password: &str) -> String {
    format!(
        "ALTER ROLE {} WITH ENCRYPTED PASSWORD {};",
        quote_ident(role),
        quote_literal(password)
    )
}

/// pg_hba entry that lets the replication role stream from anywhere.
pub fn replication_hba_entry(user: &str) -> String {
    format!("host replication {} 0.0.0.0/0 md5", user)
}

/// Create the replication role on a primary and allow it in pg_hba.conf.
pub async fn create_replication_user(config: &Config, paths: &DataPaths, psql: &Psql) -> Result<()> {
    let Some(user) = config.replication.user.as_deref() else {
        return Ok(());
    };
    if config.mode.is_replica() {
        return Ok(());
    }
    let password = config
        .replication
        .password
        .as_deref()
        .ok_or(EntrypointError::MissingSetting {
            setting: "REPLICATION_PASS",
            mode: config.mode.as_str(),
        })?;

    info!(user, "Creating replication user");
    if !psql.exists("postgres", &role_exists_sql(user)).await? {
        psql.execute("postgres", &create_role_sql(user, password, true))
            .await?;
    }
    set_hba_param(&paths.pg_hba_conf(), &replication_hba_entry(user))?;
    Ok(())
}

/// Create or refresh the application role on a primary.
pub async fn create_database_user(config: &Config, psql: &Psql) -> Result<()> {
    let (Some(user), Some(password)) = (
        config.database.user.as_deref(),
        config.database.password.as_deref(),
    ) else {
        return Ok(());
    };
    if config.mode.is_replica() {
        return Ok(());
    }
    if user == config.superuser {
        info!(user, "Database user is the superuser, skipping password refresh");
        return Ok(());
    }

    if psql.exists("postgres", &role_exists_sql(user)).await? {
        info!(user, "Updating database user password");
        psql.execute("postgres", &alter_password_sql(user, password))
            .await?;
    } else {
        info!(user, "Creating database user");
        psql.execute("postgres", &create_role_sql(user, password, false))
            .await?;
    }
    Ok(())
}

/// Set the superuser password when one is configured.
pub async fn set_superuser_password(config: &Config, psql: &Psql) -> Result<()> {
    let Some(password) = config.superuser_password.as_deref() else {
        return Ok(());
    };
    info!(user = %config.superuser, "Setting superuser password");
    psql.execute("postgres", &alter_password_sql(&config.superuser, password))
        .await
}
