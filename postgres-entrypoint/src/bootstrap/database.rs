//! Default database and extension creation

use super::sql::{quote_ident, quote_literal, Psql};
use crate::config::Config;
use crate::error::Result;
use tracing::info;

pub fn database_exists_sql(database: &str) -> String {
    format!(
        "SELECT 1 FROM pg_catalog.pg_database WHERE datname = {}",
        quote_literal(database)
    )
}

pub fn create_database_sql(database: &str, template: &str) -> String {
    format!(
        "CREATE DATABASE {} WITH TEMPLATE = {};",
        quote_ident(database),
        quote_ident(template)
    )
}

pub fn create_extension_sql(extension: &str) -> String {
    format!("CREATE EXTENSION IF NOT EXISTS {};", quote_ident(extension))
}

pub fn grant_sql(database: &str, user: &str) -> String {
    format!(
        "GRANT ALL PRIVILEGES ON DATABASE {} TO {};",
        quote_ident(database),
        quote_ident(user)
    )
}

/// Create every configured extension inside `database`.
pub async fn load_extensions(config: &Config, psql: &Psql, database: &str) -> Result<()> {
    for extension in &config.database.extensions {
        info!(database, extension = %extension, "Loading extension");
        psql.execute(database, &create_extension_sql(extension)).await?;
    }
    Ok(())
}

/// Create the configured databases on a primary, load extensions into each
/// and grant the database user access. Returns the databases handled.
pub async fn create_database(config: &Config, psql: &Psql) -> Result<Vec<String>> {
    if config.database.names.is_empty() {
        return Ok(Vec::new());
    }
    if config.mode.is_replica() {
        info!(mode = %config.mode, "Database cannot be created on a replica node, skipping");
        return Ok(Vec::new());
    }

    for database in &config.database.names {
        if psql.exists("postgres", &database_exists_sql(database)).await? {
            info!(database = %database, "Database already exists");
        } else {
            info!(database = %database, template = %config.database.template, "Creating database");
            psql.execute(
                "postgres",
                &create_database_sql(database, &config.database.template),
            )
            .await?;
        }

        load_extensions(config, psql, database).await?;

        if let Some(user) = config.database.user.as_deref() {
            info!(database = %database, user, "Granting access");
            psql.execute("postgres", &grant_sql(database, user)).await?;
        }
    }

    Ok(config.database.names.clone())
}
