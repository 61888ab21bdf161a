//! SQL execution helpers for bootstrap

use crate::error::Result;
use common::command::run_with_input;
use common::psql;

/// Quote an identifier (`"` doubled).
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal (`'` doubled).
pub fn quote_literal(literal: &str) -> String {
    format!("'{}'", literal.replace('\'', "''"))
}

/// psql over the local socket as the bootstrap superuser.
pub struct Psql {
    superuser: String,
}

impl Psql {
    pub fn new(superuser: &str) -> Self {
        Self {
            superuser: superuser.to_string(),
        }
    }

    fn base_args(&self, database: &str) -> Vec<String> {
        vec![
            "-v".to_string(),
            "ON_ERROR_STOP=1".to_string(),
            "--no-psqlrc".to_string(),
            "--no-password".to_string(),
            "-U".to_string(),
            self.superuser.clone(),
            "-d".to_string(),
            database.to_string(),
        ]
    }

    /// Unaligned, tuples-only query. Do not put secrets in `sql`.
    pub async fn query(&self, database: &str, sql: &str) -> Result<String> {
        let mut args = self.base_args(database);
        args.extend(["-Atc".to_string(), sql.to_string()]);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        Ok(psql(&args).await?)
    }

    /// Whether `sql` returns at least one row.
    pub async fn exists(&self, database: &str, sql: &str) -> Result<bool> {
        Ok(!self.query(database, sql).await?.is_empty())
    }

    /// Run a statement fed through stdin.
    pub async fn execute(&self, database: &str, sql: &str) -> Result<()> {
        let args = self.base_args(database);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_with_input("psql", &args, sql).await?.into_checked("psql")?;
        Ok(())
    }
}
