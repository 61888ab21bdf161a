//! PostgreSQL container entrypoint
//!
//! Prepares PGDATA for one of four replication modes before the server starts:
//! - `primary`: initdb, default roles, databases and extensions
//! - `slave`: clone from the upstream and follow it as a streaming standby
//! - `snapshot`: clone from the upstream and run standalone
//! - `backup`: clone from the upstream and exit

pub mod bootstrap;
pub mod conf;
pub mod config;
pub mod error;
pub mod paths;
pub mod privileges;
pub mod replication;
pub mod server;
pub mod version;

pub use bootstrap::{failure_event, initialize_database, Completion, Outcome};
pub use config::{Config, ReplicationMode};
pub use error::{EntrypointError, Result};
pub use paths::DataPaths;
pub use version::PgVersion;
