//! Replication components
//!
//! This module provides everything that relates this node to its upstream:
//! - Waiting for the upstream to accept connections
//! - Cloning its data directory
//! - Standby (recovery) configuration on replicas
//! - Hot standby settings on a primary

mod basebackup;
mod recovery;
mod standby;
mod wait;

pub use basebackup::{basebackup_args, clear_directory, clone_from_upstream};
pub use recovery::{configure_recovery, upstream_conninfo};
pub use standby::{configure_hot_standby, hot_standby_params};
pub use wait::{pg_isready_args, wait_for_host, wait_for_host_with, wait_until, PROBE_INTERVAL};
