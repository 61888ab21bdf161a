//! Lifecycle event reporting
//!
//! Every event is logged locally. When `ENTRYPOINT_EVENTS_URL` is set the
//! event is also POSTed there as JSON so an orchestrator can track node
//! bootstrap progress.

use crate::config::ContainerEnv;
use chrono::Utc;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// All lifecycle events emitted by the entrypoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TelemetryEvent {
    /// Entrypoint started and resolved its mode
    EntrypointStarted {
        mode: String,
        pg_version: String,
        version: String,
    },

    /// Upstream host accepted connections
    UpstreamReady {
        host: String,
        port: u16,
        attempts: u64,
    },

    /// Upstream host never became reachable
    UpstreamTimeout {
        host: String,
        port: u16,
        waited_secs: u64,
    },

    /// pg_basebackup finished cloning the upstream data directory
    DataCloned {
        host: String,
        mode: String,
        duration_ms: u64,
    },

    /// Backup pulled; the container will exit without starting a server
    BackupCompleted { host: String, data_dir: String },

    /// A fresh primary data directory was created
    DatabaseInitialized { data_dir: String },

    /// Configuration and bootstrap SQL finished
    BootstrapCompleted {
        mode: String,
        duration_ms: u64,
        databases: Vec<String>,
    },

    /// Bootstrap failed
    BootstrapFailed { mode: String, error: String },
}

impl TelemetryEvent {
    /// Get the event type name for logging and the JSON payload.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::EntrypointStarted { .. } => "PG_ENTRYPOINT_STARTED",
            Self::UpstreamReady { .. } => "PG_UPSTREAM_READY",
            Self::UpstreamTimeout { .. } => "PG_UPSTREAM_TIMEOUT",
            Self::DataCloned { .. } => "PG_DATA_CLONED",
            Self::BackupCompleted { .. } => "PG_BACKUP_COMPLETED",
            Self::DatabaseInitialized { .. } => "PG_DATABASE_INITIALIZED",
            Self::BootstrapCompleted { .. } => "PG_BOOTSTRAP_COMPLETED",
            Self::BootstrapFailed { .. } => "PG_BOOTSTRAP_FAILED",
        }
    }

    /// Convert event to a human-readable message.
    pub fn message(&self) -> String {
        match self {
            Self::EntrypointStarted {
                mode,
                pg_version,
                version,
            } => {
                format!(
                    "pg-entrypoint v{} started (mode={}, postgres={})",
                    version, mode, pg_version
                )
            }
            Self::UpstreamReady {
                host,
                port,
                attempts,
            } => {
                format!("{}:{} ready after {} attempt(s)", host, port, attempts)
            }
            Self::UpstreamTimeout {
                host,
                port,
                waited_secs,
            } => {
                format!("{}:{} unreachable after {}s", host, port, waited_secs)
            }
            Self::DataCloned {
                host,
                mode,
                duration_ms,
            } => {
                format!("Cloned {} data from {} in {}ms", mode, host, duration_ms)
            }
            Self::BackupCompleted { host, data_dir } => {
                format!("Backup of {} written to {}", host, data_dir)
            }
            Self::DatabaseInitialized { data_dir } => {
                format!("Initialized new data directory {}", data_dir)
            }
            Self::BootstrapCompleted {
                mode, duration_ms, ..
            } => {
                format!("Bootstrap ({}) completed in {}ms", mode, duration_ms)
            }
            Self::BootstrapFailed { mode, error } => {
                format!("Bootstrap ({}) failed: {}", mode, error)
            }
        }
    }
}

/// Event reporter. Cheap to clone.
#[derive(Clone)]
pub struct Telemetry {
    /// Built only when an endpoint is configured
    client: Option<Arc<Client>>,
    endpoint: Option<String>,
    node: String,
    run_id: String,
    component: String,
}

impl Telemetry {
    /// Create a new reporter from environment variables.
    pub fn from_env(component: &str) -> Self {
        Self::new(component, ContainerEnv::events_endpoint())
    }

    /// Create a reporter with an explicit endpoint (None logs only).
    pub fn new(component: &str, endpoint: Option<String>) -> Self {
        let client = endpoint.as_ref().map(|_| {
            let client = Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_else(|_| Client::new());
            Arc::new(client)
        });

        Self {
            client,
            endpoint,
            node: ContainerEnv::hostname(),
            run_id: Uuid::new_v4().to_string(),
            component: component.to_string(),
        }
    }

    fn payload(&self, event: &TelemetryEvent) -> Value {
        json!({
            "event": event.event_type(),
            "message": event.message(),
            "component": self.component,
            "node": self.node,
            "run_id": self.run_id,
            "timestamp": Utc::now().to_rfc3339(),
            "data": event,
        })
    }

    /// Send an event (fire and forget, non-blocking).
    ///
    /// Errors are logged but do not affect the caller.
    pub fn send(&self, event: TelemetryEvent) {
        info!(event = %event.event_type(), "{}", event.message());

        let (Some(client), Some(endpoint)) = (self.client.clone(), self.endpoint.clone()) else {
            return;
        };
        let payload = self.payload(&event);

        thread::spawn(move || match client.post(&endpoint).json(&payload).send() {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => {
                warn!("Event endpoint returned status {}", resp.status());
            }
            Err(e) => {
                warn!("Event send failed: {}", e);
            }
        });
    }

    /// Send an event synchronously (blocking).
    ///
    /// Use this right before exiting the process so the event is not lost.
    pub fn send_sync(&self, event: TelemetryEvent) -> Result<(), reqwest::Error> {
        info!(event = %event.event_type(), "{}", event.message());

        let (Some(client), Some(endpoint)) = (self.client.as_deref(), self.endpoint.as_deref())
        else {
            return Ok(());
        };

        client
            .post(endpoint)
            .json(&self.payload(&event))
            .send()?
            .error_for_status()?;

        Ok(())
    }
}
