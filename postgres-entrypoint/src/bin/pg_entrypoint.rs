//! Container entrypoint
//!
//! Runs as root only long enough to fix directory ownership, then re-executes
//! itself as `postgres`, configures PGDATA for REPLICATION_MODE and finally
//! replaces itself with the server (or exits after a backup).

use anyhow::Result;
use common::{init_logging, Telemetry, TelemetryEvent};
use postgres_entrypoint::privileges::{exec_as_postgres, exec_server, is_root, prepare_directories};
use postgres_entrypoint::{failure_event, initialize_database, Config, EntrypointError, Outcome};
use tracing::{error, info, warn};

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn report(telemetry: &Telemetry, event: TelemetryEvent) {
    if let Err(e) = telemetry.send_sync(event) {
        warn!(error = %e, "Failed to report event");
    }
}

fn main() -> Result<()> {
    let _guard = init_logging("pg-entrypoint");
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match Config::from_env().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    if is_root() {
        runtime()?.block_on(prepare_directories(&config))?;
        return Err(exec_as_postgres(&args));
    }

    // Built outside the runtime: the event client blocks
    let telemetry = Telemetry::from_env("pg-entrypoint");
    telemetry.send(TelemetryEvent::EntrypointStarted {
        mode: config.mode.to_string(),
        pg_version: config
            .pg_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "detect".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    });

    let result = runtime()?.block_on(initialize_database(&config, &telemetry));

    match result {
        Ok(done) => {
            // Must reach the endpoint before exit or exec
            if let Some(event) = done.event {
                report(&telemetry, event);
            }
            match done.outcome {
                Outcome::Exit => {
                    info!(data_dir = %config.data_dir.display(), "Backup complete, exiting");
                    Ok(())
                }
                Outcome::StartServer => Err(exec_server(&args)),
            }
        }
        Err(e) => {
            if matches!(e, EntrypointError::UpstreamTimeout { .. }) {
                error!(error = %e, "Timeout waiting for upstream");
            } else {
                error!(error = %e, mode = %config.mode, "Database initialization failed");
            }
            report(&telemetry, failure_event(&config, &e));
            std::process::exit(1);
        }
    }
}
