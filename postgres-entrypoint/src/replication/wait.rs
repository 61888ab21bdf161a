//! Upstream readiness polling

use crate::error::{EntrypointError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// Delay between readiness probes
pub const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Probe up to `attempts` times, sleeping `interval` between failures.
///
/// Returns the attempt that succeeded, or None once every attempt failed.
/// Probe errors (e.g. a missing binary) abort the wait.
pub async fn wait_until<F, Fut>(attempts: u64, interval: Duration, mut probe: F) -> Result<Option<u64>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        if probe().await? {
            return Ok(Some(attempt));
        }

        debug!(attempt, max = attempts, "Not ready yet");
        if attempt % 10 == 0 {
            info!(attempt, max = attempts, "Still waiting");
        }

        if attempt < attempts {
            sleep(interval).await;
        }
    }
    Ok(None)
}

/// `pg_isready` arguments for a one-second probe of `host:port`.
pub fn pg_isready_args(host: &str, port: u16) -> Vec<String> {
    vec![
        "-h".to_string(),
        host.to_string(),
        "-p".to_string(),
        port.to_string(),
        "-t".to_string(),
        "1".to_string(),
    ]
}

/// Wait for `host:port` to accept connections.
///
/// Returns the number of probes it took, or `UpstreamTimeout`.
pub async fn wait_for_host(host: &str, port: u16, timeout_secs: u64) -> Result<u64> {
    let args = pg_isready_args(host, port);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    wait_for_host_with(host, port, timeout_secs, PROBE_INTERVAL, || {
        common::pg_isready_probe(&args)
    })
    .await
}

/// `wait_for_host` with a caller-supplied readiness probe.
pub async fn wait_for_host_with<F, Fut>(
    host: &str,
    port: u16,
    timeout_secs: u64,
    interval: Duration,
    probe: F,
) -> Result<u64>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    info!(host, port, timeout = timeout_secs, "Waiting for upstream to accept connections");

    match wait_until(timeout_secs, interval, probe).await? {
        Some(attempts) => {
            info!(host, port, attempts, "Upstream is accepting connections");
            Ok(attempts)
        }
        None => Err(EntrypointError::UpstreamTimeout {
            host: host.to_string(),
            port,
            waited_secs: timeout_secs,
        }),
    }
}
