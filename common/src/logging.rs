//! Structured logging initialization
//!
//! Provides consistent logging initialization across all entrypoint binaries.

use crate::config::env_opt;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Guard that keeps the tracing subscriber active.
/// Drop this at the end of main to flush logs.
pub struct LogGuard;

/// Initialize structured logging for a component.
///
/// Level defaults to INFO and can be raised with `RUST_LOG`.
/// `LOG_FORMAT=json` emits one JSON object per line for log collectors.
///
/// # Example
/// ```ignore
/// let _guard = init_logging("pg-entrypoint");
/// info!("Starting up...");
/// ```
pub fn init_logging(component: &str) -> LogGuard {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let registry = tracing_subscriber::registry().with(filter);

    if is_json_format(env_opt("LOG_FORMAT").as_deref()) {
        registry
            .with(fmt::layer().json().with_target(false).with_current_span(false))
            .init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }

    tracing::debug!(component, "Logging initialized");
    LogGuard
}

fn is_json_format(value: Option<&str>) -> bool {
    value.map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format_selection() {
        assert!(is_json_format(Some("JSON")));
        assert!(!is_json_format(Some("text")));
        assert!(!is_json_format(None));
    }
}
