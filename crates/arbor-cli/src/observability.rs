// Tracing initialization with a level that can be replaced once the
// configuration file has been read.
use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, tracing_subscriber::Registry>> =
    OnceLock::new();

/// Install the global subscriber, logging to stderr at `level` unless `RUST_LOG` is set.
pub fn init_tracing_with_level(level: &str) {
    // Prefer RUST_LOG from env, otherwise use provided level string.
    let base_filter = rust_log_filter().unwrap_or_else(|| EnvFilter::new(level));

    let (reload_layer, handle) = reload::Layer::new(base_filter);
    let _ = LOG_RELOAD_HANDLE.set(handle);

    // Logs go to stderr so command output stays machine-readable.
    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Apply the configured logging level unless RUST_LOG already decides it.
pub fn apply_logging_level(level: &str) {
    if rust_log_filter().is_some() {
        return;
    }
    if let Some(handle) = LOG_RELOAD_HANDLE.get() {
        let _ = handle.modify(|f| {
            *f = EnvFilter::new(level);
        });
    }
}

fn rust_log_filter() -> Option<EnvFilter> {
    std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_can_be_replaced_after_init() {
        init_tracing_with_level("warn");
        assert!(LOG_RELOAD_HANDLE.get().is_some());

        // Second init keeps the first subscriber and handle.
        init_tracing_with_level("error");
        apply_logging_level("debug");
    }
}
