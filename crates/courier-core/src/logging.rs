//! Tracing setup shared by composition roots and integration tests.

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Safe to call more
/// than once; later calls are no-ops.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .try_init();
}
