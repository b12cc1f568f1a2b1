use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG`, then `LOG_LEVEL`, then `default_level`.
/// Calling this twice is harmless; the second install is ignored.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
