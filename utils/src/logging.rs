//! Minimal `tracing` bootstrap for binaries that have no configuration yet.

/// Install a plain subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
