use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `SQLLESS_LOG`, then `RUST_LOG`, then `info`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("SQLLESS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        tracing::trace!("tracing subscriber already installed");
    }
}
