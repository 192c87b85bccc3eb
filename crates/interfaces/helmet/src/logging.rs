use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `--verbose`.
///
/// Logs go to stderr so the operator interface owns stdout.
pub fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
