use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins when set; otherwise `default` applies.
fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Logging for the long-running service.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("rental_service=info,rental_client=info,warn"))
        .with_target(false)
        .init();
}

/// Logging for `rentalctl`: command output owns stdout, so logs go to stderr
/// and only warnings show by default.
pub fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
