use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CCGUARD_LOG";

/// Install the stderr subscriber. Stdout is reserved for host responses.
pub(crate) fn init_logging(debug: bool) {
    let default_level = if debug { "ccguard=debug" } else { "ccguard=warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
