// 📝 Logging - tracing subscriber setup shared by both binaries

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_level`.
/// Calling it twice is harmless, the second call is ignored.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Filter level for the CLI's `--debug` switch
pub fn cli_level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}
