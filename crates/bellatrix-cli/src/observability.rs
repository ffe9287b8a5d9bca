// Tracing initialization for the command-line run.
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn init_tracing(debug: bool) {
    init_tracing_with_level(if debug { "debug" } else { "info" });
}

pub fn init_tracing_with_level(level: &str) {
    // RUST_LOG overrides the level chosen from the flags.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
