use std::io::IsTerminal;

use boutique_logging::LoggerConfig;
use tracing_subscriber::EnvFilter;

pub use boutique_logging::shutdown_tracing;

pub fn init_cli_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .compact()
        .try_init();
}

pub fn init_json_logging(name: &str) {
    if !LoggerConfig::new(name).init() {
        eprintln!("a global tracing subscriber is already installed; keeping it");
    }
}
