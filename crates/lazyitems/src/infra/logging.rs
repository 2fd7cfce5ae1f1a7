//! Tracing subscriber setup.

use tracing::Level;

use crate::infra::config::Config;

/// Install the fmt subscriber on stderr at the configured level.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init(config: &Config) {
    let level = parse_level(&config.logging.level());
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn parse_level(raw: &str) -> Level {
    raw.trim().parse().unwrap_or(Level::WARN)
}
