//! Infrastructure adapters for IO, config, and logging.

pub mod config;
pub mod fs;
pub mod logging;
