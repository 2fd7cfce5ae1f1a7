pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;

pub fn init(config: &infra::config::Config) {
    infra::logging::init(config);
}
