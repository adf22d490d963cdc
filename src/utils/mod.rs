pub mod config;
pub mod logger;
pub mod schemax_toml;

pub use config::*;
pub use logger::setup_logging;
