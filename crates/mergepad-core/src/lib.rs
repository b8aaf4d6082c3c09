pub mod config;
pub mod logging;

pub use config::{ConfigError, Settings};
pub use logging::init_logging;
