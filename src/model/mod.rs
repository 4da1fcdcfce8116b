pub mod config;

pub use config::{Config, ConfigError, ConfigOverlay, DatabaseConfig, LoggingConfig};
