use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Driver key or alias, e.g. `pdomysqlmb4` or `sqlite`.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// `host`, `host:port` or `host:/path/to/socket`.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Database name, or file path for SQLite.
    #[serde(default = "default_database")]
    pub database: String,

    /// Swallow lock failures (MySQL family only). Unset means the driver
    /// default.
    #[serde(default)]
    pub weak_locks: Option<bool>,

    #[serde(default)]
    pub persistent: bool,

    /// ODBC driver name overriding the family default.
    #[serde(default)]
    pub odbc_driver: Option<String>,

    #[serde(default = "default_login_timeout")]
    pub login_timeout: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_driver() -> String {
    "pdosqlite".to_string()
}
fn default_host() -> String {
    "localhost".to_string()
}
fn default_database() -> String {
    "blog.db".to_string()
}
fn default_login_timeout() -> u32 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            host: default_host(),
            user: None,
            password: None,
            database: default_database(),
            weak_locks: None,
            persistent: false,
            odbc_driver: None,
            login_timeout: default_login_timeout(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("weak_locks", &self.weak_locks)
            .field("persistent", &self.persistent)
            .field("odbc_driver", &self.odbc_driver)
            .field("login_timeout", &self.login_timeout)
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Override file contents: only keys present in the file are `Some`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverlay {
    #[serde(default)]
    pub database: DatabaseOverlay,

    #[serde(default)]
    pub logging: LoggingOverlay,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseOverlay {
    pub driver: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub weak_locks: Option<bool>,
    pub persistent: Option<bool>,
    pub odbc_driver: Option<String>,
    pub login_timeout: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingOverlay {
    pub level: Option<String>,
}

impl ConfigOverlay {
    /// Parse an override file. A missing file is `None`; an unreadable or
    /// malformed one is an error.
    pub fn load_optional(path: &str) -> Result<Option<Self>, ConfigError> {
        if !Path::new(path).exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        toml::from_str(&content)
            .map(Some)
            .map_err(|e| ConfigError::Parse(path.to_string(), e.to_string()))
    }
}

impl Config {
    /// Load configuration from file with environment override support
    pub fn load(config_path: Option<&str>, environment: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Load base configuration file
        if let Some(path) = config_path {
            config = Self::load_from_file(path)?;
        } else {
            // Try loading from standard locations
            for standard_path in Self::standard_config_paths() {
                if standard_path.exists() {
                    debug!("Loading config from: {}", standard_path.display());
                    config = Self::load_from_file(&standard_path.to_string_lossy())?;
                    break;
                }
            }
        }

        // Load environment-specific overrides
        if let Some(env) = environment {
            if let Some(overlay) = Self::load_environment_config(env)? {
                debug!("Applying environment config for: {}", env);
                config = config.merge(overlay);
            }
        }

        // Load local overrides (always last)
        if let Some(overlay) = ConfigOverlay::load_optional("config/local.toml")? {
            debug!("Applying local config overrides");
            config = config.merge(overlay);
        }

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_string(), e.to_string()))
    }

    /// Load environment-specific overrides, if the file exists
    fn load_environment_config(environment: &str) -> Result<Option<ConfigOverlay>, ConfigError> {
        let env_path = format!("config/{}.toml", environment);
        ConfigOverlay::load_optional(&env_path)
    }

    /// Get standard configuration file paths in order of precedence
    fn standard_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
        ]
    }

    /// Apply the values an override file actually sets
    pub fn merge(mut self, overlay: ConfigOverlay) -> Self {
        let database = overlay.database;
        if let Some(driver) = database.driver {
            self.database.driver = driver;
        }
        if let Some(host) = database.host {
            self.database.host = host;
        }
        if database.user.is_some() {
            self.database.user = database.user;
        }
        if database.password.is_some() {
            self.database.password = database.password;
        }
        if let Some(name) = database.database {
            self.database.database = name;
        }
        if database.weak_locks.is_some() {
            self.database.weak_locks = database.weak_locks;
        }
        if let Some(persistent) = database.persistent {
            self.database.persistent = persistent;
        }
        if database.odbc_driver.is_some() {
            self.database.odbc_driver = database.odbc_driver;
        }
        if let Some(timeout) = database.login_timeout {
            self.database.login_timeout = timeout;
        }

        if let Some(level) = overlay.logging.level {
            self.logging.level = level;
        }

        self
    }

    /// Generate a default configuration file
    pub fn generate_default_config(path: &str) -> Result<(), ConfigError> {
        let config = Config::default();
        let toml_content =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, toml_content)
            .map_err(|e| ConfigError::FileWrite(path.to_string(), e.to_string()))?;

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    FileRead(String, String),

    #[error("Failed to parse config file '{0}': {1}")]
    Parse(String, String),

    #[error("Failed to write config file '{0}': {1}")]
    FileWrite(String, String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}
