use crate::model::DatabaseConfig;
use clap::{Args, Parser, Subcommand};

/// CLI entry point for sqlbridge
#[derive(Parser, Debug)]
#[command(
    name = "sqlbridge",
    version,
    about = "Multi-engine database driver layer for MySQL, PostgreSQL and SQLite"
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Environment (loads config/{env}.toml)
    #[arg(long, global = true)]
    pub env: Option<String>,

    /// Log statements and negotiation steps
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection options overriding the `[database]` section.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnArgs {
    /// Driver key or alias (see `drivers`)
    #[arg(long)]
    pub driver: Option<String>,

    /// host, host:port or host:/path/to/socket
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub user: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    /// Database name, or file path for SQLite
    #[arg(long)]
    pub database: Option<String>,

    /// Use the transport's connection pool
    #[arg(long)]
    pub persistent: bool,

    /// Report lock failures even on MySQL
    #[arg(long)]
    pub strict_locks: bool,
}

impl ConnArgs {
    /// Layer the flags over the loaded configuration.
    pub fn apply_to(&self, config: &mut DatabaseConfig) {
        if let Some(driver) = &self.driver {
            config.driver = driver.clone();
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if self.user.is_some() {
            config.user = self.user.clone();
        }
        if self.password.is_some() {
            config.password = self.password.clone();
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if self.persistent {
            config.persistent = true;
        }
        if self.strict_locks {
            config.weak_locks = Some(false);
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the registered drivers and their aliases
    Drivers,

    /// Connect, negotiate and report the session
    Check {
        #[command(flatten)]
        conn: ConnArgs,
    },

    /// Run a statement and print its rows as tab-separated text
    Query {
        /// SQL to run
        sql: String,

        #[command(flatten)]
        conn: ConnArgs,
    },

    /// List tables in the database
    Tables {
        #[command(flatten)]
        conn: ConnArgs,
    },

    /// Show the columns and indexes of a table
    Describe {
        table: String,

        #[command(flatten)]
        conn: ConnArgs,
    },

    /// Reclaim space held by a table
    Vacuum {
        table: String,

        #[command(flatten)]
        conn: ConnArgs,
    },

    /// Generate configuration file; with --env also config/{env}.toml
    Config {
        /// Output path for config file
        #[arg(long, default_value = "config.toml")]
        output: String,
    },
}
