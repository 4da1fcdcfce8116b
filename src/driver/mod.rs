//! The connection handle: one native connection plus the engine strategy
//! that negotiates, translates and locks on its behalf.

pub mod address;
pub mod error;
pub mod handle;

#[cfg(test)]
mod tests;

pub use error::DriverError;
pub use handle::DbHandle;

use std::fmt;

/// Credentials and location of the database to open.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// `host`, `host:port` or `host:/path/to/socket`. Ignored by SQLite.
    pub host: String,
    pub user: String,
    password: String,
    /// Database name, or the file path for SQLite.
    pub database: String,
}

impl ConnectParams {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            database: database.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}
