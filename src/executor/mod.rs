//! Native transports.
//!
//! A transport opens one native connection and runs raw SQL on it. ODBC
//! serves the MySQL and PostgreSQL engines; SQLite runs in-process through
//! rusqlite so that functions and collations can be registered on the live
//! connection.

pub mod connection;
pub mod record_set;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod scripted;

use crate::dialects::base::{EngineDescriptor, SqlFamily};
use crate::driver::{ConnectParams, DriverError};

pub use connection::{OdbcConnection, OdbcSettings};
pub use record_set::{ColumnMeta, RecordSet};
pub use sqlite::SqliteConnection;

/// An open native connection owned by exactly one `DbHandle`.
pub trait NativeConnection {
    /// Run a statement, discarding any rows it produces.
    fn execute(&mut self, sql: &str) -> Result<(), DriverError>;

    /// Run a statement and materialize its rows.
    fn query(&mut self, sql: &str) -> Result<RecordSet, DriverError>;

    /// Install a `now()` scalar function. Returns `false` when the
    /// transport cannot host user functions.
    fn register_now_function(&mut self) -> Result<bool, DriverError> {
        Ok(false)
    }

    /// Install a Unicode-aware collation sequence called `name`. Returns
    /// `false` when no comparator is available.
    fn register_unicode_collation(&mut self, _name: &str) -> Result<bool, DriverError> {
        Ok(false)
    }
}

/// Factory for native connections, injected into `DbHandle`.
pub trait Connector {
    fn open(
        &self,
        engine: &EngineDescriptor,
        params: &ConnectParams,
        persistent: bool,
    ) -> Result<Box<dyn NativeConnection>, DriverError>;
}

/// The production connector: ODBC for client/server engines, rusqlite for
/// SQLite.
#[derive(Debug, Clone, Default)]
pub struct NativeConnector {
    pub odbc: OdbcSettings,
}

impl NativeConnector {
    pub fn new(odbc: OdbcSettings) -> Self {
        Self { odbc }
    }
}

impl Connector for NativeConnector {
    fn open(
        &self,
        engine: &EngineDescriptor,
        params: &ConnectParams,
        persistent: bool,
    ) -> Result<Box<dyn NativeConnection>, DriverError> {
        match engine.family {
            SqlFamily::Mysql | SqlFamily::Postgresql => {
                let conn = OdbcConnection::open(engine, params, &self.odbc, persistent)?;
                Ok(Box::new(conn))
            }
            SqlFamily::Sqlite => Ok(Box::new(SqliteConnection::open(&params.database)?)),
        }
    }
}
