//! Engine families and driver selection.
//!
//! Each family (MySQL, PostgreSQL, SQLite) implements the capability traits
//! in `base`. The six drivers in `registry` are descriptors pointing at one
//! of those families.

pub mod base;
pub mod registry;
pub mod version;

pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use base::{
    Engine, EngineDescriptor, FieldType, Negotiated, OrderSpec, SqlFamily, Transport,
};
pub use registry::{DriverKind, DriverRegistry};
pub use version::ServerVersion;

/// Strategy object for a SQL family.
pub fn engine_for(family: SqlFamily) -> Box<dyn Engine> {
    match family {
        SqlFamily::Mysql => Box::new(mysql::MysqlEngine::new()),
        SqlFamily::Postgresql => Box::new(postgres::PostgresEngine::new()),
        SqlFamily::Sqlite => Box::new(sqlite::SqliteEngine::new()),
    }
}
