//! Multi-engine database driver layer.
//!
//! A [`DbHandle`] wraps one native connection to MySQL (legacy utf8 or
//! utf8mb4), PostgreSQL or SQLite. Right after connecting it negotiates
//! charset and collation, and from then on it translates ordering, date
//! formatting, locking and vacuuming into the engine's dialect.

pub mod cli;
pub mod dialects;
pub mod driver;
pub mod executor;
pub mod logger;
pub mod model;
pub mod schema;

pub use dialects::{
    DriverKind, DriverRegistry, EngineDescriptor, FieldType, OrderSpec, ServerVersion, SqlFamily,
};
pub use driver::{ConnectParams, DbHandle, DriverError};
pub use executor::{ColumnMeta, Connector, NativeConnection, NativeConnector, RecordSet};
pub use model::{Config, DatabaseConfig};
pub use schema::{ColumnDef, ForeignKeyDef, IndexDef, Schema, SchemaOperations, SqlType, TableDef};
