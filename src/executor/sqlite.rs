use super::{ColumnMeta, NativeConnection, RecordSet};
use crate::driver::DriverError;
use chrono::Local;
use log::{debug, info};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

const NOW_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// In-process SQLite connection.
pub struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    /// Open (creating if needed) the database file at `path`. `:memory:`
    /// opens a private in-memory database.
    pub fn open(path: &str) -> Result<Self, DriverError> {
        if path.is_empty() {
            return Err(DriverError::Connection(
                "SQLite database path is required".to_string(),
            ));
        }

        let opened = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(DriverError::Connection(format!(
                        "Directory for SQLite database does not exist: {}",
                        parent.display()
                    )));
                }
            }
            Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            )
        };
        let conn = opened.map_err(|e| {
            DriverError::Connection(format!("Failed to open SQLite database: {}", e))
        })?;

        info!("Opened SQLite database {}", path);
        Ok(Self { conn })
    }
}

fn query_error(e: rusqlite::Error) -> DriverError {
    DriverError::Query(e.to_string())
}

fn value_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).to_string()),
    }
}

/// Runtime storage class, reported when a column has no declared type
/// (expressions, aggregates).
fn storage_class(value: ValueRef<'_>) -> &'static str {
    match value {
        ValueRef::Null => "NULL",
        ValueRef::Integer(_) => "INTEGER",
        ValueRef::Real(_) => "REAL",
        ValueRef::Text(_) => "TEXT",
        ValueRef::Blob(_) => "BLOB",
    }
}

/// Case-insensitive Unicode comparison; byte order breaks ties so that
/// distinct strings never compare equal.
pub fn unicode_compare(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

impl NativeConnection for SqliteConnection {
    fn execute(&mut self, sql: &str) -> Result<(), DriverError> {
        debug!("Executing SQL statement: {}", sql);
        self.conn.execute_batch(sql).map_err(query_error)
    }

    fn query(&mut self, sql: &str) -> Result<RecordSet, DriverError> {
        debug!("Querying rows: {}", sql);

        let mut stmt = self.conn.prepare(sql).map_err(query_error)?;
        let mut columns: Vec<ColumnMeta> = stmt
            .columns()
            .iter()
            .map(|c| ColumnMeta::new(c.name(), c.decl_type().unwrap_or_default()))
            .collect();
        let column_count = columns.len();
        // Columns without a declared type take the storage class of their
        // first non-NULL value.
        let mut untyped: Vec<bool> = columns.iter().map(|c| c.native_type.is_empty()).collect();

        let mut rows = Vec::new();
        let mut result = stmt.query([]).map_err(query_error)?;
        while let Some(row) = result.next().map_err(query_error)? {
            let mut values = Vec::with_capacity(column_count);
            for index in 0..column_count {
                let value = row.get_ref(index).map_err(query_error)?;
                if untyped[index] && !matches!(value, ValueRef::Null) {
                    columns[index].native_type = storage_class(value).to_string();
                    untyped[index] = false;
                }
                values.push(value_text(value));
            }
            rows.push(values);
        }
        for (column, pending) in columns.iter_mut().zip(&untyped) {
            if *pending {
                column.native_type = storage_class(ValueRef::Null).to_string();
            }
        }

        debug!("Query returned {} rows", rows.len());
        Ok(RecordSet::new(columns, rows))
    }

    fn register_now_function(&mut self) -> Result<bool, DriverError> {
        self.conn
            .create_scalar_function("now", 0, FunctionFlags::SQLITE_UTF8, |_ctx| {
                Ok(Local::now().format(NOW_FORMAT).to_string())
            })
            .map_err(|e| DriverError::Negotiation(format!("Unable to register now(): {}", e)))?;
        Ok(true)
    }

    #[cfg(feature = "unicode-collation")]
    fn register_unicode_collation(&mut self, name: &str) -> Result<bool, DriverError> {
        self.conn
            .create_collation(name, unicode_compare)
            .map_err(|e| {
                DriverError::Negotiation(format!("Unable to register collation {}: {}", name, e))
            })?;
        Ok(true)
    }
}
