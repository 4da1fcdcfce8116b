use super::{ColumnMeta, NativeConnection, RecordSet};
use crate::dialects::base::EngineDescriptor;
use crate::driver::{ConnectParams, DriverError, address};
use log::{debug, error, info};
use odbc_api::{
    Connection, ConnectionOptions, Cursor, DataType, Environment, ResultSetMetadata,
    buffers::TextRowSet, sys::AttrConnectionPooling,
};
use std::sync::OnceLock;

const BATCH_SIZE: usize = 32;

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();
static POOLED_ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

/// ODBC driver names and limits used to build connection strings.
#[derive(Debug, Clone)]
pub struct OdbcSettings {
    pub mysql_driver: String,
    pub postgres_driver: String,
    pub login_timeout: u32,
    /// Longest text value fetched per cell, in bytes.
    pub max_text_length: usize,
}

impl Default for OdbcSettings {
    fn default() -> Self {
        Self {
            mysql_driver: "MySQL ODBC 8.0 Unicode Driver".to_string(),
            postgres_driver: "PostgreSQL Unicode".to_string(),
            login_timeout: 30,
            max_text_length: 65536,
        }
    }
}

/// The ODBC environment lives for the whole process; connections borrow it.
fn environment(pooled: bool) -> Result<&'static Environment, DriverError> {
    let slot = if pooled {
        &POOLED_ENVIRONMENT
    } else {
        &ENVIRONMENT
    };
    if let Some(env) = slot.get() {
        return Ok(env);
    }

    if pooled {
        // SAFETY: process-level attribute, set before the pooled environment
        // is allocated.
        unsafe { Environment::set_connection_pooling(AttrConnectionPooling::DriverAware) }
            .map_err(|e| DriverError::Connection(format!("Unable to enable pooling: {}", e)))?;
    }

    let env = Environment::new().map_err(|e| {
        DriverError::Connection(format!("ODBC driver manager unavailable: {}", e))
    })?;
    Ok(slot.get_or_init(|| env))
}

fn query_error(e: odbc_api::Error) -> DriverError {
    DriverError::Query(e.to_string())
}

pub struct OdbcConnection {
    connection: Connection<'static>,
    max_text_length: usize,
}

impl OdbcConnection {
    pub fn open(
        engine: &EngineDescriptor,
        params: &ConnectParams,
        settings: &OdbcSettings,
        persistent: bool,
    ) -> Result<Self, DriverError> {
        let connection_string = address::odbc_connection_string(engine, params, settings)?;
        debug!(
            "Connecting to {} via ODBC (connection string length: {}, pooled: {})",
            engine.name,
            connection_string.len(),
            persistent
        );

        let mut options = ConnectionOptions::default();
        options.login_timeout_sec = Some(settings.login_timeout);

        let connection = environment(persistent)?
            .connect_with_connection_string(&connection_string, options)
            .map_err(|e| {
                error!("Failed to connect to {}: {}", engine.name, e);
                DriverError::Connection(e.to_string())
            })?;

        info!("Connected to {} at {}", engine.name, params.host);
        Ok(Self {
            connection,
            max_text_length: settings.max_text_length,
        })
    }
}

impl NativeConnection for OdbcConnection {
    fn execute(&mut self, sql: &str) -> Result<(), DriverError> {
        debug!("Executing SQL statement: {}", sql);

        let mut prepared = self.connection.prepare(sql).map_err(query_error)?;
        match prepared.execute(()) {
            Ok(Some(mut cursor)) => {
                // OPTIMIZE TABLE and friends answer with a result set.
                let mut buffer =
                    TextRowSet::for_cursor(BATCH_SIZE, &mut cursor, Some(self.max_text_length))
                        .map_err(query_error)?;
                let mut row_set_cursor = cursor.bind_buffer(&mut buffer).map_err(query_error)?;
                while row_set_cursor.fetch().map_err(query_error)?.is_some() {}
                debug!("Statement executed successfully with results");
                Ok(())
            }
            Ok(None) => {
                debug!("Statement executed successfully (no results)");
                Ok(())
            }
            Err(e) => {
                error!("Statement execution failed: {}", e);
                Err(query_error(e))
            }
        }
    }

    fn query(&mut self, sql: &str) -> Result<RecordSet, DriverError> {
        debug!("Querying rows: {}", sql);

        let mut prepared = self.connection.prepare(sql).map_err(query_error)?;
        let Some(mut cursor) = prepared.execute(()).map_err(query_error)? else {
            debug!("Query returned no cursor");
            return Ok(RecordSet::default());
        };

        let column_count = cursor.num_result_cols().map_err(query_error)?;
        let mut columns = Vec::with_capacity(column_count.max(0) as usize);
        for index in 1..=column_count.max(0) as u16 {
            let name = cursor.col_name(index).map_err(query_error)?;
            let data_type = cursor.col_data_type(index).map_err(query_error)?;
            columns.push(ColumnMeta::new(name, odbc_type_name(&data_type)));
        }

        let mut buffer =
            TextRowSet::for_cursor(BATCH_SIZE, &mut cursor, Some(self.max_text_length))
                .map_err(query_error)?;
        let mut row_set_cursor = cursor.bind_buffer(&mut buffer).map_err(query_error)?;
        let mut rows = Vec::new();

        while let Some(row_set) = row_set_cursor.fetch().map_err(query_error)? {
            for row_index in 0..row_set.num_rows() {
                let row = (0..row_set.num_cols())
                    .map(|col_index| {
                        row_set
                            .at(col_index, row_index)
                            .map(|v| String::from_utf8_lossy(v).to_string())
                    })
                    .collect();
                rows.push(row);
            }
        }

        debug!("Query returned {} rows", rows.len());
        Ok(RecordSet::new(columns, rows))
    }
}

/// ODBC SQL type name for a described column, used as the native type
/// key in the field type tables.
pub fn odbc_type_name(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::Integer { .. } => "SQL_INTEGER",
        DataType::SmallInt { .. } => "SQL_SMALLINT",
        DataType::TinyInt { .. } => "SQL_TINYINT",
        DataType::BigInt { .. } => "SQL_BIGINT",
        DataType::Bit { .. } => "SQL_BIT",
        DataType::Real { .. } => "SQL_REAL",
        DataType::Float { .. } => "SQL_FLOAT",
        DataType::Double { .. } => "SQL_DOUBLE",
        DataType::Numeric { .. } => "SQL_NUMERIC",
        DataType::Decimal { .. } => "SQL_DECIMAL",
        DataType::Char { .. } => "SQL_CHAR",
        DataType::WChar { .. } => "SQL_WCHAR",
        DataType::Varchar { .. } => "SQL_VARCHAR",
        DataType::WVarchar { .. } => "SQL_WVARCHAR",
        DataType::LongVarchar { .. } => "SQL_LONGVARCHAR",
        DataType::Binary { .. } => "SQL_BINARY",
        DataType::Varbinary { .. } => "SQL_VARBINARY",
        DataType::LongVarbinary { .. } => "SQL_LONGVARBINARY",
        DataType::Date { .. } => "SQL_TYPE_DATE",
        DataType::Time { .. } => "SQL_TYPE_TIME",
        DataType::Timestamp { .. } => "SQL_TYPE_TIMESTAMP",
        _ => "SQL_UNKNOWN_TYPE",
    }
}
