use crate::dialects::base::{
    ConnectOperations, DatePart, DatePiece, DialectConfig, DialectOperations, Engine,
    EngineDescriptor, LockOperations, MaintenanceOperations, Negotiated, VacuumPlan, sql_literal,
    tokenize_date_pattern,
};
use crate::dialects::version::ServerVersion;
use crate::driver::DriverError;
use crate::executor::NativeConnection;
use crate::schema::{SchemaOperations, SqliteSchema};
use log::{info, warn};
use std::sync::OnceLock;

static CONFIG: OnceLock<DialectConfig> = OnceLock::new();

/// Name under which the Unicode collation is registered.
pub const UNICODE_COLLATION: &str = "UNICODE";

pub const SESSION_PRAGMAS: [&str; 2] = ["PRAGMA short_column_names = 1", "PRAGMA encoding = \"UTF-8\""];

pub struct SqliteEngine {
    config: &'static DialectConfig,
}

impl SqliteEngine {
    pub fn new() -> Self {
        let config = CONFIG.get_or_init(|| {
            let config_str = include_str!("dialect.toml");
            toml::from_str(config_str).expect("Failed to parse SQLite dialect config")
        });

        Self { config }
    }
}

impl Default for SqliteEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectOperations for SqliteEngine {
    fn version_sql(&self) -> &'static str {
        "SELECT sqlite_version()"
    }

    fn last_insert_id_sql(&self) -> &'static str {
        "SELECT last_insert_rowid()"
    }

    fn negotiate(
        &self,
        conn: &mut dyn NativeConnection,
        _engine: &EngineDescriptor,
        version: &ServerVersion,
    ) -> Result<Negotiated, DriverError> {
        for pragma in SESSION_PRAGMAS {
            conn.execute(pragma)
                .map_err(|e| DriverError::Negotiation(format!("{}: {}", pragma, e.message())))?;
        }

        if !conn.register_now_function()? {
            return Err(DriverError::Negotiation(
                "transport cannot register the now() function".to_string(),
            ));
        }

        let unicode_collation = match conn.register_unicode_collation(UNICODE_COLLATION) {
            Ok(true) => Some(UNICODE_COLLATION.to_string()),
            Ok(false) => {
                warn!("No Unicode comparator available, ordering falls back to LOWER()");
                None
            }
            Err(e) => {
                warn!("Unable to register Unicode collation, falling back to LOWER(): {}", e);
                None
            }
        };

        info!("Negotiated SQLite {} session", version);
        Ok(Negotiated { unicode_collation })
    }
}

impl DialectOperations for SqliteEngine {
    fn config(&self) -> &DialectConfig {
        self.config
    }

    fn collate(&self, field: &str, collation: Option<&str>) -> String {
        match collation {
            Some(collation) => format!("{} COLLATE {}", field, collation),
            None => format!("LOWER({})", field),
        }
    }

    fn date_format(&self, field: &str, pattern: &str) -> String {
        let mut format = String::new();
        for piece in tokenize_date_pattern(pattern) {
            match piece {
                DatePiece::Part(part) => format.push_str(match part {
                    DatePart::Day => "%d",
                    DatePart::Hour => "%H",
                    DatePart::Minute => "%M",
                    DatePart::Month => "%m",
                    DatePart::Second => "%S",
                    DatePart::Year => "%Y",
                }),
                DatePiece::Literal(text) => format.push_str(&text.replace('%', "%%")),
            }
        }
        format!("strftime({}, {})", sql_literal(&format), field)
    }
}

impl LockOperations for SqliteEngine {
    /// SQLite only locks whole databases; the table is ignored.
    fn lock_statements(&self, _quoted_table: &str) -> Vec<String> {
        vec!["BEGIN EXCLUSIVE TRANSACTION".to_string()]
    }

    fn unlock_sql(&self) -> &'static str {
        "COMMIT"
    }
}

impl MaintenanceOperations for SqliteEngine {
    /// VACUUM holds an exclusive lock on the whole file, so it waits for
    /// close.
    fn vacuum_plan(&self, _quoted_table: &str) -> VacuumPlan {
        VacuumPlan::OnClose("VACUUM".to_string())
    }
}

impl Engine for SqliteEngine {
    fn schema(&self, _engine: &EngineDescriptor) -> Box<dyn SchemaOperations> {
        Box::new(SqliteSchema::new())
    }
}
