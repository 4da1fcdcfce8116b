use crate::dialects::base::{
    ConnectOperations, DatePart, DatePiece, DialectConfig, DialectOperations, Engine,
    EngineDescriptor, LockOperations, MaintenanceOperations, Negotiated, VacuumPlan, sql_literal,
    tokenize_date_pattern,
};
use crate::dialects::version::ServerVersion;
use crate::driver::DriverError;
use crate::executor::NativeConnection;
use crate::schema::{PostgresSchema, SchemaOperations};
use log::{debug, info, warn};
use std::sync::OnceLock;

static CONFIG: OnceLock<DialectConfig> = OnceLock::new();

/// Oldest server with per-column collations.
pub const COLLATION_FLOOR: ServerVersion = ServerVersion::new(9, 1, 0);

pub const CLIENT_ENCODING_SQL: &str = "SET client_encoding = 'UTF8'";

/// First UTF-8 collation installed on the server.
pub const COLLATION_PROBE_SQL: &str = "SELECT collname FROM pg_collation \
     WHERE lower(collcollate) LIKE '%.utf8' OR lower(collcollate) LIKE '%.utf-8' \
     ORDER BY collname LIMIT 1";

pub struct PostgresEngine {
    config: &'static DialectConfig,
}

impl PostgresEngine {
    pub fn new() -> Self {
        let config = CONFIG.get_or_init(|| {
            let config_str = include_str!("dialect.toml");
            toml::from_str(config_str).expect("Failed to parse PostgreSQL dialect config")
        });

        Self { config }
    }

    fn probe_collation(&self, conn: &mut dyn NativeConnection) -> Option<String> {
        match conn.query(COLLATION_PROBE_SQL) {
            Ok(rs) => {
                let found = rs.scalar().map(str::to_string);
                if found.is_none() {
                    warn!("No UTF-8 collation installed, ordering falls back to LOWER()");
                }
                found
            }
            Err(e) => {
                warn!("Collation probe failed, ordering falls back to LOWER(): {}", e);
                None
            }
        }
    }
}

impl Default for PostgresEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap literal text for `TO_CHAR` so none of it is read as a pattern.
fn to_char_literal(text: &str) -> String {
    if text.chars().all(|c| !c.is_alphanumeric() && c != '"' && c != '\\') {
        return text.to_string();
    }
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

impl ConnectOperations for PostgresEngine {
    fn version_sql(&self) -> &'static str {
        "SHOW server_version"
    }

    fn last_insert_id_sql(&self) -> &'static str {
        "SELECT LASTVAL()"
    }

    fn negotiate(
        &self,
        conn: &mut dyn NativeConnection,
        _engine: &EngineDescriptor,
        version: &ServerVersion,
    ) -> Result<Negotiated, DriverError> {
        conn.execute(CLIENT_ENCODING_SQL).map_err(|e| {
            DriverError::Negotiation(format!("{}: {}", CLIENT_ENCODING_SQL, e.message()))
        })?;

        let unicode_collation = if version.at_least(COLLATION_FLOOR) {
            self.probe_collation(conn)
        } else {
            debug!("PostgreSQL {} has no column collations", version);
            None
        };

        info!(
            "Negotiated PostgreSQL {} session (collation: {})",
            version,
            unicode_collation.as_deref().unwrap_or("none")
        );
        Ok(Negotiated { unicode_collation })
    }
}

impl DialectOperations for PostgresEngine {
    fn config(&self) -> &DialectConfig {
        self.config
    }

    fn collate(&self, field: &str, collation: Option<&str>) -> String {
        match collation {
            Some(collation) => format!(
                "{} COLLATE \"{}\"",
                field,
                collation.replace('"', "\"\"")
            ),
            None => format!("LOWER({})", field),
        }
    }

    fn date_format(&self, field: &str, pattern: &str) -> String {
        let mut format = String::new();
        for piece in tokenize_date_pattern(pattern) {
            match piece {
                DatePiece::Part(part) => format.push_str(match part {
                    DatePart::Day => "DD",
                    DatePart::Hour => "HH24",
                    DatePart::Minute => "MI",
                    DatePart::Month => "MM",
                    DatePart::Second => "SS",
                    DatePart::Year => "YYYY",
                }),
                DatePiece::Literal(text) => format.push_str(&to_char_literal(&text)),
            }
        }
        format!("TO_CHAR({}, {})", field, sql_literal(&format))
    }
}

impl LockOperations for PostgresEngine {
    fn lock_statements(&self, quoted_table: &str) -> Vec<String> {
        vec![
            "BEGIN".to_string(),
            format!("LOCK TABLE {} IN EXCLUSIVE MODE", quoted_table),
        ]
    }

    fn abort_lock_sql(&self) -> Option<&'static str> {
        Some("ROLLBACK")
    }

    fn unlock_sql(&self) -> &'static str {
        "COMMIT"
    }
}

impl MaintenanceOperations for PostgresEngine {
    fn vacuum_plan(&self, quoted_table: &str) -> VacuumPlan {
        VacuumPlan::Now(format!("VACUUM FULL {}", quoted_table))
    }
}

impl Engine for PostgresEngine {
    fn schema(&self, _engine: &EngineDescriptor) -> Box<dyn SchemaOperations> {
        Box::new(PostgresSchema::new())
    }
}
