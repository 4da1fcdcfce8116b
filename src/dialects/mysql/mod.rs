use crate::dialects::base::{
    Charset, ConnectOperations, DatePart, DatePiece, DialectConfig, DialectOperations, Engine,
    EngineDescriptor, LockOperations, MaintenanceOperations, Negotiated, VacuumPlan,
    tokenize_date_pattern,
};
use crate::dialects::version::ServerVersion;
use crate::driver::DriverError;
use crate::executor::NativeConnection;
use crate::schema::{MysqlSchema, SchemaOperations};
use log::{debug, info};
use std::sync::OnceLock;

static CONFIG: OnceLock<DialectConfig> = OnceLock::new();

/// Oldest server with `SET NAMES` / per-connection collations.
pub const CHARSET_FLOOR: ServerVersion = ServerVersion::new(4, 1, 0);
/// Oldest server whose utf8mb4 defaults are usable for full Unicode.
pub const MB4_FLOOR: ServerVersion = ServerVersion::new(5, 7, 7);
/// From here on `character_set_database` is deprecated as a session variable.
pub const DATABASE_CHARSET_CEILING: ServerVersion = ServerVersion::new(8, 0, 0);

pub struct MysqlEngine {
    config: &'static DialectConfig,
}

impl MysqlEngine {
    pub fn new() -> Self {
        let config = CONFIG.get_or_init(|| {
            let config_str = include_str!("dialect.toml");
            toml::from_str(config_str).expect("Failed to parse MySQL dialect config")
        });

        Self { config }
    }
}

impl Default for MysqlEngine {
    fn default() -> Self {
        Self::new()
    }
}

pub fn unicode_collation(charset: Charset) -> &'static str {
    match charset {
        Charset::Utf8 => "utf8_unicode_ci",
        Charset::Utf8mb4 => "utf8mb4_unicode_ci",
    }
}

/// Session statements for `charset` on a server at `version`, in the order
/// they must run.
pub fn session_statements(
    charset: Charset,
    version: &ServerVersion,
) -> Result<Vec<String>, DriverError> {
    let collation = unicode_collation(charset);
    match charset {
        Charset::Utf8 => {
            if !version.at_least(CHARSET_FLOOR) {
                return Ok(Vec::new());
            }
            Ok(vec![
                "SET NAMES 'utf8'".to_string(),
                format!("SET collation_connection = '{}'", collation),
            ])
        }
        Charset::Utf8mb4 => {
            if !version.at_least(MB4_FLOOR) {
                return Err(DriverError::Connection(
                    "unable to connect to a full-Unicode database".to_string(),
                ));
            }
            let mut statements = vec![
                format!("SET NAMES 'utf8mb4' COLLATE '{}'", collation),
                format!("SET collation_connection = '{}'", collation),
                format!("SET collation_server = '{}'", collation),
                "SET character_set_server = 'utf8mb4'".to_string(),
            ];
            if !version.at_least(DATABASE_CHARSET_CEILING) {
                statements.push("SET character_set_database = 'utf8mb4'".to_string());
            }
            Ok(statements)
        }
    }
}

impl ConnectOperations for MysqlEngine {
    fn version_sql(&self) -> &'static str {
        "SELECT VERSION()"
    }

    fn last_insert_id_sql(&self) -> &'static str {
        "SELECT LAST_INSERT_ID()"
    }

    fn negotiate(
        &self,
        conn: &mut dyn NativeConnection,
        engine: &EngineDescriptor,
        version: &ServerVersion,
    ) -> Result<Negotiated, DriverError> {
        let statements = session_statements(engine.charset, version)?;
        if statements.is_empty() {
            debug!(
                "MySQL {} predates per-connection charsets, keeping server defaults",
                version
            );
            return Ok(Negotiated::default());
        }

        for statement in &statements {
            conn.execute(statement).map_err(|e| {
                DriverError::Negotiation(format!("{}: {}", statement, e.message()))
            })?;
        }

        info!(
            "Negotiated {} session on MySQL {}",
            engine.charset.name(),
            version
        );
        Ok(Negotiated {
            unicode_collation: Some(unicode_collation(engine.charset).to_string()),
        })
    }
}

impl DialectOperations for MysqlEngine {
    fn config(&self) -> &DialectConfig {
        self.config
    }

    /// Same escaping as `mysql_real_escape_string`, wrapped in quotes.
    fn escape_str(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for c in value.chars() {
            match c {
                '\0' => out.push_str("\\0"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\\' => out.push_str("\\\\"),
                '\'' => out.push_str("\\'"),
                '"' => out.push_str("\\\""),
                '\x1a' => out.push_str("\\Z"),
                c => out.push(c),
            }
        }
        out.push('\'');
        out
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
                    DatePart::Minute => "%i",
                    DatePart::Month => "%m",
                    DatePart::Second => "%s",
                    DatePart::Year => "%Y",
                }),
                DatePiece::Literal(text) => format.push_str(&text.replace('%', "%%")),
            }
        }
        format!("DATE_FORMAT({}, {})", field, self.escape_str(&format))
    }

    fn concat(&self, fields: &[&str]) -> String {
        match fields {
            [] => "''".to_string(),
            [single] => single.to_string(),
            _ => format!("CONCAT({})", fields.join(", ")),
        }
    }
}

impl LockOperations for MysqlEngine {
    fn honours_weak_locks(&self) -> bool {
        true
    }

    fn lock_statements(&self, quoted_table: &str) -> Vec<String> {
        vec![format!("LOCK TABLES {} WRITE", quoted_table)]
    }

    fn unlock_sql(&self) -> &'static str {
        "UNLOCK TABLES"
    }
}

impl MaintenanceOperations for MysqlEngine {
    fn vacuum_plan(&self, quoted_table: &str) -> VacuumPlan {
        VacuumPlan::Now(format!("OPTIMIZE TABLE {}", quoted_table))
    }
}

impl Engine for MysqlEngine {
    fn schema(&self, engine: &EngineDescriptor) -> Box<dyn SchemaOperations> {
        Box::new(MysqlSchema::new(engine.charset))
    }
}
