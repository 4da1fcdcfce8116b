use crate::dialects::version::ServerVersion;
use crate::driver::DriverError;
use crate::executor::NativeConnection;
use crate::schema::SchemaOperations;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// SQL syntax family shared by one or more drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlFamily {
    Mysql,
    Postgresql,
    Sqlite,
}

impl fmt::Display for SqlFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlFamily::Mysql => "mysql",
            SqlFamily::Postgresql => "postgresql",
            SqlFamily::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

/// Client library flavour a driver was registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Mysqli,
    Pdo,
}

/// Character set mode. Only meaningful for the MySQL family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    Utf8,
    Utf8mb4,
}

impl Charset {
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "utf8",
            Charset::Utf8mb4 => "utf8mb4",
        }
    }
}

/// Immutable identity of a registered driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineDescriptor {
    pub name: &'static str,
    pub key: &'static str,
    pub aliases: &'static [&'static str],
    pub family: SqlFamily,
    pub transport: Transport,
    pub charset: Charset,
    pub supports_persistent: bool,
}

/// Canonical column type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Real,
    String,
    Date,
    Time,
    Datetime,
    Year,
    Timestamp,
    Blob,
    Unknown,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            FieldType::Int => "int",
            FieldType::Real => "real",
            FieldType::String => "string",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Datetime => "datetime",
            FieldType::Year => "year",
            FieldType::Timestamp => "timestamp",
            FieldType::Blob => "blob",
            FieldType::Unknown => "unknown",
        };
        f.write_str(tag)
    }
}

/// One ORDER BY request unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderSpec {
    /// Emitted verbatim.
    Raw(String),
    Field {
        field: String,
        /// Caller's order string; only a case-insensitive `desc` counts.
        order: String,
        collate: bool,
    },
}

impl OrderSpec {
    pub fn raw(sql: impl Into<String>) -> Self {
        OrderSpec::Raw(sql.into())
    }

    pub fn field(field: impl Into<String>) -> Self {
        OrderSpec::Field {
            field: field.into(),
            order: "ASC".to_string(),
            collate: false,
        }
    }

    pub fn order(self, order: impl Into<String>) -> Self {
        match self {
            OrderSpec::Field { field, collate, .. } => OrderSpec::Field {
                field,
                order: order.into(),
                collate,
            },
            raw => raw,
        }
    }

    pub fn desc(self) -> Self {
        self.order("DESC")
    }

    pub fn collate(self) -> Self {
        match self {
            OrderSpec::Field { field, order, .. } => OrderSpec::Field {
                field,
                order,
                collate: true,
            },
            raw => raw,
        }
    }
}

impl From<&str> for OrderSpec {
    fn from(sql: &str) -> Self {
        OrderSpec::Raw(sql.to_string())
    }
}

/// Per-family dialect data, loaded from the embedded `dialect.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DialectConfig {
    pub metadata: DialectMetadata,
    pub sql: SqlConfig,
    pub types: HashMap<String, FieldType>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DialectMetadata {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqlConfig {
    pub quote_identifier: String,
    pub escape_identifier: String,
}

/// Outcome of the post-connect negotiation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Negotiated {
    /// Collation used for collation-aware ordering; `None` means callers
    /// fall back to case folding.
    pub unicode_collation: Option<String>,
}

/// Portable date pattern tokens: `d H i m s Y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Day,
    Hour,
    Minute,
    Month,
    Second,
    Year,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatePiece {
    Part(DatePart),
    Literal(String),
}

/// Split a portable date pattern into tokens and literal runs.
pub fn tokenize_date_pattern(pattern: &str) -> Vec<DatePiece> {
    let mut pieces = Vec::new();
    let mut literal = String::new();

    for c in pattern.chars() {
        let part = match c {
            'd' => Some(DatePart::Day),
            'H' => Some(DatePart::Hour),
            'i' => Some(DatePart::Minute),
            'm' => Some(DatePart::Month),
            's' => Some(DatePart::Second),
            'Y' => Some(DatePart::Year),
            _ => None,
        };
        match part {
            Some(part) => {
                if !literal.is_empty() {
                    pieces.push(DatePiece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(DatePiece::Part(part));
            }
            None => literal.push(c),
        }
    }
    if !literal.is_empty() {
        pieces.push(DatePiece::Literal(literal));
    }
    pieces
}

/// Standard SQL string literal: single quotes doubled.
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Reduce a native type name to its lookup key: `varchar(32)` and
/// `VARCHAR` both become `VARCHAR`.
pub fn normalize_type_name(native_type: &str) -> String {
    native_type
        .split('(')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_uppercase()
}

/// Session setup run right after connect.
pub trait ConnectOperations {
    /// Statement answering with the server version string.
    fn version_sql(&self) -> &'static str;

    fn last_insert_id_sql(&self) -> &'static str;

    fn negotiate(
        &self,
        conn: &mut dyn NativeConnection,
        engine: &EngineDescriptor,
        version: &ServerVersion,
    ) -> Result<Negotiated, DriverError>;
}

/// Stateless translation of portable requests into engine SQL.
pub trait DialectOperations {
    fn config(&self) -> &DialectConfig;

    /// Quote an identifier according to dialect rules.
    fn escape_system(&self, identifier: &str) -> String {
        let quote = &self.config().sql.quote_identifier;
        let escape = &self.config().sql.escape_identifier;
        let escaped = identifier.replace(quote.as_str(), escape);
        format!("{}{}{}", quote, escaped, quote)
    }

    /// Quote a value as a string literal.
    fn escape_str(&self, value: &str) -> String {
        sql_literal(value)
    }

    /// Wrap `field` for Unicode-aware comparison, or case-fold it when no
    /// collation is available.
    fn collate(&self, field: &str, collation: Option<&str>) -> String;

    fn date_format(&self, field: &str, pattern: &str) -> String;

    /// Infix concatenation; MySQL overrides with `CONCAT()`.
    fn concat(&self, fields: &[&str]) -> String {
        match fields {
            [] => "''".to_string(),
            [single] => single.to_string(),
            _ => format!("({})", fields.join(" || ")),
        }
    }

    fn order_by(&self, specs: &[OrderSpec], collation: Option<&str>) -> String {
        let parts: Vec<String> = specs
            .iter()
            .filter_map(|spec| match spec {
                OrderSpec::Raw(sql) => {
                    let sql = sql.trim();
                    (!sql.is_empty()).then(|| sql.to_string())
                }
                OrderSpec::Field {
                    field,
                    order,
                    collate,
                } => {
                    if field.trim().is_empty() {
                        return None;
                    }
                    let expr = if *collate {
                        self.collate(field, collation)
                    } else {
                        field.clone()
                    };
                    if order.trim().eq_ignore_ascii_case("desc") {
                        Some(format!("{} DESC", expr))
                    } else {
                        Some(expr)
                    }
                }
            })
            .collect();

        if parts.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {} ", parts.join(", "))
        }
    }

    fn lex_fields(&self, fields: &[&str], collation: Option<&str>) -> String {
        fields
            .iter()
            .filter(|f| !f.trim().is_empty())
            .map(|f| self.collate(f, collation))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Canonical tag for a driver-reported type name.
    fn field_type(&self, native_type: &str) -> FieldType {
        let types = &self.config().types;
        let key = normalize_type_name(native_type);
        types
            .get(&key)
            .or_else(|| key.split_whitespace().next().and_then(|w| types.get(w)))
            .copied()
            .unwrap_or(FieldType::Unknown)
    }
}

/// Table write locks or their transactional emulation.
pub trait LockOperations {
    /// Whether lock failures may be swallowed under the weak-lock policy.
    fn honours_weak_locks(&self) -> bool {
        false
    }

    /// Statements acquiring the lock, run in order.
    fn lock_statements(&self, quoted_table: &str) -> Vec<String>;

    /// Cleanup after a lock sequence failed part-way.
    fn abort_lock_sql(&self) -> Option<&'static str> {
        None
    }

    fn unlock_sql(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VacuumPlan {
    Now(String),
    /// Deferred until the handle closes.
    OnClose(String),
}

pub trait MaintenanceOperations {
    fn vacuum_plan(&self, quoted_table: &str) -> VacuumPlan;
}

/// Everything one engine family provides to a `DbHandle`.
pub trait Engine:
    ConnectOperations + DialectOperations + LockOperations + MaintenanceOperations
{
    fn schema(&self, engine: &EngineDescriptor) -> Box<dyn SchemaOperations>;
}
