//! Engine-paired schema introspection and DDL primitives.
//!
//! A `SchemaOperations` implementation only produces SQL and reads result
//! sets; `Schema` runs that SQL on the handle it was requested from.

pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mysql::MysqlSchema;
pub use postgres::PostgresSchema;
pub use sqlite::SqliteSchema;

use crate::dialects::base::sql_literal;
use crate::driver::{DbHandle, DriverError};
use crate::executor::RecordSet;
use log::{debug, info};

/// Portable column type, mapped to the closest native type per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Int,
    BigInt,
    SmallInt,
    Varchar(u32),
    Char(u32),
    Text,
    LongText,
    Decimal(u8, u8),
    Double,
    Boolean,
    Date,
    Time,
    DateTime,
    Timestamp,
    Blob,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    /// Raw SQL default expression, already quoted when it is a literal.
    pub default: Option<String>,
    pub auto_increment: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: true,
            default: None,
            auto_increment: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, expression: impl Into<String>) -> Self {
        self.default = Some(expression.into());
        self
    }

    /// Auto-increment integer key. Implies NOT NULL.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.nullable = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDef {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub name: String,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    /// `CASCADE`, `SET NULL`, ...
    pub on_delete: Option<String>,
}

impl ForeignKeyDef {
    pub fn new(
        name: impl Into<String>,
        columns: &[&str],
        ref_table: impl Into<String>,
        ref_columns: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ref_table: ref_table.into(),
            ref_columns: ref_columns.iter().map(|c| c.to_string()).collect(),
            on_delete: None,
        }
    }

    pub fn on_delete(mut self, action: impl Into<String>) -> Self {
        self.on_delete = Some(action.into());
        self
    }
}

/// Full definition of a table, as created or as it currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
    pub indexes: Vec<IndexDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn foreign_key(mut self, foreign_key: ForeignKeyDef) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

/// Introspected column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub native_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub primary_key: bool,
}

/// Introspected index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
}

/// Truthiness of a flag column as rendered by the different transports
/// (`1`, `t`, `true`, `YES`).
pub(crate) fn flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "t" | "true" | "yes" | "y")
    )
}

pub(crate) fn quote_with(identifier: &str, quote: char) -> String {
    let doubled: String = [quote, quote].iter().collect();
    format!(
        "{}{}{}",
        quote,
        identifier.replace(quote, &doubled),
        quote
    )
}

/// Schema primitives for one engine family.
///
/// Introspection queries answer with normalized columns:
/// `(name, type, nullable, default, primary)` for columns and
/// `(index_name, is_unique, is_primary, column_name)` for indexes, one row
/// per indexed column in index order.
pub trait SchemaOperations {
    fn quote(&self, identifier: &str) -> String;

    /// Native type for a portable column.
    fn column_type(&self, column: &ColumnDef) -> String;

    /// Column clause inside CREATE TABLE / ADD COLUMN.
    fn column_definition(&self, column: &ColumnDef) -> String {
        let mut sql = format!("{} {}", self.quote(&column.name), self.column_type(column));
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        sql
    }

    /// Whether an auto-increment column already declares the primary key
    /// inline.
    fn inline_auto_increment_key(&self) -> bool {
        false
    }

    /// Trailing clause after the column list.
    fn table_options(&self) -> String {
        String::new()
    }

    fn list_tables_sql(&self) -> String;

    fn columns_sql(&self, table: &str) -> String;

    fn indexes_sql(&self, table: &str) -> String;

    fn parse_columns(&self, rs: &RecordSet) -> Vec<ColumnInfo> {
        (0..rs.len())
            .filter_map(|row| {
                let name = rs.value(row, 0)?;
                Some(ColumnInfo {
                    name: name.to_string(),
                    native_type: rs.value(row, 1).unwrap_or_default().to_string(),
                    nullable: flag(rs.value(row, 2)),
                    default: rs.value(row, 3).map(str::to_string),
                    primary_key: flag(rs.value(row, 4)),
                })
            })
            .collect()
    }

    fn parse_indexes(&self, rs: &RecordSet) -> Vec<IndexInfo> {
        let mut indexes: Vec<IndexInfo> = Vec::new();
        for row in 0..rs.len() {
            let (Some(name), Some(column)) = (rs.value(row, 0), rs.value(row, 3)) else {
                continue;
            };
            match indexes.last_mut() {
                Some(last) if last.name == name => last.columns.push(column.to_string()),
                _ => indexes.push(IndexInfo {
                    name: name.to_string(),
                    columns: vec![column.to_string()],
                    unique: flag(rs.value(row, 1)),
                    primary: flag(rs.value(row, 2)),
                }),
            }
        }
        indexes
    }

    /// Column list, key and foreign keys, without indexes.
    fn create_table_body(&self, table: &TableDef) -> String {
        let mut clauses: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();

        let inline_key =
            self.inline_auto_increment_key() && table.columns.iter().any(|c| c.auto_increment);
        if !table.primary_key.is_empty() && !inline_key {
            clauses.push(format!("PRIMARY KEY ({})", self.column_list(&table.primary_key)));
        }
        for fk in &table.foreign_keys {
            clauses.push(self.foreign_key_clause(fk));
        }

        format!(
            "CREATE TABLE {} (\n  {}\n){}",
            self.quote(&table.name),
            clauses.join(",\n  "),
            self.table_options()
        )
    }

    /// CREATE TABLE followed by one CREATE INDEX per index.
    fn create_table_sql(&self, table: &TableDef) -> Vec<String> {
        let mut statements = vec![self.create_table_body(table)];
        statements.extend(
            table
                .indexes
                .iter()
                .map(|index| self.add_index_sql(&table.name, index)),
        );
        statements
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote(table))
    }

    fn add_column_sql(&self, table: &str, column: &ColumnDef) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote(table),
            self.column_definition(column)
        )]
    }

    /// Change `column` (matched by name) in `table` to the new definition.
    fn alter_column_sql(&self, table: &TableDef, column: &ColumnDef) -> Vec<String>;

    fn drop_column_sql(&self, table: &TableDef, column: &str) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote(&table.name),
            self.quote(column)
        )]
    }

    fn add_index_sql(&self, table: &str, index: &IndexDef) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote(&index.name),
            self.quote(table),
            self.column_list(&index.columns)
        )
    }

    fn drop_index_sql(&self, _table: &str, index: &str) -> String {
        format!("DROP INDEX IF EXISTS {}", self.quote(index))
    }

    fn add_foreign_key_sql(&self, table: &TableDef, foreign_key: &ForeignKeyDef) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ADD {}",
            self.quote(&table.name),
            self.foreign_key_clause(foreign_key)
        )]
    }

    fn drop_foreign_key_sql(&self, table: &TableDef, name: &str) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote(&table.name),
            self.quote(name)
        )]
    }

    fn foreign_key_clause(&self, fk: &ForeignKeyDef) -> String {
        let mut sql = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote(&fk.name),
            self.column_list(&fk.columns),
            self.quote(&fk.ref_table),
            self.column_list(&fk.ref_columns)
        );
        if let Some(action) = &fk.on_delete {
            sql.push_str(&format!(" ON DELETE {}", action));
        }
        sql
    }

    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// String literal for a table name inside an introspection query.
    fn table_literal(&self, table: &str) -> String {
        sql_literal(table)
    }
}

/// Schema provider bound to a live handle.
pub struct Schema<'a> {
    handle: &'a mut DbHandle,
    ops: Box<dyn SchemaOperations>,
}

impl<'a> Schema<'a> {
    pub(crate) fn new(handle: &'a mut DbHandle, ops: Box<dyn SchemaOperations>) -> Self {
        Self { handle, ops }
    }

    /// DDL generator for the handle's engine.
    pub fn ops(&self) -> &dyn SchemaOperations {
        self.ops.as_ref()
    }

    pub fn tables(&mut self) -> Result<Vec<String>, DriverError> {
        let rs = self.handle.select(&self.ops.list_tables_sql())?;
        Ok(rs.column_values(0))
    }

    pub fn columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>, DriverError> {
        let rs = self.handle.select(&self.ops.columns_sql(table))?;
        Ok(self.ops.parse_columns(&rs))
    }

    pub fn indexes(&mut self, table: &str) -> Result<Vec<IndexInfo>, DriverError> {
        let rs = self.handle.select(&self.ops.indexes_sql(table))?;
        Ok(self.ops.parse_indexes(&rs))
    }

    pub fn has_table(&mut self, table: &str) -> Result<bool, DriverError> {
        Ok(self.tables()?.iter().any(|t| t == table))
    }

    /// Run DDL statements in order, stopping at the first failure.
    pub fn apply(&mut self, statements: &[String]) -> Result<(), DriverError> {
        for (index, statement) in statements.iter().enumerate() {
            debug!("Applying schema statement {}/{}", index + 1, statements.len());
            self.handle.execute(statement)?;
        }
        info!("Applied {} schema statements", statements.len());
        Ok(())
    }
}
