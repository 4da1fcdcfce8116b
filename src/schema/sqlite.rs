use super::{ColumnDef, ForeignKeyDef, SchemaOperations, SqlType, TableDef, quote_with};
use log::debug;

/// SQLite schema primitives.
///
/// SQLite cannot change or drop columns and constraints in place, so those
/// primitives rebuild the table: create a copy with the new definition,
/// copy the shared columns across, drop the original and rename the copy.
pub struct SqliteSchema;

impl SqliteSchema {
    pub fn new() -> Self {
        Self
    }

    /// Statements turning `current` into `target`. Rows are carried over
    /// for every column present in both definitions.
    pub fn rebuild_sql(&self, current: &TableDef, target: &TableDef) -> Vec<String> {
        let temp_name = format!("{}__rebuild", target.name);
        debug!(
            "Rebuilding SQLite table {} through {}",
            current.name, temp_name
        );

        let temp = TableDef {
            name: temp_name.clone(),
            indexes: Vec::new(),
            ..target.clone()
        };
        let shared: Vec<String> = target
            .columns
            .iter()
            .filter(|c| current.has_column(&c.name))
            .map(|c| c.name.clone())
            .collect();
        let shared = self.column_list(&shared);

        let mut statements = vec![
            self.create_table_body(&temp),
            format!(
                "INSERT INTO {} ({}) SELECT {} FROM {}",
                self.quote(&temp_name),
                shared,
                shared,
                self.quote(&current.name)
            ),
            format!("DROP TABLE {}", self.quote(&current.name)),
            format!(
                "ALTER TABLE {} RENAME TO {}",
                self.quote(&temp_name),
                self.quote(&target.name)
            ),
        ];
        statements.extend(
            target
                .indexes
                .iter()
                .map(|index| self.add_index_sql(&target.name, index)),
        );
        statements
    }
}

impl Default for SqliteSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaOperations for SqliteSchema {
    fn quote(&self, identifier: &str) -> String {
        quote_with(identifier, '"')
    }

    fn column_type(&self, column: &ColumnDef) -> String {
        match column.sql_type {
            SqlType::Int | SqlType::BigInt | SqlType::SmallInt => "INTEGER".to_string(),
            SqlType::Varchar(len) => format!("VARCHAR({})", len),
            SqlType::Char(len) => format!("CHAR({})", len),
            SqlType::Text | SqlType::LongText => "TEXT".to_string(),
            SqlType::Decimal(precision, scale) => format!("DECIMAL({},{})", precision, scale),
            SqlType::Double => "REAL".to_string(),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::DateTime => "DATETIME".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::Blob => "BLOB".to_string(),
        }
    }

    /// AUTOINCREMENT is only legal on an inline `INTEGER PRIMARY KEY`.
    fn column_definition(&self, column: &ColumnDef) -> String {
        if column.auto_increment {
            return format!(
                "{} INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT",
                self.quote(&column.name)
            );
        }
        let mut sql = format!("{} {}", self.quote(&column.name), self.column_type(column));
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        sql
    }

    fn inline_auto_increment_key(&self) -> bool {
        true
    }

    fn list_tables_sql(&self) -> String {
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
            .to_string()
    }

    fn columns_sql(&self, table: &str) -> String {
        format!(
            r#"SELECT name, type, "notnull" = 0, dflt_value, pk > 0 FROM pragma_table_info({}) ORDER BY cid"#,
            self.table_literal(table)
        )
    }

    fn indexes_sql(&self, table: &str) -> String {
        format!(
            r#"SELECT il.name, il."unique", il.origin = 'pk', ii.name
FROM pragma_index_list({}) AS il
JOIN pragma_index_info(il.name) AS ii
ORDER BY il.name, ii.seqno"#,
            self.table_literal(table)
        )
    }

    fn alter_column_sql(&self, table: &TableDef, column: &ColumnDef) -> Vec<String> {
        let mut target = table.clone();
        for existing in target.columns.iter_mut() {
            if existing.name == column.name {
                *existing = column.clone();
            }
        }
        self.rebuild_sql(table, &target)
    }

    fn drop_column_sql(&self, table: &TableDef, column: &str) -> Vec<String> {
        let mut target = table.clone();
        target.columns.retain(|c| c.name != column);
        target.primary_key.retain(|c| c != column);
        target
            .indexes
            .retain(|index| !index.columns.iter().any(|c| c == column));
        target
            .foreign_keys
            .retain(|fk| !fk.columns.iter().any(|c| c == column));
        self.rebuild_sql(table, &target)
    }

    fn add_foreign_key_sql(&self, table: &TableDef, foreign_key: &ForeignKeyDef) -> Vec<String> {
        let target = table.clone().foreign_key(foreign_key.clone());
        self.rebuild_sql(table, &target)
    }

    fn drop_foreign_key_sql(&self, table: &TableDef, name: &str) -> Vec<String> {
        let mut target = table.clone();
        target.foreign_keys.retain(|fk| fk.name != name);
        self.rebuild_sql(table, &target)
    }
}
