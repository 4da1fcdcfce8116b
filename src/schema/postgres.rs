use super::{ColumnDef, SchemaOperations, SqlType, TableDef, quote_with};

pub struct PostgresSchema;

impl PostgresSchema {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaOperations for PostgresSchema {
    fn quote(&self, identifier: &str) -> String {
        quote_with(identifier, '"')
    }

    fn column_type(&self, column: &ColumnDef) -> String {
        match (column.sql_type, column.auto_increment) {
            (SqlType::Int, true) | (SqlType::SmallInt, true) => "SERIAL".to_string(),
            (SqlType::BigInt, true) => "BIGSERIAL".to_string(),
            (SqlType::Int, false) => "INTEGER".to_string(),
            (SqlType::BigInt, false) => "BIGINT".to_string(),
            (SqlType::SmallInt, false) => "SMALLINT".to_string(),
            (SqlType::Varchar(len), _) => format!("VARCHAR({})", len),
            (SqlType::Char(len), _) => format!("CHAR({})", len),
            (SqlType::Text, _) | (SqlType::LongText, _) => "TEXT".to_string(),
            (SqlType::Decimal(precision, scale), _) => {
                format!("NUMERIC({},{})", precision, scale)
            }
            (SqlType::Double, _) => "DOUBLE PRECISION".to_string(),
            (SqlType::Boolean, _) => "BOOLEAN".to_string(),
            (SqlType::Date, _) => "DATE".to_string(),
            (SqlType::Time, _) => "TIME".to_string(),
            (SqlType::DateTime, _) | (SqlType::Timestamp, _) => "TIMESTAMP".to_string(),
            (SqlType::Blob, _) => "BYTEA".to_string(),
        }
    }

    fn list_tables_sql(&self) -> String {
        "SELECT tablename FROM pg_tables WHERE schemaname = current_schema() ORDER BY tablename"
            .to_string()
    }

    fn columns_sql(&self, table: &str) -> String {
        format!(
            r#"SELECT c.column_name, c.data_type, c.is_nullable = 'YES', c.column_default,
  EXISTS (
    SELECT 1 FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage k
      ON k.constraint_name = tc.constraint_name AND k.table_schema = tc.table_schema
    WHERE tc.constraint_type = 'PRIMARY KEY'
      AND tc.table_schema = c.table_schema AND tc.table_name = c.table_name
      AND k.column_name = c.column_name
  )
FROM information_schema.columns c
WHERE c.table_schema = current_schema() AND c.table_name = {}
ORDER BY c.ordinal_position"#,
            self.table_literal(table)
        )
    }

    fn indexes_sql(&self, table: &str) -> String {
        format!(
            r#"SELECT i.relname, ix.indisunique, ix.indisprimary, a.attname
FROM pg_class t
JOIN pg_index ix ON ix.indrelid = t.oid
JOIN pg_class i ON i.oid = ix.indexrelid
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
WHERE t.relname = {} AND t.relnamespace = current_schema()::regnamespace
ORDER BY i.relname, array_position(ix.indkey::int2[], a.attnum)"#,
            self.table_literal(table)
        )
    }

    /// Type, nullability and default are separate ALTER COLUMN actions.
    fn alter_column_sql(&self, table: &TableDef, column: &ColumnDef) -> Vec<String> {
        let prefix = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            self.quote(&table.name),
            self.quote(&column.name)
        );
        let column_type = self.column_type(&ColumnDef {
            auto_increment: false,
            ..column.clone()
        });

        vec![
            format!("{} TYPE {}", prefix, column_type),
            if column.nullable {
                format!("{} DROP NOT NULL", prefix)
            } else {
                format!("{} SET NOT NULL", prefix)
            },
            match &column.default {
                Some(default) => format!("{} SET DEFAULT {}", prefix, default),
                None => format!("{} DROP DEFAULT", prefix),
            },
        ]
    }
}
