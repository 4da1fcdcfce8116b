use super::{ColumnDef, SchemaOperations, SqlType, TableDef, quote_with};
use crate::dialects::base::Charset;

/// Schema primitives shared by all four MySQL drivers.
pub struct MysqlSchema {
    charset: Charset,
}

impl MysqlSchema {
    pub fn new(charset: Charset) -> Self {
        Self { charset }
    }
}

impl SchemaOperations for MysqlSchema {
    fn quote(&self, identifier: &str) -> String {
        quote_with(identifier, '`')
    }

    fn column_type(&self, column: &ColumnDef) -> String {
        match column.sql_type {
            SqlType::Int => "INT(10) UNSIGNED".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Varchar(len) => format!("VARCHAR({})", len),
            SqlType::Char(len) => format!("CHAR({})", len),
            SqlType::Text => "TEXT".to_string(),
            SqlType::LongText => "LONGTEXT".to_string(),
            SqlType::Decimal(precision, scale) => format!("DECIMAL({},{})", precision, scale),
            SqlType::Double => "DOUBLE".to_string(),
            SqlType::Boolean => "TINYINT(1)".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::DateTime => "DATETIME".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::Blob => "LONGBLOB".to_string(),
        }
    }

    fn column_definition(&self, column: &ColumnDef) -> String {
        let mut sql = format!("{} {}", self.quote(&column.name), self.column_type(column));
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if column.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        } else if let Some(default) = &column.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        sql
    }

    fn table_options(&self) -> String {
        format!(" ENGINE=InnoDB DEFAULT CHARSET={}", self.charset.name())
    }

    fn list_tables_sql(&self) -> String {
        "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME".to_string()
    }

    fn columns_sql(&self, table: &str) -> String {
        format!(
            r#"SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE = 'YES', COLUMN_DEFAULT, COLUMN_KEY = 'PRI'
FROM INFORMATION_SCHEMA.COLUMNS
WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = {}
ORDER BY ORDINAL_POSITION"#,
            self.table_literal(table)
        )
    }

    fn indexes_sql(&self, table: &str) -> String {
        format!(
            r#"SELECT INDEX_NAME, NON_UNIQUE = 0, INDEX_NAME = 'PRIMARY', COLUMN_NAME
FROM INFORMATION_SCHEMA.STATISTICS
WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = {}
ORDER BY INDEX_NAME, SEQ_IN_INDEX"#,
            self.table_literal(table)
        )
    }

    fn alter_column_sql(&self, table: &TableDef, column: &ColumnDef) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.quote(&table.name),
            self.column_definition(column)
        )]
    }

    fn drop_index_sql(&self, table: &str, index: &str) -> String {
        format!("DROP INDEX {} ON {}", self.quote(index), self.quote(table))
    }

    fn drop_foreign_key_sql(&self, table: &TableDef, name: &str) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote(&table.name),
            self.quote(name)
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ForeignKeyDef, IndexDef};

    fn contents() -> TableDef {
        TableDef::new("blog_contents")
            .column(ColumnDef::new("cid", SqlType::Int).auto_increment())
            .column(ColumnDef::new("title", SqlType::Varchar(150)))
            .column(ColumnDef::new("slug", SqlType::Varchar(150)))
            .column(
                ColumnDef::new("status", SqlType::Varchar(16))
                    .not_null()
                    .default_value("'publish'"),
            )
            .primary_key(&["cid"])
            .index(IndexDef::new("slug", &["slug"]).unique())
    }

    #[test]
    fn test_create_table_carries_charset() {
        let schema = MysqlSchema::new(Charset::Utf8mb4);
        let statements = schema.create_table_sql(&contents());
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0],
            "CREATE TABLE `blog_contents` (\n  \
             `cid` INT(10) UNSIGNED NOT NULL AUTO_INCREMENT,\n  \
             `title` VARCHAR(150),\n  \
             `slug` VARCHAR(150),\n  \
             `status` VARCHAR(16) NOT NULL DEFAULT 'publish',\n  \
             PRIMARY KEY (`cid`)\n\
             ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        );
        assert_eq!(
            statements[1],
            "CREATE UNIQUE INDEX `slug` ON `blog_contents` (`slug`)"
        );

        let legacy = MysqlSchema::new(Charset::Utf8).create_table_sql(&contents());
        assert!(legacy[0].ends_with("DEFAULT CHARSET=utf8"));
    }

    #[test]
    fn test_alter_and_drop_primitives() {
        let schema = MysqlSchema::new(Charset::Utf8);
        let table = contents();

        assert_eq!(
            schema.alter_column_sql(&table, &ColumnDef::new("title", SqlType::Varchar(255))),
            vec!["ALTER TABLE `blog_contents` MODIFY COLUMN `title` VARCHAR(255)"]
        );
        assert_eq!(
            schema.drop_column_sql(&table, "slug"),
            vec!["ALTER TABLE `blog_contents` DROP COLUMN `slug`"]
        );
        assert_eq!(
            schema.drop_index_sql("blog_contents", "slug"),
            "DROP INDEX `slug` ON `blog_contents`"
        );
        assert_eq!(
            schema.drop_table_sql("blog_contents"),
            "DROP TABLE IF EXISTS `blog_contents`"
        );
    }

    #[test]
    fn test_foreign_keys() {
        let schema = MysqlSchema::new(Charset::Utf8);
        let table = contents();
        let fk = ForeignKeyDef::new("fk_parent", &["parent"], "blog_contents", &["cid"])
            .on_delete("CASCADE");

        assert_eq!(
            schema.add_foreign_key_sql(&table, &fk),
            vec![
                "ALTER TABLE `blog_contents` ADD CONSTRAINT `fk_parent` FOREIGN KEY (`parent`) REFERENCES `blog_contents` (`cid`) ON DELETE CASCADE"
            ]
        );
        assert_eq!(
            schema.drop_foreign_key_sql(&table, "fk_parent"),
            vec!["ALTER TABLE `blog_contents` DROP FOREIGN KEY `fk_parent`"]
        );
    }

    #[test]
    fn test_introspection_queries_quote_table_name() {
        let schema = MysqlSchema::new(Charset::Utf8);
        assert!(schema.columns_sql("o'brien").contains("TABLE_NAME = 'o''brien'"));
        assert!(schema.indexes_sql("posts").contains("INFORMATION_SCHEMA.STATISTICS"));
    }
}
