/// Column metadata as reported by the native client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    /// Driver-reported type name, e.g. `SQL_INTEGER` over ODBC or the
    /// declared type `VARCHAR(32)` on SQLite. Empty when the driver
    /// reports nothing.
    pub native_type: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.into(),
        }
    }
}

/// Fully materialized result of a `select`.
///
/// Values are kept as text (`None` for SQL NULL); typed conversion is the
/// caller's business, guided by `DbHandle::field_type`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RecordSet {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column named `name`, compared case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    pub fn value_by_name(&self, row: usize, name: &str) -> Option<&str> {
        self.value(row, self.column_index(name)?)
    }

    /// First column of the first row, the usual shape of scalar queries.
    pub fn scalar(&self) -> Option<&str> {
        self.value(0, 0)
    }

    /// Values of one column across all rows, NULLs skipped.
    pub fn column_values(&self, column: usize) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column).cloned().flatten())
            .collect()
    }
}
