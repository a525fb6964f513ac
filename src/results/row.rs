use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SqlTransactError;
use crate::types::RowValues;

/// Column metadata for one result cursor, shared by every row it produced.
///
/// The name-to-index map is built once per statement so row mappers can look
/// columns up by name without repeated string scans.
#[derive(Debug)]
pub struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One materialized result row, handed to caller row mappers.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Columns>,
    values: Vec<RowValues>,
}

impl Row {
    #[must_use]
    pub fn new(columns: Arc<Columns>, values: Vec<RowValues>) -> Self {
        Self { columns, values }
    }

    /// A synthetic single-column row carrying a database-generated key.
    #[must_use]
    pub fn generated_key(column: &str, value: RowValues) -> Self {
        Self {
            columns: Arc::new(Columns::new(vec![column.to_owned()])),
            values: vec![value],
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    /// Value at the named column, or `None` if the column does not exist.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.columns
            .position(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Value at the named column, as a mapping error if the column does not
    /// exist. Intended for row-mapper bodies, where a missing column should
    /// abort the statement.
    pub fn try_get(&self, column_name: &str) -> Result<&RowValues, SqlTransactError> {
        self.get(column_name).ok_or_else(|| {
            SqlTransactError::MappingError(format!("no such column: {column_name}"))
        })
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
