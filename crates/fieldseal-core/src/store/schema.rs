use serde::{Deserialize, Serialize};

use super::StoreError;

/// Column types understood by record stores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    String,
    Blob,
}

impl ColumnType {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::String => "STRING",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A single cell value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Integer(i64),
    String(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Integer(_) => ColumnType::Integer,
            Value::String(_) => ColumnType::String,
            Value::Blob(_) => ColumnType::Blob,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Ordered column values, positionally matching a [`ContainerSchema`].
pub type Row = Vec<Value>;

/// Container definition: ordered columns plus row-key behaviour.
///
/// When `row_key` is set, the first column identifies the row and an insert with
/// an existing key replaces the stored row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerSchema {
    pub name: String,
    pub columns: Vec<Column>,
    pub row_key: bool,
}

impl ContainerSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>, row_key: bool) -> Self {
        Self {
            name: name.into(),
            columns,
            row_key,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Check arity and per-column types of a row.
    pub fn validate(&self, row: &[Value]) -> Result<(), StoreError> {
        if row.len() != self.columns.len() {
            return Err(StoreError::Write {
                container: self.name.clone(),
                reason: format!(
                    "expected {} columns, got {}",
                    self.columns.len(),
                    row.len()
                ),
            });
        }

        for (column, value) in self.columns.iter().zip(row) {
            if column.column_type != value.column_type() {
                return Err(StoreError::Write {
                    container: self.name.clone(),
                    reason: format!(
                        "column {} expects {}, got {}",
                        column.name,
                        column.column_type.label(),
                        value.column_type().label()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Validate `row` and merge it into `rows`, replacing a row with the same key.
    pub fn apply_insert(&self, rows: &mut Vec<Row>, row: Row) -> Result<(), StoreError> {
        self.validate(&row)?;

        if self.row_key {
            if let Some(existing) = rows.iter_mut().find(|r| r.first() == row.first()) {
                *existing = row;
                return Ok(());
            }
        }
        rows.push(row);
        Ok(())
    }
}
