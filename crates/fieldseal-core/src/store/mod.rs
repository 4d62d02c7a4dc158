use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

mod memory;
mod schema;

pub use memory::{InMemoryContainer, InMemoryStore};
pub use schema::{Column, ColumnType, ContainerSchema, Row, Value};

/// Errors produced by record store implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or opened.
    #[error("connection failure: {reason}")]
    Connection { reason: String },
    /// A container was redefined with a different schema, or the schema is unusable.
    #[error("schema error in {container}: {reason}")]
    Schema { container: String, reason: String },
    /// A row was rejected or could not be written.
    #[error("write to {container} failed: {reason}")]
    Write { container: String, reason: String },
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// A connected record store that hands out containers by schema.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short name used for logging.
    fn name(&self) -> &str;

    /// Create the container if missing and return a handle to it.
    /// Redefining an existing container with an identical schema is a no-op.
    async fn define_schema(
        &self,
        schema: ContainerSchema,
    ) -> Result<Arc<dyn Container>, StoreError>;
}

/// A typed collection of rows.
#[async_trait]
pub trait Container: Send + Sync {
    fn schema(&self) -> &ContainerSchema;

    /// Insert a row; with a row key, replaces the row sharing the same key.
    async fn insert(&self, row: Row) -> Result<(), StoreError>;

    /// Snapshot of every row. Each call starts a fresh iteration.
    async fn query_all(&self) -> Result<RowSet, StoreError>;
}

/// Finite result set returned by [`Container::query_all`].
#[derive(Debug)]
pub struct RowSet {
    rows: std::vec::IntoIter<Row>,
}

impl RowSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }

    pub fn has_next(&self) -> bool {
        self.rows.len() > 0
    }
}

impl Iterator for RowSet {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for RowSet {}

impl StoreError {
    pub fn schema_conflict(container: &str) -> Self {
        StoreError::Schema {
            container: container.to_string(),
            reason: "container already defined with a different schema".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_set_drains_in_order() {
        let mut rows = RowSet::new(vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]);
        assert!(rows.has_next());
        assert_eq!(rows.next(), Some(vec![Value::Integer(1)]));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.next(), Some(vec![Value::Integer(2)]));
        assert!(!rows.has_next());
        assert_eq!(rows.next(), None);
    }
}
