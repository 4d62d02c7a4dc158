use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use super::{Container, ContainerSchema, RecordStore, Row, RowSet, StoreError};

/// In-memory record store for tests and smoke runs. Nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    containers: Arc<Mutex<HashMap<String, Arc<InMemoryContainer>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn define_schema(
        &self,
        schema: ContainerSchema,
    ) -> Result<Arc<dyn Container>, StoreError> {
        let mut map = self.containers.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;

        if let Some(existing) = map.get(&schema.name) {
            if existing.schema != schema {
                return Err(StoreError::schema_conflict(&schema.name));
            }
            return Ok(existing.clone());
        }

        let container = Arc::new(InMemoryContainer {
            schema: schema.clone(),
            rows: Mutex::new(Vec::new()),
        });
        map.insert(schema.name, container.clone());
        Ok(container)
    }
}

/// Container held by [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemoryContainer {
    schema: ContainerSchema,
    rows: Mutex<Vec<Row>>,
}

#[async_trait]
impl Container for InMemoryContainer {
    fn schema(&self) -> &ContainerSchema {
        &self.schema
    }

    async fn insert(&self, row: Row) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        self.schema.apply_insert(&mut rows, row)
    }

    async fn query_all(&self) -> Result<RowSet, StoreError> {
        let rows = self.rows.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        Ok(RowSet::new(rows.clone()))
    }
}
