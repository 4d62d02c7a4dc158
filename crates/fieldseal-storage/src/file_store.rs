use std::{
    collections::HashMap,
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use fieldseal_core::store::{Container, ContainerSchema, RecordStore, Row, RowSet, StoreError};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// File-backed record store: one JSON document per container under `root`.
/// Rows are written as given; sealing sensitive columns is the caller's job.
///
/// Each container name maps to one shared handle, so every caller of
/// `define_schema` serialises its writes through the same lock.
pub struct FileStore {
    root: PathBuf,
    name: String,
    containers: Mutex<HashMap<String, Arc<FileContainer>>>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn connect(root: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::Connection {
            reason: format!("{}: {e}", root.display()),
        })?;
        let name = name.into();
        debug!(?root, store = %name, "connected to file store");
        Ok(Self {
            root,
            name,
            containers: Mutex::new(HashMap::new()),
        })
    }

    fn path_for(&self, container: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_name(container)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredContainer {
    schema: ContainerSchema,
    rows: Vec<Row>,
}

#[async_trait]
impl RecordStore for FileStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(container = %schema.name))]
    async fn define_schema(
        &self,
        schema: ContainerSchema,
    ) -> Result<Arc<dyn Container>, StoreError> {
        let mut containers = self.containers.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;

        if let Some(existing) = containers.get(&schema.name) {
            if existing.schema != schema {
                return Err(StoreError::schema_conflict(&schema.name));
            }
            return Ok(existing.clone());
        }

        let path = self.path_for(&schema.name);
        if path.exists() {
            let stored = read_doc(&path)?;
            if stored.schema != schema {
                return Err(StoreError::schema_conflict(&schema.name));
            }
        } else {
            let doc = StoredContainer {
                schema: schema.clone(),
                rows: Vec::new(),
            };
            write_doc(&path, &doc)?;
        }

        let container = Arc::new(FileContainer {
            path,
            schema: schema.clone(),
            write_lock: Mutex::new(()),
        });
        containers.insert(schema.name, container.clone());
        Ok(container)
    }
}

/// Container handle returned by [`FileStore`].
pub struct FileContainer {
    path: PathBuf,
    schema: ContainerSchema,
    write_lock: Mutex<()>,
}

#[async_trait]
impl Container for FileContainer {
    fn schema(&self) -> &ContainerSchema {
        &self.schema
    }

    #[instrument(skip_all, fields(container = %self.schema.name))]
    async fn insert(&self, row: Row) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;

        let mut doc = read_doc(&self.path)?;
        self.schema.apply_insert(&mut doc.rows, row)?;
        write_doc(&self.path, &doc)
    }

    #[instrument(skip_all, fields(container = %self.schema.name))]
    async fn query_all(&self) -> Result<RowSet, StoreError> {
        let doc = read_doc(&self.path)?;
        Ok(RowSet::new(doc.rows))
    }
}

fn write_doc(path: &Path, doc: &StoredContainer) -> Result<(), StoreError> {
    let parent = path.parent().ok_or_else(|| StoreError::Storage {
        reason: "invalid storage path".to_string(),
    })?;
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    let json = serde_json::to_vec_pretty(doc).map_err(storage_err)?;
    tmp.write_all(&json).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

fn read_doc(path: &Path) -> Result<StoredContainer, StoreError> {
    let mut file = File::open(path).map_err(storage_err)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(storage_err)?;
    serde_json::from_slice(&buf).map_err(storage_err)
}

fn sanitize_name(name: &str) -> String {
    URL_SAFE_NO_PAD.encode(name)
}

fn storage_err<E: ToString>(err: E) -> StoreError {
    StoreError::Storage {
        reason: err.to_string(),
    }
}
