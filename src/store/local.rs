//! Local filesystem row store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::{count_matching, validate_dataset_id, RowSelection, RowStore, Table};
use crate::{
    error::{Error, Result},
    query::{DatasetQueryFilter, DatasetResultRow, RowId},
};

const EXTENSION: &str = "json";

/// A row store keeping one JSON document per dataset under a root
/// directory (`<root>/<dataset>.json`).
///
/// Writes go to a temporary file that is renamed over the document, so a
/// reader never observes a half-written dataset. Writers within one process
/// are serialized.
///
/// # Example
///
/// ```no_run
/// use datalab::store::LocalRowStore;
///
/// let store = LocalRowStore::open(".datalab").unwrap();
/// ```
#[derive(Debug)]
pub struct LocalRowStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalRowStore {
    /// Opens a store rooted at the given directory.
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| Error::io(e, &root))?;
        tracing::debug!(root = %root.display(), "opened local row store");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, dataset: &str) -> Result<PathBuf> {
        validate_dataset_id(dataset)?;
        Ok(self.root.join(format!("{dataset}.{EXTENSION}")))
    }

    async fn load(&self, dataset: &str) -> Result<Option<Table>> {
        let path = self.path_for(dataset)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(e, &path)),
        };
        let table = serde_json::from_slice(&bytes).map_err(|e| {
            Error::storage(format!("Failed to parse dataset file {}: {e}", path.display()))
        })?;
        Ok(Some(table))
    }

    async fn save(&self, dataset: &str, table: &Table) -> Result<()> {
        let path = self.path_for(dataset)?;
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        let data = serde_json::to_vec(table)
            .map_err(|e| Error::storage(format!("Failed to serialize dataset '{dataset}': {e}")))?;
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| Error::io(e, &tmp))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::io(e, &path))
    }
}

#[async_trait]
impl RowStore for LocalRowStore {
    async fn datasets(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| Error::io(e, &self.root))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::io(e, &self.root))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_dataset_id(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn exists(&self, dataset: &str) -> Result<bool> {
        let path = self.path_for(dataset)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| Error::io(e, &path))
    }

    async fn create_many(&self, dataset: &str, rows: Vec<Map<String, Value>>) -> Result<Vec<RowId>> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.load(dataset).await?.unwrap_or_default();
        let ids = table.insert(rows);
        self.save(dataset, &table).await?;
        tracing::debug!(dataset, created = ids.len(), "appended rows");
        Ok(ids)
    }

    async fn find_many(&self, dataset: &str, selection: &RowSelection) -> Result<Vec<DatasetResultRow>> {
        Ok(self
            .load(dataset)
            .await?
            .map(|t| selection.apply(&t.rows))
            .unwrap_or_default())
    }

    async fn count(&self, dataset: &str, filters: &[DatasetQueryFilter]) -> Result<u64> {
        Ok(self
            .load(dataset)
            .await?
            .map_or(0, |t| count_matching(&t.rows, filters)))
    }

    async fn delete_all(&self, dataset: &str) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let Some(table) = self.load(dataset).await? else {
            return Ok(0);
        };
        let path = self.path_for(dataset)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| Error::io(e, &path))?;
        Ok(table.rows.len() as u64)
    }

    async fn replace_all(&self, dataset: &str, rows: Vec<Map<String, Value>>) -> Result<(u64, Vec<RowId>)> {
        let _guard = self.write_lock.lock().await;
        let removed = self
            .load(dataset)
            .await?
            .map_or(0, |old| old.rows.len() as u64);
        let mut table = Table::default();
        let ids = table.insert(rows);
        self.save(dataset, &table).await?;
        tracing::debug!(dataset, removed, created = ids.len(), "replaced rows");
        Ok((removed, ids))
    }
}
