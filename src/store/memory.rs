//! In-memory row store.

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{count_matching, RowSelection, RowStore, Table};
use crate::{
    error::{Error, Result},
    query::{DatasetQueryFilter, DatasetResultRow, RowId},
};

/// A row store held in process memory.
///
/// Useful for tests and for datasets assembled at runtime. All rows are
/// lost when the store is dropped.
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across tasks behind an
/// `Arc`. Locks are never held across an await point.
///
/// # Example
///
/// ```
/// use datalab::store::{MemoryRowStore, RowSelection, RowStore};
/// use serde_json::json;
///
/// # tokio_test_block_on(async {
/// let store = MemoryRowStore::new();
/// let row = json!({"state": "Ohio"}).as_object().cloned().unwrap_or_default();
/// store.create_many("states", vec![row]).await.unwrap();
/// let rows = store.find_many("states", &RowSelection::all()).await.unwrap();
/// assert_eq!(rows.len(), 1);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryRowStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryRowStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the number of datasets held.
    pub fn len(&self) -> usize {
        self.tables.read().map(|t| t.len()).unwrap_or(0)
    }

    /// Returns true if no dataset is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<String, Table>) -> T) -> Result<T> {
        let tables = self
            .tables
            .read()
            .map_err(|_| Error::storage("Failed to acquire read lock"))?;
        Ok(f(&tables))
    }

    fn write<T>(&self, f: impl FnOnce(&mut HashMap<String, Table>) -> T) -> Result<T> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| Error::storage("Failed to acquire write lock"))?;
        Ok(f(&mut tables))
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn datasets(&self) -> Result<Vec<String>> {
        self.read(|tables| {
            let mut names: Vec<String> = tables.keys().cloned().collect();
            names.sort();
            names
        })
    }

    async fn exists(&self, dataset: &str) -> Result<bool> {
        self.read(|tables| tables.contains_key(dataset))
    }

    async fn create_many(&self, dataset: &str, rows: Vec<Map<String, Value>>) -> Result<Vec<RowId>> {
        self.write(|tables| tables.entry(dataset.to_string()).or_default().insert(rows))
    }

    async fn find_many(&self, dataset: &str, selection: &RowSelection) -> Result<Vec<DatasetResultRow>> {
        self.read(|tables| {
            tables
                .get(dataset)
                .map(|t| selection.apply(&t.rows))
                .unwrap_or_default()
        })
    }

    async fn count(&self, dataset: &str, filters: &[DatasetQueryFilter]) -> Result<u64> {
        self.read(|tables| {
            tables
                .get(dataset)
                .map_or(0, |t| count_matching(&t.rows, filters))
        })
    }

    async fn delete_all(&self, dataset: &str) -> Result<u64> {
        self.write(|tables| tables.remove(dataset).map_or(0, |t| t.rows.len() as u64))
    }

    async fn replace_all(&self, dataset: &str, rows: Vec<Map<String, Value>>) -> Result<(u64, Vec<RowId>)> {
        let mut table = Table::default();
        let ids = table.insert(rows);
        self.write(|tables| {
            let removed = tables
                .insert(dataset.to_string(), table)
                .map_or(0, |old| old.rows.len() as u64);
            (removed, ids)
        })
    }
}
