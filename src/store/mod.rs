//! Row stores for locally held datasets.
//!
//! A row store keeps, per dataset id, an ordered collection of
//! `{id, data}` rows. The [`RowStore`] trait is the narrow interface the
//! local provider consumes; implementations exist for process memory and
//! for JSON documents on the local filesystem.
//!
//! Store handles are constructed explicitly and passed to whoever needs
//! them (usually wrapped in an `Arc`); there is no process-wide connection.

pub mod local;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
pub use local::LocalRowStore;
pub use memory::MemoryRowStore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{Error, Result},
    query::{
        sort_rows, DatasetQuery, DatasetQueryFilter, DatasetResultRow, RowId, SortSpec, ValueKind,
    },
};

/// Ordering applied by a row store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Field and direction.
    pub sort: SortSpec,
    /// How values of the field compare.
    pub kind: ValueKind,
}

/// Which rows a `find_many` call returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSelection {
    /// Conjoined filters.
    pub filters: Vec<DatasetQueryFilter>,
    /// Optional ordering; insertion order otherwise.
    pub order_by: Option<OrderBy>,
    /// Number of matching rows to skip.
    pub skip: usize,
    /// Maximum number of rows to return (`None` = all).
    pub take: Option<usize>,
}

impl RowSelection {
    /// Selects every row in insertion order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Translates a query's page window, filters, and sort.
    pub fn for_query(query: &DatasetQuery, kind: ValueKind) -> Self {
        Self {
            filters: query.filters.clone(),
            order_by: query.sort.clone().map(|sort| OrderBy { sort, kind }),
            skip: query.offset(),
            take: Some(query.page_size),
        }
    }

    /// Applies the selection to an in-memory table.
    pub fn apply<'a>(&self, rows: impl IntoIterator<Item = &'a DatasetResultRow>) -> Vec<DatasetResultRow> {
        let mut selected: Vec<DatasetResultRow> = rows
            .into_iter()
            .filter(|row| self.filters.iter().all(|f| f.matches(row)))
            .cloned()
            .collect();

        if let Some(order) = &self.order_by {
            sort_rows(&mut selected, &order.sort, order.kind);
        }

        selected
            .into_iter()
            .skip(self.skip)
            .take(self.take.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Counts rows satisfying every filter.
pub(crate) fn count_matching<'a>(
    rows: impl IntoIterator<Item = &'a DatasetResultRow>,
    filters: &[DatasetQueryFilter],
) -> u64 {
    rows.into_iter()
        .filter(|row| filters.iter().all(|f| f.matches(row)))
        .count() as u64
}

/// Persisted form of one dataset's rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Table {
    pub next_id: i64,
    pub rows: Vec<DatasetResultRow>,
}

impl Table {
    /// Appends rows, assigning sequential ids starting at 1.
    pub fn insert(&mut self, rows: Vec<Map<String, Value>>) -> Vec<RowId> {
        let mut ids = Vec::with_capacity(rows.len());
        for data in rows {
            self.next_id += 1;
            let id = RowId::Int(self.next_id);
            ids.push(id.clone());
            self.rows.push(DatasetResultRow { id, data });
        }
        ids
    }
}

/// Checks that a dataset id is usable as a storage key.
///
/// # Errors
///
/// Returns a storage error unless the id is non-empty and made of ASCII
/// letters, digits, `-` and `_`.
pub fn validate_dataset_id(dataset: &str) -> Result<()> {
    let valid = !dataset.is_empty()
        && dataset
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::storage(format!("Invalid dataset id: '{dataset}'")))
    }
}

/// Storage for the rows of locally held datasets.
///
/// All methods address a dataset by id. Reading a dataset that does not
/// exist yields no rows; [`RowStore::exists`] distinguishes "empty" from
/// "absent".
#[async_trait]
pub trait RowStore: Send + Sync + fmt::Debug {
    /// Lists the ids of all datasets held by the store, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be enumerated.
    async fn datasets(&self) -> Result<Vec<String>>;

    /// Returns true if the dataset exists (possibly with zero rows).
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check fails.
    async fn exists(&self, dataset: &str) -> Result<bool>;

    /// Appends rows, creating the dataset if needed. Returns assigned ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be written.
    async fn create_many(&self, dataset: &str, rows: Vec<Map<String, Value>>) -> Result<Vec<RowId>>;

    /// Returns the selected rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset cannot be read.
    async fn find_many(&self, dataset: &str, selection: &RowSelection) -> Result<Vec<DatasetResultRow>>;

    /// Counts rows matching every filter, ignoring any page window.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset cannot be read.
    async fn count(&self, dataset: &str, filters: &[DatasetQueryFilter]) -> Result<u64>;

    /// Removes the dataset and all its rows. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset cannot be removed.
    async fn delete_all(&self, dataset: &str) -> Result<u64>;

    /// Replaces every row of the dataset in one write, with ids restarting
    /// at 1. Returns the number of rows removed and the new ids.
    ///
    /// If the write fails the previous rows are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be written.
    async fn replace_all(&self, dataset: &str, rows: Vec<Map<String, Value>>) -> Result<(u64, Vec<RowId>)>;
}
