//! Provider backed by the local row store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use super::DatasetProvider;
use crate::{
    config::DatasetConfig,
    error::{Error, Result},
    query::{DatasetQuery, DatasetResult, ValueKind},
    store::{RowSelection, RowStore},
};

/// A provider that evaluates queries against a [`RowStore`].
///
/// Filters and sort are honoured with the shared operator semantics; `total`
/// is the filtered count. The page and the count are fetched concurrently.
///
/// A dataset with a configuration reads as empty until rows are imported.
/// An unconfigured dataset must exist in the store, otherwise `list` fails
/// with [`Error::NotFound`].
#[derive(Debug, Clone)]
pub struct LocalProvider {
    store: Arc<dyn RowStore>,
    dataset: String,
    config: Option<DatasetConfig>,
}

impl LocalProvider {
    /// Creates a provider for a dataset known only by its id in the store.
    pub fn new(store: Arc<dyn RowStore>, dataset: impl Into<String>) -> Self {
        Self {
            store,
            dataset: dataset.into(),
            config: None,
        }
    }

    /// Creates a provider for a configured local dataset.
    ///
    /// Column types of the configuration decide how sorted fields compare.
    pub fn with_config(store: Arc<dyn RowStore>, config: DatasetConfig) -> Self {
        Self {
            store,
            dataset: config.slug.clone(),
            config: Some(config),
        }
    }

    /// Returns the dataset id.
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    fn value_kind(&self, field: &str) -> ValueKind {
        self.config
            .as_ref()
            .map_or(ValueKind::Auto, |c| c.value_kind(field))
    }
}

#[async_trait]
impl DatasetProvider for LocalProvider {
    #[instrument(skip(self, query), fields(dataset = %self.dataset, page = query.page), err)]
    async fn list(&self, query: &DatasetQuery) -> Result<DatasetResult> {
        if self.config.is_none() && !self.store.exists(&self.dataset).await? {
            return Err(Error::NotFound(format!("dataset '{}'", self.dataset)));
        }

        let kind = query
            .sort
            .as_ref()
            .map_or(ValueKind::Auto, |s| self.value_kind(&s.field));
        let selection = RowSelection::for_query(query, kind);

        let (rows, total) = tokio::join!(
            self.store.find_many(&self.dataset, &selection),
            self.store.count(&self.dataset, &query.filters),
        );
        let result = DatasetResult::new(rows?, total?);
        tracing::debug!(rows = result.rows.len(), total = result.total, "read local dataset page");
        Ok(result)
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::*;
    use crate::{
        config::{ColumnConfig, ColumnType},
        query::{DatasetQueryFilter, RowId, SortDirection},
        store::MemoryRowStore,
    };

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            other => panic!("expected object, got {other}"),
        }
    }

    async fn store() -> Arc<dyn RowStore> {
        let store = MemoryRowStore::new();
        store
            .create_many(
                "products",
                (1..=25)
                    .map(|i| obj(json!({"name": format!("item {i}"), "price": i, "code": i.to_string()})))
                    .collect(),
            )
            .await
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_pages_and_total() {
        let provider = LocalProvider::new(store().await, "products");
        let page = provider.list(&DatasetQuery::new(3, 10).unwrap()).await.unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.rows.len(), 5);
        assert_eq!(page.rows[0].id, RowId::Int(21));
    }

    #[tokio::test]
    async fn test_total_is_filtered_count() {
        let provider = LocalProvider::new(store().await, "products");
        let query = DatasetQuery::new(1, 3)
            .unwrap()
            .with_filter(DatasetQueryFilter::gte("price", 10.0))
            .with_filter(DatasetQueryFilter::lte("price", 19.0));
        let page = provider.list(&query).await.unwrap();
        assert_eq!(page.total, 10);
        assert_eq!(page.rows.len(), 3);
    }

    #[tokio::test]
    async fn test_sort_uses_configured_column_type() {
        let config = DatasetConfig::local(
            "products",
            "Products",
            vec![
                ColumnConfig::new("code", "Code", ColumnType::String).sortable(),
                ColumnConfig::new("price", "Price", ColumnType::Number).sortable(),
            ],
        );
        let provider = LocalProvider::with_config(store().await, config);

        // text ordering: "1" < "10" < "11" ...
        let query = DatasetQuery::new(1, 3).unwrap().with_sort("code", SortDirection::Asc);
        let page = provider.list(&query).await.unwrap();
        let codes: Vec<_> = page.rows.iter().map(|r| r.data["code"].clone()).collect();
        assert_eq!(codes, vec![json!("1"), json!("10"), json!("11")]);

        let query = DatasetQuery::new(1, 2).unwrap().with_sort("price", SortDirection::Desc);
        let page = provider.list(&query).await.unwrap();
        assert_eq!(page.rows[0].data["price"], json!(25));
    }

    #[tokio::test]
    async fn test_unconfigured_missing_dataset_is_not_found() {
        let provider = LocalProvider::new(store().await, "nope");
        let err = provider.list(&DatasetQuery::default()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_configured_missing_dataset_is_empty() {
        let config = DatasetConfig::local("empty", "Empty", vec![]);
        let provider = LocalProvider::with_config(store().await, config);
        let page = provider.list(&DatasetQuery::default()).await.unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(provider.dataset(), "empty");
        assert_eq!(provider.kind(), "local");
    }
}
