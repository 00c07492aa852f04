//! Resolution of dataset slugs to providers.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::instrument;

use super::{api::build_client, ApiProvider, DatasetProvider, LocalProvider};
use crate::{
    config::{DatasetCatalog, DatasetConfig, SourceType},
    error::{Error, Result},
    query::{DatasetQuery, DatasetResult, DatasetResultRow},
    store::{RowSelection, RowStore},
};

/// Entry of the dataset listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    /// Dataset slug.
    pub slug: String,
    /// Human title, for configured datasets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Backend kind.
    pub source_type: SourceType,
    /// Whether the dataset has a configuration.
    pub configured: bool,
    /// Whether rows for the dataset exist in the local store.
    pub stored: bool,
}

/// Picks the provider for a dataset slug.
///
/// Configured API datasets get an [`ApiProvider`]; everything else,
/// including slugs with no configuration at all, gets a [`LocalProvider`]
/// over the shared row store. All API providers share one HTTP client.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use datalab::config::DatasetCatalog;
/// use datalab::provider::{DatasetProvider, ProviderRegistry};
/// use datalab::store::MemoryRowStore;
///
/// let registry = ProviderRegistry::new(
///     Arc::new(DatasetCatalog::builtin()),
///     Arc::new(MemoryRowStore::new()),
/// )
/// .unwrap();
/// assert_eq!(registry.resolve("products-demo").unwrap().kind(), "api");
/// assert_eq!(registry.resolve("anything-else").unwrap().kind(), "local");
/// ```
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    catalog: Arc<DatasetCatalog>,
    store: Arc<dyn RowStore>,
    client: reqwest::Client,
}

impl ProviderRegistry {
    /// Creates a registry with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(catalog: Arc<DatasetCatalog>, store: Arc<dyn RowStore>) -> Result<Self> {
        Ok(Self::with_client(catalog, store, build_client(None)?))
    }

    /// Creates a registry whose API requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(
        catalog: Arc<DatasetCatalog>,
        store: Arc<dyn RowStore>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self::with_client(catalog, store, build_client(Some(timeout))?))
    }

    /// Creates a registry sharing an existing HTTP client.
    pub fn with_client(
        catalog: Arc<DatasetCatalog>,
        store: Arc<dyn RowStore>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            catalog,
            store,
            client,
        }
    }

    /// Returns the configuration catalog.
    pub fn catalog(&self) -> &DatasetCatalog {
        &self.catalog
    }

    /// Returns the configuration of a slug, if any.
    pub fn config(&self, slug: &str) -> Option<&DatasetConfig> {
        self.catalog.get(slug)
    }

    /// Returns the provider for a slug.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the slug is configured as
    /// API-backed but has no `apiConfig`.
    pub fn resolve(&self, slug: &str) -> Result<Box<dyn DatasetProvider>> {
        let provider: Box<dyn DatasetProvider> = match self.catalog.get(slug) {
            Some(config) if config.source_type == SourceType::Api => {
                let api = config.require_api()?.clone();
                Box::new(ApiProvider::with_client(api, self.client.clone()))
            }
            Some(config) => Box::new(LocalProvider::with_config(
                Arc::clone(&self.store),
                config.clone(),
            )),
            None => Box::new(LocalProvider::new(Arc::clone(&self.store), slug)),
        };
        tracing::debug!(slug, kind = provider.kind(), "resolved dataset provider");
        Ok(provider)
    }

    /// Validates a query against the dataset's configuration and lists it.
    ///
    /// Unconfigured datasets accept filters and sort on any field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] for undeclared fields, and any error
    /// of [`ProviderRegistry::resolve`] or of the provider itself.
    #[instrument(skip(self, query), err)]
    pub async fn list(&self, slug: &str, query: &DatasetQuery) -> Result<DatasetResult> {
        if let Some(config) = self.catalog.get(slug) {
            config.validate_query(query)?;
        }
        self.resolve(slug)?.list(query).await
    }

    /// Reads every row of a local dataset, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for API-backed datasets,
    /// [`Error::NotFound`] for unconfigured datasets absent from the store,
    /// or a store error.
    pub async fn load_all(&self, slug: &str) -> Result<Vec<DatasetResultRow>> {
        match self.catalog.get(slug) {
            Some(config) if config.is_api() => {
                return Err(Error::invalid_config(format!(
                    "dataset '{slug}' is api-backed and cannot be loaded wholesale"
                )));
            }
            Some(_) => {}
            None if !self.store.exists(slug).await? => {
                return Err(Error::NotFound(format!("dataset '{slug}'")));
            }
            None => {}
        }
        self.store.find_many(slug, &RowSelection::all()).await
    }

    /// Lists configured datasets in declaration order, followed by
    /// unconfigured datasets found in the store, sorted by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be enumerated.
    pub async fn datasets(&self) -> Result<Vec<DatasetSummary>> {
        let stored = self.store.datasets().await?;

        let mut summaries: Vec<DatasetSummary> = self
            .catalog
            .iter()
            .map(|config| DatasetSummary {
                slug: config.slug.clone(),
                title: Some(config.title.clone()),
                source_type: config.source_type,
                configured: true,
                stored: stored.contains(&config.slug),
            })
            .collect();

        summaries.extend(
            stored
                .iter()
                .filter(|slug| self.catalog.get(slug).is_none())
                .map(|slug| DatasetSummary {
                    slug: slug.clone(),
                    title: None,
                    source_type: SourceType::Local,
                    configured: false,
                    stored: true,
                }),
        );
        Ok(summaries)
    }
}
