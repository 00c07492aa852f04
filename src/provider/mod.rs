//! Dataset providers.
//!
//! A provider answers a [`DatasetQuery`] for one dataset with a
//! [`DatasetResult`]. Two implementations exist:
//!
//! - [`ApiProvider`] - translates the query into a request against a
//!   remote HTTP JSON API described by an [`ApiConfig`](crate::config::ApiConfig)
//! - [`LocalProvider`] - evaluates the query against a [`RowStore`](crate::store::RowStore)
//!
//! [`ProviderRegistry`] picks the right one for a dataset slug.

mod api;
mod local;
mod registry;

use async_trait::async_trait;

pub use api::ApiProvider;
pub use local::LocalProvider;
pub use registry::{DatasetSummary, ProviderRegistry};

use crate::{
    error::Result,
    query::{DatasetQuery, DatasetResult},
};

/// Something that can answer dataset queries.
///
/// Calls are independent: a provider keeps no state between them, so a
/// caller may issue any number concurrently and drop a pending call safely.
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    /// Returns one page of matching rows plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or answers with
    /// something that cannot be interpreted.
    async fn list(&self, query: &DatasetQuery) -> Result<DatasetResult>;

    /// Short name of the backend kind, for logging.
    fn kind(&self) -> &'static str;
}
