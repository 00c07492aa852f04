//! datalab - one query contract over local and remote datasets
//!
//! Browse heterogeneous JSON row collections through a single
//! filter/sort/paginate contract, whether the rows live in a local row store
//! or behind a remote HTTP API described by configuration.
//!
//! # Design Principles
//!
//! 1. **One contract** - every backend answers the same [`DatasetQuery`]
//!    with the same [`DatasetResult`]
//! 2. **Declarative remote APIs** - parameter names and response paths come
//!    from [`ApiConfig`], not per-dataset code
//! 3. **Shared semantics** - providers, row stores, and the client-side path
//!    evaluate operators and orderings with the same code
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use datalab::{DatasetCatalog, DatasetQuery, LocalRowStore, ProviderRegistry};
//!
//! # async fn demo() -> datalab::Result<()> {
//! let store = Arc::new(LocalRowStore::open(".datalab")?);
//! let registry = ProviderRegistry::new(Arc::new(DatasetCatalog::builtin()), store)?;
//!
//! let query = DatasetQuery::from_query_string("price_min=10&sortField=price&sortDir=desc")?;
//! let page = registry.list("products-demo", &query).await?;
//! println!("{} rows of {}", page.rows.len(), page.total);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::cast_lossless,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss,
        clippy::redundant_clone,
        clippy::too_many_lines,
        clippy::float_cmp,
        clippy::unreadable_literal
    )
)]
// Allow some pedantic lints for cleaner code
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::map_unwrap_or)]

pub mod analysis;
/// CLI module for command-line interface
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod derived;
pub mod error;
pub mod json_path;
pub mod provider;
pub mod query;
pub mod store;

// Re-exports for convenience
pub use analysis::{AnalysisResult, AnalysisValue, AnalysisWidget};
pub use config::{
    ApiConfig, ColumnConfig, ColumnType, DatasetCatalog, DatasetConfig, FilterKind, HttpMethod,
    SourceType,
};
pub use derived::{ClientFilter, Facet, FacetValues};
pub use error::{Error, Result};
pub use provider::{ApiProvider, DatasetProvider, LocalProvider, ProviderRegistry};
pub use query::{
    DatasetQuery, DatasetQueryFilter, DatasetResult, DatasetResultRow, FilterOp, FilterValue,
    RowId, SortDirection, SortSpec,
};
pub use store::{LocalRowStore, MemoryRowStore, RowSelection, RowStore};
