//! Dataset commands: listing, querying, facets, client-side view, loading.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use super::Context;
use crate::{
    analysis::{self, AnalysisResult},
    derived::{self, ClientFilter, Facet, SORT_DIR_PARAM, SORT_KEY_PARAM},
    error::{Error, Result},
    query::{DatasetQuery, DatasetResultRow},
};

#[derive(Serialize)]
struct ViewOutput {
    rows: Vec<DatasetResultRow>,
    total: u64,
    facets: Vec<Facet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    analysis: Vec<AnalysisResult>,
}

#[derive(Serialize)]
struct LoadOutput<'a> {
    dataset: &'a str,
    removed: u64,
    created: usize,
}

/// List configured and stored datasets.
pub(crate) async fn cmd_datasets(ctx: &Context) -> Result<()> {
    let datasets = ctx.registry.datasets().await?;
    ctx.print(&datasets)
}

/// Query one page of a dataset through its provider.
pub(crate) async fn cmd_query(ctx: &Context, slug: &str, raw: &str) -> Result<()> {
    let query = DatasetQuery::from_query_string(raw)?;
    let result = ctx.registry.list(slug, &query).await?;
    ctx.print(&result)
}

/// Show distinct filter values of a local dataset.
pub(crate) async fn cmd_facets(ctx: &Context, slug: &str) -> Result<()> {
    let config = ctx
        .registry
        .config(slug)
        .ok_or_else(|| Error::NotFound(format!("no configuration for dataset '{slug}'")))?;
    let rows = ctx.registry.load_all(slug).await?;
    ctx.print(&derived::facets(config, &rows))
}

/// Filter, sort, and summarize a whole local dataset in memory.
pub(crate) async fn cmd_view(
    ctx: &Context,
    slug: &str,
    raw: &str,
    limit: Option<usize>,
) -> Result<()> {
    let rows = ctx.registry.load_all(slug).await?;
    let params = parse_pairs(raw);
    let pairs = || params.iter().map(|(k, v)| (k.as_str(), v.as_str()));
    let config = ctx.registry.config(slug);

    let filter = match config {
        Some(config) => ClientFilter::for_config(config, pairs()),
        None => {
            // unconfigured datasets accept any key as a filter
            let keys: Vec<&str> = params
                .iter()
                .map(|(k, _)| k.as_str())
                .filter(|k| *k != SORT_KEY_PARAM && *k != SORT_DIR_PARAM)
                .collect();
            ClientFilter::from_params(pairs(), &keys)
        }
    };

    let mut selected = filter.apply(&rows, config);
    let total = selected.len() as u64;
    let analysis = config.map_or_else(Vec::new, |c| analysis::run(&c.analysis, &selected));
    let facets = config.map_or_else(Vec::new, |c| derived::facets(c, &rows));
    if let Some(limit) = limit {
        selected.truncate(limit);
    }

    ctx.print(&ViewOutput {
        rows: selected,
        total,
        facets,
        analysis,
    })
}

/// Append rows from a JSON file to a local dataset.
pub(crate) async fn cmd_load(ctx: &Context, slug: &str, input: &Path, replace: bool) -> Result<()> {
    if ctx.registry.config(slug).is_some_and(|c| c.is_api()) {
        return Err(Error::invalid_config(format!(
            "dataset '{slug}' is api-backed; rows cannot be loaded into it"
        )));
    }

    let text = tokio::fs::read_to_string(input)
        .await
        .map_err(|e| Error::io(e, input))?;
    let rows: Vec<Map<String, Value>> = serde_json::from_str(&text).map_err(|e| {
        Error::parse(format!(
            "{} must hold a JSON array of objects: {e}",
            input.display()
        ))
    })?;

    let (removed, ids) = if replace {
        ctx.store.replace_all(slug, rows).await?
    } else {
        (0, ctx.store.create_many(slug, rows).await?)
    };
    tracing::info!(dataset = slug, created = ids.len(), removed, "loaded rows");

    ctx.print(&LoadOutput {
        dataset: slug,
        removed,
        created: ids.len(),
    })
}

fn parse_pairs(raw: &str) -> Vec<(String, String)> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}
