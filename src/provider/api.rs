//! Provider backed by a remote HTTP JSON API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::DatasetProvider;
use crate::{
    config::{ApiConfig, HttpMethod},
    error::{Error, Result},
    json_path,
    query::{DatasetQuery, DatasetResult, DatasetResultRow, RowId},
};

const USER_AGENT: &str = concat!("datalab/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client used by API providers.
///
/// # Errors
///
/// Returns an error if the client cannot be created.
pub(crate) fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| Error::api_transport(format!("Failed to create HTTP client: {e}")))
}

/// A provider that forwards queries to a remote API.
///
/// The query is translated into query-string parameters using the
/// parameter names of the [`ApiConfig`]; the JSON response is located with
/// `resultPath` / `totalPath` and turned into uniform rows.
///
/// # Example
///
/// ```no_run
/// use datalab::config::ApiConfig;
/// use datalab::provider::{ApiProvider, DatasetProvider};
/// use datalab::query::DatasetQuery;
///
/// # async fn demo() -> datalab::Result<()> {
/// let api = ApiConfig::new("https://api.example.com/products").result_path("items");
/// let provider = ApiProvider::new(api)?;
/// let page = provider.list(&DatasetQuery::default()).await?;
/// println!("{} of {}", page.rows.len(), page.total);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiProvider {
    api: ApiConfig,
    client: Client,
}

impl ApiProvider {
    /// Creates a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api: ApiConfig) -> Result<Self> {
        Ok(Self::with_client(api, build_client(None)?))
    }

    /// Creates a provider whose requests time out after `timeout`.
    ///
    /// A timeout surfaces as [`Error::ApiRequestFailed`] without a status.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(api: ApiConfig, timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(api, build_client(Some(timeout))?))
    }

    /// Creates a provider sharing an existing HTTP client.
    pub fn with_client(api: ApiConfig, client: Client) -> Self {
        Self { api, client }
    }

    /// Returns the API configuration.
    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    /// Builds the outbound request URL for a query.
    ///
    /// Parameters already present on `baseUrl` are kept unless the query
    /// sets the same name, in which case the later value wins.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `baseUrl` is not a valid URL.
    pub fn build_url(&self, query: &DatasetQuery) -> Result<Url> {
        let mut url = Url::parse(&self.api.base_url).map_err(|e| {
            Error::invalid_config(format!("invalid baseUrl '{}': {e}", self.api.base_url))
        })?;

        let mut params = QueryParams(url.query_pairs().into_owned().collect());
        params.set(&self.api.page_param, query.page.to_string());
        params.set(&self.api.page_size_param, query.page_size.to_string());

        for filter in &query.filters {
            let name = self.api.outbound_param(&filter.field, filter.op);
            params.set(&name, filter.value.to_string());
        }

        if let Some(sort) = &query.sort {
            params.set(&self.api.sort_field_param, sort.field.clone());
            params.set(&self.api.sort_dir_param, sort.direction.to_string());
        }

        url.query_pairs_mut().clear().extend_pairs(&params.0);
        Ok(url)
    }

    /// Interprets a decoded response body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] if the located rows are not an
    /// array of objects.
    pub fn decode(&self, body: &Value, query: &DatasetQuery) -> Result<DatasetResult> {
        let items = match json_path::resolve_opt(body, self.api.result_path.as_deref()) {
            None | Some(Value::Null) => return Ok(self.with_total(body, 0, Vec::new())),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(Error::malformed(format!(
                    "expected an array at '{}', found {}",
                    self.api.result_path.as_deref().unwrap_or(""),
                    json_type(other)
                )));
            }
        };

        // an oversized page is cut to pageSize; the fallback total still
        // counts every returned item
        let offset = query.offset();
        let rows = items
            .iter()
            .take(query.page_size)
            .enumerate()
            .map(|(index, item)| self.row(item, offset.saturating_add(index)))
            .collect::<Result<Vec<_>>>()?;
        if items.len() > rows.len() {
            tracing::warn!(
                returned = items.len(),
                page_size = query.page_size,
                "remote page larger than requested, truncating"
            );
        }
        Ok(self.with_total(body, items.len(), rows))
    }

    fn row(&self, item: &Value, position: usize) -> Result<DatasetResultRow> {
        let Value::Object(data) = item else {
            return Err(Error::malformed(format!(
                "row {position} is {}, expected an object",
                json_type(item)
            )));
        };
        let id = data
            .get(&self.api.id_field)
            .and_then(RowId::from_value)
            .unwrap_or_else(|| RowId::Int(i64::try_from(position).unwrap_or(i64::MAX)));
        Ok(DatasetResultRow::new(id, data.clone()))
    }

    fn with_total(&self, body: &Value, returned: usize, rows: Vec<DatasetResultRow>) -> DatasetResult {
        let total = self
            .api
            .total_path
            .as_deref()
            .and_then(|path| json_path::resolve(body, path))
            .and_then(numeric_total)
            .unwrap_or(returned as u64);
        DatasetResult::new(rows, total)
    }
}

#[async_trait]
impl DatasetProvider for ApiProvider {
    #[instrument(skip(self, query), fields(base_url = %self.api.base_url, page = query.page), err)]
    async fn list(&self, query: &DatasetQuery) -> Result<DatasetResult> {
        let url = self.build_url(query)?;
        tracing::debug!(%url, method = ?self.api.method, "requesting remote dataset page");

        let request = match self.api.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };

        let response = request.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::api_status(
                status.as_u16(),
                format!("remote API answered {status}"),
            ));
        }

        let bytes = response.bytes().await.map_err(|e| transport_error(&e))?;
        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|e| Error::malformed(format!("response body is not valid JSON: {e}")))?;

        let result = self.decode(&body, query)?;
        tracing::debug!(rows = result.rows.len(), total = result.total, "decoded remote page");
        Ok(result)
    }

    fn kind(&self) -> &'static str {
        "api"
    }
}

/// Query-string pairs with "set" semantics: one value per name, first
/// position kept.
struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn set(&mut self, name: &str, value: String) {
        match self.0.iter_mut().find(|(k, _)| k == name) {
            Some(pair) => pair.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
    }
}

fn transport_error(e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::api_transport(format!("request timed out: {e}"))
    } else {
        Error::api_transport(e.to_string())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn numeric_total(value: &Value) -> Option<u64> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_u64().or_else(|| {
        n.as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
