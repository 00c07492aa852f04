//! Declarative dataset configuration.
//!
//! A [`DatasetConfig`] describes one dataset: where its rows come from,
//! which columns it exposes, and (for remote datasets) how to translate a
//! query into the remote API's parameters. Configurations are pure data,
//! loaded once into a [`DatasetCatalog`] and shared read-only.
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "slug": "products-demo",
//!   "title": "Demo Products (API)",
//!   "sourceType": "api",
//!   "columns": [
//!     { "field": "price", "label": "Price", "type": "number",
//!       "filter": { "type": "range" }, "sortable": true }
//!   ],
//!   "apiConfig": {
//!     "baseUrl": "https://api.example.com/products",
//!     "filterParamMap": { "price_min": "minPrice", "price_max": "maxPrice" },
//!     "resultPath": "items",
//!     "totalPath": "total"
//!   }
//! }
//! ```

mod catalog;

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

pub use catalog::DatasetCatalog;

use crate::{
    analysis::AnalysisWidget,
    error::{Error, Result},
    query::{DatasetQuery, FilterOp, ValueKind},
};

/// Where a dataset's rows live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Rows are held by the local row store.
    #[default]
    Local,
    /// Rows are fetched from a remote HTTP JSON API.
    Api,
}

/// Declared type of a column, used for formatting and comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Free text.
    #[default]
    String,
    /// Numeric values.
    Number,
    /// Dates (compared by their string form).
    Date,
    /// Booleans.
    Boolean,
}

impl ColumnType {
    /// Comparison kind used when ordering by a column of this type.
    pub fn value_kind(self) -> ValueKind {
        match self {
            Self::Number => ValueKind::Numeric,
            Self::String | Self::Date | Self::Boolean => ValueKind::Text,
        }
    }
}

/// Filter widget attached to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Not filterable.
    #[default]
    None,
    /// Pick one of the distinct values.
    Select,
    /// Free-text substring search.
    Search,
    /// Numeric min/max bounds.
    Range,
}

/// Filter descriptor of a column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnFilter {
    /// Kind of filter widget.
    #[serde(rename = "type")]
    pub kind: FilterKind,
    /// Optional placeholder text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// Display width hint: pixels or a CSS length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnWidth {
    /// Width in pixels.
    Pixels(u32),
    /// CSS length such as `"12rem"`.
    Css(String),
}

fn default_true() -> bool {
    true
}

/// One column of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Key into a row's data.
    pub field: String,
    /// Human label.
    pub label: String,
    /// Declared value type.
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    /// Optional filter descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<ColumnFilter>,
    /// Whether the column can be sorted.
    #[serde(default)]
    pub sortable: bool,
    /// Whether the column is shown.
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Optional display width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<ColumnWidth>,
}

impl ColumnConfig {
    /// Creates a visible, unsortable, unfiltered column.
    pub fn new(field: impl Into<String>, label: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
            column_type,
            filter: None,
            sortable: false,
            visible: true,
            width: None,
        }
    }

    /// Marks the column sortable.
    #[must_use]
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Attaches a filter widget.
    #[must_use]
    pub fn filter(mut self, kind: FilterKind) -> Self {
        self.filter = Some(ColumnFilter {
            kind,
            placeholder: None,
        });
        self
    }

    /// Attaches a filter widget with placeholder text.
    #[must_use]
    pub fn filter_with_placeholder(mut self, kind: FilterKind, placeholder: impl Into<String>) -> Self {
        self.filter = Some(ColumnFilter {
            kind,
            placeholder: Some(placeholder.into()),
        });
        self
    }

    /// Hides the column.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Sets the display width.
    #[must_use]
    pub fn width(mut self, width: ColumnWidth) -> Self {
        self.width = Some(width);
        self
    }

    /// The column's filter kind (`None` when absent).
    pub fn filter_kind(&self) -> FilterKind {
        self.filter.as_ref().map(|f| f.kind).unwrap_or_default()
    }
}

/// HTTP method used against a remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    #[default]
    Get,
    /// `POST`
    Post,
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_page_size_param() -> String {
    "pageSize".to_string()
}

fn default_sort_field_param() -> String {
    "sort".to_string()
}

fn default_sort_dir_param() -> String {
    "order".to_string()
}

fn default_id_field() -> String {
    "id".to_string()
}

/// How to reach a remote dataset and translate queries for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Endpoint URL; query parameters are appended to it.
    pub base_url: String,
    /// HTTP method.
    #[serde(default)]
    pub method: HttpMethod,
    /// Abstract filter key (`field`, `field_min`, `field_max`) to outbound
    /// parameter name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filter_param_map: BTreeMap<String, String>,
    /// Parameter carrying the page number.
    #[serde(default = "default_page_param")]
    pub page_param: String,
    /// Parameter carrying the page size.
    #[serde(default = "default_page_size_param")]
    pub page_size_param: String,
    /// Parameter carrying the sort field.
    #[serde(default = "default_sort_field_param")]
    pub sort_field_param: String,
    /// Parameter carrying the sort direction.
    #[serde(default = "default_sort_dir_param")]
    pub sort_dir_param: String,
    /// Key of the row id within each returned item.
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Dot path to the row array; absent means the body is the array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    /// Dot path to the total count; absent means the row array's length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_path: Option<String>,
}

impl ApiConfig {
    /// Creates a configuration with default parameter names.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            method: HttpMethod::Get,
            filter_param_map: BTreeMap::new(),
            page_param: default_page_param(),
            page_size_param: default_page_size_param(),
            sort_field_param: default_sort_field_param(),
            sort_dir_param: default_sort_dir_param(),
            id_field: default_id_field(),
            result_path: None,
            total_path: None,
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Maps an abstract filter key to an outbound parameter name.
    #[must_use]
    pub fn map_param(mut self, key: impl Into<String>, param: impl Into<String>) -> Self {
        self.filter_param_map.insert(key.into(), param.into());
        self
    }

    /// Sets the pagination parameter names.
    #[must_use]
    pub fn page_params(mut self, page: impl Into<String>, page_size: impl Into<String>) -> Self {
        self.page_param = page.into();
        self.page_size_param = page_size.into();
        self
    }

    /// Sets the sort parameter names.
    #[must_use]
    pub fn sort_params(mut self, field: impl Into<String>, direction: impl Into<String>) -> Self {
        self.sort_field_param = field.into();
        self.sort_dir_param = direction.into();
        self
    }

    /// Sets the id key.
    #[must_use]
    pub fn id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Sets the path to the row array.
    #[must_use]
    pub fn result_path(mut self, path: impl Into<String>) -> Self {
        self.result_path = Some(path.into());
        self
    }

    /// Sets the path to the total count.
    #[must_use]
    pub fn total_path(mut self, path: impl Into<String>) -> Self {
        self.total_path = Some(path.into());
        self
    }

    /// Outbound parameter name for a field, falling back to the field itself.
    pub fn param_for<'a>(&'a self, field: &'a str) -> &'a str {
        self.filter_param_map
            .get(field)
            .map_or(field, String::as_str)
    }

    /// Outbound parameter name for a filter.
    ///
    /// Range bounds first look up `<field>_min` / `<field>_max` in the map,
    /// then append the suffix to the field's own mapped name.
    pub fn outbound_param(&self, field: &str, op: FilterOp) -> String {
        let suffix = match op {
            FilterOp::Eq | FilterOp::Contains => return self.param_for(field).to_string(),
            FilterOp::Gte => "_min",
            FilterOp::Lte => "_max",
        };
        match self.filter_param_map.get(&format!("{field}{suffix}")) {
            Some(mapped) => mapped.clone(),
            None => format!("{}{suffix}", self.param_for(field)),
        }
    }

    fn validate(&self, slug: &str) -> Result<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            Error::invalid_config(format!(
                "dataset '{slug}' has invalid baseUrl '{}': {e}",
                self.base_url
            ))
        })?;
        if url.cannot_be_a_base() {
            return Err(Error::invalid_config(format!(
                "dataset '{slug}' baseUrl '{}' is not a hierarchical URL",
                self.base_url
            )));
        }
        Ok(())
    }
}

/// Declarative description of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetConfig {
    /// Unique identifier.
    pub slug: String,
    /// Human title.
    pub title: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Backend kind.
    #[serde(default)]
    pub source_type: SourceType,
    /// Ordered columns.
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    /// Remote API description; present iff `source_type` is `api`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_config: Option<ApiConfig>,
    /// Analysis widgets computed over the dataset's rows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analysis: Vec<AnalysisWidget>,
}

impl DatasetConfig {
    /// Creates a local dataset configuration.
    pub fn local(slug: impl Into<String>, title: impl Into<String>, columns: Vec<ColumnConfig>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            description: None,
            source_type: SourceType::Local,
            columns,
            api_config: None,
            analysis: Vec::new(),
        }
    }

    /// Creates an API-backed dataset configuration.
    pub fn api(
        slug: impl Into<String>,
        title: impl Into<String>,
        columns: Vec<ColumnConfig>,
        api: ApiConfig,
    ) -> Self {
        Self {
            source_type: SourceType::Api,
            api_config: Some(api),
            ..Self::local(slug, title, columns)
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends an analysis widget.
    #[must_use]
    pub fn with_analysis(mut self, widget: AnalysisWidget) -> Self {
        self.analysis.push(widget);
        self
    }

    /// Returns true for API-backed datasets.
    pub fn is_api(&self) -> bool {
        self.source_type == SourceType::Api
    }

    /// Returns the API configuration of an API-backed dataset.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the dataset is API-backed but has no
    /// `apiConfig`.
    pub fn require_api(&self) -> Result<&ApiConfig> {
        self.api_config.as_ref().ok_or_else(|| {
            Error::invalid_config(format!(
                "dataset '{}' is api-backed but has no apiConfig",
                self.slug
            ))
        })
    }

    /// Looks up a column by field.
    pub fn column(&self, field: &str) -> Option<&ColumnConfig> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Comparison kind for a field; undeclared fields compare automatically.
    pub fn value_kind(&self, field: &str) -> ValueKind {
        self.column(field)
            .map_or(ValueKind::Auto, |c| c.column_type.value_kind())
    }

    /// Columns that carry a filter widget, in declaration order.
    pub fn filter_facets(&self) -> impl Iterator<Item = &ColumnConfig> {
        self.columns
            .iter()
            .filter(|c| c.filter_kind() != FilterKind::None)
    }

    /// Checks the structural invariants of the configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the slug is empty, if `apiConfig` is
    /// present without `sourceType = api` (or missing with it), if a column
    /// field repeats, or if the API base URL is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.slug.trim().is_empty() {
            return Err(Error::invalid_config("dataset slug cannot be empty"));
        }

        match (self.source_type, &self.api_config) {
            (SourceType::Api, Some(api)) => api.validate(&self.slug)?,
            (SourceType::Api, None) => {
                self.require_api()?;
            }
            (SourceType::Local, Some(_)) => {
                return Err(Error::invalid_config(format!(
                    "dataset '{}' has apiConfig but sourceType is local",
                    self.slug
                )));
            }
            (SourceType::Local, None) => {}
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.field.as_str()) {
                return Err(Error::invalid_config(format!(
                    "dataset '{}' declares column '{}' more than once",
                    self.slug, column.field
                )));
            }
        }

        Ok(())
    }

    /// Checks that every filter and the sort reference declared columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ColumnNotFound`] for the first undeclared field.
    pub fn validate_query(&self, query: &DatasetQuery) -> Result<()> {
        let fields = query
            .filters
            .iter()
            .map(|f| f.field.as_str())
            .chain(query.sort.iter().map(|s| s.field.as_str()));

        for field in fields {
            if self.column(field).is_none() {
                return Err(Error::column_not_found(&self.slug, field));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::{DatasetQueryFilter, SortDirection};

    fn products() -> DatasetConfig {
        DatasetConfig::api(
            "products",
            "Products",
            vec![
                ColumnConfig::new("id", "ID", ColumnType::Number).sortable(),
                ColumnConfig::new("name", "Name", ColumnType::String).filter(FilterKind::Search),
                ColumnConfig::new("price", "Price", ColumnType::Number).filter(FilterKind::Range),
            ],
            ApiConfig::new("https://api.example.com/products")
                .map_param("name", "search")
                .map_param("price_min", "minPrice"),
        )
    }

    #[test]
    fn test_api_config_defaults_from_json() {
        let api: ApiConfig =
            serde_json::from_value(json!({"baseUrl": "https://x.test/items"})).unwrap();
        assert_eq!(api.method, HttpMethod::Get);
        assert_eq!(api.page_param, "page");
        assert_eq!(api.page_size_param, "pageSize");
        assert_eq!(api.sort_field_param, "sort");
        assert_eq!(api.sort_dir_param, "order");
        assert_eq!(api.id_field, "id");
        assert!(api.result_path.is_none());
        assert!(api.total_path.is_none());
    }

    #[test]
    fn test_column_defaults_from_json() {
        let col: ColumnConfig =
            serde_json::from_value(json!({"field": "state", "label": "State"})).unwrap();
        assert_eq!(col.column_type, ColumnType::String);
        assert!(col.visible);
        assert!(!col.sortable);
        assert_eq!(col.filter_kind(), FilterKind::None);
    }

    #[test]
    fn test_column_width_variants() {
        let col: ColumnConfig = serde_json::from_value(
            json!({"field": "a", "label": "A", "width": 120}),
        )
        .unwrap();
        assert_eq!(col.width, Some(ColumnWidth::Pixels(120)));
        let col: ColumnConfig = serde_json::from_value(
            json!({"field": "a", "label": "A", "width": "12rem"}),
        )
        .unwrap();
        assert_eq!(col.width, Some(ColumnWidth::Css("12rem".to_string())));
    }

    #[test]
    fn test_outbound_param_mapping() {
        let api = products().api_config.unwrap();
        assert_eq!(api.outbound_param("name", FilterOp::Contains), "search");
        assert_eq!(api.outbound_param("category", FilterOp::Eq), "category");
        assert_eq!(api.outbound_param("price", FilterOp::Gte), "minPrice");
        // no explicit price_max entry: synthesized from the field mapping
        assert_eq!(api.outbound_param("price", FilterOp::Lte), "price_max");
        assert_eq!(api.outbound_param("name", FilterOp::Gte), "search_min");
    }

    #[test]
    fn test_validate_ok() {
        assert!(products().validate().is_ok());
    }

    #[test]
    fn test_validate_api_without_config() {
        let mut config = products();
        config.api_config = None;
        let err = config.validate().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("no apiConfig"));
    }

    #[test]
    fn test_validate_local_with_api_config() {
        let mut config = products();
        config.source_type = SourceType::Local;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_column() {
        let mut config = products();
        config
            .columns
            .push(ColumnConfig::new("price", "Again", ColumnType::Number));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_base_url() {
        let mut config = products();
        config.api_config = Some(ApiConfig::new("not a url"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_query_undeclared_field() {
        let config = products();
        let ok = DatasetQuery::default()
            .with_filter(DatasetQueryFilter::gte("price", 1.0))
            .with_sort("id", SortDirection::Asc);
        assert!(config.validate_query(&ok).is_ok());

        let bad = DatasetQuery::default().with_filter(DatasetQueryFilter::eq("colour", "red"));
        let err = config.validate_query(&bad).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { ref name, .. } if name == "colour"));

        let bad_sort = DatasetQuery::default().with_sort("rating", SortDirection::Desc);
        assert!(config.validate_query(&bad_sort).is_err());
    }

    #[test]
    fn test_filter_facets_and_value_kind() {
        let config = products();
        let facets: Vec<&str> = config.filter_facets().map(|c| c.field.as_str()).collect();
        assert_eq!(facets, vec!["name", "price"]);
        assert_eq!(config.value_kind("price"), ValueKind::Numeric);
        assert_eq!(config.value_kind("name"), ValueKind::Text);
        assert_eq!(config.value_kind("unknown"), ValueKind::Auto);
    }

    #[test]
    fn test_param_for_falls_back_to_field() {
        let api = ApiConfig::new("https://x.test/rows").map_param("name", "q");
        assert_eq!(api.param_for("name"), "q");
        let field = String::from("category");
        assert_eq!(api.param_for(&field), "category");
    }

    #[test]
    fn test_config_json_roundtrip_keeps_camel_case() {
        let json = serde_json::to_value(products()).unwrap();
        assert_eq!(json["sourceType"], json!("api"));
        assert_eq!(json["apiConfig"]["baseUrl"], json!("https://api.example.com/products"));
        assert_eq!(json["apiConfig"]["method"], json!("GET"));
        assert_eq!(json["columns"][1]["filter"]["type"], json!("search"));
    }
}
