//! The dataset configuration registry.

use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

use super::{ApiConfig, ColumnConfig, ColumnType, DatasetConfig, FilterKind};
use crate::{
    analysis::AnalysisWidget,
    error::{Error, Result},
};

/// Immutable set of dataset configurations, looked up by slug.
///
/// # Example JSON
///
/// ```json
/// {
///   "version": "1.0",
///   "datasets": [ { "slug": "salary-2024", "title": "...", "sourceType": "local" } ]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetCatalog {
    /// Catalog format version.
    #[serde(default = "default_version")]
    pub version: String,
    datasets: Vec<DatasetConfig>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl DatasetCatalog {
    /// Creates a catalog, validating every configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any dataset is invalid or if two
    /// datasets share a slug.
    pub fn new(datasets: Vec<DatasetConfig>) -> Result<Self> {
        let catalog = Self {
            version: default_version(),
            datasets,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Creates an empty catalog: every slug resolves to the local store.
    pub fn empty() -> Self {
        Self {
            version: default_version(),
            datasets: Vec::new(),
        }
    }

    /// Parses and validates a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the JSON is malformed or invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(json)
            .map_err(|e| Error::invalid_config(format!("Failed to parse dataset catalog: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Loads and validates a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a configuration
    /// error if its content is invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(e, path))?;
        let catalog = Self::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            datasets = catalog.len(),
            "loaded dataset catalog"
        );
        Ok(catalog)
    }

    /// The compiled-in demo catalog.
    pub fn builtin() -> Self {
        Self {
            version: default_version(),
            datasets: vec![products_demo(), salary_2024(), state_populations()],
        }
    }

    fn validate(&self) -> Result<()> {
        let mut slugs = HashSet::new();
        for config in &self.datasets {
            config.validate()?;
            if !slugs.insert(config.slug.as_str()) {
                return Err(Error::invalid_config(format!(
                    "dataset slug '{}' is declared more than once",
                    config.slug
                )));
            }
        }
        Ok(())
    }

    /// Looks up a configuration by slug.
    pub fn get(&self, slug: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.slug == slug)
    }

    /// Iterates configurations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &DatasetConfig> {
        self.datasets.iter()
    }

    /// Returns the number of configured datasets.
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Returns true if no dataset is configured.
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

fn products_demo() -> DatasetConfig {
    DatasetConfig::api(
        "products-demo",
        "Demo Products (API)",
        vec![
            ColumnConfig::new("id", "ID", ColumnType::Number).sortable(),
            ColumnConfig::new("name", "Name", ColumnType::String)
                .filter_with_placeholder(FilterKind::Search, "Search by name")
                .sortable(),
            ColumnConfig::new("category", "Category", ColumnType::String)
                .filter(FilterKind::Select)
                .sortable(),
            ColumnConfig::new("price", "Price", ColumnType::Number)
                .filter(FilterKind::Range)
                .sortable(),
            ColumnConfig::new("currency", "Currency", ColumnType::String),
            ColumnConfig::new("rating", "Rating", ColumnType::Number),
            ColumnConfig::new("stock", "Stock", ColumnType::Number),
        ],
        ApiConfig::new("https://api.example.com/products")
            .map_param("name", "search")
            .map_param("category", "category")
            .map_param("price_min", "minPrice")
            .map_param("price_max", "maxPrice")
            .result_path("items")
            .total_path("total"),
    )
    .description("Products listing backed by an external API.")
}

fn salary_2024() -> DatasetConfig {
    DatasetConfig::local(
        "salary-2024",
        "ML / Data Salary Dataset 2024",
        vec![
            ColumnConfig::new("work_year", "Year", ColumnType::Number)
                .filter(FilterKind::Select)
                .sortable(),
            ColumnConfig::new("experience_level", "Experience", ColumnType::String)
                .filter(FilterKind::Select),
            ColumnConfig::new("employment_type", "Employment", ColumnType::String),
            ColumnConfig::new("job_title", "Job Title", ColumnType::String)
                .filter_with_placeholder(FilterKind::Search, "e.g. Data Scientist")
                .sortable(),
            ColumnConfig::new("salary", "Salary", ColumnType::Number).hidden(),
            ColumnConfig::new("salary_currency", "Currency", ColumnType::String).hidden(),
            ColumnConfig::new("salary_in_usd", "Salary (USD)", ColumnType::Number)
                .filter(FilterKind::Range)
                .sortable(),
            ColumnConfig::new("employee_residence", "Residence", ColumnType::String),
            ColumnConfig::new("remote_ratio", "Remote %", ColumnType::Number),
            ColumnConfig::new("company_location", "Company Location", ColumnType::String)
                .sortable(),
            ColumnConfig::new("company_size", "Company Size", ColumnType::String)
                .filter(FilterKind::Select),
        ],
    )
    .description("Salaries for ML and data roles, one row per reported salary.")
    .with_analysis(AnalysisWidget::RowCount {
        label: "Rows".to_string(),
    })
    .with_analysis(AnalysisWidget::Mean {
        label: "Average salary (USD)".to_string(),
        field: "salary_in_usd".to_string(),
    })
    .with_analysis(AnalysisWidget::TopValues {
        label: "Top job titles".to_string(),
        field: "job_title".to_string(),
        limit: Some(5),
        labels: Default::default(),
    })
    .with_analysis(AnalysisWidget::TopValues {
        label: "Experience levels".to_string(),
        field: "experience_level".to_string(),
        limit: None,
        labels: Default::default(),
    })
    .with_analysis(AnalysisWidget::TopValues {
        label: "Work arrangement".to_string(),
        field: "remote_ratio".to_string(),
        limit: None,
        labels: [("0", "On-site"), ("50", "Hybrid"), ("100", "Fully Remote")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    })
    .with_analysis(AnalysisWidget::GroupMean {
        label: "Highest paying company locations".to_string(),
        group_field: "company_location".to_string(),
        value_field: "salary_in_usd".to_string(),
        limit: Some(5),
    })
}

fn state_populations() -> DatasetConfig {
    DatasetConfig::local(
        "state-pop-by-year",
        "State Populations by Year (Historical)",
        vec![
            ColumnConfig::new("state", "State", ColumnType::String)
                .filter(FilterKind::Select)
                .sortable(),
            ColumnConfig::new("year", "Year", ColumnType::Number)
                .filter(FilterKind::Select)
                .sortable(),
            ColumnConfig::new("population", "Population", ColumnType::Number)
                .filter(FilterKind::Range)
                .sortable(),
        ],
    )
    .description("Historical U.S. state populations.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let catalog = DatasetCatalog::builtin();
        assert_eq!(catalog.len(), 3);
        assert!(DatasetCatalog::new(catalog.iter().cloned().collect()).is_ok());
    }

    #[test]
    fn test_builtin_products_demo() {
        let catalog = DatasetCatalog::builtin();
        let products = catalog.get("products-demo").unwrap();
        assert!(products.is_api());
        let api = products.require_api().unwrap();
        assert_eq!(api.result_path.as_deref(), Some("items"));
        assert_eq!(api.param_for("name"), "search");
    }

    #[test]
    fn test_get_unknown_slug() {
        assert!(DatasetCatalog::builtin().get("nope").is_none());
        assert!(DatasetCatalog::empty().is_empty());
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let a = DatasetConfig::local("dup", "A", vec![]);
        let b = DatasetConfig::local("dup", "B", vec![]);
        let err = DatasetCatalog::new(vec![a, b]).unwrap_err();
        assert!(err.to_string().contains("dup"));
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let catalog = DatasetCatalog::from_json(
            r#"{
                "datasets": [{
                    "slug": "remote",
                    "title": "Remote",
                    "sourceType": "api",
                    "columns": [{"field": "id", "label": "ID", "type": "number"}],
                    "apiConfig": {"baseUrl": "https://example.com/rows"}
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.version, "1.0");
        let api = catalog.get("remote").unwrap().require_api().unwrap();
        assert_eq!(api.page_size_param, "pageSize");
    }

    #[test]
    fn test_from_json_rejects_api_without_config() {
        let err = DatasetCatalog::from_json(
            r#"{"datasets": [{"slug": "broken", "title": "Broken", "sourceType": "api"}]}"#,
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(DatasetCatalog::from_json("{not json").is_err());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let json = serde_json::to_string_pretty(&DatasetCatalog::builtin()).unwrap();
        std::fs::write(&path, json).unwrap();

        let loaded = DatasetCatalog::from_path(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(
            loaded.get("salary-2024").unwrap().analysis.len(),
            DatasetCatalog::builtin().get("salary-2024").unwrap().analysis.len()
        );
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = DatasetCatalog::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
