//! Client-side filtering for datasets fetched wholesale.
//!
//! When a dataset's full row set is already in memory, filter options,
//! predicates, and ordering are computed here instead of by a provider.
//! Predicates and ordering reuse the operator semantics of
//! [`crate::query`], so a row set filtered here comes out in the same order
//! a provider would return it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    config::{ColumnType, DatasetConfig, FilterKind},
    query::{
        sort_rows,
        value::{as_number, string_form},
        DatasetQueryFilter, DatasetResultRow, SortDirection, SortSpec, ValueKind,
    },
};

/// Parameter value meaning "no filter" for a select.
pub const ALL_VALUE: &str = "__all__";

/// Parameter naming the sort field on the client path.
pub const SORT_KEY_PARAM: &str = "sortKey";

/// Parameter naming the sort direction on the client path.
pub const SORT_DIR_PARAM: &str = "sortDir";

/// Distinct values of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacetValues {
    /// Numeric values, ascending.
    Numbers(Vec<f64>),
    /// Trimmed string values, case-insensitive order.
    Strings(Vec<String>),
}

impl FacetValues {
    /// Number of distinct values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numbers(v) => v.len(),
            Self::Strings(v) => v.len(),
        }
    }

    /// Returns true if no value was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Filter options of one filterable column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    /// Column field.
    pub field: String,
    /// Column label.
    pub label: String,
    /// Filter widget kind.
    pub kind: FilterKind,
    /// Distinct values found in the rows.
    pub values: FacetValues,
}

/// Collects the distinct values of a field.
///
/// Number columns collect values that coerce to numbers; every other
/// column collects trimmed string forms. Null, absent, and empty values are
/// skipped.
pub fn distinct_values(rows: &[DatasetResultRow], field: &str, column_type: ColumnType) -> FacetValues {
    if column_type == ColumnType::Number {
        let mut values: Vec<f64> = rows
            .iter()
            .filter_map(|r| r.get(field).as_deref().and_then(as_number))
            .collect();
        values.sort_by(f64::total_cmp);
        values.dedup_by(|a, b| a.total_cmp(b).is_eq());
        return FacetValues::Numbers(values);
    }

    let mut seen = HashSet::new();
    let mut values: Vec<String> = rows
        .iter()
        .filter_map(|r| r.get(field).as_deref().and_then(string_form))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect();
    values.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    FacetValues::Strings(values)
}

/// Computes the filter options of every filterable column of a dataset.
pub fn facets(config: &DatasetConfig, rows: &[DatasetResultRow]) -> Vec<Facet> {
    config
        .filter_facets()
        .map(|column| Facet {
            field: column.field.clone(),
            label: column.label.clone(),
            kind: column.filter_kind(),
            values: distinct_values(rows, &column.field, column.column_type),
        })
        .collect()
}

/// Keeps the rows satisfying every filter, preserving order.
pub fn apply_filters(rows: &[DatasetResultRow], filters: &[DatasetQueryFilter]) -> Vec<DatasetResultRow> {
    rows.iter()
        .filter(|row| filters.iter().all(|f| f.matches(row)))
        .cloned()
        .collect()
}

/// Active filters and ordering of the client path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientFilter {
    /// Equality filters, conjoined.
    pub filters: Vec<DatasetQueryFilter>,
    /// Optional ordering.
    pub sort: Option<SortSpec>,
}

impl ClientFilter {
    /// Parses raw parameters.
    ///
    /// Only keys listed in `filter_keys` become `eq` filters; an empty value
    /// or [`ALL_VALUE`] leaves that key unfiltered. `sortKey` selects the
    /// ordering field and `sortDir` its direction (ascending unless `desc`).
    pub fn from_params<I, K, V>(params: I, filter_keys: &[&str]) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filters = Vec::new();
        let mut sort_key = None;
        let mut direction = SortDirection::Asc;

        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            let active = !value.is_empty() && value != ALL_VALUE;
            match key {
                SORT_KEY_PARAM if active => sort_key = Some(value.to_string()),
                SORT_DIR_PARAM => direction = SortDirection::parse(value),
                _ if active && filter_keys.contains(&key) => {
                    filters.push(DatasetQueryFilter::eq(key, value));
                }
                _ => {}
            }
        }

        Self {
            filters,
            sort: sort_key.map(|field| SortSpec::new(field, direction)),
        }
    }

    /// Parses raw parameters using a dataset's `select` columns as filter keys.
    pub fn for_config<I, K, V>(config: &DatasetConfig, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let keys: Vec<&str> = config
            .filter_facets()
            .filter(|c| c.filter_kind() == FilterKind::Select)
            .map(|c| c.field.as_str())
            .collect();
        Self::from_params(params, &keys)
    }

    /// Returns true if neither filters nor ordering are active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.sort.is_none()
    }

    /// Filters then orders a row set.
    ///
    /// Field comparison kinds come from `config` when given; unconfigured
    /// fields compare automatically.
    pub fn apply(&self, rows: &[DatasetResultRow], config: Option<&DatasetConfig>) -> Vec<DatasetResultRow> {
        let mut selected = apply_filters(rows, &self.filters);
        if let Some(sort) = &self.sort {
            let kind = config.map_or(ValueKind::Auto, |c| c.value_kind(&sort.field));
            sort_rows(&mut selected, sort, kind);
        }
        selected
    }
}
