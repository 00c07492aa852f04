//! Backend-independent query contract.
//!
//! A [`DatasetQuery`] carries conjoined filters, an optional sort, and a
//! 1-based page window. Every provider answers it with a [`DatasetResult`]
//! whose `total` counts all matching rows across pages.
//!
//! Operator semantics live in [`value`] so that providers, row stores, and
//! the client-side derived path all evaluate filters and orderings the same
//! way.

mod params;
pub mod value;

use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use params::{DEFAULT_PAGE_SIZE, RESERVED_PARAMS};
pub use value::{sort_rows, SortKey, ValueKind};

use crate::error::{Error, Result};

/// Comparison operator of a single filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    /// Value equality (case-sensitive for strings, exact for numbers).
    Eq,
    /// Case-insensitive substring match on the string form.
    Contains,
    /// Numeric greater-than-or-equal.
    Gte,
    /// Numeric less-than-or-equal.
    Lte,
}

impl FilterOp {
    /// Returns the lowercase operator name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Contains => "contains",
            Self::Gte => "gte",
            Self::Lte => "lte",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped filter operand: a string or a number depending on the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Numeric operand.
    Number(f64),
    /// Textual operand.
    Text(String),
}

impl FilterValue {
    /// Coerces the operand to a finite number, if possible.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n).filter(|n| n.is_finite()),
            Self::Text(s) => value::parse_number(s),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(&value::format_number(*n)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FilterValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

/// A single field/operator/value predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetQueryFilter {
    /// Key into a row's data.
    pub field: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Operand.
    pub value: FilterValue,
}

impl DatasetQueryFilter {
    /// Creates a filter from its parts.
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Creates an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Creates a substring filter.
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Contains, FilterValue::Text(value.into()))
    }

    /// Creates a lower-bound filter.
    pub fn gte(field: impl Into<String>, value: f64) -> Self {
        Self::new(field, FilterOp::Gte, value)
    }

    /// Creates an upper-bound filter.
    pub fn lte(field: impl Into<String>, value: f64) -> Self {
        Self::new(field, FilterOp::Lte, value)
    }

    /// Evaluates the filter against one row.
    pub fn matches(&self, row: &DatasetResultRow) -> bool {
        value::matches(self.op, row.get(&self.field).as_deref(), &self.value)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first, missing values last.
    #[default]
    Asc,
    /// Largest first, missing values first.
    Desc,
}

impl SortDirection {
    /// Parses a raw direction; only `desc` selects descending order.
    pub fn parse(raw: &str) -> Self {
        if raw == "desc" {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    /// Returns the lowercase direction name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering requested by a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to order by.
    pub field: String,
    /// Direction of the ordering.
    pub direction: SortDirection,
}

impl SortSpec {
    /// Creates a sort specification.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// An abstract, backend-independent dataset query.
///
/// All filters conjoin; their order does not affect the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetQuery {
    /// Conjoined filters.
    #[serde(default)]
    pub filters: Vec<DatasetQueryFilter>,
    /// Optional ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    /// 1-based page number.
    pub page: usize,
    /// Maximum number of rows per page.
    pub page_size: usize,
}

impl DatasetQuery {
    /// Creates an unfiltered, unsorted query for one page.
    ///
    /// # Errors
    ///
    /// Returns an error if `page` or `page_size` is zero.
    pub fn new(page: usize, page_size: usize) -> Result<Self> {
        if page == 0 {
            return Err(Error::parse("page must be >= 1"));
        }
        if page_size == 0 {
            return Err(Error::parse("pageSize must be >= 1"));
        }
        Ok(Self {
            filters: Vec::new(),
            sort: None,
            page,
            page_size,
        })
    }

    /// Adds a filter.
    #[must_use]
    pub fn with_filter(mut self, filter: DatasetQueryFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(SortSpec::new(field, direction));
        self
    }

    /// Number of rows preceding the requested page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Returns true if the row satisfies every filter.
    pub fn matches(&self, row: &DatasetResultRow) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }
}

impl Default for DatasetQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Identifier of a row, unique within one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    /// Integer id (local store ids, most APIs).
    Int(i64),
    /// Opaque string id.
    Text(String),
}

impl RowId {
    /// Derives an id from a JSON value; null yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Int(i)),
                None => Some(Self::Text(n.to_string())),
            },
            Value::String(s) => Some(Self::Text(s.clone())),
            other => Some(Self::Text(other.to_string())),
        }
    }

    /// Converts the id into a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::from(*i),
            Self::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One row of a result: an id plus an open key/value map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetResultRow {
    /// Row identifier.
    pub id: RowId,
    /// Row fields.
    pub data: Map<String, Value>,
}

impl DatasetResultRow {
    /// Creates a row.
    pub fn new(id: impl Into<RowId>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Looks up a field; `id` falls back to the row id when the data map does
    /// not carry it.
    pub fn get(&self, field: &str) -> Option<Cow<'_, Value>> {
        match self.data.get(field) {
            Some(v) => Some(Cow::Borrowed(v)),
            None if field == "id" => Some(Cow::Owned(self.id.to_value())),
            None => None,
        }
    }
}

/// A page of rows plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetResult {
    /// Rows of the requested page, in order.
    pub rows: Vec<DatasetResultRow>,
    /// Count of matching rows across all pages.
    pub total: u64,
}

impl DatasetResult {
    /// Creates a result.
    pub fn new(rows: Vec<DatasetResultRow>, total: u64) -> Self {
        Self { rows, total }
    }
}
