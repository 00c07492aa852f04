//! Operator semantics over schema-less JSON values.
//!
//! Row values are checked at the point of use: a value that cannot be read
//! as a number simply fails numeric predicates and sorts after numbers.

use std::cmp::Ordering;

use serde_json::Value;

use super::{DatasetResultRow, FilterOp, FilterValue, SortDirection, SortSpec};

/// How a field's values should be compared when ordering rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    /// Numbers (and numeric strings) numerically, everything else as text.
    #[default]
    Auto,
    /// Numerically; values that do not coerce are treated as missing.
    Numeric,
    /// Case-insensitive text comparison of the string form.
    Text,
}

/// Parses a trimmed, finite number.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Formats a number without a trailing `.0` for integral values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

/// Coerces a row value to a number: JSON numbers and numeric strings.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// String form of a row value; `None` for null.
pub fn string_form(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(u)) => u.to_string(),
            _ => n.as_f64().map(format_number).unwrap_or_default(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Evaluates one operator against a (possibly absent) row value.
///
/// Absent and null values never match.
pub fn matches(op: FilterOp, value: Option<&Value>, operand: &FilterValue) -> bool {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return false;
    };

    match op {
        FilterOp::Eq => equals(value, operand),
        FilterOp::Contains => match string_form(value) {
            Some(s) => s
                .to_lowercase()
                .contains(&operand.to_string().to_lowercase()),
            None => false,
        },
        FilterOp::Gte => match (as_number(value), operand.as_number()) {
            (Some(v), Some(bound)) => v >= bound,
            _ => false,
        },
        FilterOp::Lte => match (as_number(value), operand.as_number()) {
            (Some(v), Some(bound)) => v <= bound,
            _ => false,
        },
    }
}

#[allow(clippy::float_cmp)]
fn equals(value: &Value, operand: &FilterValue) -> bool {
    let numeric = value.is_number() || matches!(operand, FilterValue::Number(_));
    if numeric {
        if let (Some(a), Some(b)) = (as_number(value), operand.as_number()) {
            return a == b;
        }
    }
    string_form(value).is_some_and(|s| s == operand.to_string())
}

/// A precomputed ordering key for one row value.
///
/// Ascending order is numbers, then text, then missing values, which gives
/// a total order even over mixed columns.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    /// Numeric value.
    Number(f64),
    /// Text value, folded for case-insensitive comparison.
    Text {
        /// Lowercased form used for the primary comparison.
        folded: String,
        /// Original form used to break ties.
        raw: String,
    },
    /// Null or absent.
    Missing,
}

impl SortKey {
    /// Builds the key for a value under the given comparison kind.
    pub fn from_value(value: Option<&Value>, kind: ValueKind) -> Self {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Self::Missing;
        };

        match kind {
            ValueKind::Numeric => as_number(value).map_or(Self::Missing, Self::Number),
            ValueKind::Text => Self::text(value),
            ValueKind::Auto => match as_number(value) {
                Some(n) => Self::Number(n),
                None => Self::text(value),
            },
        }
    }

    fn text(value: &Value) -> Self {
        let raw = string_form(value).unwrap_or_default();
        Self::Text {
            folded: raw.to_lowercase(),
            raw,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Text { .. } => 1,
            Self::Missing => 2,
        }
    }

    /// Compares two keys in ascending order.
    pub fn cmp_asc(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (
                Self::Text { folded: fa, raw: ra },
                Self::Text { folded: fb, raw: rb },
            ) => fa.cmp(fb).then_with(|| ra.cmp(rb)),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Compares two keys in the given direction.
    ///
    /// Descending is the exact reverse of ascending, so missing values come
    /// first.
    pub fn cmp_directed(&self, other: &Self, direction: SortDirection) -> Ordering {
        match direction {
            SortDirection::Asc => self.cmp_asc(other),
            SortDirection::Desc => self.cmp_asc(other).reverse(),
        }
    }
}

/// Sorts rows in place by one field. The sort is stable.
pub fn sort_rows(rows: &mut Vec<DatasetResultRow>, sort: &SortSpec, kind: ValueKind) {
    let mut keyed: Vec<(SortKey, DatasetResultRow)> = rows
        .drain(..)
        .map(|row| (SortKey::from_value(row.get(&sort.field).as_deref(), kind), row))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| a.cmp_directed(b, sort.direction));
    rows.extend(keyed.into_iter().map(|(_, row)| row));
}
