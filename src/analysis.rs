//! Configuration-driven summaries over an in-memory row set.
//!
//! A dataset declares a list of [`AnalysisWidget`]s; [`run`] evaluates them
//! against whatever rows are currently in view (typically after client-side
//! filtering) and returns one [`AnalysisResult`] per widget, in order.
//!
//! # Example
//!
//! ```
//! use datalab::analysis::{run, AnalysisValue, AnalysisWidget};
//! use datalab::query::DatasetResultRow;
//! use serde_json::json;
//!
//! let rows: Vec<DatasetResultRow> = [json!({"salary": 100}), json!({"salary": 200})]
//!     .into_iter()
//!     .zip(1_i64..)
//!     .map(|(v, id)| DatasetResultRow::new(id, v.as_object().cloned().unwrap_or_default()))
//!     .collect();
//!
//! let widgets = [AnalysisWidget::Mean {
//!     label: "Average".to_string(),
//!     field: "salary".to_string(),
//! }];
//! let results = run(&widgets, &rows);
//! assert_eq!(results[0].value, AnalysisValue::Number(Some(150.0)));
//! ```

#![allow(clippy::cast_precision_loss)]

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::query::{
    value::{as_number, string_form},
    DatasetResultRow,
};

/// One declarative summary computed over a row set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnalysisWidget {
    /// Number of rows in view.
    RowCount {
        /// Display label.
        label: String,
    },
    /// Arithmetic mean of a numeric field, rounded to two decimals.
    Mean {
        /// Display label.
        label: String,
        /// Field to average.
        field: String,
    },
    /// Most frequent values of a field, by descending count.
    #[serde(rename_all = "camelCase")]
    TopValues {
        /// Display label.
        label: String,
        /// Field to count.
        field: String,
        /// Maximum number of entries (all when absent).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
        /// Display names for raw values.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        labels: BTreeMap<String, String>,
    },
    /// Mean of one field per distinct value of another, highest mean first.
    #[serde(rename_all = "camelCase")]
    GroupMean {
        /// Display label.
        label: String,
        /// Field whose values form the groups.
        group_field: String,
        /// Numeric field averaged within each group.
        value_field: String,
        /// Maximum number of groups (all when absent).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
}

impl AnalysisWidget {
    /// Display label of the widget.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::RowCount { label }
            | Self::Mean { label, .. }
            | Self::TopValues { label, .. }
            | Self::GroupMean { label, .. } => label,
        }
    }

    /// Evaluates the widget over a row set.
    #[must_use]
    pub fn evaluate(&self, rows: &[DatasetResultRow]) -> AnalysisValue {
        match self {
            Self::RowCount { .. } => AnalysisValue::Count(rows.len() as u64),
            Self::Mean { field, .. } => {
                let values = rows.iter().filter_map(|r| numeric(r, field));
                AnalysisValue::Number(mean(values).map(round2))
            }
            Self::TopValues {
                field,
                limit,
                labels,
                ..
            } => {
                let mut groups = Groups::default();
                for row in rows {
                    if let Some(key) = group_key(row, field) {
                        let key = labels.get(&key).cloned().unwrap_or(key);
                        groups.add(key, None);
                    }
                }
                AnalysisValue::Ranking(groups.into_ranking(*limit, false))
            }
            Self::GroupMean {
                group_field,
                value_field,
                limit,
                ..
            } => {
                let mut groups = Groups::default();
                for row in rows {
                    if let (Some(key), Some(v)) = (group_key(row, group_field), numeric(row, value_field)) {
                        groups.add(key, Some(v));
                    }
                }
                AnalysisValue::Ranking(groups.into_ranking(*limit, true))
            }
        }
    }
}

/// Output of one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisValue {
    /// A row count.
    Count(u64),
    /// A single number; `None` when no row carried a numeric value.
    Number(Option<f64>),
    /// Ordered entries of a breakdown.
    Ranking(Vec<RankEntry>),
}

/// One entry of a breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    /// Group value (or its display label).
    pub key: String,
    /// Number of rows in the group.
    pub count: u64,
    /// Group mean, for mean breakdowns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
}

/// Labelled output of one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Widget label.
    pub label: String,
    /// Computed value.
    pub value: AnalysisValue,
}

/// Evaluates every widget, preserving declaration order.
#[must_use]
pub fn run(widgets: &[AnalysisWidget], rows: &[DatasetResultRow]) -> Vec<AnalysisResult> {
    widgets
        .iter()
        .map(|w| AnalysisResult {
            label: w.label().to_string(),
            value: w.evaluate(rows),
        })
        .collect()
}

fn numeric(row: &DatasetResultRow, field: &str) -> Option<f64> {
    row.get(field).as_deref().and_then(as_number)
}

fn group_key(row: &DatasetResultRow, field: &str) -> Option<String> {
    let key = row.get(field).as_deref().and_then(string_form)?;
    let key = key.trim();
    (!key.is_empty()).then(|| key.to_string())
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Per-key accumulators kept in first-seen order so that ties rank stably.
#[derive(Default)]
struct Groups {
    index: HashMap<String, usize>,
    entries: Vec<(String, u64, f64)>,
}

impl Groups {
    fn add(&mut self, key: String, value: Option<f64>) {
        let slot = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, 0, 0.0));
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[slot];
        entry.1 += 1;
        entry.2 += value.unwrap_or(0.0);
    }

    fn into_ranking(self, limit: Option<usize>, by_mean: bool) -> Vec<RankEntry> {
        let mut ranking: Vec<RankEntry> = self
            .entries
            .into_iter()
            .map(|(key, count, sum)| RankEntry {
                key,
                count,
                mean: by_mean.then(|| round2(sum / count as f64)),
            })
            .collect();

        if by_mean {
            ranking.sort_by(|a, b| {
                b.mean
                    .unwrap_or(f64::NEG_INFINITY)
                    .total_cmp(&a.mean.unwrap_or(f64::NEG_INFINITY))
            });
        } else {
            ranking.sort_by(|a, b| b.count.cmp(&a.count));
        }
        ranking.truncate(limit.unwrap_or(usize::MAX));
        ranking
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn rows(values: Vec<Value>) -> Vec<DatasetResultRow> {
        values
            .into_iter()
            .zip(1_i64..)
            .map(|(v, id)| match v {
                Value::Object(m) => DatasetResultRow::new(id, m),
                other => panic!("expected object, got {other}"),
            })
            .collect()
    }

    fn salaries() -> Vec<DatasetResultRow> {
        rows(vec![
            json!({"job_title": "Data Scientist", "salary_in_usd": 100_000, "remote_ratio": 0, "company_location": "US"}),
            json!({"job_title": "ML Engineer", "salary_in_usd": 150_000, "remote_ratio": 100, "company_location": "US"}),
            json!({"job_title": "Data Scientist", "salary_in_usd": 90_000, "remote_ratio": 50, "company_location": "DE"}),
            json!({"job_title": "Data Scientist", "salary_in_usd": "n/a", "remote_ratio": 100, "company_location": "GB"}),
            json!({"job_title": "", "remote_ratio": 25}),
        ])
    }

    #[test]
    fn test_row_count() {
        let w = AnalysisWidget::RowCount {
            label: "Rows".to_string(),
        };
        assert_eq!(w.evaluate(&salaries()), AnalysisValue::Count(5));
        assert_eq!(w.evaluate(&[]), AnalysisValue::Count(0));
    }

    #[test]
    fn test_mean_skips_non_numeric_and_rounds() {
        let w = AnalysisWidget::Mean {
            label: "Avg".to_string(),
            field: "salary_in_usd".to_string(),
        };
        assert_eq!(w.evaluate(&salaries()), AnalysisValue::Number(Some(113_333.33)));
        assert_eq!(w.evaluate(&[]), AnalysisValue::Number(None));
    }

    #[test]
    fn test_top_values_orders_by_count_and_limits() {
        let w = AnalysisWidget::TopValues {
            label: "Titles".to_string(),
            field: "job_title".to_string(),
            limit: Some(1),
            labels: BTreeMap::new(),
        };
        let AnalysisValue::Ranking(ranking) = w.evaluate(&salaries()) else {
            panic!("expected ranking");
        };
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].key, "Data Scientist");
        assert_eq!(ranking[0].count, 3);
        assert!(ranking[0].mean.is_none());
    }

    #[test]
    fn test_top_values_applies_labels() {
        let w = AnalysisWidget::TopValues {
            label: "Remote".to_string(),
            field: "remote_ratio".to_string(),
            limit: None,
            labels: [("0", "On-site"), ("50", "Hybrid"), ("100", "Fully Remote")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        let AnalysisValue::Ranking(ranking) = w.evaluate(&salaries()) else {
            panic!("expected ranking");
        };
        let keys: Vec<_> = ranking.iter().map(|e| e.key.as_str()).collect();
        // unlabelled values keep their raw form; ties keep first-seen order
        assert_eq!(keys, vec!["Fully Remote", "On-site", "Hybrid", "25"]);
    }

    #[test]
    fn test_group_mean_orders_by_mean() {
        let w = AnalysisWidget::GroupMean {
            label: "Locations".to_string(),
            group_field: "company_location".to_string(),
            value_field: "salary_in_usd".to_string(),
            limit: Some(5),
        };
        let AnalysisValue::Ranking(ranking) = w.evaluate(&salaries()) else {
            panic!("expected ranking");
        };
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].key, "US");
        assert_eq!(ranking[0].count, 2);
        assert_eq!(ranking[0].mean, Some(125_000.0));
        assert_eq!(ranking[1].key, "DE");
    }

    #[test]
    fn test_run_preserves_order_and_labels() {
        let widgets = vec![
            AnalysisWidget::RowCount {
                label: "Rows".to_string(),
            },
            AnalysisWidget::Mean {
                label: "Avg".to_string(),
                field: "missing".to_string(),
            },
        ];
        let results = run(&widgets, &salaries());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].label, "Rows");
        assert_eq!(results[1].value, AnalysisValue::Number(None));
    }

    #[test]
    fn test_widget_serde_shape() {
        let w: AnalysisWidget = serde_json::from_value(json!({
            "kind": "groupMean",
            "label": "By country",
            "groupField": "company_location",
            "valueField": "salary_in_usd"
        }))
        .unwrap();
        assert_eq!(
            w,
            AnalysisWidget::GroupMean {
                label: "By country".to_string(),
                group_field: "company_location".to_string(),
                value_field: "salary_in_usd".to_string(),
                limit: None,
            }
        );
        let json = serde_json::to_value(AnalysisWidget::RowCount {
            label: "Rows".to_string(),
        })
        .unwrap();
        assert_eq!(json, json!({"kind": "rowCount", "label": "Rows"}));
    }
}
