#![allow(clippy::unwrap_used)]
//! Property-based tests for query evaluation
//!
//! Uses proptest to verify paging, filtering, and ordering invariants hold
//! across random row sets.

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use datalab::{
    query::{sort_rows, SortKey, ValueKind},
    DatasetQuery, DatasetQueryFilter, DatasetResultRow, RowSelection, SortDirection, SortSpec,
};

// ═══════════════════════════════════════════════════════════════════════════════
// STRATEGIES
// ═══════════════════════════════════════════════════════════════════════════════

/// A row with an optional numeric `score` and a short `name`.
fn row_strategy() -> impl Strategy<Value = (Option<i32>, String)> {
    (proptest::option::of(-500i32..500), "[a-d]{0,3}")
}

fn rows_strategy() -> impl Strategy<Value = Vec<DatasetResultRow>> {
    prop::collection::vec(row_strategy(), 0..40).prop_map(|specs| {
        specs
            .into_iter()
            .zip(1_i64..)
            .map(|((score, name), id)| {
                let mut data = Map::new();
                data.insert("name".to_string(), Value::String(name));
                if let Some(score) = score {
                    data.insert("score".to_string(), json!(score));
                }
                DatasetResultRow::new(id, data)
            })
            .collect()
    })
}

fn direction_strategy() -> impl Strategy<Value = SortDirection> {
    prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]
}

fn select(rows: &[DatasetResultRow], query: &DatasetQuery) -> (Vec<DatasetResultRow>, u64) {
    let everything = RowSelection {
        skip: 0,
        take: None,
        ..RowSelection::for_query(query, ValueKind::Numeric)
    };
    let total = everything.apply(rows).len() as u64;
    let page = RowSelection::for_query(query, ValueKind::Numeric).apply(rows);
    (page, total)
}

fn ids(rows: &[DatasetResultRow]) -> Vec<String> {
    rows.iter().map(|r| r.id.to_string()).collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY TESTS: Paging
// ═══════════════════════════════════════════════════════════════════════════════

proptest! {
    /// Property: Concatenating every page reproduces the full ordered result
    #[test]
    fn prop_pages_partition_result(
        rows in rows_strategy(),
        page_size in 1usize..8,
        direction in direction_strategy(),
    ) {
        let base = DatasetQuery::new(1, page_size)
            .unwrap()
            .with_filter(DatasetQueryFilter::gte("score", -250.0))
            .with_sort("score", direction);
        let (_, total) = select(&rows, &base);

        let mut collected = Vec::new();
        let pages = (total as usize).div_ceil(page_size) + 1;
        for page in 1..=pages {
            let query = DatasetQuery { page, ..base.clone() };
            let (rows_on_page, page_total) = select(&rows, &query);
            prop_assert_eq!(page_total, total);
            prop_assert!(rows_on_page.len() <= page_size);
            collected.extend(rows_on_page);
        }

        let full = RowSelection { skip: 0, take: None, ..RowSelection::for_query(&base, ValueKind::Numeric) }
            .apply(&rows);
        prop_assert_eq!(ids(&collected), ids(&full));
    }

    /// Property: A page past the end is empty but still reports the total
    #[test]
    fn prop_page_past_end_is_empty(rows in rows_strategy(), page_size in 1usize..8) {
        let first = DatasetQuery::new(1, page_size).unwrap();
        let (_, total) = select(&rows, &first);
        let past = DatasetQuery::new(total as usize / page_size + 2, page_size).unwrap();
        let (page, page_total) = select(&rows, &past);
        prop_assert!(page.is_empty());
        prop_assert_eq!(page_total, total);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY TESTS: Filters
// ═══════════════════════════════════════════════════════════════════════════════

proptest! {
    /// Property: A gte+lte pair selects exactly the rows inside both bounds
    #[test]
    fn prop_range_is_intersection(rows in rows_strategy(), a in -500i32..500, b in -500i32..500) {
        let (lo, hi) = (f64::from(a.min(b)), f64::from(a.max(b)));
        let ranged = DatasetQuery::default()
            .with_filter(DatasetQueryFilter::gte("score", lo))
            .with_filter(DatasetQueryFilter::lte("score", hi));
        let (selected, _) = select(&rows, &ranged);

        let expected: Vec<_> = rows
            .iter()
            .filter(|r| {
                r.data
                    .get("score")
                    .and_then(Value::as_f64)
                    .is_some_and(|s| s >= lo && s <= hi)
            })
            .cloned()
            .collect();
        prop_assert_eq!(ids(&selected), ids(&expected));
    }

    /// Property: Filter order does not change the result
    #[test]
    fn prop_filter_order_independent(rows in rows_strategy(), bound in -500i32..500, needle in "[a-d]{1}") {
        let range = DatasetQueryFilter::gte("score", f64::from(bound));
        let text = DatasetQueryFilter::contains("name", needle);

        let forward = DatasetQuery::default().with_filter(range.clone()).with_filter(text.clone());
        let backward = DatasetQuery::default().with_filter(text).with_filter(range);
        prop_assert_eq!(ids(&select(&rows, &forward).0), ids(&select(&rows, &backward).0));
    }

    /// Property: Repeating a filter changes nothing
    #[test]
    fn prop_filter_idempotent(rows in rows_strategy(), needle in "[a-d]{1,2}") {
        let once = DatasetQuery::default().with_filter(DatasetQueryFilter::contains("name", needle.clone()));
        let twice = once.clone().with_filter(DatasetQueryFilter::contains("name", needle));
        prop_assert_eq!(select(&rows, &once), select(&rows, &twice));
    }

    /// Property: Contains is case-insensitive
    #[test]
    fn prop_contains_ignores_case(rows in rows_strategy(), needle in "[a-d]{1,2}") {
        let lower = DatasetQuery::default().with_filter(DatasetQueryFilter::contains("name", needle.clone()));
        let upper = DatasetQuery::default().with_filter(DatasetQueryFilter::contains("name", needle.to_uppercase()));
        prop_assert_eq!(ids(&select(&rows, &lower).0), ids(&select(&rows, &upper).0));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY TESTS: Ordering
// ═══════════════════════════════════════════════════════════════════════════════

proptest! {
    /// Property: Ascending puts missing values last, descending puts them first
    #[test]
    fn prop_missing_values_placement(mut rows in rows_strategy(), direction in direction_strategy()) {
        sort_rows(&mut rows, &SortSpec::new("score", direction), ValueKind::Numeric);
        let missing: Vec<bool> = rows.iter().map(|r| !r.data.contains_key("score")).collect();
        let boundary = missing.iter().position(|m| *m != missing.first().copied().unwrap_or(false));

        // missing values form one contiguous block at the expected end
        if let Some(boundary) = boundary {
            prop_assert!(missing[boundary..].iter().all(|m| *m == missing[boundary]));
            match direction {
                SortDirection::Asc => prop_assert!(missing[boundary]),
                SortDirection::Desc => prop_assert!(!missing[boundary]),
            }
        }
    }

    /// Property: Sorted keys are monotonic in the requested direction
    #[test]
    fn prop_sort_is_monotonic(mut rows in rows_strategy(), direction in direction_strategy()) {
        sort_rows(&mut rows, &SortSpec::new("score", direction), ValueKind::Numeric);
        let keys: Vec<SortKey> = rows
            .iter()
            .map(|r| SortKey::from_value(r.get("score").as_deref(), ValueKind::Numeric))
            .collect();
        for pair in keys.windows(2) {
            prop_assert_ne!(
                pair[0].cmp_directed(&pair[1], direction),
                std::cmp::Ordering::Greater
            );
        }
    }

    /// Property: Rows with equal keys keep their insertion order
    #[test]
    fn prop_sort_is_stable(mut rows in rows_strategy(), direction in direction_strategy()) {
        sort_rows(&mut rows, &SortSpec::new("name", direction), ValueKind::Text);
        for pair in rows.windows(2) {
            if pair[0].data["name"] == pair[1].data["name"] {
                prop_assert!(pair[0].id.to_string().parse::<i64>().unwrap()
                    < pair[1].id.to_string().parse::<i64>().unwrap());
            }
        }
    }
}
