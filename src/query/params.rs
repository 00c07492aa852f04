//! Parsing of raw request parameters into a [`DatasetQuery`].
//!
//! One naming convention, shared by every front end:
//!
//! | parameter          | filter                    |
//! |--------------------|---------------------------|
//! | `<field>_min`      | `gte` on `<field>`        |
//! | `<field>_max`      | `lte` on `<field>`        |
//! | `<field>_contains` | `contains` on `<field>`   |
//! | anything else      | `eq` on the parameter name |
//!
//! `page`, `pageSize`, `sortField` and `sortDir` are control parameters and
//! never become filters.

use super::{DatasetQuery, DatasetQueryFilter, FilterOp, FilterValue, SortDirection, SortSpec};
use crate::error::{Error, Result};

/// Control parameter names that are never treated as filters.
pub const RESERVED_PARAMS: [&str; 4] = ["page", "pageSize", "sortField", "sortDir"];

/// Page size used when the request does not carry one.
pub const DEFAULT_PAGE_SIZE: usize = 50;

const SUFFIXES: [(&str, FilterOp); 3] = [
    ("_min", FilterOp::Gte),
    ("_max", FilterOp::Lte),
    ("_contains", FilterOp::Contains),
];

impl DatasetQuery {
    /// Builds a query from raw `(name, value)` parameters.
    ///
    /// Repeated parameters produce repeated filters, all of which must hold.
    ///
    /// # Errors
    ///
    /// Returns a parse error if `page`/`pageSize` are not positive integers,
    /// if a range bound is not numeric, or if a suffixed parameter has no
    /// field name.
    pub fn from_params<I, K, V>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut page = None;
        let mut page_size = None;
        let mut sort_field = None;
        let mut sort_dir = None;
        let mut filters = Vec::new();

        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "page" => page = Some(parse_positive("page", value)?),
                "pageSize" => page_size = Some(parse_positive("pageSize", value)?),
                "sortField" => sort_field = Some(value.to_string()),
                "sortDir" => sort_dir = Some(value.to_string()),
                _ => filters.push(parse_filter(key, value)?),
            }
        }

        let mut query = Self::new(page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE))?;
        query.filters = filters;
        query.sort = match (sort_field, sort_dir) {
            (Some(field), Some(dir)) if !field.is_empty() && !dir.is_empty() => {
                Some(SortSpec::new(field, SortDirection::parse(&dir)))
            }
            _ => None,
        };
        Ok(query)
    }

    /// Builds a query from a URL-encoded query string (without the `?`).
    ///
    /// # Errors
    ///
    /// See [`DatasetQuery::from_params`].
    pub fn from_query_string(query: &str) -> Result<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_params(url::form_urlencoded::parse(query.as_bytes()))
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(Error::parse(format!(
            "{name} must be a positive integer, got '{raw}'"
        ))),
    }
}

fn parse_filter(key: &str, raw: &str) -> Result<DatasetQueryFilter> {
    for (suffix, op) in SUFFIXES {
        let Some(field) = key.strip_suffix(suffix) else {
            continue;
        };
        if field.is_empty() {
            return Err(Error::parse(format!(
                "filter parameter '{key}' has no field name"
            )));
        }
        let value = match op {
            FilterOp::Gte | FilterOp::Lte => {
                let n = super::value::parse_number(raw).ok_or_else(|| {
                    Error::parse(format!("range bound '{key}' must be numeric, got '{raw}'"))
                })?;
                FilterValue::Number(n)
            }
            _ => FilterValue::Text(raw.to_string()),
        };
        return Ok(DatasetQueryFilter::new(field, op, value));
    }

    Ok(DatasetQueryFilter::eq(key, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_params() {
        let q = DatasetQuery::from_params(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, DEFAULT_PAGE_SIZE);
        assert!(q.filters.is_empty());
        assert!(q.sort.is_none());
    }

    #[test]
    fn test_suffix_convention() {
        let q = DatasetQuery::from_query_string(
            "price_min=10&price_max=20&name_contains=Lamp&category=books",
        )
        .unwrap();

        assert_eq!(
            q.filters,
            vec![
                DatasetQueryFilter::gte("price", 10.0),
                DatasetQueryFilter::lte("price", 20.0),
                DatasetQueryFilter::contains("name", "Lamp"),
                DatasetQueryFilter::eq("category", "books"),
            ]
        );
    }

    #[test]
    fn test_reserved_params_are_not_filters() {
        let q = DatasetQuery::from_query_string("page=3&pageSize=25&sortField=price&sortDir=desc")
            .unwrap();
        assert!(q.filters.is_empty());
        assert_eq!(q.page, 3);
        assert_eq!(q.page_size, 25);
        assert_eq!(q.sort, Some(SortSpec::new("price", SortDirection::Desc)));
    }

    #[test]
    fn test_sort_requires_field_and_direction() {
        let q = DatasetQuery::from_query_string("sortField=price").unwrap();
        assert!(q.sort.is_none());

        let q = DatasetQuery::from_query_string("sortField=price&sortDir=sideways").unwrap();
        assert_eq!(q.sort, Some(SortSpec::new("price", SortDirection::Asc)));
    }

    #[test]
    fn test_invalid_page() {
        assert!(DatasetQuery::from_query_string("page=0").is_err());
        assert!(DatasetQuery::from_query_string("page=abc").is_err());
        assert!(DatasetQuery::from_query_string("pageSize=-5").is_err());
    }

    #[test]
    fn test_non_numeric_range_bound() {
        let err = DatasetQuery::from_query_string("price_min=cheap").unwrap_err();
        assert!(err.to_string().contains("price_min"));
    }

    #[test]
    fn test_suffix_without_field() {
        assert!(DatasetQuery::from_query_string("_min=3").is_err());
    }

    #[test]
    fn test_url_decoding_and_leading_question_mark() {
        let q = DatasetQuery::from_query_string("?job_title_contains=data%20scientist").unwrap();
        assert_eq!(
            q.filters,
            vec![DatasetQueryFilter::contains("job_title", "data scientist")]
        );
    }

    #[test]
    fn test_repeated_params_conjoin() {
        let q = DatasetQuery::from_params([("year", "2023"), ("year", "2024")]).unwrap();
        assert_eq!(q.filters.len(), 2);
    }

    #[test]
    fn test_field_with_inner_suffix_text() {
        // only a trailing suffix is significant
        let q = DatasetQuery::from_query_string("min_wage=7").unwrap();
        assert_eq!(q.filters, vec![DatasetQueryFilter::eq("min_wage", "7")]);
    }
}
