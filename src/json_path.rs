//! Dot-separated path lookup into JSON documents.
//!
//! `resolve(doc, "data.items")` walks `doc["data"]["items"]`. Array segments
//! accept decimal indices (`"pages.0.rows"`). Any missing intermediate yields
//! `None` rather than an error; callers decide what absence means.

use serde_json::Value;

/// Resolves a dot-separated path. An empty path resolves to `root`.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }

    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Resolves an optional path; `None` means the whole document.
pub fn resolve_opt<'a>(root: &'a Value, path: Option<&str>) -> Option<&'a Value> {
    match path {
        Some(path) => resolve(root, path),
        None => Some(root),
    }
}
