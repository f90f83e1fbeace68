//! Source column name -> destination column name.

use std::collections::BTreeMap;

use tablemerge_client::{RowValues, Schema};

/// Lowercase, drop `/`, `(` and `)`, collapse whitespace runs, trim.
pub fn normalize(name: &str) -> String {
    collapse(&name.to_lowercase().replace(['/', '(', ')'], ""))
}

/// Like [`normalize`], but `/`, `(` and `)` become word breaks, so
/// `"Email/Contact"` and `"Email Contact"` compare equal.
fn normalize_spaced(name: &str) -> String {
    collapse(&name.to_lowercase().replace(['/', '(', ')'], " "))
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn names_match(source: &str, destination: &str) -> bool {
    normalize(source) == normalize(destination)
        || normalize_spaced(source) == normalize_spaced(destination)
}

/// Destination name for one source column.
///
/// Priority: explicit mapping, exact destination name, normalized match
/// (first destination column in schema order), else the original name.
pub fn map_column<'a>(
    name: &'a str,
    destination: &'a Schema,
    mappings: &'a BTreeMap<String, String>,
) -> &'a str {
    if let Some(target) = mappings.get(name) {
        return target;
    }
    if destination.contains(name) {
        return name;
    }
    destination.names().find(|dest| names_match(name, dest)).unwrap_or(name)
}

/// Rename every cell of a row onto destination column names. When two source
/// columns land on the same destination column, the one whose source name
/// sorts last wins.
pub fn map_row(
    values: &RowValues,
    destination: &Schema,
    mappings: &BTreeMap<String, String>,
) -> RowValues {
    values
        .iter()
        .map(|(name, value)| (map_column(name, destination, mappings).to_string(), value.clone()))
        .collect()
}
