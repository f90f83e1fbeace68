//! Turning fetched source rows into destination-shaped rows.

use std::collections::BTreeMap;

use serde_json::Value;
use tablemerge_client::{Row, Schema};

use crate::config::SourceTable;
use crate::hash::content_hash;
use crate::mapping::map_row;
use crate::model::{PROJECT, ROW_HASH, UNIQUE_KEY};

/// Map, stamp, hash and filter the rows of one source.
///
/// `position` is the 1-based index of `source` in the configuration. The hash
/// is taken after `Project`/`unique_key` are stamped and before columns
/// unknown to the destination are dropped. Ingested rows carry no `id`: the
/// source row id only survives inside a synthesized `unique_key`.
pub fn ingest_rows(
    rows: Vec<Row>,
    source: &SourceTable,
    position: usize,
    destination: &Schema,
    mappings: &BTreeMap<String, String>,
) -> Vec<Row> {
    let source_id = source.source_id();
    let project = source.project_label(position);

    rows.into_iter()
        .map(|row| {
            let mut values = map_row(&row.values, destination, mappings);
            values.insert(PROJECT.to_string(), Value::String(project.clone()));
            if !values.contains_key(UNIQUE_KEY) {
                let row_id = row.id.as_deref().unwrap_or_default();
                values.insert(UNIQUE_KEY.to_string(), Value::String(format!("{source_id}_{row_id}")));
            }

            let hash = content_hash(&values);
            values.retain(|name, _| {
                destination.contains(name) || name == UNIQUE_KEY || name == ROW_HASH
            });

            Row {
                id: None,
                values,
                source_id: Some(source_id.clone()),
                content_hash: Some(hash),
            }
        })
        .collect()
}
