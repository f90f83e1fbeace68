use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tablemerge_client::Row;

use crate::model::{MergePlan, ROW_HASH, UNIQUE_KEY};

/// Classify ingested source rows against the (deduplicated) destination rows.
///
/// Source rows without a usable `unique_key` are skipped. Every planned row
/// gets its content hash written to `row_hash`; updated rows take the
/// destination row's `id`.
pub fn diff(source_rows: Vec<Row>, destination: &[Row]) -> MergePlan {
    let existing: HashMap<String, &Row> = destination
        .iter()
        .filter_map(|row| row.key_value(UNIQUE_KEY).map(|key| (key, row)))
        .collect();

    let mut plan = MergePlan::default();
    let mut source_keys = HashSet::new();

    for mut row in source_rows {
        let Some(key) = row.key_value(UNIQUE_KEY) else {
            continue;
        };
        let hash = row.content_hash.clone().unwrap_or_default();
        row.values.insert(ROW_HASH.to_string(), Value::String(hash.clone()));

        match existing.get(&key) {
            None => plan.new_rows.push(row),
            Some(current) => {
                let stored = current.get(ROW_HASH).and_then(Value::as_str).unwrap_or_default();
                if stored != hash {
                    row.id = current.id.clone();
                    plan.updated_rows.push(row);
                }
            }
        }
        source_keys.insert(key);
    }

    let mut seen = HashSet::new();
    plan.orphaned = destination
        .iter()
        .filter(|row| match row.key_value(UNIQUE_KEY) {
            Some(key) => !source_keys.contains(&key) && seen.insert(key),
            None => false,
        })
        .cloned()
        .collect();

    plan
}
