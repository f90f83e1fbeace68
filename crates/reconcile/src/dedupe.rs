use std::collections::HashMap;

use tablemerge_client::Row;

use crate::model::UNIQUE_KEY;

/// Rows left after duplicate resolution, and the rows to delete.
#[derive(Debug, Default)]
pub struct Deduped {
    pub kept: Vec<Row>,
    pub removed: Vec<Row>,
}

impl Deduped {
    pub fn removed_ids(&self) -> Vec<String> {
        self.removed.iter().filter_map(|r| r.id.clone()).collect()
    }
}

/// Keep the last row (in fetch order) for every `unique_key`; everything
/// earlier with the same key goes to `removed`. Rows without a key are kept.
pub fn resolve_duplicates(rows: Vec<Row>) -> Deduped {
    let mut last_index: HashMap<String, usize> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        if let Some(key) = row.key_value(UNIQUE_KEY) {
            last_index.insert(key, i);
        }
    }

    let mut out = Deduped::default();
    for (i, row) in rows.into_iter().enumerate() {
        match row.key_value(UNIQUE_KEY) {
            Some(key) if last_index.get(&key) != Some(&i) => out.removed.push(row),
            _ => out.kept.push(row),
        }
    }
    out
}
