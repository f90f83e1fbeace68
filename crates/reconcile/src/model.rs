use std::fmt;

use serde::{Deserialize, Serialize};
use tablemerge_client::Row;

// ---------------------------------------------------------------------------
// Reserved columns
// ---------------------------------------------------------------------------

/// Cross-table identity of a merged row.
pub const UNIQUE_KEY: &str = "unique_key";
/// Content hash stored alongside each merged row.
pub const ROW_HASH: &str = "row_hash";
/// Source label injected into every merged row.
pub const PROJECT: &str = "Project";

/// Columns the engine writes and creates in the destination when missing.
pub const RESERVED_COLUMNS: [&str; 3] = [UNIQUE_KEY, ROW_HASH, PROJECT];

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Stage of a merge run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "stage", content = "source")]
pub enum MergeStage {
    Verifying,
    Aligning,
    DuplicateResolving,
    /// 1-based position of the source in the configuration.
    Ingesting(usize),
    /// Local computation only; no error is ever raised here. Kept so every
    /// stage of a run has a name.
    Diffing,
    Applying,
}

impl fmt::Display for MergeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verifying => write!(f, "access verification"),
            Self::Aligning => write!(f, "schema alignment"),
            Self::DuplicateResolving => write!(f, "duplicate resolution"),
            Self::Ingesting(i) => write!(f, "ingesting source {i}"),
            Self::Diffing => write!(f, "diffing"),
            Self::Applying => write!(f, "applying changes"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Compute the plan but issue no remote mutation.
    pub dry_run: bool,
}

// ---------------------------------------------------------------------------
// Plan + result
// ---------------------------------------------------------------------------

/// Writes a run has to issue against the destination.
#[derive(Debug, Clone, Default)]
pub struct MergePlan {
    /// Keys absent from the destination.
    pub new_rows: Vec<Row>,
    /// Keys present with a different stored hash. `id` is the destination row's id.
    pub updated_rows: Vec<Row>,
    /// Destination rows whose key no source produced.
    pub orphaned: Vec<Row>,
}

impl MergePlan {
    /// New rows followed by updated rows, in upsert order.
    pub fn upserts(&self) -> Vec<Row> {
        self.new_rows.iter().chain(&self.updated_rows).cloned().collect()
    }

    pub fn orphan_ids(&self) -> Vec<String> {
        self.orphaned.iter().filter_map(|r| r.id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.new_rows.is_empty() && self.updated_rows.is_empty() && self.orphaned.is_empty()
    }
}

/// Summary of one merge run. Field names are the service's public JSON contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub success: bool,
    /// Source rows ingested, including rows without a usable key.
    pub total_rows_processed: usize,
    pub new_rows: usize,
    pub updated_rows: usize,
    /// Orphaned rows deleted (or, in a dry run, that would be).
    pub deleted_rows: usize,
    pub destination_table_id: String,
    /// Destination duplicates removed before diffing.
    #[serde(default)]
    pub duplicates_removed: usize,
    #[serde(default)]
    pub dry_run: bool,
    /// RFC 3339 completion time.
    pub run_at: String,
}
