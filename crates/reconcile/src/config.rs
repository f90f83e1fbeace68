use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tablemerge_client::ClientSettings;

use crate::error::MergeError;

/// Environment variable holding a JSON-encoded [`MergeConfig`].
pub const MERGE_TABLE_CONFIG_ENV: &str = "MERGE_TABLE_CONFIG";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// What to merge, and where to.
///
/// ```toml
/// destination_doc_id = "AbCdEf"
/// destination_table_id = "grid-merged"
///
/// [[source_tables]]
/// doc_id = "GhIjKl"
/// table_id = "grid-tasks"
/// project = "Apollo"
///
/// [column_mappings]
/// "Owner Name" = "Owner"
///
/// [client]
/// batch_size = 20
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    pub destination_doc_id: String,
    pub destination_table_id: String,
    #[serde(default)]
    pub source_tables: Vec<SourceTable>,
    /// Source column name -> destination column name. Checked before any
    /// automatic matching.
    #[serde(default)]
    pub column_mappings: BTreeMap<String, String>,
    #[serde(default)]
    pub client: ClientSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTable {
    pub doc_id: String,
    pub table_id: String,
    /// Label written to the `Project` column of this source's rows.
    #[serde(default)]
    pub project: Option<String>,
}

impl SourceTable {
    /// Provenance tag: `src_{doc_id}_{table_id}`.
    pub fn source_id(&self) -> String {
        format!("src_{}_{}", self.doc_id, self.table_id)
    }

    /// Configured label, else `Project {position}` (1-based).
    pub fn project_label(&self, position: usize) -> String {
        match self.project.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => format!("Project {position}"),
        }
    }
}

impl MergeConfig {
    pub fn new(
        destination_doc_id: impl Into<String>,
        destination_table_id: impl Into<String>,
        source_tables: Vec<SourceTable>,
    ) -> Self {
        Self {
            destination_doc_id: destination_doc_id.into(),
            destination_table_id: destination_table_id.into(),
            source_tables,
            column_mappings: BTreeMap::new(),
            client: ClientSettings::default(),
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, MergeError> {
        let config: MergeConfig =
            toml::from_str(input).map_err(|e| MergeError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(input: &str) -> Result<Self, MergeError> {
        let config: MergeConfig = serde_json::from_str(input)
            .map_err(|e| MergeError::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file. `.json` files parse as JSON, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self, MergeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MergeError::Config(format!("cannot read {}: {e}", path.display())))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_toml(&text)
        }
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if self.destination_doc_id.trim().is_empty() {
            return Err(MergeError::Config("destination_doc_id must not be empty".into()));
        }
        if self.destination_table_id.trim().is_empty() {
            return Err(MergeError::Config("destination_table_id must not be empty".into()));
        }

        if self.source_tables.is_empty() {
            return Err(MergeError::Config(
                "no source tables specified; add at least one [[source_tables]] entry".into(),
            ));
        }
        for (i, src) in self.source_tables.iter().enumerate() {
            if src.doc_id.trim().is_empty() || src.table_id.trim().is_empty() {
                return Err(MergeError::Config(format!(
                    "source table {}: doc_id and table_id must not be empty",
                    i + 1
                )));
            }
        }

        for (from, to) in &self.column_mappings {
            if from.trim().is_empty() || to.trim().is_empty() {
                return Err(MergeError::Config(format!(
                    "column mapping '{from}' -> '{to}': names must not be empty"
                )));
            }
        }

        self.client
            .validate()
            .map_err(|e| MergeError::Config(format!("[client]: {e}")))
    }
}
