use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Cell values of a row, keyed by column name.
pub type RowValues = BTreeMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One table row.
///
/// `id` is assigned by the service and absent for rows not yet created.
/// `source_id` and `content_hash` never come from the wire; the merge engine
/// stamps them during ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub values: RowValues,
    #[serde(skip)]
    pub source_id: Option<String>,
    #[serde(skip)]
    pub content_hash: Option<String>,
}

impl Row {
    pub fn new(id: Option<String>, values: RowValues) -> Self {
        Self { id, values, source_id: None, content_hash: None }
    }

    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.values.get(column)
    }

    /// The cell as a matching key: non-empty strings as-is, numbers in their
    /// JSON form. Null, empty strings, booleans and structures yield `None`.
    pub fn key_value(&self, column: &str) -> Option<String> {
        match self.values.get(column)? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// One column of a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ColumnPayload")]
pub struct ColumnSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<bool>,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self { id: None, name: name.into(), column_type: column_type.into(), display: None }
    }
}

/// Wire shape of a column. The columns endpoint nests the type under
/// `format.type`; schemas written by hand carry a top-level `type`.
#[derive(Deserialize)]
struct ColumnPayload {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default, rename = "type")]
    column_type: Option<String>,
    #[serde(default)]
    format: Option<ColumnFormat>,
    #[serde(default)]
    display: Option<bool>,
}

#[derive(Deserialize)]
struct ColumnFormat {
    #[serde(default, rename = "type")]
    column_type: Option<String>,
}

impl From<ColumnPayload> for ColumnSchema {
    fn from(p: ColumnPayload) -> Self {
        let column_type = p
            .format
            .and_then(|f| f.column_type)
            .or(p.column_type)
            .unwrap_or_else(|| "text".to_string());
        Self { id: p.id, name: p.name, column_type, display: p.display }
    }
}

/// Ordered column set of one table, with lookup by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnSchema>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column type as declared by the schema.
    pub fn column_type(&self, name: &str) -> Option<&str> {
        self.column(name).map(|c| c.column_type.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Append a column unless one with the same name exists.
    pub fn push(&mut self, column: ColumnSchema) {
        if !self.contains(&column.name) {
            self.columns.push(column);
        }
    }
}

impl From<Vec<ColumnSchema>> for Schema {
    fn from(columns: Vec<ColumnSchema>) -> Self {
        Self::new(columns)
    }
}

// ---------------------------------------------------------------------------
// Resource info
// ---------------------------------------------------------------------------

/// Account behind the API token (`GET /whoami`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub login_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub row_count: Option<u64>,
}
