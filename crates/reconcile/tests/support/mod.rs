//! In-memory stand-in for the remote table service.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tablemerge_client::{ClientError, ColumnSchema, DocInfo, Row, RowValues, TableInfo, UserInfo};
use tablemerge_reconcile::TableStore;

#[derive(Debug, Default, Clone)]
pub struct FakeTable {
    pub schema: Vec<ColumnSchema>,
    pub rows: Vec<Row>,
}

/// Tables keyed by `(doc_id, table_id)`. Every call is logged; failures are
/// injected per operation name or per logged call.
#[derive(Default)]
pub struct FakeRemote {
    docs: RefCell<BTreeSet<String>>,
    tables: RefCell<BTreeMap<(String, String), FakeTable>>,
    calls: RefCell<Vec<String>>,
    failures: RefCell<BTreeMap<String, u16>>,
    next_id: Cell<u32>,
}

pub const MUTATIONS: [&str; 3] = ["create_column", "upsert_rows", "delete_rows"];

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&self, doc_id: &str, table_id: &str, columns: &[&str]) {
        self.docs.borrow_mut().insert(doc_id.to_string());
        let schema = columns.iter().map(|c| ColumnSchema::new(*c, "text")).collect();
        self.tables
            .borrow_mut()
            .insert(key(doc_id, table_id), FakeTable { schema, rows: Vec::new() });
    }

    /// Append a row; returns its generated id.
    pub fn insert(&self, doc_id: &str, table_id: &str, values: Value) -> String {
        let values: RowValues = serde_json::from_value(values).expect("row values must be an object");
        let id = self.fresh_id();
        self.table_mut(doc_id, table_id, |t| t.rows.push(Row::new(Some(id.clone()), values)));
        id
    }

    pub fn set_cell(&self, doc_id: &str, table_id: &str, row_id: &str, column: &str, value: Value) {
        self.table_mut(doc_id, table_id, |t| {
            let row = t.rows.iter_mut().find(|r| r.id.as_deref() == Some(row_id)).expect("no such row");
            row.values.insert(column.to_string(), value);
        });
    }

    pub fn remove_row(&self, doc_id: &str, table_id: &str, row_id: &str) {
        self.table_mut(doc_id, table_id, |t| t.rows.retain(|r| r.id.as_deref() != Some(row_id)));
    }

    pub fn rows(&self, doc_id: &str, table_id: &str) -> Vec<Row> {
        self.tables.borrow()[&key(doc_id, table_id)].rows.clone()
    }

    pub fn column_names(&self, doc_id: &str, table_id: &str) -> Vec<String> {
        self.tables.borrow()[&key(doc_id, table_id)]
            .schema
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Make every call to `operation` fail with `status`.
    pub fn fail(&self, operation: &str, status: u16) {
        self.failures.borrow_mut().insert(operation.to_string(), status);
    }

    /// Make only the call logged as `call` fail, e.g. `"get_rows doc-b/grid-b"`.
    pub fn fail_call(&self, call: &str, status: u16) {
        self.failures.borrow_mut().insert(call.to_string(), status);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn mutation_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| MUTATIONS.iter().any(|m| c.starts_with(m)))
            .collect()
    }

    fn fresh_id(&self) -> String {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        format!("i-{n}")
    }

    fn table_mut<R>(&self, doc_id: &str, table_id: &str, f: impl FnOnce(&mut FakeTable) -> R) -> R {
        let mut tables = self.tables.borrow_mut();
        let table = tables.get_mut(&key(doc_id, table_id)).expect("unknown table");
        f(table)
    }

    fn record(&self, operation: &str, detail: String) -> Result<(), ClientError> {
        let call = format!("{operation} {detail}");
        self.calls.borrow_mut().push(call.clone());
        let failures = self.failures.borrow();
        match failures.get(&call).or_else(|| failures.get(operation)) {
            Some(&status) => Err(ClientError::Api { status, body: format!("{operation} refused") }),
            None => Ok(()),
        }
    }

    fn lookup(&self, doc_id: &str, table_id: &str) -> Result<FakeTable, ClientError> {
        self.tables
            .borrow()
            .get(&key(doc_id, table_id))
            .cloned()
            .ok_or_else(|| not_found(&format!("{doc_id}/{table_id}")))
    }
}

fn key(doc_id: &str, table_id: &str) -> (String, String) {
    (doc_id.to_string(), table_id.to_string())
}

fn not_found(what: &str) -> ClientError {
    ClientError::Api { status: 404, body: format!("{{\"message\":\"{what} not found\"}}") }
}

impl TableStore for FakeRemote {
    fn whoami(&self) -> Result<UserInfo, ClientError> {
        self.record("whoami", String::new())?;
        Ok(UserInfo { name: "Test User".into(), login_id: None })
    }

    fn get_doc(&self, doc_id: &str) -> Result<DocInfo, ClientError> {
        self.record("get_doc", doc_id.to_string())?;
        if !self.docs.borrow().contains(doc_id) {
            return Err(not_found(doc_id));
        }
        Ok(DocInfo { id: doc_id.to_string(), name: format!("Doc {doc_id}") })
    }

    fn get_table(&self, doc_id: &str, table_id: &str) -> Result<TableInfo, ClientError> {
        self.record("get_table", format!("{doc_id}/{table_id}"))?;
        let table = self.lookup(doc_id, table_id)?;
        Ok(TableInfo {
            id: table_id.to_string(),
            name: format!("Table {table_id}"),
            row_count: Some(table.rows.len() as u64),
        })
    }

    fn get_schema(&self, doc_id: &str, table_id: &str) -> Result<Vec<ColumnSchema>, ClientError> {
        self.record("get_schema", format!("{doc_id}/{table_id}"))?;
        Ok(self.lookup(doc_id, table_id)?.schema)
    }

    fn get_rows(&self, doc_id: &str, table_id: &str) -> Result<Vec<Row>, ClientError> {
        self.record("get_rows", format!("{doc_id}/{table_id}"))?;
        Ok(self.lookup(doc_id, table_id)?.rows)
    }

    fn create_column(
        &self,
        doc_id: &str,
        table_id: &str,
        column: &ColumnSchema,
    ) -> Result<(), ClientError> {
        self.record("create_column", format!("{doc_id}/{table_id} {}", column.name))?;
        self.lookup(doc_id, table_id)?;
        self.table_mut(doc_id, table_id, |t| t.schema.push(column.clone()));
        Ok(())
    }

    /// Matches on `key_columns`; matched rows get their cells overwritten,
    /// unmatched rows are appended with a fresh id.
    fn upsert_rows(
        &self,
        doc_id: &str,
        table_id: &str,
        rows: &[Row],
        key_columns: &[&str],
    ) -> Result<(), ClientError> {
        self.record("upsert_rows", format!("{doc_id}/{table_id} {}", rows.len()))?;
        self.lookup(doc_id, table_id)?;
        for row in rows {
            let mut cells = row.values.clone();
            cells.remove("id");
            let matches = |existing: &Row| {
                key_columns.iter().all(|k| existing.get(k).is_some() && existing.get(k) == cells.get(*k))
            };
            let position = self.table_mut(doc_id, table_id, |t| t.rows.iter().position(|r| matches(r)));
            match position {
                Some(i) => self.table_mut(doc_id, table_id, |t| t.rows[i].values.extend(cells.clone())),
                None => {
                    let id = self.fresh_id();
                    self.table_mut(doc_id, table_id, |t| t.rows.push(Row::new(Some(id), cells.clone())));
                }
            }
        }
        Ok(())
    }

    fn delete_rows(&self, doc_id: &str, table_id: &str, row_ids: &[String]) -> Result<(), ClientError> {
        self.record("delete_rows", format!("{doc_id}/{table_id} {}", row_ids.join(",")))?;
        self.lookup(doc_id, table_id)?;
        self.table_mut(doc_id, table_id, |t| {
            t.rows.retain(|r| !r.id.as_ref().is_some_and(|id| row_ids.contains(id)))
        });
        Ok(())
    }
}
