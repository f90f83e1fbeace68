//! Coda HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). Every request goes
//! through [`RetryPolicy::execute`], so 429/5xx handling is uniform across
//! reads and writes.

use std::sync::Arc;

use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::error::ClientError;
use crate::model::{ColumnSchema, DocInfo, Row, TableInfo, UserInfo};
use crate::retry::{parse_retry_after, RawResponse, RetryPolicy, Sleeper, ThreadSleeper};
use crate::settings::ClientSettings;

/// Coda API client (blocking).
#[derive(Clone)]
pub struct TableClient {
    http: Client,
    base_url: Url,
    token: String,
    settings: ClientSettings,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

/// One page of a list endpoint.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

impl std::fmt::Debug for TableClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableClient")
            .field("base_url", &self.base_url.as_str())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TableClient {
    /// Client against the public Coda API with default settings.
    pub fn new(token: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_settings(token, ClientSettings::default())
    }

    pub fn with_settings(
        token: impl Into<String>,
        settings: ClientSettings,
    ) -> Result<Self, ClientError> {
        settings.validate()?;

        let base_url = Url::parse(settings.base_url.trim_end_matches('/'))
            .map_err(|e| ClientError::InvalidConfig(format!("base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidConfig(format!(
                "base_url is not a base URL: {base_url}"
            )));
        }

        let http = Client::builder()
            .user_agent(concat!("tablemerge/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            token: token.into(),
            policy: settings.retry_policy(),
            settings,
            sleeper: Arc::new(ThreadSleeper),
        })
    }

    /// Replace the sleeper used for backoff.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Verify the token and return the account it belongs to.
    pub fn whoami(&self) -> Result<UserInfo, ClientError> {
        self.get(&["whoami"], &[])
    }

    pub fn get_doc(&self, doc_id: &str) -> Result<DocInfo, ClientError> {
        self.get(&["docs", doc_id], &[])
    }

    pub fn get_table(&self, doc_id: &str, table_id: &str) -> Result<TableInfo, ClientError> {
        self.get(&["docs", doc_id, "tables", table_id], &[])
    }

    /// First page of tables in a document.
    pub fn list_tables(&self, doc_id: &str) -> Result<Vec<TableInfo>, ClientError> {
        let page: Page<TableInfo> = self.get(&["docs", doc_id, "tables"], &[])?;
        Ok(page.items)
    }

    /// All columns of a table, hidden ones included.
    pub fn get_schema(&self, doc_id: &str, table_id: &str) -> Result<Vec<ColumnSchema>, ClientError> {
        let page: Page<ColumnSchema> = self.get(
            &["docs", doc_id, "tables", table_id, "columns"],
            &[("visibleOnly", "false".to_string())],
        )?;
        Ok(page.items)
    }

    /// All rows of a table, following `nextPageToken` up to `max_pages` pages.
    pub fn get_rows(&self, doc_id: &str, table_id: &str) -> Result<Vec<Row>, ClientError> {
        let segments = ["docs", doc_id, "tables", table_id, "rows"];
        let max_pages = self.settings.max_pages;
        let mut rows = Vec::new();
        let mut page_token: Option<String> = None;

        for page_no in 1..=max_pages {
            let mut query = vec![
                ("limit", self.settings.page_size.to_string()),
                ("useColumnNames", "true".to_string()),
            ];
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.clone()));
            }

            let page: Page<Row> = self.get(&segments, &query)?;
            debug!("{doc_id}/{table_id}: page {page_no} returned {} rows", page.items.len());
            rows.extend(page.items);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                None => return Ok(rows),
                Some(token) => {
                    if page_no == max_pages {
                        warn!(
                            "{doc_id}/{table_id}: stopped after {max_pages} pages ({} rows); more rows remain",
                            rows.len()
                        );
                    }
                    page_token = Some(token);
                }
            }
        }

        Ok(rows)
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Create a table and return its id.
    pub fn create_table(
        &self,
        doc_id: &str,
        name: &str,
        schema: &[ColumnSchema],
    ) -> Result<String, ClientError> {
        let columns: Vec<_> = schema
            .iter()
            .map(|c| json!({ "name": c.name, "type": c.column_type }))
            .collect();
        let body = json!({ "name": name, "columns": columns });
        let created: Created = self.send(Method::POST, &["docs", doc_id, "tables"], &[], Some(&body))?;
        info!("Created table '{name}' ({}) in doc {doc_id}", created.id);
        Ok(created.id)
    }

    /// Add one column to an existing table.
    pub fn create_column(
        &self,
        doc_id: &str,
        table_id: &str,
        column: &ColumnSchema,
    ) -> Result<(), ClientError> {
        let body = json!({ "name": column.name, "format": { "type": column.column_type } });
        let _: serde_json::Value = self.send(
            Method::POST,
            &["docs", doc_id, "tables", table_id, "columns"],
            &[],
            Some(&body),
        )?;
        info!("Created column '{}' in {doc_id}/{table_id}", column.name);
        Ok(())
    }

    /// Insert-or-update rows matched on `key_columns`, `batch_size` rows per request.
    ///
    /// Batches are sent in order with no cross-batch atomicity: if batch *k*
    /// fails, batches before it stay applied.
    pub fn upsert_rows(
        &self,
        doc_id: &str,
        table_id: &str,
        rows: &[Row],
        key_columns: &[&str],
    ) -> Result<(), ClientError> {
        if rows.is_empty() {
            info!("No rows to upsert");
            return Ok(());
        }

        let segments = ["docs", doc_id, "tables", table_id, "rows"];
        let batch_size = self.settings.batch_size;
        for (i, batch) in rows.chunks(batch_size).enumerate() {
            let body = upsert_payload(batch, key_columns);
            let _: serde_json::Value = self.send(Method::POST, &segments, &[], Some(&body))?;
            let start = i * batch_size;
            info!("Upserted batch of {} rows ({} to {})", batch.len(), start + 1, start + batch.len());
        }

        info!("Upserted {} rows into {doc_id}/{table_id}", rows.len());
        Ok(())
    }

    /// Delete rows by id, `batch_size` ids per request.
    pub fn delete_rows(
        &self,
        doc_id: &str,
        table_id: &str,
        row_ids: &[String],
    ) -> Result<(), ClientError> {
        if row_ids.is_empty() {
            return Ok(());
        }

        let segments = ["docs", doc_id, "tables", table_id, "rows"];
        let batch_size = self.settings.batch_size;
        for (i, batch) in row_ids.chunks(batch_size).enumerate() {
            let body = json!({ "rowIds": batch });
            let _: serde_json::Value = self.send(Method::DELETE, &segments, &[], Some(&body))?;
            let start = i * batch_size;
            info!("Deleted batch of {} rows ({} to {})", batch.len(), start + 1, start + batch.len());
        }

        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidConfig(format!("base_url is not a base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        self.send(Method::GET, segments, query, None)
    }

    fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        let label = format!("{method} {url}");
        debug!("{label} query={query:?}");

        let response = self.policy.execute(&label, self.sleeper.as_ref(), |_attempt| {
            let mut req = self
                .http
                .request(method.clone(), url.clone())
                .bearer_auth(&self.token)
                .query(query);
            if let Some(body) = body {
                req = req.json(body);
            }
            let resp = req.send().map_err(|e| transport_error(&label, e))?;

            let status = resp.status().as_u16();
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let text = resp.text().map_err(|e| transport_error(&label, e))?;
            debug!("{label} -> HTTP {status}");
            Ok(RawResponse { status, retry_after, body: text })
        })?;

        let text = if response.body.trim().is_empty() { "null" } else { response.body.as_str() };
        serde_json::from_str(text).map_err(|e| {
            ClientError::Parse(format!(
                "{label}: {e} (body: {})",
                &response.body[..floor_char_boundary(&response.body, 200)]
            ))
        })
    }
}

/// Request body for one upsert batch. Any `id` cell is dropped: the service
/// matches existing rows through `keyColumns`, not through client-side ids.
pub fn upsert_payload(batch: &[Row], key_columns: &[&str]) -> serde_json::Value {
    let rows: Vec<_> = batch
        .iter()
        .map(|row| {
            let cells: Vec<_> = row
                .values
                .iter()
                .filter(|(column, _)| column.as_str() != "id")
                .map(|(column, value)| json!({ "column": column, "value": value }))
                .collect();
            json!({ "cells": cells })
        })
        .collect();
    json!({ "rows": rows, "keyColumns": key_columns })
}

fn transport_error(label: &str, e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout(format!("{label}: {e}"))
    } else {
        ClientError::Network(format!("{label}: {e}"))
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}
