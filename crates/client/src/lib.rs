//! Coda API client.
//!
//! Paginated reads, batched writes and one retry loop shared by every
//! request. Blocking: callers that need concurrency run it on their own
//! threads.
//!
//! No merge logic lives here. The reconciliation engine talks to this crate
//! through plain method calls and never sees HTTP details.

mod client;
mod error;
mod model;
mod retry;
mod settings;

pub use client::{upsert_payload, TableClient};
pub use error::ClientError;
pub use model::{ColumnSchema, DocInfo, Row, RowValues, Schema, TableInfo, UserInfo};
pub use retry::{parse_retry_after, Disposition, RawResponse, RetryPolicy, Sleeper, ThreadSleeper};
pub use settings::{ClientSettings, CODA_API_BASE};
