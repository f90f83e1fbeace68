//! `tablemerge-reconcile`: merges several remote tables into one.
//!
//! The engine owns no storage. It reads and writes through a [`TableStore`]
//! (the Coda client in production) and returns a [`MergeResult`] per run.
//! The destination table's rows are the only state carried between runs.

pub mod config;
pub mod dedupe;
pub mod diff;
pub mod engine;
pub mod error;
pub mod hash;
pub mod ingest;
pub mod mapping;
pub mod model;
pub mod store;

pub use config::{MergeConfig, SourceTable, MERGE_TABLE_CONFIG_ENV};
pub use engine::Merger;
pub use error::MergeError;
pub use model::{MergeOptions, MergePlan, MergeResult, MergeStage};
pub use store::TableStore;
