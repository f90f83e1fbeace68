//! Merge run orchestration.
//!
//! One pass, stages in fixed order, terminal on the first error:
//! verify access, align the destination schema, resolve destination
//! duplicates, ingest every source, diff, apply.

use log::{info, warn};
use tablemerge_client::{ClientError, ColumnSchema, Row, Schema};

use crate::config::MergeConfig;
use crate::dedupe::resolve_duplicates;
use crate::diff::diff;
use crate::error::MergeError;
use crate::ingest::ingest_rows;
use crate::model::{MergeOptions, MergePlan, MergeResult, MergeStage, RESERVED_COLUMNS, UNIQUE_KEY};
use crate::store::TableStore;

/// Merges the configured source tables into the destination table.
pub struct Merger<S> {
    store: S,
    config: MergeConfig,
}

impl<S: TableStore> Merger<S> {
    pub fn new(store: S, config: MergeConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Validate the configuration, then check the token, destination and
    /// source documents. Issues reads only.
    pub fn verify(&self) -> Result<(), MergeError> {
        self.config.validate()?;

        let user = self.store.whoami().map_err(access("whoami"))?;
        info!("API authenticated as: {}", user.name);

        let doc_id = &self.config.destination_doc_id;
        let table_id = &self.config.destination_table_id;
        let doc = self.store.get_doc(doc_id).map_err(access(format!("doc {doc_id}")))?;
        info!("Accessed destination document: {}", doc.name);
        let table = self
            .store
            .get_table(doc_id, table_id)
            .map_err(access(format!("table {doc_id}/{table_id}")))?;
        info!("Using destination table: {} (ID: {table_id})", table.name);

        for (i, src) in self.config.source_tables.iter().enumerate() {
            let doc = self
                .store
                .get_doc(&src.doc_id)
                .map_err(access(format!("doc {}", src.doc_id)))?;
            info!("Accessed source document {}: {}", i + 1, doc.name);
        }
        Ok(())
    }

    /// Run a full merge.
    pub fn run(&self, options: MergeOptions) -> Result<MergeResult, MergeError> {
        let sources = &self.config.source_tables;
        info!(
            "Starting merge of {} source tables{}",
            sources.len(),
            if options.dry_run { " (dry run)" } else { "" }
        );

        self.verify()?;
        let columns = self.align_schema(options)?;
        let (existing, duplicates_removed) = self.resolve_duplicates(options)?;

        let mut source_rows = Vec::new();
        for (i, src) in sources.iter().enumerate() {
            let position = i + 1;
            info!("Fetching data from source {position}: doc {}, table {}", src.doc_id, src.table_id);
            let rows = self
                .store
                .get_rows(&src.doc_id, &src.table_id)
                .map_err(remote(MergeStage::Ingesting(position)))?;
            info!("Retrieved {} rows from source {position}", rows.len());
            source_rows.extend(ingest_rows(rows, src, position, &columns, &self.config.column_mappings));
        }
        let total_rows_processed = source_rows.len();

        let plan = diff(source_rows, &existing);
        info!(
            "Changes to apply: {} new, {} updates, {} deletions",
            plan.new_rows.len(),
            plan.updated_rows.len(),
            plan.orphaned.len()
        );

        self.apply(&plan, options)?;
        info!("Merge completed successfully");

        Ok(MergeResult {
            success: true,
            total_rows_processed,
            new_rows: plan.new_rows.len(),
            updated_rows: plan.updated_rows.len(),
            deleted_rows: plan.orphaned.len(),
            destination_table_id: self.config.destination_table_id.clone(),
            duplicates_removed,
            dry_run: options.dry_run,
            run_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    // ── Stages ──────────────────────────────────────────────────────

    /// Live destination column set: the destination schema plus every
    /// reserved column that exists or was created. Creation failures are
    /// logged and skipped. A dry run assumes creation would succeed.
    fn align_schema(&self, options: MergeOptions) -> Result<Schema, MergeError> {
        let stage = MergeStage::Aligning;
        let first = self
            .config
            .source_tables
            .first()
            .ok_or_else(|| MergeError::Config("no source tables specified".into()))?;
        let nominal = self
            .store
            .get_schema(&first.doc_id, &first.table_id)
            .map_err(remote(stage))?;
        info!("Source 1 has {} columns", nominal.len());

        let doc_id = &self.config.destination_doc_id;
        let table_id = &self.config.destination_table_id;
        let mut columns = Schema::from(self.store.get_schema(doc_id, table_id).map_err(remote(stage))?);
        info!("Destination table has {} columns", columns.len());

        for name in RESERVED_COLUMNS {
            if columns.contains(name) {
                continue;
            }
            let column = ColumnSchema::new(name, "text");
            if options.dry_run {
                info!("Would create column '{name}' in destination");
                columns.push(column);
                continue;
            }
            match self.store.create_column(doc_id, table_id, &column) {
                Ok(()) => columns.push(column),
                Err(e) => warn!("Could not create column '{name}' in destination: {e}"),
            }
        }
        Ok(columns)
    }

    /// Fetch destination rows and drop duplicate keys, keeping the last
    /// occurrence. Returns the surviving rows and how many were removed.
    fn resolve_duplicates(&self, options: MergeOptions) -> Result<(Vec<Row>, usize), MergeError> {
        let stage = MergeStage::DuplicateResolving;
        let doc_id = &self.config.destination_doc_id;
        let table_id = &self.config.destination_table_id;

        info!("Fetching existing rows from destination table");
        let rows = self.store.get_rows(doc_id, table_id).map_err(remote(stage))?;
        info!("Found {} existing rows in destination table", rows.len());

        let deduped = resolve_duplicates(rows);
        if deduped.removed.is_empty() {
            info!("No duplicate {UNIQUE_KEY} values in destination table");
            return Ok((deduped.kept, 0));
        }

        let ids = deduped.removed_ids();
        if options.dry_run {
            info!("Would delete {} duplicate rows", ids.len());
        } else {
            self.store.delete_rows(doc_id, table_id, &ids).map_err(remote(stage))?;
            info!("Deleted {} duplicate rows (kept the most recent occurrence)", ids.len());
        }
        Ok((deduped.kept, deduped.removed.len()))
    }

    /// Upserts first, then orphan deletes.
    fn apply(&self, plan: &MergePlan, options: MergeOptions) -> Result<(), MergeError> {
        if options.dry_run {
            info!("Dry run: no changes written");
            return Ok(());
        }
        let stage = MergeStage::Applying;
        let doc_id = &self.config.destination_doc_id;
        let table_id = &self.config.destination_table_id;

        let upserts = plan.upserts();
        if !upserts.is_empty() {
            self.store
                .upsert_rows(doc_id, table_id, &upserts, &[UNIQUE_KEY])
                .map_err(remote(stage))?;
        }

        let orphans = plan.orphan_ids();
        if !orphans.is_empty() {
            self.store.delete_rows(doc_id, table_id, &orphans).map_err(remote(stage))?;
            info!("Deleted {} removed rows", orphans.len());
        }
        Ok(())
    }
}

fn access(target: impl Into<String>) -> impl FnOnce(ClientError) -> MergeError {
    let target = target.into();
    move |source| MergeError::Access { target, source }
}

fn remote(stage: MergeStage) -> impl FnOnce(ClientError) -> MergeError {
    move |source| MergeError::Remote { stage, source }
}
