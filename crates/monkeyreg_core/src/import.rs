//! Bulk import of raw records through the registry.
//!
//! Rows go through [`Registry`] like any other write, so validation and
//! the uniqueness rule apply to each one. Per-row problems are counted;
//! backend failures abort the import.
//!
//! A row carrying an `id` is restored with that id and its timestamps, so
//! an export of one backend imports into another unchanged. Rows without
//! one are created as new records.

use crate::error::{RegistryError, RegistryResult, ValidationError};
use crate::record::{NewRecord, Record, RecordPatch};
use crate::registry::Registry;
use monkeyreg_storage::{
    fold, item_id, ListFilter, RecordStore, StorageError, FIELD_ID, FIELD_NAME,
};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// What to do with a row whose name is already taken in its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Skip it.
    #[default]
    Create,
    /// Update the existing record with the row's fields.
    Upsert,
}

/// Options for [`import_rows`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Conflict handling.
    pub mode: ImportMode,
    /// Validate rows without writing anything. Valid rows count as created.
    pub dry_run: bool,
}

impl ImportOptions {
    /// Creates default options: create mode, writes enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the conflict handling.
    #[must_use]
    pub fn mode(mut self, mode: ImportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enables or disables dry-run.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Row counts of one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Rows stored as new records.
    pub created: usize,
    /// Rows that updated an existing record.
    pub updated: usize,
    /// Rows dropped because the name or id was taken.
    pub skipped: usize,
    /// Rows that failed validation.
    pub failed: usize,
    /// Rows seen.
    pub total: usize,
}

enum RowOutcome {
    Created,
    Updated,
    Skipped,
}

/// Reads import rows from a JSON file holding an array.
///
/// # Errors
///
/// - [`RegistryError::Storage`] if the file cannot be read or parsed
/// - [`RegistryError::InvalidImport`] if the top level is not an array
pub fn read_rows(path: impl AsRef<Path>) -> RegistryResult<Vec<Value>> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(StorageError::from)?;
    match serde_json::from_slice::<Value>(&bytes).map_err(StorageError::from)? {
        Value::Array(rows) => Ok(rows),
        _ => Err(RegistryError::invalid_import(format!(
            "{} must contain a JSON array",
            path.display()
        ))),
    }
}

/// Imports rows through the registry.
///
/// # Errors
///
/// Returns [`RegistryError::Storage`] as soon as the backend fails.
/// Invalid and conflicting rows are counted, not returned.
pub fn import_rows<S: RecordStore>(
    registry: &Registry<S>,
    rows: &[Value],
    options: &ImportOptions,
) -> RegistryResult<ImportReport> {
    let mut report = ImportReport::default();

    for (index, row) in rows.iter().enumerate() {
        report.total += 1;
        match import_row(registry, row, options) {
            Ok(RowOutcome::Created) => report.created += 1,
            Ok(RowOutcome::Updated) => report.updated += 1,
            Ok(RowOutcome::Skipped) => report.skipped += 1,
            Err(e) if e.is_duplicate() => {
                warn!(row = index, error = %e, "skipped row");
                report.skipped += 1;
            }
            Err(e @ RegistryError::Validation(_)) => {
                warn!(row = index, error = %e, "rejected row");
                report.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        created = report.created,
        updated = report.updated,
        skipped = report.skipped,
        failed = report.failed,
        total = report.total,
        dry_run = options.dry_run,
        "import finished"
    );
    Ok(report)
}

fn import_row<S: RecordStore>(
    registry: &Registry<S>,
    row: &Value,
    options: &ImportOptions,
) -> RegistryResult<RowOutcome> {
    let raw = row.as_object().ok_or(ValidationError::InvalidType {
        field: "row",
        expected: "an object",
    })?;
    let new = NewRecord::from_item(raw)?;
    let keeps_identity = raw.get(FIELD_ID).is_some_and(|id| !id.is_null());

    if options.dry_run {
        Record::from_item(raw)?;
        return Ok(RowOutcome::Created);
    }

    let stored = if keeps_identity {
        registry.restore(raw)
    } else {
        registry.create(new.clone())
    };
    match stored {
        Ok(_) => Ok(RowOutcome::Created),
        Err(RegistryError::DuplicateName { .. }) if options.mode == ImportMode::Upsert => {
            upsert_existing(registry, new)
        }
        Err(e) => Err(e),
    }
}

fn upsert_existing<S: RecordStore>(
    registry: &Registry<S>,
    new: NewRecord,
) -> RegistryResult<RowOutcome> {
    let record = Record::new(new.clone())?;
    let (name, category) = record.natural_key();
    let filter = ListFilter::new().with_name(name).with_category(category);

    let existing = registry.list(Some(&filter))?.into_iter().find(|item| {
        item.get(FIELD_NAME)
            .and_then(Value::as_str)
            .is_some_and(|n| fold(n) == fold(name))
    });
    let Some(id) = existing.as_ref().and_then(item_id) else {
        return Ok(RowOutcome::Skipped);
    };

    match registry.update(id, &RecordPatch::from(new))? {
        Some(_) => Ok(RowOutcome::Updated),
        None => Ok(RowOutcome::Skipped),
    }
}
