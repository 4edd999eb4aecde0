//! The import pipeline: parse, validate, coerce, bulk-persist, report.
//!
//! The pipeline is generic over the injected [`DataStore`] so it can run
//! against the hosted API in production and against an in-memory store in
//! tests. It holds no state across imports: every run re-fetches the
//! existing identifiers rather than caching them, trading an extra round
//! trip for correctness against concurrent external writes.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{CsvResult, ImportError, ImportResult, StoreError};
use crate::import::coerce::{coerce_record, stamp_created};
use crate::import::validate::{validate_records, ValidationError};
use crate::parser::{parse_bytes, parse_preview};
use crate::schema::EntityKind;
use crate::store::DataStore;

/// How many validation messages the outbound report shows before folding
/// the rest into an overflow count.
pub const MAX_REPORTED_ERRORS: usize = 5;

/// What the confirmation dialog renders before the real import runs.
#[derive(Debug, Clone)]
pub struct ImportPreview {
    pub headers: Vec<String>,
    /// First 3 data rows, parsed with the same rules as the full pass.
    pub rows: Vec<Value>,
    pub encoding: String,
}

/// Outcome of a successful import.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub kind: EntityKind,
    pub inserted: usize,
}

pub struct ImportPipeline<S> {
    store: S,
}

impl<S: DataStore> ImportPipeline<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Parse just enough of the file to render the confirmation dialog.
    ///
    /// No store round-trip happens here; duplicate checks wait for the
    /// confirmed run.
    pub fn preview(bytes: &[u8]) -> CsvResult<ImportPreview> {
        let outcome = parse_preview(bytes)?;
        Ok(ImportPreview {
            headers: outcome.headers,
            rows: outcome.records,
            encoding: outcome.encoding,
        })
    }

    /// Run the full import for one entity kind.
    ///
    /// The whole batch is rejected before any write if validation finds
    /// anything; the bulk insert itself is a single atomic round-trip and
    /// is never retried.
    pub async fn run(&self, kind: EntityKind, bytes: &[u8]) -> ImportResult<ImportReport> {
        let outcome = parse_bytes(bytes)?;
        if outcome.records.is_empty() {
            return Err(ImportError::EmptyInput);
        }

        let schema = kind.schema();

        // Fetched fresh per attempt; only needed when the kind designates a
        // unique-identifier column.
        let existing: HashSet<String> = if let Some(unique) = schema.unique_column {
            self.store
                .fetch_existing(kind)
                .await?
                .iter()
                .filter_map(|row| row.get(unique).and_then(Value::as_str))
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect()
        } else {
            HashSet::new()
        };

        let errors = validate_records(&outcome.records, schema, &existing);
        if !errors.is_empty() {
            return Err(ImportError::Validation(errors));
        }

        let records: Vec<Value> = outcome
            .records
            .iter()
            .map(|record| {
                let mut coerced = coerce_record(record, schema);
                stamp_created(&mut coerced, schema);
                coerced
            })
            .collect();

        let inserted = self
            .store
            .bulk_insert(kind, records)
            .await
            .map_err(|err| match err {
                // Uniqueness violations get the user-facing rewrite; other
                // rejections pass through verbatim.
                StoreError::Rejected(message) => StoreError::from_rejection(message),
                other => other,
            })?;

        Ok(ImportReport { kind, inserted })
    }
}

/// Join validation errors for user display: at most
/// [`MAX_REPORTED_ERRORS`] messages plus an overflow count. The full list
/// stays with the caller.
pub fn format_validation_errors(errors: &[ValidationError]) -> String {
    let mut lines: Vec<String> = errors
        .iter()
        .take(MAX_REPORTED_ERRORS)
        .map(ToString::to_string)
        .collect();
    if errors.len() > MAX_REPORTED_ERRORS {
        lines.push(format!("... and {} more", errors.len() - MAX_REPORTED_ERRORS));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    const STUDENTS_HEADER: &str =
        "student_id,first_name,last_name,email,program_id,center_id";

    fn pipeline() -> ImportPipeline<MemoryStore> {
        ImportPipeline::new(MemoryStore::new())
    }

    #[test]
    fn test_preview_shows_first_three_rows() {
        let csv = format!(
            "{STUDENTS_HEADER}\n\
             S-1,Alice,Nguyen,alice@example.com,P-1,C-1\n\
             S-2,Bob,Okafor,bob@example.com,P-1,C-1\n\
             S-3,Cara,Ito,cara@example.com,P-1,C-1\n\
             S-4,Dan,Mehta,dan@example.com,P-1,C-1\n"
        );
        let preview = ImportPipeline::<MemoryStore>::preview(csv.as_bytes()).unwrap();
        assert_eq!(preview.rows.len(), 3);
        assert_eq!(preview.rows[0]["student_id"], "S-1");
    }

    #[tokio::test]
    async fn test_invalid_rows_reject_batch_before_any_persist() {
        // Row 2 has a blank last_name, row 3 repeats row 1's identifier:
        // exactly two validation errors, zero bulk-insert calls.
        let csv = format!(
            "{STUDENTS_HEADER}\n\
             S-1,Alice,Nguyen,alice@example.com,P-1,C-1\n\
             S-2,Bob,,bob@example.com,P-1,C-1\n\
             S-1,Cara,Ito,cara@example.com,P-1,C-1\n"
        );
        let p = pipeline();
        let err = p.run(EntityKind::Students, csv.as_bytes()).await.unwrap_err();

        match err {
            ImportError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].row, 2);
                assert!(errors[0].message.contains("last_name"));
                assert_eq!(errors[1].row, 3);
                assert!(errors[1].message.contains("duplicate"));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        assert_eq!(p.store().bulk_insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_success_path_stamps_created_timestamps() {
        let csv = format!(
            "{STUDENTS_HEADER}\n\
             S-1,Alice,Nguyen,alice@example.com,P-1,C-1\n\
             S-2,Bob,Okafor,bob@example.com,P-1,C-1\n"
        );
        let p = pipeline();
        let report = p.run(EntityKind::Students, csv.as_bytes()).await.unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(p.store().bulk_insert_calls(), 1);

        let rows = p.store().rows(EntityKind::Students);
        assert_eq!(rows.len(), 2);
        for row in rows {
            let created = row["created_at"].as_str().unwrap();
            assert!(!created.is_empty());
            assert!(created.ends_with('Z'));
        }
    }

    #[tokio::test]
    async fn test_existing_identifiers_fetched_fresh() {
        let csv = format!(
            "{STUDENTS_HEADER}\n\
             S-1,Alice,Nguyen,alice@example.com,P-1,C-1\n"
        );
        let p = pipeline();
        p.store().seed(EntityKind::Students, vec![json!({"student_id": "S-1"})]);

        let err = p.run(EntityKind::Students, csv.as_bytes()).await.unwrap_err();
        match err {
            ImportError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].message.contains("already exists"));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_store_uniqueness_rejection_is_rewritten() {
        // A row whose identifier is blank slips past both duplicate rules,
        // so the store itself is the last line of defense.
        let p = pipeline();
        p.store().seed(
            EntityKind::Students,
            vec![json!({"student_id": "S-9", "id": "row-1"})],
        );
        let err = p
            .store()
            .bulk_insert(EntityKind::Students, vec![json!({"student_id": "S-9"})])
            .await
            .unwrap_err();

        let rewritten = match err {
            StoreError::Rejected(message) => StoreError::from_rejection(message),
            other => other,
        };
        assert!(matches!(rewritten, StoreError::DuplicateIdentifier(_)));
        assert!(rewritten.to_string().contains("'S-9' already exists"));
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_input() {
        let p = pipeline();
        let err = p
            .run(EntityKind::Students, b"student_id,first_name\n")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::EmptyInput));
    }

    #[tokio::test]
    async fn test_kinds_without_rules_coerce_and_insert() {
        let csv = "course_id,name,schedule_days,capacity\n\
                   CR-1,Robotics,\"Monday, Wednesday\",24\n";
        let p = pipeline();
        let report = p.run(EntityKind::Courses, csv.as_bytes()).await.unwrap();
        assert_eq!(report.inserted, 1);

        let rows = p.store().rows(EntityKind::Courses);
        assert_eq!(rows[0]["schedule_days"], json!(["Monday", "Wednesday"]));
        assert_eq!(rows[0]["capacity"], json!(24));
    }

    #[tokio::test]
    async fn test_import_from_file_on_disk() {
        // Same path the CLI takes: bytes come from a file, not a request body.
        use std::io::Write;

        let csv = format!(
            "{STUDENTS_HEADER}\n\
             S-1,Alice,Nguyen,alice@example.com,P-1,C-1\n"
        );
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(csv.as_bytes()).unwrap();

        let bytes = crate::parser::read_file(file.path()).unwrap();
        let p = pipeline();
        let report = p.run(EntityKind::Students, &bytes).await.unwrap();
        assert_eq!(report.inserted, 1);
    }

    #[test]
    fn test_format_validation_errors_truncates_at_five() {
        let errors: Vec<ValidationError> = (1..=8)
            .map(|row| ValidationError {
                row,
                message: format!("missing required field 'f{row}'"),
            })
            .collect();
        let report = format_validation_errors(&errors);

        assert_eq!(report.lines().count(), 6);
        assert!(report.starts_with("Row 1:"));
        assert!(report.ends_with("... and 3 more"));
    }
}
