//! Field-level validation of parsed CSV rows.
//!
//! Rules run per row in file order, each independently — a row failing one
//! rule is still checked against all others — and every violation lands in
//! one ordered list. Per-row rule order: required fields, intra-file
//! duplicate, cross-store duplicate, email shape, numeric shape.
//!
//! Field rules only fire for kinds whose schema declares them (currently
//! students). The caller truncates for display; the full list is returned.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::schema::TargetSchema;

/// A single rule violation on one data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// 1-based data-row index, matching the original file's ordering.
    pub row: usize,
    /// Human-readable message naming the field and problem.
    pub message: String,
}

impl ValidationError {
    fn new(row: usize, message: impl Into<String>) -> Self {
        Self { row, message: message.into() }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

/// Simple local@domain.tld shape; anything stricter belongs to the backend.
static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Whether a value passes the email format rule.
pub fn is_email_shaped(value: &str) -> bool {
    EMAIL_SHAPE.is_match(value)
}

fn field_str<'a>(record: &'a Value, name: &str) -> &'a str {
    record.get(name).and_then(Value::as_str).unwrap_or("")
}

/// Validate all records against the schema's rules and the set of
/// identifiers already persisted in the store.
///
/// Returns the complete ordered error list, possibly empty. `existing` is
/// only read; the intra-file seen-set is tracked separately so the two
/// duplicate rules fire independently.
pub fn validate_records(
    records: &[Value],
    schema: &TargetSchema,
    existing: &HashSet<String>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !schema.has_field_rules() {
        return errors;
    }

    let mut seen_ids: HashSet<String> = HashSet::new();

    for (idx, record) in records.iter().enumerate() {
        let row = idx + 1;

        // Required fields
        for col in schema.required_columns() {
            if field_str(record, col.name).trim().is_empty() {
                errors.push(ValidationError::new(
                    row,
                    format!("missing required field '{}'", col.name),
                ));
            }
        }

        // Duplicate identifier, within the file and against the store
        if let Some(unique) = schema.unique_column {
            let id = field_str(record, unique).trim();
            if !id.is_empty() {
                if !seen_ids.insert(id.to_string()) {
                    errors.push(ValidationError::new(
                        row,
                        format!("duplicate {unique} '{id}' in file"),
                    ));
                }
                if existing.contains(id) {
                    errors.push(ValidationError::new(
                        row,
                        format!("{unique} '{id}' already exists"),
                    ));
                }
            }
        }

        // Email shape, independently for every email-widget column
        for col in schema.email_columns() {
            let value = field_str(record, col.name).trim();
            if !value.is_empty() && !is_email_shaped(value) {
                errors.push(ValidationError::new(
                    row,
                    format!("invalid email in '{}': '{value}'", col.name),
                ));
            }
        }

        // Numeric shape
        for col in schema.numeric_columns() {
            let value = field_str(record, col.name).trim();
            if !value.is_empty() && value.parse::<f64>().is_err() {
                errors.push(ValidationError::new(
                    row,
                    format!("'{}' must be a number, got '{value}'", col.name),
                ));
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EntityKind;
    use serde_json::json;

    fn students() -> &'static TargetSchema {
        EntityKind::Students.schema()
    }

    fn valid_row(id: &str) -> Value {
        json!({
            "student_id": id,
            "first_name": "Alice",
            "last_name": "Nguyen",
            "email": "alice@example.com",
            "program_id": "P-01",
            "center_id": "C-01",
        })
    }

    #[test]
    fn test_valid_rows_produce_no_errors() {
        let records = vec![valid_row("S-001"), valid_row("S-002")];
        let errors = validate_records(&records, students(), &HashSet::new());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_required_fields_named_per_row() {
        let mut row = valid_row("S-001");
        row["last_name"] = json!("   ");
        row["center_id"] = json!("");
        let errors = validate_records(&[row], students(), &HashSet::new());

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].row, 1);
        assert!(errors[0].message.contains("last_name"));
        assert!(errors[1].message.contains("center_id"));
    }

    #[test]
    fn test_no_short_circuit_within_a_row() {
        // Missing required field AND duplicate identifier: two distinct
        // entries for the same row.
        let mut second = valid_row("S-001");
        second["first_name"] = json!("");
        let records = vec![valid_row("S-001"), second];
        let errors = validate_records(&records, students(), &HashSet::new());

        let row2: Vec<_> = errors.iter().filter(|e| e.row == 2).collect();
        assert_eq!(row2.len(), 2);
        assert!(row2[0].message.contains("first_name"));
        assert!(row2[1].message.contains("duplicate"));
    }

    #[test]
    fn test_duplicate_detection_symmetry() {
        // File ids [A, B, A], store holds {B}: intra-file error on row 3,
        // cross-store error on row 2.
        let records = vec![valid_row("A"), valid_row("B"), valid_row("A")];
        let existing: HashSet<String> = ["B".to_string()].into();
        let errors = validate_records(&records, students(), &existing);

        assert!(errors.len() >= 2);
        assert!(errors
            .iter()
            .any(|e| e.row == 3 && e.message.contains("duplicate")));
        assert!(errors
            .iter()
            .any(|e| e.row == 2 && e.message.contains("already exists")));
    }

    #[test]
    fn test_intra_file_error_lands_on_repeating_row() {
        let records = vec![valid_row("A"), valid_row("A")];
        let errors = validate_records(&records, students(), &HashSet::new());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row, 2);
    }

    #[test]
    fn test_email_shape() {
        assert!(is_email_shaped("bob@example.com"));
        assert!(!is_email_shaped("bob@example"));
        assert!(!is_email_shaped("bob example.com"));
        assert!(!is_email_shaped("@example.com"));
    }

    #[test]
    fn test_both_email_columns_checked() {
        let mut row = valid_row("S-001");
        row["email"] = json!("bob@example");
        row["guardian_email"] = json!("mom@example");
        let errors = validate_records(&[row], students(), &HashSet::new());

        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("'email'"));
        assert!(errors[1].message.contains("'guardian_email'"));
    }

    #[test]
    fn test_numeric_shape() {
        let mut row = valid_row("S-001");
        row["grade_level"] = json!("abc");
        let errors = validate_records(&[row], students(), &HashSet::new());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("grade_level"));

        let mut ok = valid_row("S-002");
        ok["grade_level"] = json!("7");
        assert!(validate_records(&[ok], students(), &HashSet::new()).is_empty());
    }

    #[test]
    fn test_kinds_without_rules_skip_validation() {
        let row = json!({ "email": "not-an-email" });
        let errors =
            validate_records(&[row], EntityKind::Educators.schema(), &HashSet::new());
        assert!(errors.is_empty());
    }
}
