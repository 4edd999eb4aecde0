//! REST API types for the dashboard frontend.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::import::{ImportPreview, ImportReport};

/// Response for a confirmed CSV import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    /// Unique job identifier.
    pub job_id: String,

    /// Status: "imported" on success.
    pub status: String,

    /// Target table.
    pub kind: String,

    /// Number of rows persisted by the bulk insert.
    pub inserted: usize,
}

impl From<ImportReport> for ImportResponse {
    fn from(report: ImportReport) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            status: "imported".to_string(),
            kind: report.kind.table().to_string(),
            inserted: report.inserted,
        }
    }
}

/// Response for the pre-confirmation preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub headers: Vec<String>,
    /// First 3 data rows, parsed exactly as the import will parse them.
    pub rows: Vec<Value>,
    pub encoding: String,
}

impl From<ImportPreview> for PreviewResponse {
    fn from(preview: ImportPreview) -> Self {
        Self {
            headers: preview.headers,
            rows: preview.rows,
            encoding: preview.encoding,
        }
    }
}

/// Response for the dictation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictationResponse {
    pub transcript: String,
}

/// Create a generic error response body.
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

/// Create a validation-rejection response body.
///
/// `summary` is the truncated multi-line report (up to 5 messages plus an
/// overflow line); `messages` carries the complete list.
pub fn rejection_response(summary: &str, messages: Vec<String>) -> Value {
    json!({
        "status": "rejected",
        "error": summary,
        "validationErrors": messages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EntityKind;

    #[test]
    fn test_import_response_from_report() {
        let response: ImportResponse =
            ImportReport { kind: EntityKind::Students, inserted: 12 }.into();
        assert_eq!(response.status, "imported");
        assert_eq!(response.kind, "students");
        assert_eq!(response.inserted, 12);
        assert!(!response.job_id.is_empty());
    }

    #[test]
    fn test_rejection_body_carries_full_list() {
        let body = rejection_response(
            "Row 1: missing required field 'email'",
            vec!["Row 1: missing required field 'email'".into()],
        );
        assert_eq!(body["status"], "rejected");
        assert_eq!(body["validationErrors"].as_array().unwrap().len(), 1);
    }
}
