//! CSV import: validation, type coercion, and the orchestrating pipeline.
//!
//! Flow: parse → preview (first 3 rows) → on confirm: parse again (full) →
//! fetch existing identifiers → validate → coerce → bulk-persist → report.

pub mod coerce;
pub mod pipeline;
pub mod validate;

pub use coerce::{coerce_record, coerce_value, stamp_created};
pub use pipeline::{
    format_validation_errors, ImportPipeline, ImportPreview, ImportReport,
};
pub use validate::{validate_records, ValidationError};
