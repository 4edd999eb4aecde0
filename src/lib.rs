//! # Rosterload - education dashboard backend
//!
//! Rosterload is the backend for an education organization's admin
//! dashboard: staff browse centers, programs, and per-program tables,
//! edit rows, bulk-import rosters from CSV, and dictate field values.
//! Persistence lives in a hosted data API; this crate holds the import
//! pipeline, the per-kind schema tables, and the HTTP surface.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Validate + │────▶│ Bulk insert │
//! │  (auto-enc) │     │  (preview)  │     │   Coerce    │     │ (hosted API)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rosterload::{EntityKind, ImportPipeline, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let pipeline = ImportPipeline::new(MemoryStore::new());
//!     let report = pipeline
//!         .run(EntityKind::Students, csv_bytes)
//!         .await
//!         .unwrap();
//!     println!("Imported {} rows", report.inserted);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - hierarchical error types
//! - [`schema`] - entity kinds and per-kind column tables
//! - [`parser`] - CSV parsing with encoding auto-detection
//! - [`import`] - validator, coercion, and the import pipeline
//! - [`store`] - backing-store collaborators (hosted API, in-memory)
//! - [`speech`] - speech-to-text dictation client
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod schema;

// Parsing
pub mod parser;

// Import pipeline
pub mod import;

// Backing stores
pub mod store;

// Dictation
pub mod speech;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CsvError, CsvResult, ImportError, ImportResult, StoreError, StoreResult};

// =============================================================================
// Re-exports - Schema
// =============================================================================

pub use schema::{Coercion, ColumnSpec, EntityKind, TargetSchema, Widget};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_encoding, parse_bytes, parse_preview, read_file, ParseOutcome,
    PREVIEW_ROWS,
};

// =============================================================================
// Re-exports - Import pipeline
// =============================================================================

pub use import::{
    coerce_record, coerce_value, format_validation_errors, stamp_created, validate_records,
    ImportPipeline, ImportPreview, ImportReport, ValidationError,
};

// =============================================================================
// Re-exports - Stores
// =============================================================================

pub use store::{ChangeAction, ChangeEvent, DataStore, MemoryStore, RestStore};

// =============================================================================
// Re-exports - Speech
// =============================================================================

pub use speech::{SpeechClient, SpeechError};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, ImportResponse, PreviewResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
