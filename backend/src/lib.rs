//! # assaynorm - protein assay normalization
//!
//! assaynorm turns a plate reader's protein export into a normalized xlsx
//! workbook: repeated measurements are reduced to geometric means, every
//! sample is scaled against a reference protein (BSA by default), and the
//! samples are split into one sheet per group.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐   ┌─────────────┐   ┌─────────────┐
//! │ CSV export  │──▶│   Parser    │──▶│  Reconcile + │──▶│  Normalize  │──▶│   Sheets /  │
//! │ (any enc.)  │   │ (auto-enc)  │   │  Aggregate   │   │ (reference) │   │  Workbook   │
//! └─────────────┘   └─────────────┘   └──────────────┘   └─────────────┘   └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use assaynorm::{process_file, write_workbook, RunConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RunConfig::load("groups.json").unwrap();
//!     let result = process_file(Path::new("plate.csv"), &config).await.unwrap();
//!     write_workbook(&result.sheets, Path::new("plate_normalized.xlsx")).await.unwrap();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells, records, groups and sheets
//! - [`parser`] - CSV parsing with encoding detection
//! - [`config`] - Run configuration
//! - [`transform`] - Reconciliation, aggregation, normalization, sheets
//! - [`validation`] - Config schema and non-finite checks
//! - [`workbook`] - xlsx and CSV output
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Configuration
pub mod config;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Output
pub mod workbook;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AggregateError, ConfigError, CsvError, GroupSpecError, NormalizeError, PipelineError,
    ServerError, WorkbookError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, Group, Row, Sheet, SheetCell, TabularRecord};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{example_config, output_file_name, GroupSpec, RunConfig, SourceLayout};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid_run_config, validate_finite, validate_run_config};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{decode_content, detect_encoding, parse, parse_bytes, parse_file, ParseResult};

// =============================================================================
// Re-exports - Transformation stages
// =============================================================================

pub use transform::{
    aggregate, build, col_to_letters, find_reference, geometric_mean, group_by_column, normalize,
    reconcile, EmptyValuePolicy, SheetOptions,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    process_bytes, process_file, process_record, workbook_bytes, write_workbook, CsvInfo,
    ProcessResult,
};

// =============================================================================
// Re-exports - Workbook
// =============================================================================

pub use workbook::{export_csv, save, sanitize_sheet_name, SaveDestination};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, PreviewResponse, ResponseMetadata};

// Server
pub mod server {
    pub use crate::api::server::{app, start_server};
}
