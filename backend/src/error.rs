//! Error types for the assay normalization pipeline.
//!
//! Each stage owns one error enum:
//!
//! - [`CsvError`] - CSV ingestion and header reconciliation
//! - [`AggregateError`] - Geometric-mean aggregation
//! - [`NormalizeError`] - Reference normalization
//! - [`GroupSpecError`] - Group definitions and column selection
//! - [`WorkbookError`] - Spreadsheet encoding and writing
//! - [`ConfigError`] - Run configuration loading
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading the instrument export.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Input bytes could not be decoded.
    #[error("Failed to decode input: {0}")]
    EncodingError(String),

    /// Input is empty or lacks a row the layout requires.
    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

// =============================================================================
// Aggregation Errors
// =============================================================================

/// Errors while reducing protein groups to geometric means.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// A protein has no positive numeric value in a sample column.
    #[error("Protein '{key}' has no positive values in column '{column}'")]
    EmptyGroup { key: String, column: String },

    /// Grouping column does not exist.
    #[error("Grouping column {index} is out of range ({width} columns)")]
    MissingColumn { index: usize, width: usize },
}

// =============================================================================
// Normalization Errors
// =============================================================================

/// Errors while normalizing against the reference protein.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// No row matches the reference key.
    #[error("Reference protein '{0}' not found")]
    ReferenceNotFound(String),
}

// =============================================================================
// Group Errors
// =============================================================================

/// Errors in group definitions.
#[derive(Debug, Error)]
pub enum GroupSpecError {
    /// Column list is not a comma-separated list of integers.
    #[error("Invalid columns for group '{group}': {message}")]
    InvalidGroupSpec { group: String, message: String },

    /// Column index does not exist in the normalized data.
    #[error("Group '{group}' selects column {column}, but only {available} sample columns exist")]
    ColumnOutOfRange {
        group: String,
        column: usize,
        available: usize,
    },

    /// Two sheets would share a name in the workbook.
    #[error("Group '{group}' would be written as sheet '{sheet}', which is already taken")]
    DuplicateSheetName { group: String, sheet: String },
}

// =============================================================================
// Workbook Errors
// =============================================================================

/// Errors while encoding or writing the workbook.
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// Two sheets end up with the same name.
    #[error("Duplicate sheet name: {0}")]
    DuplicateSheet(String),

    /// The xlsx encoder failed.
    #[error("Xlsx error: {0}")]
    Xlsx(#[from] umya_spreadsheet::XlsxError),

    /// CSV export failed.
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("Workbook IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration does not match the schema.
    #[error("Invalid configuration: {}", .0.join("; "))]
    Schema(Vec<String>),

    /// JSON error.
    #[error("Configuration JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error.
    #[error("Configuration IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline::process_bytes`].
/// It wraps all lower-level errors and adds pipeline-specific variants.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Aggregation error.
    #[error("Aggregation error: {0}")]
    Aggregate(#[from] AggregateError),

    /// Normalization error.
    #[error("Normalization error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Group error.
    #[error("Group error: {0}")]
    Group(#[from] GroupSpecError),

    /// Workbook error.
    #[error("Workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Strict validation found non-finite values.
    #[error("{} non-finite values after normalization (first: {})", .0.len(), .0.first().map(String::as_str).unwrap_or("-"))]
    NonFinite(Vec<String>),

    /// No data rows left after dropping the boilerplate rows.
    #[error("No data rows after skipping {0} boilerplate rows")]
    EmptyInput(usize),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for aggregation.
pub type AggregateResult<T> = Result<T, AggregateError>;

/// Result type for normalization.
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Result type for group handling.
pub type GroupResult<T> = Result<T, GroupSpecError>;

/// Result type for workbook operations.
pub type WorkbookResult<T> = Result<T, WorkbookError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // NormalizeError -> PipelineError
        let err: PipelineError = NormalizeError::ReferenceNotFound("bsa".into()).into();
        assert!(err.to_string().contains("bsa"));

        // AggregateError -> PipelineError
        let err: PipelineError = AggregateError::EmptyGroup {
            key: "Actin".into(),
            column: "S1".into(),
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("Actin"));
        assert!(msg.contains("S1"));
    }

    #[test]
    fn test_group_error_format() {
        let err = GroupSpecError::InvalidGroupSpec {
            group: "Control".into(),
            message: "'x' is not an integer".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Control"));
        assert!(msg.contains("'x'"));
    }

    #[test]
    fn test_non_finite_format() {
        let err = PipelineError::NonFinite(vec!["Actin / S1".into(), "Actin / S2".into()]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 non-finite"));
        assert!(msg.contains("Actin / S1"));
    }
}
