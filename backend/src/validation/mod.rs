//! Validation passes.
//!
//! - Run configurations are checked against an embedded JSON Schema
//!   (Draft 7, `schemas/run-config.json`) before deserialization, so users
//!   get every problem at once instead of the first serde error.
//! - Normalized records are checked for non-finite values (a reference value
//!   of zero, or a protein with no positive measurements).
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use assaynorm::validate_run_config;
//!
//! let config = json!({ "referenceConcentration": 8, "groups": [] });
//! assert!(validate_run_config(&config).is_ok());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::models::{Cell, TabularRecord};

static RUN_CONFIG_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/run-config.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate against the run configuration schema.
pub fn validate_run_config(data: &Value) -> Result<(), Vec<String>> {
    validate(&RUN_CONFIG_SCHEMA, data)
}

/// Quick check against the run configuration schema.
pub fn is_valid_run_config(data: &Value) -> bool {
    is_valid(&RUN_CONFIG_SCHEMA, data)
}

/// Find non-finite numbers in a record.
///
/// Each problem is reported as `"<row id> / <column header>: <value>"`.
/// Non-numeric cells outside the identity column are reported too, since
/// nothing downstream can sum them.
pub fn validate_finite(record: &TabularRecord) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for row in &record.rows {
        let id = row.first().map(Cell::to_key).unwrap_or_default();
        for (col, cell) in row.iter().enumerate().skip(1) {
            let header = record.headers.get(col).map(String::as_str).unwrap_or("?");
            match cell {
                Cell::Number(n) if n.is_finite() => {}
                Cell::Number(n) => errors.push(format!("{} / {}: {}", id, header, n)),
                other => errors.push(format!("{} / {}: '{}'", id, header, other)),
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
