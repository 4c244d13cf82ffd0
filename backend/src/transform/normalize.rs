//! Normalization against a reference protein.
//!
//! Every measurement is divided by the reference protein's value in the same
//! sample column and scaled by the reference concentration:
//!
//! ```text
//! normalized = value / reference[column] * scale
//! ```
//!
//! The reference row is normalized too (and therefore becomes `scale` in
//! every column). Auxiliary identity columns are dropped from the output.

use crate::error::{NormalizeError, NormalizeResult};
use crate::models::{Cell, Row, TabularRecord};

/// Find the row whose identity cell matches `reference_key`, ignoring case.
pub fn find_reference<'a>(record: &'a TabularRecord, reference_key: &str) -> Option<&'a Row> {
    let wanted = reference_key.to_lowercase();
    record.rows.iter().find(|row| {
        row.first()
            .map(|cell| cell.to_key().to_lowercase() == wanted)
            .unwrap_or(false)
    })
}

/// Normalize every measurement column against the reference row.
///
/// Columns `1..identity_columns` are dropped; the output headers are the
/// identity header followed by the measurement headers. A reference value of
/// zero yields `inf` or `NaN`.
pub fn normalize(
    record: &TabularRecord,
    reference_key: &str,
    scale: f64,
    identity_columns: usize,
) -> NormalizeResult<TabularRecord> {
    let reference = find_reference(record, reference_key)
        .ok_or_else(|| NormalizeError::ReferenceNotFound(reference_key.to_string()))?;

    let first_measurement = identity_columns.max(1);
    let divisors: Vec<f64> = (first_measurement..record.width())
        .map(|col| reference.get(col).map(numeric).unwrap_or(f64::NAN))
        .collect();

    let mut headers = Vec::with_capacity(divisors.len() + 1);
    headers.extend(record.headers.first().cloned());
    headers.extend(record.headers.iter().skip(first_measurement).cloned());

    let rows = record
        .rows
        .iter()
        .map(|row| {
            let mut out: Row = Vec::with_capacity(headers.len());
            out.push(row.first().cloned().unwrap_or_default());
            for (offset, divisor) in divisors.iter().enumerate() {
                let value = row.get(first_measurement + offset).map(numeric).unwrap_or(f64::NAN);
                out.push(Cell::Number(value / divisor * scale));
            }
            out
        })
        .collect();

    Ok(TabularRecord::new(headers, rows))
}

/// Aggregated cells are numbers; anything else has no value.
fn numeric(cell: &Cell) -> f64 {
    cell.as_number().unwrap_or(f64::NAN)
}
