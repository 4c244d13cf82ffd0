//! Workbook serialization.
//!
//! Turns finished [`Sheet`]s into an xlsx workbook with `umya-spreadsheet`,
//! and exports a normalized record as CSV.
//!
//! # Example
//!
//! ```rust,ignore
//! use assaynorm::workbook::{save, SaveDestination};
//!
//! let bytes = save(&sheets, SaveDestination::Bytes)?.unwrap();
//! std::fs::write("out.xlsx", bytes)?;
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;
use umya_spreadsheet::Spreadsheet;

use crate::error::{WorkbookError, WorkbookResult};
use crate::models::{non_finite_token, Cell, Sheet, SheetCell, TabularRecord};

/// Longest sheet name xlsx accepts.
pub const MAX_SHEET_NAME_LEN: usize = 31;

static FORBIDDEN_SHEET_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\[\]:*?/\\]").expect("valid regex"));

/// Where to put the encoded workbook.
pub enum SaveDestination<'a> {
    /// Write to a file.
    Path(&'a Path),
    /// Return the bytes.
    Bytes,
}

/// Make a group name acceptable as an xlsx sheet name.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned = FORBIDDEN_SHEET_CHARS.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_matches('\'');
    let truncated: String = cleaned.chars().take(MAX_SHEET_NAME_LEN).collect();
    if truncated.is_empty() {
        "Sheet".to_string()
    } else {
        truncated
    }
}

/// Build an in-memory workbook, one worksheet per sheet in order.
pub fn to_spreadsheet(sheets: &[Sheet]) -> WorkbookResult<Spreadsheet> {
    let mut book = umya_spreadsheet::new_file_empty_worksheet();
    let mut seen = HashSet::new();

    for sheet in sheets {
        let name = sanitize_sheet_name(&sheet.name);
        // xlsx sheet names are case-insensitive
        if !seen.insert(name.to_lowercase()) {
            return Err(WorkbookError::DuplicateSheet(name));
        }

        let ws = book
            .new_sheet(name.as_str())
            .map_err(|e| WorkbookError::Xlsx(umya_spreadsheet::XlsxError::CellError(e.to_string())))?;

        for (row, col, cell) in sheet.cells() {
            // umya uses 1-based (col, row)
            let target = ws.get_cell_mut((col + 1, row + 1));
            match cell {
                SheetCell::Formula(formula) => {
                    let formula = formula.strip_prefix('=').unwrap_or(&formula).to_string();
                    target.set_formula(formula);
                }
                SheetCell::Literal(Cell::Number(n)) if n.is_finite() => {
                    target.set_value_number(n);
                }
                SheetCell::Literal(Cell::Number(n)) => {
                    target.set_value(non_finite_token(n));
                }
                SheetCell::Literal(Cell::Text(s)) => {
                    target.set_value_string(s);
                }
                SheetCell::Literal(Cell::Empty) => {}
            }
        }
    }

    Ok(book)
}

/// Encode the sheets as xlsx and write them to `dest`.
///
/// Returns the bytes for [`SaveDestination::Bytes`], `None` otherwise.
pub fn save(sheets: &[Sheet], dest: SaveDestination<'_>) -> WorkbookResult<Option<Vec<u8>>> {
    let book = to_spreadsheet(sheets)?;
    match dest {
        SaveDestination::Path(path) => {
            umya_spreadsheet::writer::xlsx::write(&book, path)?;
            Ok(None)
        }
        SaveDestination::Bytes => {
            let mut buf = Cursor::new(Vec::new());
            umya_spreadsheet::writer::xlsx::write_writer(&book, &mut buf)?;
            Ok(Some(buf.into_inner()))
        }
    }
}

/// Write a record as comma-separated text.
///
/// Non-finite numbers are written as `NaN` / `inf`.
pub fn export_csv<W: Write>(record: &TabularRecord, writer: W) -> WorkbookResult<()> {
    let mut csv_writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    csv_writer.write_record(&record.headers)?;
    for row in &record.rows {
        csv_writer.write_record(row.iter().map(Cell::to_key))?;
    }
    csv_writer.flush()?;
    Ok(())
}
