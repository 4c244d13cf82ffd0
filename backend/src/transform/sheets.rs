//! Split normalized data into one sheet per sample group.
//!
//! Every sheet has the same shape:
//!
//! ```text
//!      A        B      C      D      E
//! 1  Protein   S2     S3     AVG    SD          header row
//! 2  BSA       8      8                         data rows
//! 3  Actin     4      2
//! 4                                             spacer
//! 5  Sum      =SUM(B2:B3)  ...  =AVERAGE(B5:C5)  =STDEV(B5:C5)
//! ```
//!
//! AVG and SD only appear on group sheets. A final "All data" sheet carries
//! every column.

use std::collections::HashSet;

use crate::error::{GroupResult, GroupSpecError};
use crate::models::{Cell, Group, Row, Sheet, TabularRecord};
use crate::workbook::sanitize_sheet_name;

/// Name of the sheet holding every column.
pub const ALL_DATA_SHEET: &str = "All data";

/// Label written in the identity column of the sum row.
pub const SUM_LABEL: &str = "Sum";

/// Output toggles for sheet building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetOptions {
    /// Add AVG and SD columns to group sheets.
    pub summary_statistics: bool,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            summary_statistics: true,
        }
    }
}

/// Convert a 0-based column index into spreadsheet letters (A, …, Z, AA, …).
pub fn col_to_letters(mut col: u32) -> String {
    let mut buf = Vec::new();
    loop {
        buf.push(b'A' + (col % 26) as u8);
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1; // letters are bijective base-26
    }
    buf.iter().rev().map(|&b| char::from(b)).collect()
}

/// Fail when two groups, or a group and "All data", would end up as the
/// same xlsx sheet. Names are compared after sanitizing, ignoring case.
pub fn check_sheet_names(groups: &[Group]) -> GroupResult<()> {
    let mut seen = HashSet::new();
    seen.insert(sanitize_sheet_name(ALL_DATA_SHEET).to_lowercase());

    for group in groups {
        let sheet = sanitize_sheet_name(&group.name);
        if !seen.insert(sheet.to_lowercase()) {
            return Err(GroupSpecError::DuplicateSheetName {
                group: group.name.clone(),
                sheet,
            });
        }
    }
    Ok(())
}

/// Build one sheet per group, in declaration order, followed by the
/// "All data" sheet.
pub fn build(
    record: &TabularRecord,
    groups: &[Group],
    options: &SheetOptions,
) -> GroupResult<Vec<Sheet>> {
    check_sheet_names(groups)?;

    let mut sheets = Vec::with_capacity(groups.len() + 1);

    for group in groups {
        let columns = select_columns(record, group)?;
        sheets.push(project(
            record,
            &group.name,
            &columns,
            options.summary_statistics,
        ));
    }

    let all: Vec<usize> = (0..record.width()).collect();
    sheets.push(project(record, ALL_DATA_SHEET, &all, false));

    Ok(sheets)
}

/// Identity column plus the group's columns, in header order.
fn select_columns(record: &TabularRecord, group: &Group) -> GroupResult<Vec<usize>> {
    let available = record.width().saturating_sub(1);
    if let Some(&column) = group.columns.iter().find(|&&c| c == 0 || c > available) {
        return Err(GroupSpecError::ColumnOutOfRange {
            group: group.name.clone(),
            column,
            available,
        });
    }

    Ok(std::iter::once(0)
        .chain((1..record.width()).filter(|&c| group.contains(c)))
        .collect())
}

/// Project `columns` of the record into a sheet and append the spacer and
/// sum rows.
fn project(record: &TabularRecord, name: &str, columns: &[usize], statistics: bool) -> Sheet {
    let extra = if statistics { 2 } else { 0 };
    let width = columns.len() + extra;

    let mut header_row: Row = columns
        .iter()
        .map(|&c| Cell::Text(record.headers.get(c).cloned().unwrap_or_default()))
        .collect();
    if statistics {
        header_row.push(Cell::from("AVG"));
        header_row.push(Cell::from("SD"));
    }

    let mut sheet = Sheet::new(name, header_row);
    for row in &record.rows {
        let mut projected: Row = columns
            .iter()
            .map(|&c| row.get(c).cloned().unwrap_or_default())
            .collect();
        projected.resize(width, Cell::Empty);
        sheet.data_rows.push(projected);
    }

    let data_count = record.rows.len() as u32;
    // Spreadsheet rows are 1-based and row 1 is the header.
    let first_data = 2;
    let last_data = data_count + 1;
    let sum_row_number = data_count + 3;
    let sum_row_index = data_count + 2;

    sheet.data_rows.push(vec![Cell::Empty; width]);
    let mut sum_row = vec![Cell::Empty; width];
    sum_row[0] = Cell::from(SUM_LABEL);
    sheet.data_rows.push(sum_row);

    for col in 1..columns.len() as u32 {
        let letters = col_to_letters(col);
        sheet.formula_cells.insert(
            (sum_row_index, col),
            format!("SUM({letters}{first_data}:{letters}{last_data})"),
        );
    }

    if statistics && columns.len() > 1 {
        let range = format!(
            "B{row}:{last}{row}",
            row = sum_row_number,
            last = col_to_letters(columns.len() as u32 - 1)
        );
        let avg_col = columns.len() as u32;
        sheet
            .formula_cells
            .insert((sum_row_index, avg_col), format!("AVERAGE({range})"));
        sheet
            .formula_cells
            .insert((sum_row_index, avg_col + 1), format!("STDEV({range})"));
    }

    sheet
}
