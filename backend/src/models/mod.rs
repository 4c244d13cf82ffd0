//! Domain models for the assay normalization pipeline.
//!
//! This module contains the core data structures passed between stages:
//!
//! - [`Cell`] - A single CSV value (empty, text or number)
//! - [`TabularRecord`] - Headers plus rows, owned by one stage at a time
//! - [`Group`] - A named subset of sample columns rendered as one sheet
//! - [`Sheet`] - A finished sheet with literal cells and formula cells
//! - [`SheetCell`] - Tagged view of a sheet cell for serializers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Cells and records
// =============================================================================

/// A single value read from the CSV export.
///
/// Serializes as `null`, a number or a string. Non-finite numbers go out as
/// the spreadsheet error text from [`non_finite_token`].
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    /// Blank CSV field.
    #[default]
    Empty,
    /// Numeric field.
    Number(f64),
    /// Anything that is not a finite number.
    Text(String),
}

impl Cell {
    /// Type a raw CSV field: blank or whitespace-only → `Empty`, finite number → `Number`,
    /// anything else → `Text`.
    pub fn from_field(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Textual form used for headers and aggregation keys.
    ///
    /// Numbers use their shortest display form, so `1.0` and `"1"` agree.
    pub fn to_key(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }
}

/// Error text a spreadsheet shows for a non-finite result.
pub fn non_finite_token(n: f64) -> &'static str {
    if n.is_infinite() {
        "#DIV/0!"
    } else {
        "#NUM!"
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Cell::Empty => serializer.serialize_none(),
            Cell::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            Cell::Number(n) => serializer.serialize_str(non_finite_token(*n)),
            Cell::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

/// One row of cells; index `i` belongs to header `i`.
pub type Row = Vec<Cell>;

/// Headers plus rows.
///
/// Column 0 always holds the protein / entity identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TabularRecord {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl TabularRecord {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a header, compared exactly.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

// =============================================================================
// Groups
// =============================================================================

/// A named subset of sample columns.
///
/// `columns` are 1-based sample indices: `1` is the first column after the
/// identity column of the normalized record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub columns: Vec<usize>,
}

impl Group {
    pub fn new(name: impl Into<String>, columns: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn contains(&self, column: usize) -> bool {
        self.columns.contains(&column)
    }
}

// =============================================================================
// Sheets
// =============================================================================

/// A cell as seen by a serializer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SheetCell {
    Literal(Cell),
    /// Spreadsheet formula without the leading `=`.
    Formula(String),
}

/// A finished sheet.
///
/// Coordinates in `formula_cells` are 0-based and sheet-local: row 0 is the
/// header row, row 1 the first data row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub name: String,
    pub header_row: Row,
    pub data_rows: Vec<Row>,
    #[serde(serialize_with = "serialize_formula_cells")]
    pub formula_cells: BTreeMap<(u32, u32), String>,
}

/// JSON object keys must be strings, so formulas go out as a list.
fn serialize_formula_cells<S>(
    cells: &BTreeMap<(u32, u32), String>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    #[derive(Serialize)]
    struct FormulaCell<'a> {
        row: u32,
        col: u32,
        formula: &'a str,
    }

    serializer.collect_seq(cells.iter().map(|(&(row, col), formula)| FormulaCell {
        row,
        col,
        formula,
    }))
}

impl Sheet {
    pub fn new(name: impl Into<String>, header_row: Row) -> Self {
        Self {
            name: name.into(),
            header_row,
            data_rows: Vec::new(),
            formula_cells: BTreeMap::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.header_row.len()
    }

    /// Header row followed by data rows.
    pub fn row_count(&self) -> usize {
        self.data_rows.len() + 1
    }

    /// The cell at a sheet-local position; formulas win over literals.
    pub fn cell(&self, row: u32, col: u32) -> SheetCell {
        if let Some(formula) = self.formula_cells.get(&(row, col)) {
            return SheetCell::Formula(formula.clone());
        }
        let literal = if row == 0 {
            self.header_row.get(col as usize)
        } else {
            self.data_rows
                .get(row as usize - 1)
                .and_then(|r| r.get(col as usize))
        };
        SheetCell::Literal(literal.cloned().unwrap_or_default())
    }

    /// Every non-empty cell in row-major order.
    pub fn cells(&self) -> Vec<(u32, u32, SheetCell)> {
        let mut out = Vec::new();
        for row in 0..self.row_count() as u32 {
            for col in 0..self.width() as u32 {
                match self.cell(row, col) {
                    SheetCell::Literal(Cell::Empty) => {}
                    cell => out.push((row, col, cell)),
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_typing() {
        assert_eq!(Cell::from_field(""), Cell::Empty);
        assert_eq!(Cell::from_field("12.5"), Cell::Number(12.5));
        assert_eq!(Cell::from_field("-3"), Cell::Number(-3.0));
        assert_eq!(Cell::from_field("BSA"), Cell::Text("BSA".into()));
        assert_eq!(Cell::from_field("NaN"), Cell::Text("NaN".into()));
        assert_eq!(Cell::from_field("inf"), Cell::Text("inf".into()));
        assert_eq!(Cell::from_field(" 4 "), Cell::Number(4.0));
    }

    #[test]
    fn test_whitespace_only_field_is_empty() {
        assert_eq!(Cell::from_field(" "), Cell::Empty);
        assert_eq!(Cell::from_field("\t "), Cell::Empty);
    }

    #[test]
    fn test_cell_json() {
        assert_eq!(serde_json::to_value(Cell::Empty).unwrap(), serde_json::Value::Null);
        assert_eq!(serde_json::to_value(Cell::Number(4.5)).unwrap(), 4.5);
        assert_eq!(serde_json::to_value(Cell::from("BSA")).unwrap(), "BSA");
        assert_eq!(serde_json::to_value(Cell::Number(f64::NAN)).unwrap(), "#NUM!");
        assert_eq!(
            serde_json::to_value(Cell::Number(f64::NEG_INFINITY)).unwrap(),
            "#DIV/0!"
        );
    }

    #[test]
    fn test_column_index() {
        let record = TabularRecord::new(vec!["Protein".into(), "S1".into()], vec![]);
        assert_eq!(record.column_index("S1"), Some(1));
        assert_eq!(record.column_index("s1"), None);
    }

    #[test]
    fn test_numeric_keys_match_text() {
        assert_eq!(Cell::Number(1.0).to_key(), Cell::Text("1".into()).to_key());
        assert_eq!(Cell::Number(2.5).to_key(), "2.5");
    }

    #[test]
    fn test_sheet_cell_lookup() {
        let mut sheet = Sheet::new("G", vec!["Protein".into(), "S1".into()]);
        sheet.data_rows.push(vec!["BSA".into(), 8.0.into()]);
        sheet.data_rows.push(vec![Cell::Empty, Cell::Empty]);
        sheet.formula_cells.insert((2, 1), "SUM(B2:B2)".into());

        assert_eq!(sheet.cell(0, 1), SheetCell::Literal("S1".into()));
        assert_eq!(sheet.cell(1, 1), SheetCell::Literal(Cell::Number(8.0)));
        assert_eq!(sheet.cell(2, 1), SheetCell::Formula("SUM(B2:B2)".into()));
        assert_eq!(sheet.cells().len(), 5);
    }

    #[test]
    fn test_sheet_serializes_formulas_as_list() {
        let mut sheet = Sheet::new("G", vec!["Protein".into()]);
        sheet.formula_cells.insert((2, 1), "SUM(B2:B2)".into());
        let json = serde_json::to_value(&sheet).unwrap();
        assert_eq!(json["formulaCells"][0]["row"], 2);
        assert_eq!(json["formulaCells"][0]["formula"], "SUM(B2:B2)");
        assert_eq!(json["headerRow"][0], "Protein");
    }
}
