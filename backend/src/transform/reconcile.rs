//! Header reconciliation for instrument exports.
//!
//! The export's first line only names the identity columns; the real sample
//! labels sit in a metadata row of the body, followed by a block of
//! boilerplate rows before the measurements start.
//!
//! ```text
//! Protein,Gene,Desc,x,x,x            →   Protein,Gene,Desc,S1,S2,S3
//! ...,...,...,S1,S2,S3   (label row)       Actin,ACTB,...,12,15,9
//! ...   (boilerplate)                      ...
//! Actin,ACTB,...,12,15,9
//! ```

use crate::config::SourceLayout;
use crate::error::{CsvError, CsvResult};
use crate::models::{Cell, Row, TabularRecord};

/// Rebuild headers from the label row and drop the boilerplate rows.
///
/// Every returned row has exactly as many cells as there are headers.
pub fn reconcile(record: TabularRecord, layout: &SourceLayout) -> CsvResult<TabularRecord> {
    let TabularRecord { headers: old_headers, rows: old_rows } = record;

    let label_row = old_rows.get(layout.label_row).ok_or_else(|| {
        CsvError::MalformedInput(format!(
            "expected sample labels in body row {}, but the file has {} body rows",
            layout.label_row,
            old_rows.len()
        ))
    })?;

    let mut headers: Vec<String> = old_headers
        .into_iter()
        .take(layout.identity_columns)
        .collect();
    headers.extend(
        label_row
            .iter()
            .skip(layout.identity_columns)
            .map(Cell::to_key),
    );

    let width = headers.len();
    let rows: Vec<Row> = old_rows
        .into_iter()
        .skip(layout.skip_rows)
        .map(|row| fit_row(row, width))
        .collect();

    Ok(TabularRecord::new(headers, rows))
}

/// Pad with empty cells or truncate to `width`.
fn fit_row(mut row: Row, width: usize) -> Row {
    row.resize(width, Cell::Empty);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    /// Export with `n` body rows: a label row, boilerplate, then data.
    fn export(n: usize) -> String {
        let mut lines = vec!["Protein,Gene,Desc,x,x".to_string()];
        for i in 0..n {
            match i {
                1 => lines.push("meta,meta,meta,S1,S2".to_string()),
                i if i < 12 => lines.push(format!("boiler{},,,,", i)),
                i => lines.push(format!("P{},G,D,{},{}", i, i, i * 2)),
            }
        }
        lines.join("\n")
    }

    #[test]
    fn test_headers_from_label_row() {
        let record = reconcile(parse(&export(14)).unwrap(), &SourceLayout::default()).unwrap();
        assert_eq!(record.headers, vec!["Protein", "Gene", "Desc", "S1", "S2"]);
    }

    #[test]
    fn test_skips_boilerplate_rows() {
        for n in [12, 13, 20] {
            let record = reconcile(parse(&export(n)).unwrap(), &SourceLayout::default()).unwrap();
            assert_eq!(record.rows.len(), n - 12);
        }

        let record = reconcile(parse(&export(14)).unwrap(), &SourceLayout::default()).unwrap();
        assert_eq!(record.rows[0][0], Cell::Text("P12".into()));
        assert_eq!(record.rows[0][4], Cell::Number(24.0));
    }

    #[test]
    fn test_rows_fit_header_width() {
        let csv = "Protein,Gene,Desc,x\nm,m,m,m\nm,m,m,S1,S2\nA,b,c,1\nB,b,c,1,2,3,4";
        let layout = SourceLayout {
            identity_columns: 3,
            label_row: 1,
            skip_rows: 2,
        };
        let record = reconcile(parse(csv).unwrap(), &layout).unwrap();
        assert_eq!(record.headers.len(), 5);
        assert!(record.rows.iter().all(|r| r.len() == 5));
        assert_eq!(record.rows[0][4], Cell::Empty);
        assert_eq!(record.rows[1][4], Cell::Number(2.0));
    }

    #[test]
    fn test_missing_label_row() {
        let result = reconcile(parse("Protein,Gene,Desc\nonly,one,row").unwrap(), &SourceLayout::default());
        assert!(matches!(result, Err(CsvError::MalformedInput(_))));
    }

    #[test]
    fn test_numeric_labels_become_text() {
        let csv = "Protein,x\nm,m\nm,101\nA,1";
        let layout = SourceLayout {
            identity_columns: 1,
            label_row: 1,
            skip_rows: 2,
        };
        let record = reconcile(parse(csv).unwrap(), &layout).unwrap();
        assert_eq!(record.headers, vec!["Protein", "101"]);
    }
}
