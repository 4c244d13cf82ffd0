//! Reduce repeated protein measurements to one row per protein.
//!
//! # Architecture
//!
//! ```text
//! Reconciled rows (repeats)        →  Aggregated rows (geometric means)
//! ┌──────────────────────────┐       ┌──────────────────────────┐
//! │ Actin  ...  2    10      │       │ Actin  ...  4    10      │
//! │ Actin  ...  8    10      │  →    ├──────────────────────────┤
//! │ BSA    ...  5    20      │       │ BSA    ...  5    20      │
//! └──────────────────────────┘       └──────────────────────────┘
//! ```
//!
//! Proteins keep the order in which they first appear.

use indexmap::IndexMap;

use crate::error::{AggregateError, AggregateResult};
use crate::models::{Cell, Row, TabularRecord};

/// Rows grouped by identity, in first-seen order.
pub type ProteinGroups = IndexMap<String, Vec<Row>>;

/// What to do when a protein has no positive value in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyValuePolicy {
    /// Abort with [`AggregateError::EmptyGroup`].
    #[default]
    Fail,
    /// Write `NaN` and carry on.
    Propagate,
}

/// Group rows by the textual value of `column`.
///
/// Rows with an empty identity cell are not grouped.
pub fn group_by_column(record: &TabularRecord, column: usize) -> AggregateResult<ProteinGroups> {
    if column >= record.width() {
        return Err(AggregateError::MissingColumn {
            index: column,
            width: record.width(),
        });
    }

    let mut groups = ProteinGroups::new();
    for row in &record.rows {
        let key = match row.get(column) {
            Some(cell) if !cell.is_empty() => cell.to_key(),
            _ => continue,
        };
        groups.entry(key).or_default().push(row.clone());
    }

    Ok(groups)
}

/// Geometric mean of the positive values; `None` when there are none.
///
/// Zeros and negatives are dropped before taking logs.
pub fn geometric_mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (count, log_sum) = values
        .into_iter()
        .filter(|v| *v > 0.0)
        .fold((0usize, 0.0f64), |(n, sum), v| (n + 1, sum + v.ln()));

    if count == 0 {
        None
    } else {
        Some((log_sum / count as f64).exp())
    }
}

/// Reduce every group to one row: the key, the auxiliary identity cells of
/// the group's first row, then the geometric mean of each measurement column.
///
/// The auxiliary cells make the row `[key, aux…, mean…]` rather than just
/// `[key, mean…]`, so the output keeps the input's headers. [`normalize`]
/// drops them again, and its output has the `[key, value…]` shape.
///
/// [`normalize`]: super::normalize::normalize
pub fn aggregate(
    headers: &[String],
    groups: &ProteinGroups,
    identity_columns: usize,
    policy: EmptyValuePolicy,
) -> AggregateResult<TabularRecord> {
    let mut rows = Vec::with_capacity(groups.len());

    for (key, members) in groups {
        let mut row: Row = Vec::with_capacity(headers.len());
        row.push(Cell::Text(key.clone()));

        let first = members.first();
        for col in 1..identity_columns.min(headers.len()) {
            row.push(
                first
                    .and_then(|r| r.get(col))
                    .cloned()
                    .unwrap_or_default(),
            );
        }

        for (col, header) in headers.iter().enumerate().skip(identity_columns) {
            let values = members
                .iter()
                .filter_map(|r| r.get(col).and_then(Cell::as_number));
            let mean = match (geometric_mean(values), policy) {
                (Some(mean), _) => mean,
                (None, EmptyValuePolicy::Propagate) => f64::NAN,
                (None, EmptyValuePolicy::Fail) => {
                    return Err(AggregateError::EmptyGroup {
                        key: key.clone(),
                        column: header.clone(),
                    })
                }
            };
            row.push(Cell::Number(mean));
        }

        rows.push(row);
    }

    Ok(TabularRecord::new(headers.to_vec(), rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        ["Protein", "Gene", "Desc", "S1", "S2"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn row(id: &str, s1: f64, s2: f64) -> Row {
        vec![id.into(), "g".into(), Cell::Empty, s1.into(), s2.into()]
    }

    fn record(rows: Vec<Row>) -> TabularRecord {
        TabularRecord::new(headers(), rows)
    }

    fn assert_close(cell: &Cell, expected: f64) {
        let value = cell.as_number().expect("numeric cell");
        assert!((value - expected).abs() < 1e-9, "{value} != {expected}");
    }

    #[test]
    fn test_geometric_mean() {
        assert!((geometric_mean([2.0, 8.0]).unwrap() - 4.0).abs() < 1e-12);
        assert!((geometric_mean([2.0, -1.0, 8.0]).unwrap() - 4.0).abs() < 1e-12);
        assert!((geometric_mean([0.0, 2.0, 8.0]).unwrap() - 4.0).abs() < 1e-12);
        assert_eq!(geometric_mean([0.0, -3.0]), None);
        assert_eq!(geometric_mean(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_groups_keep_first_seen_order() {
        let record = record(vec![
            row("Zeta", 1.0, 1.0),
            row("Actin", 1.0, 1.0),
            row("Zeta", 2.0, 2.0),
            row("BSA", 1.0, 1.0),
        ]);
        let groups = group_by_column(&record, 0).unwrap();
        let keys: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Zeta", "Actin", "BSA"]);
        assert_eq!(groups["Zeta"].len(), 2);
    }

    #[test]
    fn test_numeric_keys_group_with_text() {
        let mut numeric = row("x", 1.0, 1.0);
        numeric[0] = Cell::Number(7.0);
        let record = record(vec![numeric, row("7", 2.0, 2.0)]);
        let groups = group_by_column(&record, 0).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["7"].len(), 2);
    }

    #[test]
    fn test_empty_identity_rows_are_skipped() {
        let record = record(vec![row("Actin", 1.0, 1.0), vec![Cell::Empty; 5]]);
        let groups = group_by_column(&record, 0).unwrap();
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_missing_group_column() {
        let result = group_by_column(&record(vec![]), 9);
        assert!(matches!(result, Err(AggregateError::MissingColumn { index: 9, .. })));
    }

    #[test]
    fn test_aggregate_geometric_means() {
        let record = record(vec![
            row("Actin", 2.0, 10.0),
            row("BSA", 5.0, 20.0),
            row("Actin", 8.0, 10.0),
        ]);
        let groups = group_by_column(&record, 0).unwrap();
        let result = aggregate(&record.headers, &groups, 3, EmptyValuePolicy::Fail).unwrap();

        assert_eq!(result.headers, headers());
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0][0], Cell::Text("Actin".into()));
        assert_eq!(result.rows[0][1], Cell::Text("g".into()));
        assert_close(&result.rows[0][3], 4.0);
        assert_close(&result.rows[0][4], 10.0);
        assert_close(&result.rows[1][3], 5.0);
        assert!(result.rows.iter().all(|r| r.len() == 5));
    }

    #[test]
    fn test_text_and_empty_cells_are_ignored() {
        let mut noisy = row("Actin", 0.0, 0.0);
        noisy[3] = Cell::Text("n/a".into());
        noisy[4] = Cell::Empty;
        let record = record(vec![noisy, row("Actin", 3.0, 6.0)]);
        let groups = group_by_column(&record, 0).unwrap();
        let result = aggregate(&record.headers, &groups, 3, EmptyValuePolicy::Fail).unwrap();
        assert_close(&result.rows[0][3], 3.0);
        assert_close(&result.rows[0][4], 6.0);
    }

    #[test]
    fn test_empty_group_fails() {
        let record = record(vec![row("Actin", 0.0, 2.0), row("Actin", -1.0, 2.0)]);
        let groups = group_by_column(&record, 0).unwrap();
        let err = aggregate(&record.headers, &groups, 3, EmptyValuePolicy::Fail).unwrap_err();
        match err {
            AggregateError::EmptyGroup { key, column } => {
                assert_eq!(key, "Actin");
                assert_eq!(column, "S1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_group_propagates_nan() {
        let record = record(vec![row("Actin", 0.0, 2.0)]);
        let groups = group_by_column(&record, 0).unwrap();
        let result = aggregate(&record.headers, &groups, 3, EmptyValuePolicy::Propagate).unwrap();
        assert!(result.rows[0][3].as_number().unwrap().is_nan());
        assert_close(&result.rows[0][4], 2.0);
    }
}
