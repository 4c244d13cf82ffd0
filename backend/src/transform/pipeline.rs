//! High-level pipeline API: instrument export in, sheets out.
//!
//! This module combines all stages: parsing, header reconciliation,
//! aggregation, normalization, validation and sheet building.
//!
//! # Example
//!
//! ```rust,ignore
//! use assaynorm::{process_file, RunConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::load("groups.json")?;
//!     let result = process_file(Path::new("plate.csv"), &config).await?;
//!
//!     println!("Built {} sheets", result.sheets.len());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::path::Path;

use super::aggregate::{aggregate, group_by_column, EmptyValuePolicy};
use super::normalize::normalize;
use super::reconcile::reconcile;
use super::sheets::{build, SheetOptions};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::RunConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Group, Sheet, TabularRecord};
use crate::parser::{parse_bytes, ParseResult};
use crate::validation::validate_finite;
use crate::workbook::{save, SaveDestination};

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    /// Group sheets followed by the "All data" sheet
    pub sheets: Vec<Sheet>,

    /// Normalized record the sheets were built from
    pub normalized: TabularRecord,

    /// Non-finite cells tolerated in lenient mode
    pub warnings: Vec<String>,

    /// Input file information
    pub csv_info: CsvInfo,
}

/// Input file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    /// Body rows in the file, boilerplate included
    pub row_count: usize,
    /// Rows left after dropping the boilerplate
    pub data_rows: usize,
    /// Distinct proteins
    pub proteins: usize,
    /// Sample column headers
    pub samples: Vec<String>,
}

/// Run the pipeline on raw file bytes.
///
/// Group specs are checked before the bytes are decoded.
pub fn process_bytes(bytes: &[u8], config: &RunConfig) -> PipelineResult<ProcessResult> {
    let groups = config.parsed_groups()?;
    let parse_result = parse_bytes(bytes)?;
    process_parsed(parse_result, &groups, config)
}

/// Run the pipeline on an already-decoded record.
pub fn process_record(record: TabularRecord, config: &RunConfig) -> PipelineResult<ProcessResult> {
    let groups = config.parsed_groups()?;
    let parse_result = ParseResult {
        record,
        encoding: "utf-8".to_string(),
    };
    process_parsed(parse_result, &groups, config)
}

/// Read a file and run the pipeline on it.
pub async fn process_file(path: &Path, config: &RunConfig) -> PipelineResult<ProcessResult> {
    log_info(format!("📖 Reading {}", path.display()));
    let bytes = tokio::fs::read(path)
        .await
        .map_err(crate::error::CsvError::from)?;
    process_bytes(&bytes, config)
}

/// Encode the sheets as xlsx and write them to `output`.
///
/// Nothing is written unless every stage succeeded.
pub async fn write_workbook(sheets: &[Sheet], output: &Path) -> PipelineResult<()> {
    let bytes = workbook_bytes(sheets)?;
    tokio::fs::write(output, bytes)
        .await
        .map_err(crate::error::WorkbookError::from)?;
    log_success(format!("💾 Workbook written to {}", output.display()));
    Ok(())
}

/// Encode the sheets as xlsx bytes.
pub fn workbook_bytes(sheets: &[Sheet]) -> PipelineResult<Vec<u8>> {
    Ok(save(sheets, SaveDestination::Bytes)?.unwrap_or_default())
}

/// Internal: run every stage after decoding
fn process_parsed(
    parse_result: ParseResult,
    groups: &[Group],
    config: &RunConfig,
) -> PipelineResult<ProcessResult> {
    let layout = &config.layout;

    let ParseResult { record, encoding } = parse_result;
    log_success(format!("Detected encoding: {}", encoding));
    log_success(format!("Read {} rows", record.len()));
    let row_count = record.len();

    // Step 1: headers
    log_info("📋 Reconciling headers...");
    let record = reconcile(record, layout)?;
    if record.is_empty() {
        return Err(PipelineError::EmptyInput(layout.skip_rows));
    }
    let data_rows = record.len();
    log_success(format!(
        "{} data rows after skipping {} boilerplate rows",
        data_rows, layout.skip_rows
    ));

    // Step 2: geometric means
    log_info("🧮 Aggregating repeated measurements...");
    let policy = if config.strict {
        EmptyValuePolicy::Fail
    } else {
        EmptyValuePolicy::Propagate
    };
    let protein_groups = group_by_column(&record, 0)?;
    let aggregated = aggregate(&record.headers, &protein_groups, layout.identity_columns, policy)?;
    log_success(format!("{} proteins", aggregated.len()));

    // Step 3: reference normalization
    log_info(format!(
        "⚖️  Normalizing against '{}' at {}",
        config.reference_key, config.reference_concentration
    ));
    let normalized = normalize(
        &aggregated,
        &config.reference_key,
        config.reference_concentration,
        layout.identity_columns,
    )?;

    // Step 4: non-finite values
    let warnings = match validate_finite(&normalized) {
        Ok(()) => Vec::new(),
        Err(problems) if config.strict => return Err(PipelineError::NonFinite(problems)),
        Err(problems) => {
            log_warning(format!("{} non-finite values kept", problems.len()));
            for problem in problems.iter().take(5) {
                log_info_indent(problem.clone(), 1);
            }
            problems
        }
    };

    // Step 5: sheets
    log_info("📑 Building sheets...");
    let options = SheetOptions {
        summary_statistics: config.summary_statistics,
    };
    let sheets = build(&normalized, groups, &options)?;
    for sheet in &sheets {
        log_info_indent(
            format!("{} ({} columns)", sheet.name, sheet.width()),
            1,
        );
    }
    log_success(format!("{} sheets ready", sheets.len()));

    let csv_info = CsvInfo {
        encoding,
        row_count,
        data_rows,
        proteins: normalized.len(),
        samples: normalized.headers.iter().skip(1).cloned().collect(),
    };

    Ok(ProcessResult {
        sheets,
        normalized,
        warnings,
        csv_info,
    })
}
