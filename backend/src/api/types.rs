//! REST API types for frontend integration.
//!
//! The preview endpoint returns the finished sheets as JSON so a client can
//! render them before downloading the workbook.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::Sheet;
use crate::transform::pipeline::{CsvInfo, ProcessResult};

/// Response sent after a preview run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready" or "warning"
    pub status: String,

    /// Group sheets followed by "All data"
    pub sheets: Vec<Sheet>,

    pub metadata: ResponseMetadata,
}

/// Metadata about the run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub csv_info: CsvInfo,

    /// Sheet names in workbook order
    pub sheet_names: Vec<String>,

    /// Non-finite values kept in lenient mode
    pub warnings: Vec<String>,
}

impl From<ProcessResult> for PreviewResponse {
    fn from(result: ProcessResult) -> Self {
        let sheet_names = result.sheets.iter().map(|s| s.name.clone()).collect();
        let status = if result.warnings.is_empty() {
            "ready"
        } else {
            "warning"
        };

        PreviewResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            sheets: result.sheets,
            metadata: ResponseMetadata {
                csv_info: result.csv_info,
                sheet_names,
                warnings: result.warnings,
            },
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "sheets": [],
    })
}
