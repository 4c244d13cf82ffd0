//! HTTP Server for the assaynorm API.
//!
//! Provides REST endpoints to normalize an uploaded instrument export.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                                |
//! |--------|-------------------|--------------------------------------------|
//! | GET    | `/health`         | Health check                               |
//! | POST   | `/api/process`    | Upload export, download the xlsx workbook  |
//! | POST   | `/api/preview`    | Upload export, get the sheets as JSON      |
//! | GET    | `/api/logs`       | SSE stream for real-time logs              |
//!
//! Both upload endpoints take a multipart form with a `file` field and an
//! optional `config` field holding a run configuration as JSON.

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, path::Path, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, log_success, LOG_BROADCASTER};
use super::types::{error_response, PreviewResponse};
use crate::config::{output_file_name, RunConfig};
use crate::error::{PipelineError, ServerError, ServerResult, WorkbookError};
use crate::transform::pipeline::{process_bytes, workbook_bytes, ProcessResult};

/// MIME type of xlsx workbooks.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

type ApiError = (StatusCode, Json<Value>);

/// Build the router.
pub fn app() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/process", post(process_upload))
        .route("/api/preview", post(preview_upload))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
}

/// Start the HTTP server
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 assaynorm server running on http://localhost:{}", port);
    println!("   POST /api/process - Upload export, download workbook");
    println!("   POST /api/preview - Upload export, preview sheets");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app()).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "assaynorm",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "process": "POST /api/process",
            "preview": "POST /api/preview",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip the entries they missed.
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload endpoint returning the xlsx workbook
async fn process_upload(multipart: Multipart) -> Result<Response, ApiError> {
    let upload = read_upload(multipart).await.map_err(reject)?;
    let file_name = upload.file_name.clone();
    let config = upload.config.clone();

    let bytes = run_blocking(move || {
        let result = run_pipeline(&upload)?;
        Ok(workbook_bytes(&result.sheets)?)
    })
    .await
    .map_err(reject)?;

    let stem = Path::new(&file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export");
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    let download = output_file_name(&config.file_name_pattern, stem, &today);
    log_success(format!("📦 Sending {} ({} bytes)", download, bytes.len()));

    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (header::CONTENT_DISPOSITION, content_disposition(&download)),
    ];
    Ok((headers, bytes).into_response())
}

/// Upload endpoint returning the sheets as JSON
async fn preview_upload(multipart: Multipart) -> Result<Json<PreviewResponse>, ApiError> {
    let upload = read_upload(multipart).await.map_err(reject)?;
    let result = run_blocking(move || run_pipeline(&upload))
        .await
        .map_err(reject)?;
    Ok(Json(PreviewResponse::from(result)))
}

/// A parsed multipart upload.
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
    config: RunConfig,
}

async fn read_upload(mut multipart: Multipart) -> ServerResult<Upload> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut config_json: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or("export.csv").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                file = Some((name, data.to_vec()));
            }
            "config" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                config_json = Some(text);
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;
    let config = match config_json.as_deref().map(str::trim) {
        Some(json) if !json.is_empty() => {
            RunConfig::from_json(json).map_err(|e| ServerError::Pipeline(e.into()))?
        }
        _ => RunConfig::default(),
    };

    println!("\n{}", "=".repeat(70));
    println!("📄 NEW UPLOAD: {} ({} bytes)", file_name, bytes.len());
    println!("{}\n", "=".repeat(70));

    Ok(Upload {
        file_name,
        bytes,
        config,
    })
}

fn run_pipeline(upload: &Upload) -> ServerResult<ProcessResult> {
    log_info(format!("Processing {}", upload.file_name));
    Ok(process_bytes(&upload.bytes, &upload.config)?)
}

/// Run CPU-bound pipeline work off the async executor.
async fn run_blocking<T, F>(work: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}

/// `attachment` header value; quotes and backslashes are dropped from the name.
fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .filter(|c| !matches!(c, '"' | '\\') && !c.is_control())
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

/// HTTP status for a failed request.
fn status_for(err: &ServerError) -> StatusCode {
    match err {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServerError::Pipeline(PipelineError::Workbook(WorkbookError::DuplicateSheet(_))) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServerError::Pipeline(PipelineError::Workbook(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        ServerError::Pipeline(PipelineError::Config(_)) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn reject(err: ServerError) -> ApiError {
    log_error(err.to_string());
    (status_for(&err), Json(error_response(&err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, NormalizeError};

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("plate1_normalized.xlsx"),
            "attachment; filename=\"plate1_normalized.xlsx\""
        );
        assert_eq!(
            content_disposition("a\"b\\c.xlsx"),
            "attachment; filename=\"abc.xlsx\""
        );
    }

    #[test]
    fn test_status_for() {
        let missing = ServerError::Pipeline(PipelineError::Normalize(
            NormalizeError::ReferenceNotFound("bsa".into()),
        ));
        assert_eq!(status_for(&missing), StatusCode::UNPROCESSABLE_ENTITY);

        let config = ServerError::Pipeline(PipelineError::Config(ConfigError::Schema(vec![])));
        assert_eq!(status_for(&config), StatusCode::BAD_REQUEST);

        let duplicate = ServerError::Pipeline(PipelineError::Workbook(
            WorkbookError::DuplicateSheet("G".into()),
        ));
        assert_eq!(status_for(&duplicate), StatusCode::UNPROCESSABLE_ENTITY);

        let io = ServerError::Pipeline(PipelineError::Workbook(WorkbookError::IoError(
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        )));
        assert_eq!(status_for(&io), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(
            status_for(&ServerError::BadRequest("No file provided".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_blocking_work_errors_propagate() {
        let result: ServerResult<()> =
            run_blocking(|| Err(ServerError::BadRequest("nope".into()))).await;
        assert!(matches!(result, Err(ServerError::BadRequest(_))));
    }
}
