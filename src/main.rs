//! Receipt Extractor - turns photographed receipts into itemised expenses.

mod backend;
mod config;
mod dispatcher;
mod error;
mod export;
mod expenses;
mod languages;
mod openrouter;
mod session;
mod upload_store;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, Method as HttpMethod},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use backend::{tesseract::TesseractBackend, vision::VisionLlmBackend, Method};
use config::AppConfig;
use dispatcher::MethodDispatcher;
use error::{AppError, UploadError};
use expenses::ExtractedData;
use openrouter::OpenRouterClient;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use session::{ProcessingRequest, ProcessingResult, ProcessingSession};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upload_store::UploadStore;

/// Multipart framing overhead allowed on top of the file size limit.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    session: ProcessingSession,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "receipt_extractor=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store = UploadStore::open(&config.upload_dir)?;
    info!("Upload directory: {:?}", store.root());

    let ocr = TesseractBackend::new(config.tesseract_bin.clone());
    let llm = VisionLlmBackend::new(OpenRouterClient::new(&config.llm)?);
    let dispatcher = MethodDispatcher::new(Arc::new(ocr), Arc::new(llm));

    let state = AppState {
        session: ProcessingSession::new(store, Arc::new(dispatcher), config.max_upload_bytes),
    };

    let app = router(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([HttpMethod::GET, HttpMethod::POST])
        .allow_headers(Any);

    let body_limit = state.session.max_upload_bytes() + BODY_LIMIT_SLACK;

    Router::new()
        .route("/health", get(health))
        .route("/api/upload", post(upload_file))
        .route("/api/process", post(process_file))
        .route("/api/languages", get(list_languages))
        .route("/api/export/csv", post(export_csv))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "receipt-extractor" }))
}

#[derive(Serialize)]
struct UploadResponse {
    file_id: String,
    original_name: String,
    size: usize,
    content_type: String,
    sha256: String,
    status: &'static str,
}

/// Accept a receipt upload (multipart field `file`).
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let filename = field.file_name().map(str::to_string);
            let data = field.bytes().await?.to_vec();
            file = Some((filename, data));
            break;
        }
    }

    let (filename, data) = file.ok_or(UploadError::MissingFile)?;
    let upload = state.session.handle_upload(filename.as_deref(), &data).await?;

    Ok(Json(UploadResponse {
        file_id: upload.id,
        original_name: upload.original_name,
        size: upload.size,
        content_type: upload.content_type,
        sha256: upload.sha256,
        status: "uploaded",
    }))
}

#[derive(Deserialize)]
struct ProcessBody {
    #[serde(alias = "upload_id")]
    file_id: Option<String>,
    method: Option<String>,
    language: Option<String>,
}

#[derive(Serialize)]
struct ProcessResponse {
    status: &'static str,
    data: ProcessingResult,
}

/// Run extraction on a stored upload.
async fn process_file(
    State(state): State<AppState>,
    body: Result<Json<ProcessBody>, JsonRejection>,
) -> Result<Json<ProcessResponse>, AppError> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let file_id = body
        .file_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("No file_id provided".to_string()))?;

    let method = match body.method.as_deref() {
        None => Method::Ocr,
        Some(m) => Method::from_str(m)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown method: {}. Use 'ocr' or 'llm'", m)))?,
    };

    let language = body
        .language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| "eng".to_string());

    let request = ProcessingRequest {
        upload_id: file_id,
        method,
        language,
    };
    let result = state.session.handle_process(&request).await?;

    Ok(Json(ProcessResponse {
        status: "success",
        data: result,
    }))
}

/// List supported recognition languages.
async fn list_languages() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "languages": languages::LANGUAGES }))
}

/// Render (possibly edited) expense data as CSV, recomputing the total.
async fn export_csv(
    body: Result<Json<ExtractedData>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(mut data) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if let Some(item) = data.items.iter().find(|i| i.amount < Decimal::ZERO) {
        return Err(AppError::BadRequest(format!(
            "Negative amount for '{}'",
            item.description
        )));
    }
    for item in data.items.iter_mut() {
        item.amount = item.amount.round_dp(2);
    }
    data.recompute_total();

    let csv = export::to_csv(&data)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"expenses.csv\""),
        ],
        csv,
    ))
}
