//! Processing session: accepts uploads and runs the extraction pipeline on them.
//!
//! Uploads are write-once. Every process call re-runs the full pipeline, so
//! the same upload can be processed repeatedly with different methods or
//! languages, concurrently if needed.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::backend::{ExtractionInput, Method};
use crate::dispatcher::MethodDispatcher;
use crate::error::{AppError, UploadError};
use crate::expenses::{self, ExtractedData};
use crate::upload_store::{extension_of, Upload, UploadStore};

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "pdf"];

/// One process call.
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    pub upload_id: String,
    pub method: Method,
    pub language: String,
}

/// Complete outcome of a process call.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub file_id: String,
    pub method_used: Method,
    pub language: String,
    pub raw_text: String,
    pub lines: Vec<String>,
    pub extracted_data: ExtractedData,
}

#[derive(Clone)]
pub struct ProcessingSession {
    store: UploadStore,
    dispatcher: Arc<MethodDispatcher>,
    max_upload_bytes: usize,
}

impl ProcessingSession {
    pub fn new(store: UploadStore, dispatcher: Arc<MethodDispatcher>, max_upload_bytes: usize) -> Self {
        Self {
            store,
            dispatcher,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Validate and persist a file.
    pub async fn handle_upload(&self, filename: Option<&str>, data: &[u8]) -> Result<Upload, UploadError> {
        let filename = filename
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or(UploadError::MissingFile)?;

        let ext = extension_of(filename).unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(UploadError::UnsupportedType(filename.to_string()));
        }
        if data.is_empty() {
            return Err(UploadError::EmptyFile);
        }
        if data.len() > self.max_upload_bytes {
            return Err(UploadError::TooLarge {
                size: data.len(),
                limit: self.max_upload_bytes,
            });
        }

        let upload = self.store.save(filename, data).await?;
        info!(
            "Accepted upload {} ({} bytes, {})",
            upload.id, upload.size, upload.content_type
        );
        Ok(upload)
    }

    /// Extract text from a stored upload and parse it into expenses.
    pub async fn handle_process(&self, request: &ProcessingRequest) -> Result<ProcessingResult, AppError> {
        let (upload, data) = self.store.load(&request.upload_id).await?;

        info!(
            "Processing {} with {} method (lang={})",
            upload.id,
            request.method.as_str(),
            request.language
        );

        let input = ExtractionInput {
            filename: upload.original_name.clone(),
            content_type: upload.content_type.clone(),
            data,
        };

        let dispatched = self
            .dispatcher
            .process(&input, request.method, &request.language)
            .await?;

        let extracted_data = expenses::parse(&dispatched.extraction.raw_text);

        info!(
            "Processed {}: method_used={}, {} lines, {} items",
            upload.id,
            dispatched.method_used.as_str(),
            dispatched.extraction.lines.len(),
            extracted_data.items.len()
        );

        Ok(ProcessingResult {
            file_id: upload.id,
            method_used: dispatched.method_used,
            language: request.language.clone(),
            raw_text: dispatched.extraction.raw_text,
            lines: dispatched.extraction.lines,
            extracted_data,
        })
    }
}
