//! Deterministic OCR via the Tesseract command-line tool.
//!
//! Images are converted to grayscale and auto-contrasted, written to a temp
//! PNG and handed to `tesseract <image> stdout -l <lang>`. PDFs use their
//! embedded text layer instead.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info};

use super::{pdf, preprocess, ExtractionBackend, ExtractionInput, RawExtraction};
use crate::error::ExtractionError;

lazy_static! {
    static ref LANGUAGE_CODE: Regex = Regex::new(r"^[A-Za-z_]+(\+[A-Za-z_]+)*$").unwrap();
}

pub struct TesseractBackend {
    binary: String,
}

impl TesseractBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run_tesseract(&self, image_path: &Path, language: &str) -> Result<String, ExtractionError> {
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", language])
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if stderr.contains("Failed loading language") {
                    Err(ExtractionError::UnsupportedLanguage(language.to_string()))
                } else {
                    Err(ExtractionError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                ExtractionError::BackendUnavailable(format!("{} not found (install tesseract-ocr)", self.binary)),
            ),
            Err(e) => Err(ExtractionError::Io(e)),
        }
    }

    async fn ocr_image(&self, data: Vec<u8>, language: &str) -> Result<String, ExtractionError> {
        let prepared = tokio::task::spawn_blocking(move || -> Result<_, ExtractionError> {
            let gray = preprocess::prepare(&data)?;
            let file = tempfile::Builder::new()
                .prefix("receipt-")
                .suffix(".png")
                .tempfile()?;
            gray.save_with_format(file.path(), image::ImageFormat::Png)
                .map_err(|e| ExtractionError::OcrFailed(format!("failed to write preprocessed image: {}", e)))?;
            Ok(file)
        })
        .await
        .map_err(|e| ExtractionError::OcrFailed(format!("preprocessing task failed: {}", e)))??;

        // temp file lives until `prepared` drops
        self.run_tesseract(prepared.path(), language).await
    }
}

/// Reject anything that is not a plain Tesseract language spec like `eng+hrv`.
pub fn validate_language(language: &str) -> Result<(), ExtractionError> {
    if LANGUAGE_CODE.is_match(language) {
        Ok(())
    } else {
        Err(ExtractionError::UnsupportedLanguage(language.to_string()))
    }
}

#[async_trait::async_trait]
impl ExtractionBackend for TesseractBackend {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn extract(
        &self,
        input: &ExtractionInput,
        language: &str,
    ) -> Result<RawExtraction, ExtractionError> {
        let start = Instant::now();
        validate_language(language)?;

        let raw_text = if input.is_pdf() {
            debug!("TesseractBackend: reading PDF text layer of {}", input.filename);
            let data = input.data.clone();
            tokio::task::spawn_blocking(move || pdf::extract_text(&data))
                .await
                .map_err(|e| ExtractionError::OcrFailed(format!("PDF task failed: {}", e)))??
        } else {
            self.ocr_image(input.data.clone(), language).await?
        };

        info!(
            "TesseractBackend: {} -> {} chars in {}ms (lang={})",
            input.filename,
            raw_text.len(),
            start.elapsed().as_millis(),
            language
        );

        Ok(RawExtraction::from_text(raw_text))
    }
}
