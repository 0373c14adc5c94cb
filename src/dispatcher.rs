//! Chooses a backend per request and falls back from the vision model to OCR.

use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::{ExtractionBackend, ExtractionInput, Method, RawExtraction};
use crate::error::ExtractionError;

/// Text produced for one request, tagged with the method that actually ran.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub method_used: Method,
    pub extraction: RawExtraction,
}

/// Stateless: holds only the two backends.
#[derive(Clone)]
pub struct MethodDispatcher {
    ocr: Arc<dyn ExtractionBackend>,
    llm: Arc<dyn ExtractionBackend>,
}

impl MethodDispatcher {
    pub fn new(ocr: Arc<dyn ExtractionBackend>, llm: Arc<dyn ExtractionBackend>) -> Self {
        Self { ocr, llm }
    }

    /// Run the requested method. An LLM failure of any kind falls back to OCR
    /// once with the same language; an OCR failure is final.
    pub async fn process(
        &self,
        input: &ExtractionInput,
        requested: Method,
        language: &str,
    ) -> Result<Dispatched, ExtractionError> {
        if requested == Method::Llm {
            match self.try_llm(input, language).await {
                Ok(extraction) => {
                    return Ok(Dispatched {
                        method_used: Method::Llm,
                        extraction,
                    })
                }
                Err(e) => warn!(
                    "{} failed for {}: {}. Falling back to OCR.",
                    self.llm.name(),
                    input.filename,
                    e
                ),
            }
        }

        info!("Running {} on {} (lang={})", self.ocr.name(), input.filename, language);
        let extraction = self.ocr.extract(input, language).await?;
        Ok(Dispatched {
            method_used: Method::Ocr,
            extraction,
        })
    }

    async fn try_llm(&self, input: &ExtractionInput, language: &str) -> Result<RawExtraction, ExtractionError> {
        if !self.llm.is_available() {
            return Err(ExtractionError::MissingCredential);
        }
        info!("Running {} on {} (lang={})", self.llm.name(), input.filename, language);
        let extraction = self.llm.extract(input, language).await?;
        if extraction.is_blank() {
            return Err(ExtractionError::EmptyResult);
        }
        Ok(extraction)
    }
}
