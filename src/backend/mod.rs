//! Extraction backends.
//!
//! Defines the [`ExtractionBackend`] trait and the shared input/output types.
//! There are exactly two implementations: deterministic Tesseract OCR and a
//! hosted vision model. The dispatcher relies on that closed set for fallback.

pub mod pdf;
pub mod preprocess;
pub mod tesseract;
pub mod vision;

use crate::error::ExtractionError;
use serde::{Deserialize, Serialize};

/// Extraction method a caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Ocr,
    Llm,
}

impl Method {
    /// Parse a request string into a method.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ocr" => Some(Self::Ocr),
            "llm" => Some(Self::Llm),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ocr => "ocr",
            Self::Llm => "llm",
        }
    }
}

/// A stored upload handed to a backend.
#[derive(Debug, Clone)]
pub struct ExtractionInput {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ExtractionInput {
    pub fn is_pdf(&self) -> bool {
        self.content_type == "application/pdf"
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Text produced by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RawExtraction {
    /// Recognised text as the backend produced it.
    pub raw_text: String,
    /// Trimmed, non-empty lines of `raw_text`.
    pub lines: Vec<String>,
}

impl RawExtraction {
    pub fn from_text(raw_text: String) -> Self {
        let lines = split_lines(&raw_text);
        Self { raw_text, lines }
    }

    pub fn is_blank(&self) -> bool {
        self.raw_text.trim().is_empty()
    }
}

/// Split on line breaks, trim, drop empties.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Async capability implemented by each backend.
#[async_trait::async_trait]
pub trait ExtractionBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the backend can be attempted at all (e.g. a credential is present).
    fn is_available(&self) -> bool {
        true
    }

    async fn extract(
        &self,
        input: &ExtractionInput,
        language: &str,
    ) -> Result<RawExtraction, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines() {
        let lines = split_lines("  TOTAL 4.50 \r\n\n\t\nThanks\n");
        assert_eq!(lines, vec!["TOTAL 4.50", "Thanks"]);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!(Method::from_str("LLM"), Some(Method::Llm));
        assert_eq!(Method::from_str("ocr"), Some(Method::Ocr));
        assert_eq!(Method::from_str("magic"), None);
        assert_eq!(serde_json::to_string(&Method::Ocr).unwrap(), "\"ocr\"");
    }

    #[test]
    fn test_blank_extraction() {
        assert!(RawExtraction::from_text(" \n\t ".into()).is_blank());
        assert!(!RawExtraction::from_text("x".into()).is_blank());
    }
}
