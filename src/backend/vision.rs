//! Vision-LLM backend: sends the receipt image to a hosted model.
//!
//! Every failure (no key, HTTP error, timeout, bad payload, blank text) is
//! returned to the dispatcher untouched. Nothing is retried here.

use std::time::Instant;
use tracing::info;

use super::{ExtractionBackend, ExtractionInput, RawExtraction};
use crate::error::ExtractionError;
use crate::languages;
use crate::openrouter::{Message, OpenRouterClient};

pub struct VisionLlmBackend {
    client: OpenRouterClient,
}

impl VisionLlmBackend {
    pub fn new(client: OpenRouterClient) -> Self {
        Self { client }
    }
}

fn build_prompt(language: &str) -> String {
    format!(
        "Extract all text from this receipt image as well-formatted Markdown. \
         The document is probably written in {}. Keep the original layout, \
         line order, item names, quantities and prices exactly as printed, \
         one receipt line per output line. Do not add commentary.",
        languages::display_name(language)
    )
}

#[async_trait::async_trait]
impl ExtractionBackend for VisionLlmBackend {
    fn name(&self) -> &str {
        "vision_llm"
    }

    fn is_available(&self) -> bool {
        self.client.has_credential()
    }

    async fn extract(
        &self,
        input: &ExtractionInput,
        language: &str,
    ) -> Result<RawExtraction, ExtractionError> {
        if !input.is_image() {
            return Err(ExtractionError::UnsupportedInput {
                backend: "vision_llm",
                content_type: input.content_type.clone(),
            });
        }

        let start = Instant::now();
        info!(
            "VisionLlmBackend: sending {} ({} bytes) to {}",
            input.filename,
            input.data.len(),
            self.client.model()
        );

        let message = Message::user_with_image(build_prompt(language), &input.content_type, &input.data);
        let content = self.client.chat(vec![message]).await?;

        let text = content.trim();
        if text.is_empty() {
            return Err(ExtractionError::EmptyResult);
        }

        info!(
            "VisionLlmBackend: {} chars in {}ms",
            text.len(),
            start.elapsed().as_millis()
        );

        Ok(RawExtraction::from_text(format!("{}\n", text)))
    }
}
