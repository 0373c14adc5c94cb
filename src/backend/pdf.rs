//! Text-layer extraction for PDF uploads.

use crate::error::ExtractionError;

/// Extract embedded text from a PDF using lopdf, one page after another.
///
/// A PDF without a text layer yields an empty string.
pub fn extract_text(data: &[u8]) -> Result<String, ExtractionError> {
    use lopdf::Document;
    use std::io::Cursor;

    let doc = Document::load_from(Cursor::new(data))
        .map_err(|e| ExtractionError::UnreadableImage(format!("Failed to load PDF: {}", e)))?;

    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        if let Ok(content) = doc.extract_text(&[page_num]) {
            text.push_str(&content);
            text.push('\n');
        }
    }

    Ok(text)
}
