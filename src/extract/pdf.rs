use super::TextExtractor;
use crate::error::{Error, Result};

/// Readers accept the `%PDF` marker anywhere in this leading window.
const HEADER_WINDOW: usize = 1024;

pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String> {
        if !has_pdf_header(bytes) {
            return Err(Error::Extraction("missing PDF header".to_string()));
        }
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| Error::Extraction(format!("PDF extraction error: {}", e)))
    }
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(HEADER_WINDOW)]
        .windows(4)
        .any(|w| w == b"%PDF")
}
