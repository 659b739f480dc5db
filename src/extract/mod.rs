//! Format-specific adapters that turn a stored file's bytes into plain text.

pub(crate) mod docx;
pub(crate) mod pdf;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;

use crate::error::{Error, Result};

pub trait TextExtractor: Send + Sync {
    /// Fails with `Error::Extraction` only when the input is malformed for
    /// the format this extractor handles.
    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// Stands in for file types without an extractor. Never fails.
pub struct UnsupportedExtractor {
    extension: String,
}

impl UnsupportedExtractor {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

impl TextExtractor for UnsupportedExtractor {
    fn extract(&self, _bytes: &[u8]) -> Result<String> {
        Ok(unsupported_text(&self.extension))
    }
}

pub fn unsupported_text(extension: &str) -> String {
    format!("Text extraction is not supported for .{} files.", extension)
}

pub fn for_extension(extension: &str) -> Box<dyn TextExtractor> {
    match extension.to_lowercase().as_str() {
        "pdf" => Box::new(PdfExtractor),
        "docx" => Box::new(DocxExtractor),
        other => Box::new(UnsupportedExtractor::new(other)),
    }
}

/// Runs extraction on the blocking pool. A panic inside a parser is reported
/// as an extraction failure.
pub async fn extract_blocking(extension: &str, bytes: Vec<u8>) -> Result<String> {
    let extractor = for_extension(extension);
    tokio::task::spawn_blocking(move || extractor.extract(&bytes))
        .await
        .map_err(|e| Error::Extraction(format!("extractor aborted: {}", e)))?
}
