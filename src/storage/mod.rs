use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::Result;

/// File types the upload intake accepts.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

pub fn generate_submission_id() -> String {
    format!(
        "{}_{}",
        Utc::now().format("%Y%m%d"),
        &Uuid::new_v4().simple().to_string()[..8]
    )
}

pub fn ensure_dirs(upload_folder: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(upload_folder)
}

/// Lowercased extension of an uploaded file name, without the dot.
pub fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_lowercase())
}

pub fn is_allowed_extension(ext: &str) -> bool {
    ALLOWED_EXTENSIONS.contains(&ext)
}

/// A file written to the upload folder before its metadata was validated.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub path: PathBuf,
    pub original_name: String,
}

impl StagedFile {
    pub fn extension(&self) -> String {
        file_extension(&self.original_name).unwrap_or_default()
    }
}

pub async fn stage_file(upload_folder: &Path, original_name: &str, data: &[u8]) -> Result<StagedFile> {
    let stored_name = match file_extension(original_name) {
        Some(ext) => format!("{}.{}", generate_submission_id(), ext),
        None => generate_submission_id(),
    };
    let path = upload_folder.join(stored_name);
    tokio::fs::write(&path, data).await?;

    Ok(StagedFile {
        path,
        original_name: original_name.to_string(),
    })
}

pub async fn read_file(path: &str) -> Result<Vec<u8>> {
    Ok(tokio::fs::read(path).await?)
}

/// Best effort; a failed delete is logged and otherwise ignored.
pub async fn discard_staged(file: &StagedFile) {
    if let Err(e) = tokio::fs::remove_file(&file.path).await {
        tracing::warn!("Failed to delete staged upload {}: {}", file.path.display(), e);
    }
}
