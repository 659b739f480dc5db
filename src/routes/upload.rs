use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::auth::Requester;
use crate::error::{Error, Result};
use crate::state::AppState;
use crate::storage::{self, StagedFile};
use crate::submission::SubmissionMetadata;

const FILE_FIELD: &str = "document";

/// Upload intake: enforces the file-type allow-list and size limit, stages
/// the file, then hands everything to the submission service.
pub async fn upload_submission(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let mut metadata = SubmissionMetadata::default();
    let mut staged: Option<StagedFile> = None;

    if let Err(e) = read_form(&state, &mut multipart, &mut metadata, &mut staged).await {
        if let Some(ref file) = staged {
            storage::discard_staged(file).await;
        }
        return Err(e);
    }

    let summary = state
        .submissions
        .submit(&requester.owner_id, metadata, staged)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Submission uploaded successfully. Analysis initiated.",
            "submission": summary,
        })),
    ))
}

async fn read_form(
    state: &AppState,
    multipart: &mut Multipart,
    metadata: &mut SubmissionMetadata,
    staged: &mut Option<StagedFile>,
) -> Result<()> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("malformed upload: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        let slot = match name.as_str() {
            "title" => &mut metadata.title,
            "abstract" => &mut metadata.abstract_text,
            "tags" => &mut metadata.tags,
            "supervisor" => &mut metadata.supervisor,
            FILE_FIELD => {
                *staged = Some(stage_document(state, field, staged.is_some()).await?);
                continue;
            }
            _ => continue,
        };
        let text = field
            .text()
            .await
            .map_err(|e| Error::Validation(format!("unreadable field '{}': {}", name, e)))?;
        *slot = Some(text);
    }
    Ok(())
}

async fn stage_document(
    state: &AppState,
    field: axum::extract::multipart::Field<'_>,
    already_staged: bool,
) -> Result<StagedFile> {
    if already_staged {
        return Err(Error::Validation("only one document may be uploaded".to_string()));
    }

    let filename = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| Error::Validation("document field carries no file".to_string()))?;

    let allowed = storage::file_extension(&filename)
        .map(|ext| storage::is_allowed_extension(&ext))
        .unwrap_or(false);
    if !allowed {
        return Err(Error::Validation(
            "only PDF, DOC, and DOCX files are allowed".to_string(),
        ));
    }

    let data = field
        .bytes()
        .await
        .map_err(|e| Error::Validation(format!("could not read uploaded file: {}", e)))?;
    if data.is_empty() {
        return Err(Error::Validation("uploaded document is empty".to_string()));
    }
    if data.len() > state.config.max_upload_bytes {
        return Err(Error::Validation(format!(
            "uploaded document exceeds {} bytes",
            state.config.max_upload_bytes
        )));
    }

    storage::stage_file(&state.config.upload_folder, &filename, &data).await
}
