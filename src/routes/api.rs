use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::auth::Requester;
use crate::db::SubmissionView;
use crate::error::{Error, Result};
use crate::state::AppState;

pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> Result<Json<Vec<SubmissionView>>> {
    let submissions = state
        .submissions
        .list_for_owner(&requester.owner_id)
        .await?;
    Ok(Json(submissions.into_iter().map(SubmissionView::from).collect()))
}

pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(submission_id): Path<String>,
) -> Result<Json<SubmissionView>> {
    let submission = state
        .submissions
        .get_for_requester(&submission_id, &requester)
        .await?;
    Ok(Json(submission.into()))
}

pub async fn download_file(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    Path(submission_id): Path<String>,
) -> Result<impl IntoResponse> {
    let submission = state
        .submissions
        .get_for_requester(&submission_id, &requester)
        .await?;

    let content = match tokio::fs::read(&submission.file_path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Stored file for {} is missing: {}", submission_id, e);
            return Err(Error::NotFound(submission_id));
        }
        Err(e) => return Err(e.into()),
    };

    let mime = mime_guess::from_path(&submission.file_name)
        .first_raw()
        .unwrap_or("application/octet-stream");
    let download_name: String = submission
        .file_name
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"') || c == ' ' { c } else { '_' })
        .collect();

    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download_name),
            ),
        ],
        content,
    ))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
