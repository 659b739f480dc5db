use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::sync::Arc;

use super::{AnalysisStatus, DocumentStore, NewSubmission, StatusUpdate, Submission, SubmissionRow};
use crate::error::{Error, Result};
use crate::storage::generate_submission_id;

pub type DbPool = Arc<PgPool>;

pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn create(&self, new: NewSubmission) -> Result<Submission> {
        new.validate()?;

        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            INSERT INTO submissions (
                id, owner_id, title, abstract_text, tags, supervisor,
                file_path, file_name, file_extension,
                analysis_status, plagiarism_score, grammar_score, analysis_details
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, 0, '{}'::jsonb)
            RETURNING *
            "#,
        )
        .bind(generate_submission_id())
        .bind(&new.owner_id)
        .bind(&new.title)
        .bind(&new.abstract_text)
        .bind(&new.tags)
        .bind(&new.supervisor)
        .bind(&new.file_path)
        .bind(&new.file_name)
        .bind(&new.file_extension)
        .bind(AnalysisStatus::PendingAnalysis.as_str())
        .fetch_one(self.pool.as_ref())
        .await?;

        row.try_into()
    }

    async fn get_by_id(&self, id: &str) -> Result<Submission> {
        sqlx::query_as::<_, SubmissionRow>("SELECT * FROM submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?
            .try_into()
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Submission>> {
        sqlx::query_as::<_, SubmissionRow>(
            "SELECT * FROM submissions WHERE owner_id = $1 ORDER BY created_at, id",
        )
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await?
        .into_iter()
        .map(Submission::try_from)
        .collect()
    }

    async fn update_status(&self, id: &str, update: StatusUpdate) -> Result<Submission> {
        // The predecessor check and the write happen in one statement, so a
        // concurrent reader sees either the old row or the new one.
        let allowed: Vec<String> = update
            .status
            .map(|s| {
                s.allowed_predecessors()
                    .iter()
                    .map(|p| p.as_str().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            UPDATE submissions SET
                analysis_status = COALESCE($2, analysis_status),
                plagiarism_score = COALESCE($3, plagiarism_score),
                grammar_score = COALESCE($4, grammar_score),
                analysis_details = COALESCE($5, analysis_details),
                updated_at = NOW()
            WHERE id = $1 AND ($2::text IS NULL OR analysis_status = ANY($6))
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.plagiarism_score)
        .bind(update.grammar_score)
        .bind(update.analysis_details.map(Json))
        .bind(&allowed)
        .fetch_optional(self.pool.as_ref())
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => {
                let current = self.get_by_id(id).await?;
                Err(Error::InvalidTransition {
                    id: id.to_string(),
                    from: current.analysis_status,
                    to: update.status.unwrap_or(current.analysis_status),
                })
            }
        }
    }

    async fn list_by_status(
        &self,
        status: AnalysisStatus,
        updated_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Submission>> {
        sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT * FROM submissions
            WHERE analysis_status = $1 AND ($2::timestamptz IS NULL OR updated_at < $2)
            ORDER BY updated_at
            "#,
        )
        .bind(status.as_str())
        .bind(updated_before)
        .fetch_all(self.pool.as_ref())
        .await?
        .into_iter()
        .map(Submission::try_from)
        .collect()
    }
}
