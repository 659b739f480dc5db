mod memory;
mod models;
mod postgres;

pub use memory::MemoryStore;
pub use models::*;
pub use postgres::{create_pool, run_migrations, PgStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::Result;

pub type SharedStore = Arc<dyn DocumentStore>;

/// Durable record of submissions and their analysis state.
///
/// The analysis job is the only writer of the status, score and detail
/// fields; everything else is written once by `create`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists a new record in `pending_analysis` with zeroed scores.
    async fn create(&self, new: NewSubmission) -> Result<Submission>;

    async fn get_by_id(&self, id: &str) -> Result<Submission>;

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Submission>>;

    /// Atomically applies `update` and returns the record as written.
    ///
    /// A status change that does not move the lifecycle forward is rejected
    /// with `Error::InvalidTransition` and nothing is written.
    async fn update_status(&self, id: &str, update: StatusUpdate) -> Result<Submission>;

    /// Records in `status`, optionally only those last written before `updated_before`.
    async fn list_by_status(
        &self,
        status: AnalysisStatus,
        updated_before: Option<DateTime<Utc>>,
    ) -> Result<Vec<Submission>>;
}
