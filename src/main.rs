mod analysis;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod routes;
mod state;
mod storage;
mod submission;

use std::sync::Arc;

use analysis::{
    AnalysisJob, AnalysisRunner, Analyzer, DelayRange, RemoteAnalyzer, ScoreSimulator,
    StaleAnalysisSweeper,
};
use config::{AnalyzerKind, StoreBackend};
use db::SharedStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thesisdesk=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;
    let config = Arc::new(config);

    crate::storage::ensure_dirs(&config.upload_folder)?;

    let store: SharedStore = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config.database_url).await?;
            db::run_migrations(pool.as_ref()).await?;
            Arc::new(db::PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, submissions will not survive a restart");
            Arc::new(db::MemoryStore::new())
        }
    };

    let analyzer: Arc<dyn Analyzer> = match config.analyzer {
        AnalyzerKind::Simulated => Arc::new(ScoreSimulator),
        AnalyzerKind::Remote => {
            tracing::info!("Scoring via remote analyzer at {}", config.ai_service_url);
            Arc::new(RemoteAnalyzer::new(config.ai_service_url.clone())?)
        }
    };

    let (delay_min, delay_max) = config.analysis_delay_secs;
    let job = AnalysisJob::new(
        store.clone(),
        analyzer,
        DelayRange::from_secs(delay_min, delay_max),
    );
    let runner = AnalysisRunner::new(job, config.max_concurrent_jobs);

    let resumed = analysis::resume_pending(&store, &runner).await?;
    if resumed > 0 {
        tracing::info!("Resumed {} pending analyses", resumed);
    }

    if let Some(stale_after) = config.stale_analysis_after() {
        let sweeper = StaleAnalysisSweeper::new(store.clone(), stale_after, config.sweep_interval());
        tokio::spawn(sweeper.run());
    }

    let state = Arc::new(state::AppState {
        config: config.clone(),
        submissions: submission::SubmissionService::new(store, runner),
    });

    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Thesisdesk listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
