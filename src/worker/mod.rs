//! Worker wiring: open the store and queue, create the embedding provider,
//! and run the poll loop.
//!
//! [`setup_services`] is shared by the `work`, `recommend` and `similar`
//! commands so they all see the same configuration.

pub mod orchestrator;
pub mod runner;

use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::SkillpathConfig;
use crate::db;
use crate::embedding;
use crate::queue::{JobQueue, SqliteQueue};
use crate::similarity::{MatrixCache, SkillSimilarityIndex};
use crate::store::SqliteStore;

pub use orchestrator::{JobOutcome, JobReport, JobState, Orchestrator};
pub use runner::{Backoff, Poll, RunStats, Worker};

/// Long-lived objects shared by every job in a process.
pub struct Services {
    pub db: Arc<Mutex<rusqlite::Connection>>,
    pub store: Arc<SqliteStore>,
    pub queue: Arc<SqliteQueue>,
    pub index: Arc<SkillSimilarityIndex>,
    pub orchestrator: Arc<Orchestrator>,
}

/// Open the database, queue and embedding provider described by `config`.
pub fn setup_services(config: &SkillpathConfig) -> Result<Services> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let provider = embedding::create_provider(&config.embedding)?;
    let provider: Arc<dyn embedding::EmbeddingProvider> = Arc::from(provider);
    tracing::info!(model = %provider.model_id(), dims = provider.dimensions(), "embedding provider ready");

    if let Ok(Some(stored_model)) = db::migrations::get_embedding_model(&conn) {
        if stored_model != provider.model_id() {
            tracing::warn!(
                stored = %stored_model,
                configured = %provider.model_id(),
                "embedding model changed since last run, similarity scores will differ"
            );
        }
    }
    db::migrations::set_embedding_model(&conn, provider.model_id())?;

    let db = Arc::new(Mutex::new(conn));

    let queue_path = config.resolved_queue_db_path();
    let queue_conn = if queue_path == db_path {
        Arc::clone(&db)
    } else {
        let conn = db::open_database(&queue_path)?;
        tracing::info!(db = %queue_path.display(), "queue database ready");
        Arc::new(Mutex::new(conn))
    };
    let queue = Arc::new(SqliteQueue::new(
        queue_conn,
        &config.queue.name,
        Duration::from_secs(config.queue.visibility_timeout_secs),
    ));

    let store = Arc::new(SqliteStore::new(Arc::clone(&db)));
    let index = Arc::new(SkillSimilarityIndex::new(provider));
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        Arc::clone(&index),
        Arc::new(MatrixCache::new()),
        &config.ranking,
    ));

    Ok(Services {
        db,
        store,
        queue,
        index,
        orchestrator,
    })
}

/// Run the worker until Ctrl-C, or until the queue is empty when `drain` is set.
pub async fn serve_queue(config: SkillpathConfig, drain: bool) -> Result<RunStats> {
    let services = setup_services(&config)?;
    let queue: Arc<dyn JobQueue> = services.queue.clone();
    let worker = Arc::new(Worker::new(
        queue,
        services.orchestrator.clone(),
        config.worker.clone(),
    ));

    if drain {
        return worker.drain().await;
    }

    let stats = worker
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown requested, finishing current job");
        })
        .await;
    Ok(stats)
}
