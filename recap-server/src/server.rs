//! HTTP server assembly: application state, router, worker pool.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::api;
use crate::auth::{spawn_session_cleanup, Sessions};
use crate::config::Config;
use crate::jobs::worker::{spawn_workers, WorkerContext};
use crate::jobs::{ActiveJobs, JobQueue};
use crate::pipeline::Summarize;
use crate::services::key_policy::KeyPolicy;
use crate::sse::hub::DEFAULT_CHANNEL_CAPACITY;
use crate::sse::EventHub;
use crate::store::{SummaryCache, UserHistory};

/// Shared application state. Singletons are owned here and passed by
/// reference; nothing is a true global.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<SummaryCache>,
    pub history: Arc<UserHistory>,
    pub registry: Arc<ActiveJobs>,
    pub hub: Arc<EventHub>,
    pub queue: JobQueue,
    pub sessions: Arc<Sessions>,
    pub key_policy: Arc<KeyPolicy>,
    pub summarizer: Arc<dyn Summarize>,
}

/// Construct state, spawn the worker pool, and build the router.
///
/// This is the single assembly point used by both `main` and the
/// integration tests (which pass a mock summarizer). The key policy is
/// built by the caller because the production pipeline shares it.
pub fn build_app(
    config: Config,
    key_policy: Arc<KeyPolicy>,
    summarizer: Arc<dyn Summarize>,
) -> recap_common::Result<(Router, AppState)> {
    let cache = Arc::new(SummaryCache::open(&config.cache_dir)?);
    let history = Arc::new(UserHistory::open(&config.users_dir, config.max_history)?);
    let registry = Arc::new(ActiveJobs::new());
    let hub = Arc::new(EventHub::new(DEFAULT_CHANNEL_CAPACITY));
    let sessions = Arc::new(Sessions::new());

    let (queue, queue_rx) = JobQueue::new(config.queue_capacity);

    let worker_ctx = WorkerContext {
        cache: Arc::clone(&cache),
        history: Arc::clone(&history),
        registry: Arc::clone(&registry),
        hub: Arc::clone(&hub),
        summarizer: Arc::clone(&summarizer),
        merge_interval_seconds: config.merge_interval_seconds,
    };
    spawn_workers(config.num_workers, queue_rx, worker_ctx);
    info!(
        workers = config.num_workers,
        queue_capacity = config.queue_capacity,
        "summarization worker pool started"
    );

    let state = AppState {
        config: Arc::new(config),
        cache,
        history,
        registry,
        hub,
        queue,
        sessions,
        key_policy,
        summarizer,
    };

    Ok((router(state.clone()), state))
}

/// Build the HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/summary", post(api::summary::submit_summary))
        .route("/api/summary/events", get(api::events::summary_events))
        .route("/api/recent-summaries", get(api::summary::recent_summaries))
        .route(
            "/api/user-recent-summaries",
            get(api::summary::user_recent_summaries),
        )
        .route("/user/info", get(api::user::user_info))
        .route("/user/api-key-status", get(api::user::api_key_status))
        .route("/auth/logout", post(api::user::logout))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server and serve until the process exits.
pub async fn start(
    config: Config,
    key_policy: Arc<KeyPolicy>,
    summarizer: Arc<dyn Summarize>,
) -> anyhow::Result<()> {
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let (app, state) = build_app(config, key_policy, summarizer)?;

    spawn_session_cleanup(Arc::clone(&state.sessions));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP server listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}
