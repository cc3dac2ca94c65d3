//! Axum JSON API over the record store, plus the manual scrape trigger.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use jobradar_pipeline::{CycleError, Orchestrator};
use jobradar_storage::{JobFilter, JobStore, StoreError};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

pub const CRATE_NAME: &str = "jobradar-web";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Debug, Deserialize, Default)]
struct JobsQuery {
    search: Option<String>,
    location: Option<String>,
    experience: Option<String>,
    job_type: Option<String>,
    source: Option<String>,
}

impl JobsQuery {
    fn into_filter(self) -> JobFilter {
        fn non_empty(value: Option<String>) -> Option<String> {
            value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        }
        JobFilter {
            search: non_empty(self.search),
            location: non_empty(self.location),
            experience_level: non_empty(self.experience),
            job_type: non_empty(self.job_type),
            source_platform: non_empty(self.source),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/jobs", get(jobs_handler))
        .route("/api/jobs/new", get(new_jobs_handler))
        .route("/api/jobs/mark-viewed", post(mark_viewed_handler))
        .route("/api/scrape", post(scrape_handler))
        .route("/api/stats", get(stats_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(port: u16, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn jobs_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobsQuery>,
) -> Response {
    match state.store.list_all(&query.into_filter()).await {
        Ok(jobs) => {
            let count = jobs.len();
            Json(json!({ "jobs": jobs, "count": count })).into_response()
        }
        Err(err) => server_error(err),
    }
}

async fn new_jobs_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list_unseen().await {
        Ok(jobs) => {
            let count = jobs.len();
            Json(json!({ "jobs": jobs, "count": count })).into_response()
        }
        Err(err) => server_error(err),
    }
}

async fn mark_viewed_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.store.mark_all_seen().await {
        Ok(()) => Json(json!({ "message": "All jobs marked as viewed" })).into_response(),
        Err(err) => server_error(err),
    }
}

async fn scrape_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.run_all_sources().await {
        Ok(accepted) => Json(json!({
            "message": "Scraping completed",
            "new_jobs_count": accepted.len(),
        }))
        .into_response(),
        Err(CycleError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "a scrape cycle is already running" })),
        )
            .into_response(),
    }
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> Response {
    let all = match state.store.list_all(&JobFilter::default()).await {
        Ok(jobs) => jobs,
        Err(err) => return server_error(err),
    };
    let unseen = match state.store.list_unseen().await {
        Ok(jobs) => jobs,
        Err(err) => return server_error(err),
    };
    let statuses = match state.store.source_statuses().await {
        Ok(statuses) => statuses,
        Err(err) => return server_error(err),
    };

    let mut platform_counts = BTreeMap::<String, usize>::new();
    for job in &all {
        *platform_counts
            .entry(job.record.source_platform.clone())
            .or_default() += 1;
    }

    Json(json!({
        "total_jobs": all.len(),
        "new_jobs": unseen.len(),
        "platform_counts": platform_counts,
        "sources": statuses,
    }))
    .into_response()
}

fn server_error(err: StoreError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}
