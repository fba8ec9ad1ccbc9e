//! HTTP trigger API.
//!
//! Stage endpoints start work on the runtime and answer immediately; the
//! outcome only shows up in the logs and in `/api/stats`.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::ingest::IngestLimits;
use crate::models::StatusCount;
use crate::pipeline::{GenerationMode, Pipeline};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParams {
    pub max_pages: Option<u32>,
    pub max_articles: Option<usize>,
    #[serde(default)]
    pub batch: bool,
}

impl RunParams {
    fn limits(&self) -> IngestLimits {
        IngestLimits {
            max_pages: self.max_pages,
            max_articles: self.max_articles,
        }
    }

    fn mode(&self, default: GenerationMode) -> GenerationMode {
        if self.batch {
            GenerationMode::Batch
        } else {
            default
        }
    }
}

#[derive(Debug, Serialize)]
struct Started {
    success: bool,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    success: bool,
    news: Vec<StatusCount>,
    artifacts: Vec<StatusCount>,
}

struct ApiError(AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "request failed");
        let body = json!({ "success": false, "error": self.0.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/stats", get(stats))
        .route("/api/scrape", post(scrape))
        .route("/api/generate", post(generate))
        .route("/api/send", post(send))
        .route("/api/workflow", post(workflow))
        .with_state(pipeline)
}

pub async fn serve(pipeline: Arc<Pipeline>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}

/// Run `task` on the runtime, logging how it ended.
fn spawn_stage<T, F>(stage: &'static str, task: F)
where
    T: std::fmt::Debug + Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(async move {
        match task.await {
            Ok(report) => info!(stage, ?report, "background stage finished"),
            Err(e) => error!(stage, error = %e, "background stage failed"),
        }
    });
}

fn started(message: &'static str) -> Json<Started> {
    Json(Started {
        success: true,
        message,
    })
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "stats": "GET /api/stats",
            "scrape": "POST /api/scrape?maxPages=&maxArticles=",
            "generate": "POST /api/generate?batch=",
            "send": "POST /api/send",
            "workflow": "POST /api/workflow?maxPages=&maxArticles=&batch=",
        }
    }))
}

async fn stats(
    State(pipeline): State<Arc<Pipeline>>,
) -> std::result::Result<Json<StatsResponse>, ApiError> {
    let stats = pipeline.stats().await.map_err(ApiError)?;
    Ok(Json(StatsResponse {
        success: true,
        news: stats.news,
        artifacts: stats.artifacts,
    }))
}

async fn scrape(
    State(pipeline): State<Arc<Pipeline>>,
    Query(params): Query<RunParams>,
) -> Json<Started> {
    let limits = params.limits();
    spawn_stage("scrape", async move { pipeline.scrape(limits).await });
    started("Scraping started in background")
}

async fn generate(
    State(pipeline): State<Arc<Pipeline>>,
    Query(params): Query<RunParams>,
) -> Json<Started> {
    let mode = params.mode(pipeline.default_mode());
    spawn_stage("generate", async move { pipeline.generate(mode).await });
    started("Generation started in background")
}

async fn send(State(pipeline): State<Arc<Pipeline>>) -> Json<Started> {
    spawn_stage("send", async move { pipeline.dispatch().await });
    started("Dispatch started in background")
}

async fn workflow(
    State(pipeline): State<Arc<Pipeline>>,
    Query(params): Query<RunParams>,
) -> Json<Started> {
    let limits = params.limits();
    let mode = params.mode(pipeline.default_mode());
    spawn_stage("workflow", async move { pipeline.run(limits, mode).await });
    started("Workflow started in background")
}
