use crate::{
    corpus::CorpusItem,
    semantic::{RankOptions, SearchResponse, SemanticSearchError, SemanticSearchService},
};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

/// Search requests are a query string and two numbers.
const BODY_LIMIT: usize = 64 * 1024;

#[derive(Clone)]
struct SharedState {
    service: Arc<SemanticSearchService>,
}

pub fn router(service: Arc<SemanticSearchService>) -> Router {
    let shared_state = Arc::new(SharedState { service });

    Router::new()
        .route("/api/semantic-search", post(semantic_search))
        .route("/api/corpus", get(corpus))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

pub async fn serve(service: Arc<SemanticSearchService>, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!(
        "listening on {addr} (provider: {}, corpus: {} items)",
        service.provider_name(),
        service.corpus().len()
    );

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(service: Arc<SemanticSearchService>, addr: &str) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve(service, addr))
}

#[derive(thiserror::Error, Debug)]
enum ApiError {
    #[error("failed to perform semantic search")]
    Search(#[from] SemanticSearchError),

    #[error("invalid request body")]
    Body(#[from] JsonRejection),
}

#[derive(Debug)]
struct HttpError(ApiError);

/// Every failure is reported as `{ error, details }` with status 500.
impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let details = match &self.0 {
            ApiError::Search(err) => err.to_string(),
            ApiError::Body(rejection) => rejection.body_text(),
        };

        log::error!("{}: {details}", self.0);

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": self.0.to_string(),
                "details": details,
            })),
        )
            .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<ApiError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SemanticSearchRequest {
    pub query: String,

    /// Overrides the configured threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,

    /// Overrides the configured limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

async fn semantic_search(
    State(state): State<Arc<SharedState>>,
    payload: Result<Json<SemanticSearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, HttpError> {
    let Json(payload) = payload?;

    log::debug!("payload: {payload:?}");

    let defaults = state.service.options();
    let options = RankOptions {
        threshold: payload.threshold.unwrap_or(defaults.threshold),
        limit: payload.limit.unwrap_or(defaults.limit),
    };

    let response = state.service.search(&payload.query, Some(options)).await?;
    Ok(Json(response))
}

async fn corpus(State(state): State<Arc<SharedState>>) -> Json<Vec<CorpusItem>> {
    Json(state.service.corpus().items().to_vec())
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
    pub corpus_size: usize,
}

async fn health(State(state): State<Arc<SharedState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        provider: state.service.provider_name().to_string(),
        corpus_size: state.service.corpus().len(),
    })
}
