use crate::aggregate::DetailAggregator;
use crate::config::Config;
use crate::models::{MovieDetail, MovieSummary, Review};
use crate::tmdb::{MovieApi, TmdbClient, TmdbError};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn MovieApi>,
    pub aggregator: Arc<DetailAggregator>,
}

impl AppState {
    pub fn new(api: Arc<dyn MovieApi>, aggregator: DetailAggregator) -> Self {
        Self {
            api,
            aggregator: Arc::new(aggregator),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    query: Option<String>,
}

pub async fn run_server(config: Config) -> Result<()> {
    let api: Arc<dyn MovieApi> = Arc::new(TmdbClient::new(&config.tmdb)?);
    let aggregator = DetailAggregator::new(api.clone(), config.branch_timeout);
    info!(
        "TMDB base {} (language {}), branch timeout {:?}",
        config.tmdb.base_url, config.tmdb.language, config.branch_timeout
    );

    let app = build_router(AppState::new(api, aggregator)).layer(TraceLayer::new_for_http());

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/movies/trending", get(trending))
        .route("/movies/search", get(search))
        .route("/movies/:id", get(movie_detail))
        .route("/movies/:id/reviews", get(reviews))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn trending(State(state): State<AppState>) -> Result<Json<Vec<MovieSummary>>, StatusCode> {
    debug!("GET /movies/trending");
    state.api.trending().await.map(Json).map_err(|e| {
        warn!("Trending fetch failed: {}", e);
        status_for(&e)
    })
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<MovieSummary>, StatusCode> {
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or(StatusCode::BAD_REQUEST)?;
    debug!(query = %query, "GET /movies/search");

    state.api.search_by_name(query).await.map(Json).map_err(|e| {
        match e {
            TmdbError::NotFound(_) => info!("No TMDB match for '{}'", query),
            _ => warn!("Search for '{}' failed: {}", query, e),
        }
        status_for(&e)
    })
}

async fn movie_detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MovieDetail>, StatusCode> {
    debug!(movie_id = id, "GET /movies/:id");

    // Details seed the summary; the aggregator then fills the remaining branches.
    let details = match state.api.details(id).await {
        Ok(details) => details,
        Err(e) => {
            warn!("Failed to fetch TMDB movie {}: {}", id, e);
            return Err(status_for(&e));
        }
    };

    let detail = state.aggregator.aggregate_from_details(details).await;
    info!(
        "Aggregated '{}' (cast {}, recommended {})",
        detail.summary.title,
        detail.cast.len(),
        detail.recommended.len()
    );
    Ok(Json(detail))
}

async fn reviews(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<Review>>, StatusCode> {
    debug!(movie_id = id, "GET /movies/:id/reviews");
    state.api.reviews(id).await.map(Json).map_err(|e| {
        warn!("Failed to fetch reviews for {}: {}", id, e);
        status_for(&e)
    })
}

pub fn status_for(err: &TmdbError) -> StatusCode {
    match err {
        TmdbError::NotFound(_) => StatusCode::NOT_FOUND,
        TmdbError::Upstream { status: 404, .. } => StatusCode::NOT_FOUND,
        TmdbError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        TmdbError::Network(_) | TmdbError::Parse(_) | TmdbError::Upstream { .. } => {
            StatusCode::BAD_GATEWAY
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
