use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::topics::{
    apply_filters, categories_of, FetchError, FilterState, FilteredView, Retrieval, TopicStore,
};

/// Diagnostics header: HIT (cache), MISS (fetched now) or STALE (fallback).
pub const CACHE_HEADER: &str = "x-topics-cache";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TopicStore>,
}

impl AppState {
    pub fn new(store: Arc<TopicStore>) -> Self {
        Self { store }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/topics", get(get_topics))
        .route("/api/categories", get(get_categories))
        .route("/api/refresh", post(post_refresh))
        .route("/api/status", get(get_status))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TopicsBody {
    #[serde(flatten)]
    view: FilteredView,
    categories: Vec<String>,
    filters: FilterState,
    generated_at: String,
    last_updated: Option<String>,
    is_stale: bool,
    last_error: Option<String>,
    loading: bool,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

async fn get_topics(
    State(state): State<AppState>,
    Query(filters): Query<FilterState>,
) -> Response {
    let res = state.store.retrieve(false).await;
    render(&state, res, filters)
}

async fn post_refresh(
    State(state): State<AppState>,
    Query(filters): Query<FilterState>,
) -> Response {
    let res = state.store.retrieve(true).await;
    render(&state, res, filters)
}

fn render(state: &AppState, res: Result<Retrieval, FetchError>, filters: FilterState) -> Response {
    let r = match res {
        Ok(r) => r,
        Err(e) => return unavailable(&e),
    };

    let snap = state.store.snapshot();
    let data = r.data();
    let body = TopicsBody {
        view: apply_filters(&data.topics, &filters),
        categories: categories_of(&data.topics),
        filters,
        generated_at: data.generated_at.clone(),
        last_updated: snap.last_updated,
        is_stale: r.is_stale() || snap.is_stale,
        last_error: r.cause().map(|c| c.to_string()).or(snap.last_error),
        loading: snap.loading,
    };

    ([(CACHE_HEADER, r.cache_status())], Json(body)).into_response()
}

fn unavailable(e: &FetchError) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorBody {
            error: e.to_string(),
            kind: e.kind(),
        }),
    )
        .into_response()
}

/// Categories of whatever is current; goes through the cache like `/api/topics`.
async fn get_categories(State(state): State<AppState>) -> Response {
    match state.store.retrieve(false).await {
        Ok(r) => (
            [(CACHE_HEADER, r.cache_status())],
            Json(categories_of(&r.data().topics)),
        )
            .into_response(),
        Err(e) => unavailable(&e),
    }
}

/// Store state without triggering a fetch.
async fn get_status(State(state): State<AppState>) -> Json<crate::topics::StoreSnapshot> {
    Json(state.store.snapshot())
}
