// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod metrics;
pub mod topics;

use std::sync::Arc;

use axum::Router;
use tower_http::services::ServeDir;
use tracing::info;

pub use crate::api::{router, AppState};
pub use crate::config::DashboardConfig;
pub use crate::topics::{FilterState, Retrieval, TopicStore};

/// Assemble the full HTTP app around an existing store: API routes, optional
/// `/metrics`, and the static dashboard files as fallback.
pub fn build_app(cfg: &DashboardConfig, store: Arc<TopicStore>) -> anyhow::Result<Router> {
    let mut app = api::router(AppState::new(store));

    if cfg.metrics {
        let m = crate::metrics::Metrics::init()?;
        app = app.merge(m.router());
    }

    Ok(app.fallback_service(ServeDir::new(&cfg.static_dir)))
}

/// Binary entry: build everything and spawn the staleness ticker.
pub fn start(cfg: &DashboardConfig) -> anyhow::Result<Router> {
    let source = cfg.build_source()?;
    info!(
        source = source.name(),
        url = ?cfg.source.url,
        path = ?cfg.source.path,
        stale_check_secs = cfg.stale_check_secs,
        "starting topic dashboard"
    );
    let store = Arc::new(TopicStore::with_system_clock(source));
    topics::scheduler::spawn_staleness_checker(
        store.clone(),
        topics::scheduler::StalenessCheckCfg {
            interval: cfg.stale_check_interval(),
        },
    );
    build_app(cfg, store)
}
