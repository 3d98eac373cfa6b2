//! Topic Dashboard: binary entrypoint
//! Boots the Axum HTTP server: topic store, staleness ticker, API routes and
//! the static dashboard.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use topic_dashboard::DashboardConfig;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - DASHBOARD_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("DASHBOARD_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("topics=info,topic_dashboard=info,warn"));

    // Shuttle may already have installed a subscriber; don't panic over it.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = DashboardConfig::load_default()?;
    let router = topic_dashboard::start(&cfg)?;

    Ok(router.into())
}
