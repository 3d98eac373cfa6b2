use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::topics::CACHE_TTL;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and describe the topic series.
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new().install_recorder()?;
                describe();
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();

        // Static gauge with the cache TTL (absolute TTL, no sliding refresh)
        gauge!("topics_cache_ttl_ms").set(CACHE_TTL.as_millis() as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("topics_fetch_total", "Source calls made by the topic store.");
    describe_counter!(
        "topics_fetch_errors_total",
        "Failed source calls, labelled by error kind."
    );
    describe_counter!(
        "topics_cache_hits_total",
        "Retrievals served from cache inside the TTL."
    );
    describe_counter!(
        "topics_stale_served_total",
        "Failed refreshes answered with the previous payload."
    );
    describe_counter!(
        "topics_stale_refresh_total",
        "Forced refreshes triggered by the staleness ticker."
    );
    describe_histogram!("topics_fetch_ms", "Source call duration in milliseconds.");
    describe_gauge!("topics_cache_ttl_ms", "Cache TTL in milliseconds.");
    describe_gauge!("topics_last_fetch_ts", "Unix ts of the last successful fetch.");
    describe_gauge!("topics_cached_count", "Topics in the cached payload.");
}
