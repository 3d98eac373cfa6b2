// src/topics/scheduler.rs
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::topics::store::TopicStore;

#[derive(Clone, Copy, Debug)]
pub struct StalenessCheckCfg {
    pub interval: Duration,
}

impl Default for StalenessCheckCfg {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// One tick: force a refresh if the store has gone stale.
/// Returns true when a refresh was attempted.
pub async fn check_once(store: &TopicStore) -> bool {
    if !store.is_stale() {
        tracing::trace!(target: "topics", "staleness tick: still fresh");
        return false;
    }

    counter!("topics_stale_refresh_total").increment(1);
    match store.retrieve(true).await {
        Ok(r) => {
            tracing::info!(
                target: "topics",
                cache = r.cache_status(),
                topics = r.data().topics.len(),
                "staleness tick refreshed topics"
            );
        }
        Err(e) => {
            tracing::warn!(target: "topics", error = %e, "staleness tick failed");
        }
    }
    true
}

/// Spawn the background ticker. The first tick fires immediately, which also
/// warms the cache at startup.
pub fn spawn_staleness_checker(store: Arc<TopicStore>, cfg: StalenessCheckCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            check_once(&store).await;
        }
    })
}
