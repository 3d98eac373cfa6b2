// src/topics/store.rs
//! # Topic Store
//! Holds the most recent topics payload, decides when it is still usable and
//! falls back to it when a refresh fails.
//!
//! One entry at most, memory only. Overlapping refreshes are collapsed into a
//! single source call (single-flight): callers that arrive while a fetch is
//! running wait for it and receive its outcome. A forced caller only joins a
//! forced fetch; behind a plain one it issues its own cache-busting call.

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use metrics::{counter, gauge, histogram};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::topics::clock::{Clock, SystemClock};
use crate::topics::error::FetchError;
use crate::topics::source::TopicSource;
use crate::topics::types::{Topic, TopicsResponse};

/// How long a fetched payload is served without going back to the source.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Outcome of [`TopicStore::retrieve`] when data is available.
#[derive(Debug, Clone)]
pub enum Retrieval {
    /// Just fetched from the source.
    Fresh(Arc<TopicsResponse>),
    /// Served from cache inside the TTL window; no source call was made.
    Cached(Arc<TopicsResponse>),
    /// The refresh failed; this is the last good payload, unchanged.
    Stale {
        data: Arc<TopicsResponse>,
        cause: FetchError,
    },
}

impl Retrieval {
    pub fn data(&self) -> &Arc<TopicsResponse> {
        match self {
            Retrieval::Fresh(d) | Retrieval::Cached(d) => d,
            Retrieval::Stale { data, .. } => data,
        }
    }

    pub fn into_data(self) -> Arc<TopicsResponse> {
        match self {
            Retrieval::Fresh(d) | Retrieval::Cached(d) => d,
            Retrieval::Stale { data, .. } => data,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Retrieval::Stale { .. })
    }

    pub fn cause(&self) -> Option<&FetchError> {
        match self {
            Retrieval::Stale { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// Value for the `X-Topics-Cache` diagnostics header.
    pub fn cache_status(&self) -> &'static str {
        match self {
            Retrieval::Fresh(_) => "MISS",
            Retrieval::Cached(_) => "HIT",
            Retrieval::Stale { .. } => "STALE",
        }
    }
}

/// Point-in-time view of the store for the rendering layer.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(skip)]
    pub data: Option<Arc<TopicsResponse>>,
    pub categories: Vec<String>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub last_updated: Option<String>,
    pub generated_at: Option<String>,
    pub is_stale: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Arc<TopicsResponse>,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    /// Monotonic count of completed source calls; never reset.
    attempts: u64,
    /// Outcome of attempt number `attempts`, shared with waiting callers.
    last_outcome: Option<Result<(), FetchError>>,
    /// Whether attempt number `attempts` asked the source to bypass caches.
    last_forced: bool,
    last_error: Option<String>,
}

pub struct TopicStore {
    source: Arc<dyn TopicSource>,
    clock: Arc<dyn Clock>,
    ttl: ChronoDuration,
    state: Mutex<CacheState>,
    flight: tokio::sync::Mutex<()>,
    loading: AtomicBool,
}

impl TopicStore {
    pub fn new(source: Arc<dyn TopicSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            ttl: ChronoDuration::seconds(CACHE_TTL.as_secs() as i64),
            state: Mutex::new(CacheState::default()),
            flight: tokio::sync::Mutex::new(()),
            loading: AtomicBool::new(false),
        }
    }

    /// Store driven by the wall clock.
    pub fn with_system_clock(source: Arc<dyn TopicSource>) -> Self {
        Self::new(source, Arc::new(SystemClock))
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.clock.now().signed_duration_since(entry.fetched_at) < self.ttl
    }

    /// Return the topics payload, from cache when allowed and still fresh.
    ///
    /// `Err` only when the source failed and there is nothing cached; a failure
    /// with a cache present comes back as [`Retrieval::Stale`] and leaves the
    /// fetch timestamp untouched.
    pub async fn retrieve(&self, force_refresh: bool) -> Result<Retrieval, FetchError> {
        let seen_attempts = {
            let st = self.lock_state();
            if !force_refresh {
                if let Some(entry) = st.entry.as_ref().filter(|e| self.is_fresh(e)) {
                    counter!("topics_cache_hits_total").increment(1);
                    debug!(target: "topics", "serving cached topics");
                    return Ok(Retrieval::Cached(entry.data.clone()));
                }
            }
            st.attempts
        };

        let _flight = self.flight.lock().await;

        // A fetch completed while we were queued: share it instead of refetching.
        {
            let st = self.lock_state();
            if st.attempts != seen_attempts && (st.last_forced || !force_refresh) {
                if let Some(shared) = shared_outcome(&st) {
                    debug!(target: "topics", "joined in-flight fetch");
                    return shared;
                }
            }
        }

        let t0 = Instant::now();
        let result = {
            let _loading = LoadingFlag::raise(&self.loading);
            self.source.fetch(force_refresh).await
        };
        let elapsed_ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("topics_fetch_ms").record(elapsed_ms);
        counter!("topics_fetch_total").increment(1);

        let now = self.clock.now();
        let mut st = self.lock_state();
        st.attempts = st.attempts.wrapping_add(1);
        st.last_forced = force_refresh;

        match result {
            Ok(resp) => {
                info!(
                    target: "topics",
                    source = self.source.name(),
                    topics = resp.topics.len(),
                    generated_at = %resp.generated_at,
                    elapsed_ms = elapsed_ms as u64,
                    force_refresh,
                    "topics fetched"
                );
                gauge!("topics_cached_count").set(resp.topics.len() as f64);
                gauge!("topics_last_fetch_ts").set(now.timestamp() as f64);

                let data = Arc::new(resp);
                st.entry = Some(CacheEntry {
                    data: data.clone(),
                    fetched_at: now,
                });
                st.last_outcome = Some(Ok(()));
                st.last_error = None;
                Ok(Retrieval::Fresh(data))
            }
            Err(e) => {
                counter!("topics_fetch_errors_total", "kind" => e.kind()).increment(1);
                st.last_outcome = Some(Err(e.clone()));
                st.last_error = Some(e.to_string());
                match &st.entry {
                    Some(entry) => {
                        counter!("topics_stale_served_total").increment(1);
                        warn!(
                            target: "topics",
                            source = self.source.name(),
                            error = %e,
                            fetched_at = %entry.fetched_at,
                            "refresh failed, serving stale topics"
                        );
                        Ok(Retrieval::Stale {
                            data: entry.data.clone(),
                            cause: e,
                        })
                    }
                    None => {
                        warn!(
                            target: "topics",
                            source = self.source.name(),
                            error = %e,
                            "refresh failed with nothing cached"
                        );
                        Err(e)
                    }
                }
            }
        }
    }

    /// True when nothing is cached or the cached payload is at least TTL old.
    pub fn is_stale(&self) -> bool {
        let st = self.lock_state();
        match &st.entry {
            Some(entry) => !self.is_fresh(entry),
            None => true,
        }
    }

    /// Back to the never-fetched state.
    pub fn reset(&self) {
        let mut st = self.lock_state();
        st.entry = None;
        st.last_outcome = None;
        st.last_error = None;
        debug!(target: "topics", "store reset");
    }

    /// When the cached payload was fetched, if any.
    pub fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
        self.lock_state().entry.as_ref().map(|e| e.fetched_at)
    }

    /// Cached payload regardless of age, without touching the source.
    pub fn current(&self) -> Option<Arc<TopicsResponse>> {
        self.lock_state().entry.as_ref().map(|e| e.data.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let st = self.lock_state();
        let data = st.entry.as_ref().map(|e| e.data.clone());
        StoreSnapshot {
            categories: data
                .as_deref()
                .map(|d| categories_of(&d.topics))
                .unwrap_or_default(),
            generated_at: data.as_ref().map(|d| d.generated_at.clone()),
            last_updated: st
                .entry
                .as_ref()
                .map(|e| e.fetched_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            is_stale: st.entry.as_ref().map_or(true, |e| !self.is_fresh(e)),
            last_error: st.last_error.clone(),
            loading: self.is_loading(),
            data,
        }
    }
}

fn shared_outcome(st: &CacheState) -> Option<Result<Retrieval, FetchError>> {
    match (&st.last_outcome, &st.entry) {
        (Some(Ok(())), Some(entry)) => Some(Ok(Retrieval::Fresh(entry.data.clone()))),
        (Some(Err(e)), Some(entry)) => Some(Ok(Retrieval::Stale {
            data: entry.data.clone(),
            cause: e.clone(),
        })),
        (Some(Err(e)), None) => Some(Err(e.clone())),
        // reset() landed in between; fetch again
        _ => None,
    }
}

/// Distinct, non-empty categories in ascending order.
pub fn categories_of(topics: &[Topic]) -> Vec<String> {
    topics
        .iter()
        .map(|t| t.category.as_str())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Keeps `loading` true for the lifetime of the fetch, even if the future is dropped.
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
