// tests/common/mod.rs
// Shared helpers for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use topic_dashboard::topics::{
    FetchError, ManualClock, Topic, TopicSource, TopicStore, TopicsResponse,
};

/// Source that replays a queue of canned outcomes and counts calls.
#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<TopicsResponse, FetchError>>>,
    calls: AtomicUsize,
    forced: Mutex<Vec<bool>>,
    delay: Option<Duration>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push_ok(&self, resp: TopicsResponse) -> &Self {
        self.script.lock().unwrap().push_back(Ok(resp));
        self
    }

    pub fn push_err(&self, err: FetchError) -> &Self {
        self.script.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn forced_flags(&self) -> Vec<bool> {
        self.forced.lock().unwrap().clone()
    }
}

#[async_trait]
impl TopicSource for ScriptedSource {
    async fn fetch(&self, force_refresh: bool) -> Result<TopicsResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.forced.lock().unwrap().push(force_refresh);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Err(FetchError::Transport {
                url: "scripted://latest.json".into(),
                message: "script exhausted".into(),
            })
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub fn topic(term: &str, category: &str, score: f64, pct: f64) -> Topic {
    Topic {
        term: term.into(),
        category: category.into(),
        score,
        percent_change: pct,
        sparkline: vec![1.0, 2.0, 3.0],
        first_seen: "2025-08-01T00:00:00".into(),
        last_seen: "2025-09-01T00:00:00".into(),
        volume: 42.0,
        related_queries: None,
    }
}

pub fn response(tag: &str, topics: Vec<Topic>) -> TopicsResponse {
    TopicsResponse {
        generated_at: format!("2025-09-01T06:00:00-{tag}"),
        total_topics: topics.len() as u64,
        topics,
    }
}

/// The three-topic dataset used by the filter scenarios.
pub fn abc() -> Vec<Topic> {
    vec![
        topic("A", "x", 5.0, 10.0),
        topic("B", "x", 8.0, -5.0),
        topic("C", "y", 3.0, 50.0),
    ]
}

pub fn transport_err() -> FetchError {
    FetchError::Transport {
        url: "scripted://latest.json".into(),
        message: "connection refused".into(),
    }
}

pub fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap())
}

pub fn store_with(source: Arc<ScriptedSource>, clock: &ManualClock) -> TopicStore {
    TopicStore::new(source, Arc::new(clock.clone()))
}
