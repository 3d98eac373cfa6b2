// src/topics/view.rs
//! View pipeline: filter → stable sort → summarize. Pure, no I/O.

use serde::{Deserialize, Serialize};

use crate::topics::types::Topic;

/// Sort key offered to the dashboard user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Score,
    PercentChange,
}

impl SortKey {
    fn key(self, t: &Topic) -> f64 {
        match self {
            SortKey::Score => t.score,
            SortKey::PercentChange => t.percent_change,
        }
    }
}

/// User-chosen view configuration; also the `/api/topics` query string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    /// Empty means "all categories".
    pub category: String,
    pub min_score: f64,
    pub sort_by: SortKey,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            category: String::new(),
            min_score: 0.0,
            sort_by: SortKey::Score,
        }
    }
}

impl FilterState {
    pub fn matches(&self, t: &Topic) -> bool {
        (self.category.is_empty() || self.category == t.category) && t.score >= self.min_score
    }
}

/// Ordered subset ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredView {
    pub topics: Vec<Topic>,
    /// Length of `topics`.
    pub count: usize,
    /// Length of the unfiltered input.
    pub total: usize,
}

pub fn apply_filters(topics: &[Topic], filters: &FilterState) -> FilteredView {
    let mut kept: Vec<Topic> = topics
        .iter()
        .filter(|t| filters.matches(t))
        .cloned()
        .collect();

    // `sort_by` is stable: equal keys keep their input order.
    let key = filters.sort_by;
    kept.sort_by(|a, b| key.key(b).total_cmp(&key.key(a)));

    FilteredView {
        count: kept.len(),
        total: topics.len(),
        topics: kept,
    }
}
