// src/topics/types.rs
use serde::{Deserialize, Serialize};

use crate::topics::error::FetchError;

/// One trending term with its metrics, as produced by the data pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub term: String,
    #[serde(default)]
    pub category: String,
    pub score: f64,
    pub percent_change: f64,
    /// Rendering-only time series; may be empty.
    #[serde(default)]
    pub sparkline: Vec<f64>,
    #[serde(default)]
    pub first_seen: String, // ISO 8601, kept verbatim
    #[serde(default)]
    pub last_seen: String,
    #[serde(default)]
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_queries: Option<Vec<String>>,
}

/// Wire payload of `latest.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopicsResponse {
    #[serde(default)]
    pub generated_at: String,
    /// Informational only; not checked against `topics.len()`. Values that are
    /// not a non-negative integer read as 0.
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_topics: u64,
    pub topics: Vec<Topic>,
}

impl TopicsResponse {
    /// Parse and structurally validate a raw payload.
    ///
    /// The document must be an object with a `topics` array; every entry has to
    /// decode as a [`Topic`]. Anything else is a [`FetchError::Malformed`].
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, FetchError> {
        let raw: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| FetchError::Malformed(format!("invalid JSON: {e}")))?;

        match raw.get("topics") {
            Some(serde_json::Value::Array(_)) => {}
            Some(other) => {
                return Err(FetchError::Malformed(format!(
                    "`topics` must be an array, got {}",
                    json_kind(other)
                )))
            }
            None => return Err(FetchError::Malformed("missing `topics` field".into())),
        }

        serde_json::from_value(raw)
            .map_err(|e| FetchError::Malformed(format!("invalid topic entry: {e}")))
    }
}

fn lenient_count<'de, D>(de: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(de)?;
    Ok(v.as_u64().unwrap_or(0))
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
