use crate::error::BackendFailure;
use crate::models::{Hit, Retrieval, SearchResponse};
use log::debug;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

/// A search endpoint that can be asked for the top `k` hits of a query on one backend
pub trait SearchClient {
    async fn search(
        &self,
        query: &str,
        backend: &str,
        k: usize,
    ) -> Result<Retrieval, BackendFailure>;
}

/// Client for the unified HTTP search endpoint
pub struct HttpSearchClient {
    api_url: String,
    http: reqwest::Client,
}

impl HttpSearchClient {
    /// Create a client whose requests give up after `timeout`
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendFailure> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_url: api_url.into(),
            http,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl SearchClient for HttpSearchClient {
    async fn search(
        &self,
        query: &str,
        backend: &str,
        k: usize,
    ) -> Result<Retrieval, BackendFailure> {
        let k_param = k.to_string();
        let started = Instant::now();

        let response = self
            .http
            .get(&self.api_url)
            .query(&[("query", query), ("backend", backend), ("k", k_param.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendFailure::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let measured = started.elapsed().as_secs_f64();

        let value: Value =
            serde_json::from_str(&body).map_err(|e| BackendFailure::Body(e.to_string()))?;
        let normalized = normalize_response(&value);
        debug!(
            "backend={} returned {} hits in {:.3}s",
            backend,
            normalized.hits.len(),
            measured
        );

        Ok(extract_retrieval(normalized, k, measured))
    }
}

/// Bring either response shape into canonical form.
///
/// The endpoint answers with a bare array of hits, or (older servers) an
/// object holding the hits under `sources` and optionally `latency_ms`.
/// Anything else yields no hits.
pub fn normalize_response(value: &Value) -> SearchResponse {
    match value {
        Value::Array(items) => response_from_items(items, None),
        Value::Object(object) => {
            let latency_ms = object.get("latency_ms").and_then(Value::as_f64);
            match object.get("sources") {
                Some(Value::Array(items)) => response_from_items(items, latency_ms),
                _ => SearchResponse {
                    latency_ms,
                    ..SearchResponse::default()
                },
            }
        }
        _ => SearchResponse::default(),
    }
}

/// Elements that are not objects are dropped from the ranking, but still
/// occupy the first position when the answer is chosen
fn response_from_items(items: &[Value], latency_ms: Option<f64>) -> SearchResponse {
    let answer = items
        .first()
        .and_then(hit_from_value)
        .and_then(|first| first.text.filter(|text| !text.is_empty()).or(first.answer))
        .unwrap_or_default();

    SearchResponse {
        hits: items.iter().filter_map(hit_from_value).collect(),
        answer,
        latency_ms,
    }
}

fn hit_from_value(value: &Value) -> Option<Hit> {
    let object = value.as_object()?;
    Some(Hit {
        source: text_field(object, "source"),
        id: object.get("id").and_then(id_text),
        text: text_field(object, "text"),
        answer: text_field(object, "answer"),
        score: object.get("score").and_then(Value::as_f64),
    })
}

/// Multi-valued fields contribute their first string
fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Array(values) => values.iter().find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    }
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(id) => Some(id.clone()),
        other => Some(other.to_string()),
    }
}

/// Pick the answer snippet and ranked ids out of a normalized response.
///
/// Ids keep backend order and are cut to `k`. A server-reported latency wins
/// over the locally measured one.
pub fn extract_retrieval(response: SearchResponse, k: usize, measured_secs: f64) -> Retrieval {
    let retrieved_ids: Vec<String> = response
        .hits
        .iter()
        .filter_map(|hit| hit.id.clone())
        .take(k)
        .collect();

    let latency = match response.latency_ms {
        Some(ms) => ms / 1000.0,
        None => measured_secs,
    };

    Retrieval {
        answer: response.answer,
        retrieved_ids,
        latency,
    }
}
