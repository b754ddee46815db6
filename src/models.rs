use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Query identifier as it appears in the input file (integer or string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryId {
    Int(i64),
    /// Integers above `i64::MAX`
    UInt(u64),
    Text(String),
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryId::Int(id) => write!(f, "{}", id),
            QueryId::UInt(id) => write!(f, "{}", id),
            QueryId::Text(id) => f.write_str(id),
        }
    }
}

/// Accepts a list of string or integer ids (or null) and renders every entry as a string
fn string_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<QueryId>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .iter()
        .map(ToString::to_string)
        .collect())
}

/// One line of a gold or queries file before required fields are checked
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    #[serde(alias = "qid")]
    pub id: QueryId,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default, alias = "relevant_ids", deserialize_with = "string_ids")]
    pub gold_ids: Vec<String>,
    #[serde(default, alias = "ref_answer")]
    pub gold_answer: Option<String>,
}

/// A gold-standard query with its relevant document ids
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRecord {
    pub id: QueryId,
    pub query: String,
    /// Relevant document ids in file order; order carries no meaning
    pub gold_ids: Vec<String>,
    pub gold_answer: Option<String>,
}

impl QueryRecord {
    pub fn gold_set(&self) -> HashSet<String> {
        self.gold_ids.iter().cloned().collect()
    }
}

/// A single hit returned by the search endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Hit {
    pub source: Option<String>,
    pub id: Option<String>,
    pub text: Option<String>,
    pub answer: Option<String>,
    /// Backend-specific scale, not comparable across backends
    pub score: Option<f64>,
}

/// Canonical form of a search endpoint response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub hits: Vec<Hit>,
    /// Snippet of the first listed element; empty when that element is not a hit
    pub answer: String,
    /// Server-reported latency, when the endpoint provides one
    pub latency_ms: Option<f64>,
}

/// What the evaluation needs from one search call
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    /// Snippet of the top hit, or empty
    pub answer: String,
    /// Ranked document ids in backend order
    pub retrieved_ids: Vec<String>,
    /// Seconds
    pub latency: f64,
}

/// Metrics for one (backend, query) pair
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub backend: String,
    pub query_id: QueryId,
    pub query: String,
    pub gold_ids: Vec<String>,
    pub gold_answer: Option<String>,
    pub latency: f64,
    pub retrieved_ids: Vec<String>,
    pub answer: String,
    pub recall_at_k: f64,
    pub mrr: f64,
    pub ndcg: f64,
    #[serde(rename = "rougeL")]
    pub rouge_l: Option<f64>,
}

/// A (backend, query) pair that could not be evaluated
#[derive(Debug, Clone, Serialize)]
pub struct FailedQuery {
    pub backend: String,
    pub query_id: QueryId,
    pub error: String,
}

/// Result of attempting one (backend, query) pair
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Success(QueryResult),
    Failure(FailedQuery),
}

/// Mean metrics for one backend
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub backend: String,
    /// Successful queries the means are computed over
    pub queries: usize,
    pub failures: usize,
    pub latency: f64,
    pub recall_at_k: f64,
    pub mrr: f64,
    pub ndcg: f64,
    /// Mean over queries that had a ROUGE-L score; absent when none did
    #[serde(rename = "rougeL")]
    pub rouge_l: Option<f64>,
    #[serde(rename = "rougeL_queries")]
    pub rouge_l_queries: usize,
}

/// Complete output of an evaluation run
#[derive(Debug, Serialize)]
pub struct EvaluationReport {
    pub k: usize,
    /// Number of (backend, query) pairs attempted
    pub attempted: usize,
    pub failed: usize,
    pub summary: Vec<SummaryRow>,
    pub failures: Vec<FailedQuery>,
    /// Per-query rows, written to the detailed table only
    #[serde(skip)]
    pub results: Vec<QueryResult>,
}
