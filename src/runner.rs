use crate::client::SearchClient;
use crate::config::RougePolicy;
use crate::error::{EvalError, Result};
use crate::evaluation::summarize;
use crate::metrics::{mrr, ndcg_at_k, recall_at_k, rouge_l};
use crate::models::{
    EvaluationReport, FailedQuery, QueryOutcome, QueryRecord, QueryResult, Retrieval,
};
use log::{debug, error, info, warn};

/// Main runner that drives every (backend, query) pair through the search client
pub struct Runner<C> {
    client: C,
    backends: Vec<String>,
    k: usize,
    rouge_policy: RougePolicy,
}

impl<C: SearchClient> Runner<C> {
    pub fn new(client: C, backends: Vec<String>, k: usize, rouge_policy: RougePolicy) -> Self {
        Self {
            client,
            backends,
            k,
            rouge_policy,
        }
    }

    /// Evaluate all records against all backends and assemble the report.
    ///
    /// Individual failures are kept in the report. Fails with
    /// `EmptyResultSet` when no pair produced a result.
    pub async fn run_evaluations(&self, records: &[QueryRecord]) -> Result<EvaluationReport> {
        let outcomes = self.run_all(records).await;
        let attempted = outcomes.len();

        let (results, failures) = partition_outcomes(outcomes);
        if results.is_empty() {
            error!(
                "No results produced ({} of {} query/backend pairs failed); is the search API reachable?",
                failures.len(),
                attempted
            );
            return Err(EvalError::EmptyResultSet {
                attempted,
                failed: failures.len(),
            });
        }
        if !failures.is_empty() {
            warn!("{} of {} query/backend pairs failed", failures.len(), attempted);
        }

        let summary = summarize(&results, &failures);
        Ok(EvaluationReport {
            k: self.k,
            attempted,
            failed: failures.len(),
            summary,
            failures,
            results,
        })
    }

    /// Attempt every (backend, query) pair, backend by backend, in load order
    pub async fn run_all(&self, records: &[QueryRecord]) -> Vec<QueryOutcome> {
        let mut outcomes = Vec::with_capacity(self.backends.len() * records.len());

        for backend in &self.backends {
            info!("Evaluating backend {} over {} queries", backend, records.len());
            for (index, record) in records.iter().enumerate() {
                debug!(
                    "Processing query {}/{} (qid={}) on {}",
                    index + 1,
                    records.len(),
                    record.id,
                    backend
                );
                outcomes.push(self.attempt(backend, record).await);
            }
        }

        outcomes
    }

    async fn attempt(&self, backend: &str, record: &QueryRecord) -> QueryOutcome {
        match self.evaluate_single_query(backend, record).await {
            Ok(result) => QueryOutcome::Success(result),
            Err(e) => {
                warn!("{}", e);
                QueryOutcome::Failure(FailedQuery {
                    backend: backend.to_string(),
                    query_id: record.id.clone(),
                    error: e.to_string(),
                })
            }
        }
    }

    /// Query one backend and score the response
    async fn evaluate_single_query(&self, backend: &str, record: &QueryRecord) -> Result<QueryResult> {
        let retrieval = self
            .client
            .search(&record.query, backend, self.k)
            .await
            .map_err(|source| EvalError::Backend {
                backend: backend.to_string(),
                query_id: record.id.clone(),
                source,
            })?;

        Ok(score_query(backend, record, retrieval, self.k, self.rouge_policy))
    }
}

/// Compute every metric for one retrieval against its gold record
pub fn score_query(
    backend: &str,
    record: &QueryRecord,
    retrieval: Retrieval,
    k: usize,
    rouge_policy: RougePolicy,
) -> QueryResult {
    let gold = record.gold_set();
    let reference = record.gold_answer.as_deref().unwrap_or_default();

    let rouge = match rouge_l(&retrieval.answer, reference) {
        Some(score) => Some(score),
        None if rouge_policy == RougePolicy::Zero && !reference.trim().is_empty() => Some(0.0),
        None => None,
    };

    QueryResult {
        backend: backend.to_string(),
        query_id: record.id.clone(),
        query: record.query.clone(),
        gold_ids: record.gold_ids.clone(),
        gold_answer: record.gold_answer.clone(),
        latency: retrieval.latency,
        recall_at_k: recall_at_k(&retrieval.retrieved_ids, &gold, k),
        mrr: mrr(&retrieval.retrieved_ids, &gold),
        ndcg: ndcg_at_k(&retrieval.retrieved_ids, &gold, k),
        rouge_l: rouge,
        retrieved_ids: retrieval.retrieved_ids,
        answer: retrieval.answer,
    }
}

/// Split outcomes into successful rows and failures, each in attempt order
pub fn partition_outcomes(outcomes: Vec<QueryOutcome>) -> (Vec<QueryResult>, Vec<FailedQuery>) {
    let mut results = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            QueryOutcome::Success(result) => results.push(result),
            QueryOutcome::Failure(failure) => failures.push(failure),
        }
    }
    (results, failures)
}
