use crate::models::{FailedQuery, QueryResult, SummaryRow};

/// Average per-query metrics into one row per backend.
///
/// Backends appear in the order their first successful result does. A backend
/// with no successful result gets no row; its failures are still reported.
pub fn summarize(results: &[QueryResult], failures: &[FailedQuery]) -> Vec<SummaryRow> {
    let mut backends: Vec<&str> = Vec::new();
    for result in results {
        if !backends.contains(&result.backend.as_str()) {
            backends.push(&result.backend);
        }
    }

    backends
        .into_iter()
        .map(|backend| summarize_backend(backend, results, failures))
        .collect()
}

fn summarize_backend(backend: &str, results: &[QueryResult], failures: &[FailedQuery]) -> SummaryRow {
    let rows: Vec<&QueryResult> = results.iter().filter(|r| r.backend == backend).collect();
    let rouge_scores: Vec<f64> = rows.iter().filter_map(|r| r.rouge_l).collect();

    SummaryRow {
        backend: backend.to_string(),
        queries: rows.len(),
        failures: failures.iter().filter(|f| f.backend == backend).count(),
        latency: calculate_mean(rows.iter().map(|r| r.latency)),
        recall_at_k: calculate_mean(rows.iter().map(|r| r.recall_at_k)),
        mrr: calculate_mean(rows.iter().map(|r| r.mrr)),
        ndcg: calculate_mean(rows.iter().map(|r| r.ndcg)),
        rouge_l: if rouge_scores.is_empty() {
            None
        } else {
            Some(calculate_mean(rouge_scores.iter().copied()))
        },
        rouge_l_queries: rouge_scores.len(),
    }
}

/// Mean of scores; `0.0` for no scores
fn calculate_mean(scores: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = scores.fold((0.0, 0usize), |(sum, count), score| (sum + score, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryId;

    fn result(backend: &str, id: i64, recall: f64, rouge_l: Option<f64>) -> QueryResult {
        QueryResult {
            backend: backend.to_string(),
            query_id: QueryId::Int(id),
            query: format!("query {}", id),
            gold_ids: vec!["doc".to_string()],
            gold_answer: None,
            latency: 0.2 * id as f64,
            retrieved_ids: vec![],
            answer: String::new(),
            recall_at_k: recall,
            mrr: recall,
            ndcg: recall,
            rouge_l,
        }
    }

    fn failure(backend: &str, id: i64) -> FailedQuery {
        FailedQuery {
            backend: backend.to_string(),
            query_id: QueryId::Int(id),
            error: "timeout".to_string(),
        }
    }

    #[test]
    fn test_summarize_mean_per_backend() {
        let results = vec![
            result("keyword", 1, 1.0, Some(0.8)),
            result("keyword", 2, 0.0, Some(0.4)),
            result("vector", 1, 0.5, None),
        ];
        let summary = summarize(&results, &[]);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].backend, "keyword");
        assert_eq!(summary[0].queries, 2);
        assert!((summary[0].recall_at_k - 0.5).abs() < 1e-9);
        assert!((summary[0].latency - 0.3).abs() < 1e-9);
        assert!((summary[0].rouge_l.unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(summary[1].backend, "vector");
        assert_eq!(summary[1].rouge_l, None);
        assert_eq!(summary[1].rouge_l_queries, 0);
    }

    #[test]
    fn test_summarize_rouge_excludes_absent() {
        let results = vec![
            result("keyword", 1, 1.0, Some(1.0)),
            result("keyword", 2, 1.0, None),
            result("keyword", 3, 1.0, Some(0.5)),
        ];
        let summary = summarize(&results, &[]);

        assert!((summary[0].rouge_l.unwrap() - 0.75).abs() < 1e-9);
        assert_eq!(summary[0].rouge_l_queries, 2);
        assert_eq!(summary[0].queries, 3);
    }

    #[test]
    fn test_summarize_counts_failures() {
        let results = vec![result("keyword", 1, 1.0, None), result("vector", 2, 0.0, None)];
        let failures = vec![failure("vector", 1), failure("both", 1)];
        let summary = summarize(&results, &failures);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].failures, 0);
        assert_eq!(summary[1].failures, 1);
        assert_eq!(summary[1].queries, 1);
    }

    #[test]
    fn test_summarize_is_order_insensitive_within_backend() {
        let forward = vec![
            result("keyword", 1, 1.0, Some(0.2)),
            result("vector", 1, 0.25, None),
            result("keyword", 2, 0.0, Some(0.6)),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = summarize(&forward, &[]);
        let b = summarize(&reversed, &[]);
        let keyword_a = a.iter().find(|r| r.backend == "keyword").unwrap();
        let keyword_b = b.iter().find(|r| r.backend == "keyword").unwrap();
        assert!((keyword_a.recall_at_k - keyword_b.recall_at_k).abs() < 1e-12);
        assert!((keyword_a.rouge_l.unwrap() - keyword_b.rouge_l.unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[], &[failure("keyword", 1)]).is_empty());
    }

    #[test]
    fn test_calculate_mean() {
        assert_eq!(calculate_mean(std::iter::empty()), 0.0);
        assert!((calculate_mean([0.6, 0.7, 0.8, 0.9].into_iter()) - 0.75).abs() < 1e-9);
    }
}
