use crate::error::{EvalError, Result};
use crate::models::{EvaluationReport, QueryResult, SummaryRow};
use clap::ValueEnum;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const PER_QUERY_FILE: &str = "metrics_per_query.csv";
pub const SUMMARY_FILE: &str = "metrics_summary.csv";
pub const SUMMARY_JSON_FILE: &str = "summary.json";

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Paths of the report files written for a run
#[derive(Debug)]
pub struct ReportFiles {
    pub per_query: PathBuf,
    pub summary: PathBuf,
    pub summary_json: PathBuf,
}

/// Flattened per-query row; list cells hold JSON arrays
#[derive(Debug, Serialize)]
struct DetailRow<'a> {
    backend: &'a str,
    query_id: String,
    query: &'a str,
    gold_ids: String,
    latency: f64,
    recall_at_k: f64,
    mrr: f64,
    ndcg: f64,
    #[serde(rename = "rougeL")]
    rouge_l: Option<f64>,
    retrieved_ids: String,
    answer: &'a str,
    gold_answer: &'a str,
}

impl<'a> DetailRow<'a> {
    fn from_result(result: &'a QueryResult) -> Result<Self> {
        Ok(Self {
            backend: &result.backend,
            query_id: result.query_id.to_string(),
            query: &result.query,
            gold_ids: serde_json::to_string(&result.gold_ids)?,
            latency: result.latency,
            recall_at_k: result.recall_at_k,
            mrr: result.mrr,
            ndcg: result.ndcg,
            rouge_l: result.rouge_l,
            retrieved_ids: serde_json::to_string(&result.retrieved_ids)?,
            answer: &result.answer,
            gold_answer: result.gold_answer.as_deref().unwrap_or_default(),
        })
    }
}

/// Write the per-query table, the per-backend summary table and the JSON summary into `dir`
pub fn write_reports(report: &EvaluationReport, dir: &Path) -> Result<ReportFiles> {
    std::fs::create_dir_all(dir).map_err(|e| EvalError::io(dir, e))?;

    let files = ReportFiles {
        per_query: dir.join(PER_QUERY_FILE),
        summary: dir.join(SUMMARY_FILE),
        summary_json: dir.join(SUMMARY_JSON_FILE),
    };

    write_per_query(&report.results, &files.per_query)?;
    write_summary(&report.summary, &files.summary)?;

    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&files.summary_json, json).map_err(|e| EvalError::io(&files.summary_json, e))?;

    Ok(files)
}

fn write_per_query(results: &[QueryResult], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for result in results {
        writer.serialize(DetailRow::from_result(result)?)?;
    }
    writer.flush().map_err(|e| EvalError::io(path, e))?;
    Ok(())
}

fn write_summary(summary: &[SummaryRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in summary {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| EvalError::io(path, e))?;
    Ok(())
}

/// Print the evaluation summary in the specified format
pub fn print_results(report: &EvaluationReport, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print_plain(report),
        OutputFormat::Json => print_json(report),
    }
}

/// Print results in plain text format
fn print_plain(report: &EvaluationReport) {
    println!("{}", render_plain(report));
}

/// Render the summary table followed by the failure count and one line per failure
fn render_plain(report: &EvaluationReport) -> String {
    let mut lines = vec![
        format!("📊 SUMMARY (k={})", report.k),
        "-----------------".to_string(),
    ];
    lines.extend(render_summary_plain(&report.summary));
    lines.push(String::new());

    lines.push(format!(
        "Failed query/backend pairs: {} of {}",
        report.failed, report.attempted
    ));
    for failure in &report.failures {
        lines.push(format!(
            "  • backend={} qid={}: {}",
            failure.backend, failure.query_id, failure.error
        ));
    }
    lines.join("\n")
}

/// Per-backend table lines; latency in seconds to 2 decimals
fn render_summary_plain(summary: &[SummaryRow]) -> Vec<String> {
    if summary.is_empty() {
        return vec!["No statistics available.".to_string()];
    }

    let mut lines = vec![
        format!(
            "{:<12} {:>7} {:>6} {:>9} {:>8} {:>8} {:>8} {:>8}",
            "Backend", "Queries", "Failed", "Latency", "Recall", "MRR", "nDCG", "ROUGE-L"
        ),
        "-".repeat(73),
    ];

    for row in summary {
        lines.push(format!(
            "{:<12} {:>7} {:>6} {:>9.2} {:>8.3} {:>8.3} {:>8.3} {:>8}",
            row.backend,
            row.queries,
            row.failures,
            row.latency,
            row.recall_at_k,
            row.mrr,
            row.ndcg,
            format_optional(row.rouge_l)
        ));
    }
    lines
}

fn format_optional(score: Option<f64>) -> String {
    match score {
        Some(score) => format!("{:.3}", score),
        None => "n/a".to_string(),
    }
}

/// Print results in JSON format
fn print_json(report: &EvaluationReport) {
    match render_json(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results to JSON: {}", e),
    }
}

fn render_json(report: &EvaluationReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailedQuery, QueryId};
    use tempfile::tempdir;

    fn create_test_report() -> EvaluationReport {
        let result = QueryResult {
            backend: "keyword".to_string(),
            query_id: QueryId::Int(1),
            query: "lorem, ipsum".to_string(),
            gold_ids: vec!["doc_000005".to_string()],
            gold_answer: Some("lorem ipsum dolor".to_string()),
            latency: 0.123456,
            retrieved_ids: vec!["doc_000005".to_string(), "doc_000002".to_string()],
            answer: "lorem ipsum".to_string(),
            recall_at_k: 1.0,
            mrr: 1.0,
            ndcg: 1.0,
            rouge_l: Some(0.8),
        };
        let unscored = QueryResult {
            query_id: QueryId::Text("q-2".to_string()),
            gold_answer: None,
            rouge_l: None,
            recall_at_k: 0.0,
            mrr: 0.0,
            ndcg: 0.0,
            ..result.clone()
        };
        let summary = vec![SummaryRow {
            backend: "keyword".to_string(),
            queries: 2,
            failures: 1,
            latency: 0.123456,
            recall_at_k: 0.5,
            mrr: 0.5,
            ndcg: 0.5,
            rouge_l: Some(0.8),
            rouge_l_queries: 1,
        }];
        let failures = vec![FailedQuery {
            backend: "vector".to_string(),
            query_id: QueryId::Int(1),
            error: "request failed: operation timed out".to_string(),
        }];

        EvaluationReport {
            k: 5,
            attempted: 4,
            failed: 1,
            summary,
            failures,
            results: vec![result, unscored],
        }
    }

    #[test]
    fn test_write_reports() {
        let dir = tempdir().unwrap();
        let reports_dir = dir.path().join("reports");
        let report = create_test_report();

        let files = write_reports(&report, &reports_dir).unwrap();
        assert!(files.per_query.exists());
        assert!(files.summary.exists());
        assert!(files.summary_json.exists());

        let mut reader = csv::Reader::from_path(&files.per_query).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![
                "backend",
                "query_id",
                "query",
                "gold_ids",
                "latency",
                "recall_at_k",
                "mrr",
                "ndcg",
                "rougeL",
                "retrieved_ids",
                "answer",
                "gold_answer"
            ]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "1");
        assert_eq!(&rows[0][2], "lorem, ipsum");
        assert_eq!(&rows[0][3], r#"["doc_000005"]"#);
        // Stored values are not rounded
        assert_eq!(&rows[0][4], "0.123456");
        assert_eq!(&rows[0][9], r#"["doc_000005","doc_000002"]"#);
        assert_eq!(&rows[1][1], "q-2");
        assert_eq!(&rows[1][8], "");
        assert_eq!(&rows[1][11], "");
    }

    #[test]
    fn test_write_summary_csv_and_json() {
        let dir = tempdir().unwrap();
        let report = create_test_report();
        let files = write_reports(&report, dir.path()).unwrap();

        let mut reader = csv::Reader::from_path(&files.summary).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![
                "backend",
                "queries",
                "failures",
                "latency",
                "recall_at_k",
                "mrr",
                "ndcg",
                "rougeL",
                "rougeL_queries"
            ]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "keyword");
        assert_eq!(&rows[0][4], "0.5");

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&files.summary_json).unwrap()).unwrap();
        assert_eq!(json["k"], 5);
        assert_eq!(json["attempted"], 4);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["summary"][0]["rougeL"], 0.8);
        assert_eq!(json["failures"][0]["backend"], "vector");
        assert!(json.get("results").is_none());
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(0.12345)), "0.123");
        assert_eq!(format_optional(None), "n/a");
    }

    #[test]
    fn test_render_plain_reports_failures() {
        let report = create_test_report();
        let text = render_plain(&report);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "📊 SUMMARY (k=5)");
        assert!(lines[2].starts_with("Backend"));
        assert!(lines[4].starts_with("keyword"));
        assert!(lines[4].contains("0.12"));
        assert!(lines[4].contains("0.800"));
        assert!(lines.contains(&"Failed query/backend pairs: 1 of 4"));
        assert_eq!(
            *lines.last().unwrap(),
            "  • backend=vector qid=1: request failed: operation timed out"
        );
    }

    #[test]
    fn test_render_plain_without_failures() {
        let report = EvaluationReport {
            attempted: 2,
            failed: 0,
            failures: vec![],
            ..create_test_report()
        };
        let text = render_plain(&report);
        assert!(text.ends_with("Failed query/backend pairs: 0 of 2"));
        assert!(!text.contains("•"));
    }

    #[test]
    fn test_render_json_matches_summary() {
        let report = create_test_report();
        let json: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();
        assert_eq!(json["attempted"], 4);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["failures"][0]["query_id"], 1);
        assert_eq!(json["summary"][0]["backend"], "keyword");
    }

    #[test]
    fn test_render_summary_plain_empty() {
        assert_eq!(render_summary_plain(&[]), vec!["No statistics available."]);
    }
}
