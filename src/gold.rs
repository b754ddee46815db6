//! Gold-standard loading and generation.
//!
//! Inputs are line-delimited JSON. A line that does not decode aborts the
//! whole load: a partially read gold set would silently skew every metric.

use crate::error::{EvalError, Result};
use crate::models::{QueryId, QueryRecord, RawRecord};
use log::{debug, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Decode every non-blank line of a JSONL file, keeping 1-based line numbers
fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<(usize, T)>> {
    let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;

    let mut rows = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(line).map_err(|e| EvalError::DataFormat {
            path: path.to_path_buf(),
            line: index + 1,
            message: e.to_string(),
        })?;
        rows.push((index + 1, row));
    }
    Ok(rows)
}

fn require_query(path: &Path, line: usize, raw: RawRecord) -> Result<QueryRecord> {
    let query = raw.query.ok_or_else(|| EvalError::DataFormat {
        path: path.to_path_buf(),
        line,
        message: "missing field `query`".to_string(),
    })?;
    Ok(QueryRecord {
        id: raw.id,
        query,
        gold_ids: raw.gold_ids,
        gold_answer: raw.gold_answer,
    })
}

/// Load a gold file whose records carry both the query and its relevance labels
pub fn load_gold(path: &Path) -> Result<Vec<QueryRecord>> {
    let records = read_jsonl::<RawRecord>(path)?
        .into_iter()
        .map(|(line, raw)| require_query(path, line, raw))
        .collect::<Result<Vec<_>>>()?;

    debug!("Loaded {} gold records from {}", records.len(), path.display());
    Ok(records)
}

/// Load queries from one file and attach relevance labels from a gold file, matched by id.
///
/// Output follows the queries file order. Ids match by JSON type as well as
/// value, so `1` and `"1"` are different queries. A query without a gold
/// entry keeps whatever labels its own line carries (usually none).
pub fn load_queries_with_gold(queries_path: &Path, gold_path: &Path) -> Result<Vec<QueryRecord>> {
    let mut labels: HashMap<QueryId, RawRecord> = HashMap::new();
    for (line, raw) in read_jsonl::<RawRecord>(gold_path)? {
        if labels.insert(raw.id.clone(), raw).is_some() {
            warn!(
                "Duplicate gold id at {}:{}, later entry wins",
                gold_path.display(),
                line
            );
        }
    }

    let mut records = Vec::new();
    for (line, raw) in read_jsonl::<RawRecord>(queries_path)? {
        let mut record = require_query(queries_path, line, raw)?;
        match labels.get(&record.id) {
            Some(gold) => {
                record.gold_ids = gold.gold_ids.clone();
                record.gold_answer = gold.gold_answer.clone();
            }
            None => warn!("Query {} has no gold entry in {}", record.id, gold_path.display()),
        }
        records.push(record);
    }

    debug!(
        "Loaded {} queries from {} with labels from {}",
        records.len(),
        queries_path.display(),
        gold_path.display()
    );
    Ok(records)
}

/// A corpus document used to derive gold records
#[derive(Debug, Deserialize)]
struct CorpusDoc {
    id: QueryId,
    #[serde(default)]
    text: Option<String>,
}

fn first_tokens(text: &str, count: usize) -> String {
    text.split_whitespace()
        .take(count)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a gold file from a corpus: each document becomes a query made of its
/// opening words, with the document itself as the only relevant id.
///
/// Returns the number of records written. Documents with blank text are skipped.
pub fn build_gold(
    corpus_path: &Path,
    out_path: &Path,
    query_tokens: usize,
    answer_tokens: usize,
) -> Result<usize> {
    let docs = read_jsonl::<CorpusDoc>(corpus_path)?;

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
    }
    let file = std::fs::File::create(out_path).map_err(|e| EvalError::io(out_path, e))?;
    let mut writer = BufWriter::new(file);

    let mut written = 0;
    for (line, doc) in docs {
        let text = doc.text.unwrap_or_default();
        if text.trim().is_empty() {
            continue;
        }
        let record = QueryRecord {
            id: QueryId::Int(line as i64),
            query: first_tokens(&text, query_tokens),
            gold_ids: vec![doc.id.to_string()],
            gold_answer: Some(first_tokens(&text, answer_tokens)),
        };
        let json = serde_json::to_string(&record)?;
        writeln!(writer, "{}", json).map_err(|e| EvalError::io(out_path, e))?;
        written += 1;
    }
    writer.flush().map_err(|e| EvalError::io(out_path, e))?;

    Ok(written)
}
