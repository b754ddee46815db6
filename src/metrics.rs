//! Ranking and answer-overlap metrics.
//!
//! Ranking metrics take the retrieved ids in backend order and the set of
//! gold ids. An empty gold set scores `0.0` everywhere.

use std::collections::HashSet;

/// Fraction of gold ids found in the top `k` retrieved ids.
///
/// A gold id retrieved twice is counted once.
pub fn recall_at_k(retrieved: &[String], gold: &HashSet<String>, k: usize) -> f64 {
    if gold.is_empty() {
        return 0.0;
    }
    let found: HashSet<&str> = retrieved
        .iter()
        .take(k)
        .map(String::as_str)
        .filter(|id| gold.contains(*id))
        .collect();
    found.len() as f64 / gold.len() as f64
}

/// Reciprocal of the 1-based rank of the first relevant id, or `0.0` if none is relevant.
pub fn mrr(retrieved: &[String], gold: &HashSet<String>) -> f64 {
    match retrieved.iter().position(|id| gold.contains(id)) {
        Some(index) => 1.0 / (index as f64 + 1.0),
        None => 0.0,
    }
}

/// Binary-relevance nDCG over the top `k` retrieved ids.
///
/// The ideal list holds `min(|gold|, k)` relevant ids. Repeats of an already
/// counted relevant id earn no gain, so the score never exceeds `1.0`.
pub fn ndcg_at_k(retrieved: &[String], gold: &HashSet<String>, k: usize) -> f64 {
    dcg(retrieved, gold, k) / ideal_dcg(gold.len(), k)
}

fn discount(index: usize) -> f64 {
    1.0 / (index as f64 + 2.0).log2()
}

fn dcg(retrieved: &[String], gold: &HashSet<String>, k: usize) -> f64 {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut total = 0.0;
    for (index, id) in retrieved.iter().take(k).enumerate() {
        if gold.contains(id) && seen.insert(id.as_str()) {
            total += discount(index);
        }
    }
    total
}

/// Never zero: with nothing to rank the ratio falls to `0.0` instead of dividing by zero.
fn ideal_dcg(num_gold: usize, k: usize) -> f64 {
    let ideal: f64 = (0..num_gold.min(k)).map(discount).sum();
    if ideal > 0.0 { ideal } else { 1.0 }
}

/// ROUGE-L F-measure between a predicted and a reference text.
///
/// Returns `None` when either text is empty, so callers can leave the query
/// out of averages instead of scoring it zero.
pub fn rouge_l(prediction: &str, reference: &str) -> Option<f64> {
    let predicted = tokenize(prediction);
    let expected = tokenize(reference);
    if predicted.is_empty() || expected.is_empty() {
        return None;
    }

    let lcs = lcs_len(&predicted, &expected);
    if lcs == 0 {
        return Some(0.0);
    }
    let precision = lcs as f64 / predicted.len() as f64;
    let recall = lcs as f64 / expected.len() as f64;
    Some(2.0 * precision * recall / (precision + recall))
}

/// Lowercased whitespace tokens with surrounding punctuation removed.
/// A token made only of punctuation is kept as is.
fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|raw| {
            let lower = raw.to_lowercase();
            let trimmed = lower.trim_matches(|c: char| !c.is_alphanumeric()).to_string();
            if trimmed.is_empty() { lower } else { trimmed }
        })
        .collect()
}

fn lcs_len(a: &[String], b: &[String]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for token_a in a {
        for (j, token_b) in b.iter().enumerate() {
            current[j + 1] = if token_a == token_b {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
