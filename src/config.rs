use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How ROUGE-L is recorded for a query whose backend returned no answer text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RougePolicy {
    /// Leave the score absent so the query is excluded from the ROUGE-L mean
    #[default]
    Skip,
    /// Score a missing answer as 0.0 when a reference answer exists
    Zero,
}

/// Configuration for an evaluation run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Search endpoint queried with `query`, `backend` and `k` parameters
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Backends to evaluate, in report order
    #[serde(default = "default_backends")]
    pub backends: Vec<String>,
    /// Number of hits requested and scored per query
    #[serde(default = "default_k")]
    pub k: usize,
    /// Per-request timeout; vector backends can be slow on their first call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Gold-standard JSONL file
    #[serde(default = "default_gold_path")]
    pub gold_path: PathBuf,
    /// Optional separate JSONL of queries, joined to the gold file by id
    #[serde(default)]
    pub queries_path: Option<PathBuf>,
    /// Directory receiving the CSV and JSON reports
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
    /// ROUGE-L handling for queries answered with no text
    #[serde(default)]
    pub rouge_policy: RougePolicy,
}

fn default_api_url() -> String {
    "http://localhost:8000/ask".to_string()
}

fn default_backends() -> Vec<String> {
    vec!["keyword".to_string(), "vector".to_string()]
}

fn default_k() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_gold_path() -> PathBuf {
    PathBuf::from("data/queries_gold.jsonl")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            backends: default_backends(),
            k: default_k(),
            timeout_secs: default_timeout_secs(),
            gold_path: default_gold_path(),
            queries_path: None,
            reports_dir: default_reports_dir(),
            rouge_policy: RougePolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Reject settings that would make every query meaningless
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            bail!("api_url must not be empty");
        }
        if self.backends.is_empty() {
            bail!("At least one backend must be configured");
        }
        if let Some(blank) = self.backends.iter().position(|b| b.trim().is_empty()) {
            bail!("Backend name at position {} is empty", blank + 1);
        }
        if self.k == 0 {
            bail!("k must be at least 1");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than 0");
        }
        Ok(())
    }
}
