use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::{LevelFilter, info};
use std::path::PathBuf;
use std::time::Duration;

mod client;
mod config;
mod error;
mod evaluation;
mod gold;
mod metrics;
mod models;
mod output;
mod runner;

use crate::client::HttpSearchClient;
use crate::config::{Config, RougePolicy};
use crate::output::OutputFormat;
use crate::runner::Runner;

/// Retrieval evaluation CLI - score search backends against a gold set
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output - log progress for each backend
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query every backend with every gold query and write metric reports
    Run(RunArgs),
    /// Derive a gold file from a JSONL corpus of {id, text} documents
    BuildGold(BuildGoldArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to a TOML run configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gold-standard JSONL file
    #[arg(long)]
    gold: Option<PathBuf>,

    /// Separate queries JSONL file, joined to the gold file by id
    #[arg(long)]
    queries: Option<PathBuf>,

    /// Search endpoint URL
    #[arg(long)]
    api_url: Option<String>,

    /// Backends to evaluate (comma-separated, e.g. keyword,vector)
    #[arg(short, long = "backend", value_delimiter = ',')]
    backends: Option<Vec<String>>,

    /// Number of hits requested and scored per query
    #[arg(short)]
    k: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Directory for the CSV and JSON reports
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// How to score ROUGE-L when a backend returns no answer text
    #[arg(long, value_enum)]
    rouge_policy: Option<RougePolicy>,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,
}

#[derive(Args, Debug)]
struct BuildGoldArgs {
    /// Corpus JSONL with {id, text} per line
    #[arg(long)]
    corpus: PathBuf,

    /// Gold JSONL to write
    #[arg(long, default_value = "data/queries_gold.jsonl")]
    out: PathBuf,

    /// Words of each document used as the query
    #[arg(long, default_value_t = 20)]
    query_tokens: usize,

    /// Words of each document used as the reference answer
    #[arg(long, default_value_t = 60)]
    answer_tokens: usize,
}

impl RunArgs {
    /// Load the configuration file (or defaults) and apply command-line overrides
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(gold) = &self.gold {
            config.gold_path = gold.clone();
        }
        if let Some(queries) = &self.queries {
            config.queries_path = Some(queries.clone());
        }
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        if let Some(backends) = &self.backends {
            config.backends = backends.clone();
        }
        if let Some(k) = self.k {
            config.k = k;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        if let Some(reports_dir) = &self.reports_dir {
            config.reports_dir = reports_dir.clone();
        }
        if let Some(rouge_policy) = self.rouge_policy {
            config.rouge_policy = rouge_policy;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { LevelFilter::Info } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = args.resolve_config()?;

    let records = match &config.queries_path {
        Some(queries) => gold::load_queries_with_gold(queries, &config.gold_path)?,
        None => gold::load_gold(&config.gold_path)?,
    };
    info!("Loaded {} queries", records.len());

    let client = HttpSearchClient::new(&config.api_url, Duration::from_secs(config.timeout_secs))
        .context("Failed to create search client")?;
    info!("Querying {} with k={}", client.api_url(), config.k);

    let runner = Runner::new(client, config.backends.clone(), config.k, config.rouge_policy);
    let report = runner.run_evaluations(&records).await?;

    let files = output::write_reports(&report, &config.reports_dir)?;
    info!(
        "Reports written to {}, {} and {}",
        files.per_query.display(),
        files.summary.display(),
        files.summary_json.display()
    );

    output::print_results(&report, args.output);
    Ok(())
}

fn build_gold(args: BuildGoldArgs) -> anyhow::Result<()> {
    let written = gold::build_gold(&args.corpus, &args.out, args.query_tokens, args.answer_tokens)?;
    println!("Gold standard written to {} ({} queries)", args.out.display(), written);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::BuildGold(args) => build_gold(args),
    }
}
