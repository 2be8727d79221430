// Stract is an open source web search engine.
// Copyright (C) 2024 Stract ApS
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use seeker_common::CoreConfig;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Args {
    /// Optional TOML file overlaying the CRAWL_*/SMART_*/RANK_*/OLLAMA_* env knobs.
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and print a ranked candidate frontier for a query.
    Frontier {
        query: String,
        #[clap(long)]
        budget: Option<usize>,
        #[clap(long = "extra-url")]
        extra_urls: Vec<String>,
    },

    /// Run the focused fetcher for a query and append to the raw crawl log.
    Fetch {
        query: String,
        #[clap(long)]
        budget: Option<usize>,
        #[clap(long = "extra-url")]
        extra_urls: Vec<String>,
    },

    /// Normalize a raw crawl file into normalized.jsonl.
    Normalize {
        /// Path to a `focused_<epoch>.jsonl` file. Defaults to every
        /// `focused_*.jsonl` file under the data dir.
        raw_path: Option<PathBuf>,
    },

    /// Index the normalized corpus.
    Index,

    /// Run a plain search against the index.
    Search {
        query: String,
        #[clap(long, default_value_t = 10)]
        limit: usize,
    },

    /// Run the smart-search orchestrator (search, then trigger a focused
    /// crawl if results are thin).
    SmartSearch {
        query: String,
        #[clap(long, default_value_t = 10)]
        limit: usize,
        #[clap(long)]
        use_llm: bool,
        #[clap(long)]
        model: Option<String>,
    },

    /// Rebuild the host authority index from the normalized corpus.
    Authority,

    /// Print on-disk state: last index time, ledger size, authority hosts.
    Stats,
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn load_config(path: &Option<PathBuf>) -> Result<CoreConfig> {
    CoreConfig::load(path.as_deref()).context("failed to load configuration")
}

fn epoch_now() -> u64 {
    seeker_common::time::unix_now() as u64
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let config = load_config(&args.config)?;

    match args.command {
        Commands::Frontier { query, budget, extra_urls } => {
            let candidates = build_candidates(&config, &query, budget, &extra_urls)?;
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }
        Commands::Fetch { query, budget, extra_urls } => {
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(run_fetch(&config, &query, budget, &extra_urls))?;
        }
        Commands::Normalize { raw_path } => {
            run_normalize(&config, raw_path)?;
        }
        Commands::Index => {
            run_index(&config)?;
        }
        Commands::Search { query, limit } => {
            run_search(&config, &query, limit)?;
        }
        Commands::SmartSearch { query, limit, use_llm, model } => {
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(run_smart_search(&config, &query, limit, use_llm, model))?;
        }
        Commands::Authority => {
            run_authority(&config)?;
        }
        Commands::Stats => {
            run_stats(&config)?;
        }
    }

    Ok(())
}

/// Builds the candidate frontier for `query` (§4.4): seed domains come
/// from the top of the seed log, extra urls from the CLI flag, authority
/// from whatever has been persisted so far.
fn build_candidates(
    config: &CoreConfig,
    query: &str,
    budget: Option<usize>,
    extra_urls: &[String],
) -> Result<Vec<seeker_frontier::Candidate>> {
    let seed_domains = seeker_seeds::get_top_domains(100, &config.seed_log_path());
    let authority = seeker_authority::AuthorityIndex::load(&config.authority_path())?;
    let overrides = std::collections::BTreeMap::new();

    let opts = seeker_frontier::FrontierOptions {
        query,
        seed_domains: &seed_domains,
        extra_urls,
        budget: budget.unwrap_or(config.focused_crawl_budget),
        value_overrides: &overrides,
        authority: &authority,
        weights: seeker_frontier::PriorityWeights::default(),
    };

    Ok(seeker_frontier::build_frontier(&opts))
}

async fn run_fetch(config: &CoreConfig, query: &str, budget: Option<usize>, extra_urls: &[String]) -> Result<()> {
    let candidates = build_candidates(config, query, budget, extra_urls)?;
    if candidates.is_empty() {
        tracing::warn!(query, "frontier produced no candidates, nothing to fetch");
        return Ok(());
    }

    let robots = Arc::new(seeker_robots::RobotsCache::new(config.user_agent.clone(), config.respect_robots));
    let metrics = Arc::new(seeker_common::Metrics::default());
    let cooldowns = seeker_cooldown::Cooldowns::load(&config.cooldowns_path())?;

    let fetcher_config = seeker_fetch::FetcherConfig {
        user_agent: config.user_agent.clone(),
        concurrency: config.concurrent_requests,
        concurrency_per_domain: config.concurrent_per_domain,
        respect_robots: config.respect_robots,
        force_render: false,
    };

    let budget = budget.unwrap_or(config.focused_crawl_budget);
    let fetcher = seeker_fetch::Fetcher::new(fetcher_config, robots, metrics, cooldowns, config.smart_trigger_cooldown.as_secs(), budget);
    let (pages, cooldowns) = fetcher.run(query, candidates).await;

    cooldowns.save()?;
    seeker_fetch::append_raw_records(&config.raw_crawl_path(epoch_now()), query, &pages)?;

    tracing::info!(query, fetched = pages.len(), "fetch complete");
    Ok(())
}

fn run_normalize(config: &CoreConfig, raw_path: Option<PathBuf>) -> Result<()> {
    let raw_paths: Vec<PathBuf> = match raw_path {
        Some(path) => vec![path],
        None => {
            let mut matches = Vec::new();
            if let Ok(entries) = std::fs::read_dir(&config.data_dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    let is_raw = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| n.starts_with("focused_") && n.ends_with(".jsonl"))
                        .unwrap_or(false);
                    if is_raw {
                        matches.push(path);
                    }
                }
            }
            matches
        }
    };

    let mut docs = Vec::new();
    for path in &raw_paths {
        let records = seeker_normalize::read_raw_records(path)?;
        docs.extend(records.iter().map(seeker_normalize::normalize_record));
    }

    seeker_normalize::write_normalized(&config.normalized_path(), &docs, seeker_normalize::WriteMode::Append)?;
    tracing::info!(files = raw_paths.len(), docs = docs.len(), "normalize complete");
    Ok(())
}

fn load_normalized_corpus(config: &CoreConfig) -> Result<Vec<seeker_normalize::NormalizedDoc>> {
    let path = config.normalized_path();
    if !path.exists() {
        return Ok(vec![]);
    }
    let contents = std::fs::read_to_string(&path)?;
    Ok(contents
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

fn run_index(config: &CoreConfig) -> Result<()> {
    let docs = load_normalized_corpus(config)?;
    let mut index = seeker_index::SearchIndex::open(&config.index_dir(), true)?;
    let stats = index.index_documents(&docs, seeker_common::time::unix_now())?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn run_search(config: &CoreConfig, query: &str, limit: usize) -> Result<()> {
    let index = seeker_index::SearchIndex::open(&config.index_dir(), true)?;
    let hits = index.search(query, limit, seeker_index::DEFAULT_MAX_LIMIT, seeker_index::DEFAULT_MAX_QUERY_LENGTH);

    let authority = seeker_authority::AuthorityIndex::load(&config.authority_path())?;
    let ranked = seeker_rank::blend(hits, config.rank_auth_alpha, |host| authority.score_for(host));

    println!("{}", serde_json::to_string_pretty(&ranked)?);
    Ok(())
}

/// Focused-crawl pipeline run as a detached background task by
/// [`seeker_search::SmartSearch`]: frontier -> fetch -> normalize -> index,
/// using the same config the triggering query ran under.
struct PipelineScheduler {
    config: Arc<CoreConfig>,
}

#[async_trait::async_trait]
impl seeker_search::CrawlScheduler for PipelineScheduler {
    async fn schedule_focused_crawl(&self, query: String, budget: usize, _use_llm: bool, _model: Option<String>) {
        if let Err(e) = run_fetch(&self.config, &query, Some(budget), &[]).await {
            tracing::warn!(query, error = %e, "background focused fetch failed");
            return;
        }
        if let Err(e) = run_normalize(&self.config, None) {
            tracing::warn!(query, error = %e, "background normalize failed");
            return;
        }
        if let Err(e) = run_index(&self.config) {
            tracing::warn!(query, error = %e, "background index failed");
        }
    }
}

async fn run_smart_search(config: &CoreConfig, query: &str, limit: usize, use_llm: bool, model: Option<String>) -> Result<()> {
    let config = Arc::new(config.clone());
    let index = seeker_index::SearchIndex::open(&config.index_dir(), true)?;
    let cooldowns = seeker_cooldown::Cooldowns::load(&config.cooldowns_path())?;

    let scheduler: Arc<dyn seeker_search::CrawlScheduler> = Arc::new(PipelineScheduler { config: config.clone() });
    let smart_search_config = seeker_search::SmartSearchConfig {
        min_results: config.smart_min_results,
        trigger_cooldown_seconds: config.smart_trigger_cooldown.as_secs(),
        focused_crawl_budget: config.focused_crawl_budget,
    };
    let smart_search = seeker_search::SmartSearch::new(&scheduler, cooldowns, smart_search_config);

    let hits = smart_search.smart_search(&index, query, limit, use_llm, model.clone()).await;

    if use_llm {
        let client = reqwest::Client::new();
        let authority = seeker_authority::AuthorityIndex::load(&config.authority_path())?;
        let ranked = seeker_rank::blend(hits, config.rank_auth_alpha, |host| authority.score_for(host));
        let reranked = seeker_rank::llm_rerank(
            &client,
            &config.ollama_url,
            model.as_deref().unwrap_or(&config.ollama_model),
            ranked,
            config.rerank_top_n,
            config.ollama_timeout,
        )
        .await;
        println!("{}", serde_json::to_string_pretty(&reranked)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    }

    // Keep the process alive long enough for a just-triggered background
    // crawl to make progress before the runtime shuts down underneath it.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    Ok(())
}

fn run_authority(config: &CoreConfig) -> Result<()> {
    let docs = load_normalized_corpus(config)?;
    let mut graph = seeker_authority::HostGraph::new();

    for doc in &docs {
        let Ok(source_url) = url::Url::parse(&doc.url) else { continue };
        let outlinks: Vec<url::Url> = doc.outlinks.iter().filter_map(|u| url::Url::parse(u).ok()).collect();
        graph.add_document(&source_url, &outlinks);
    }

    let index = graph.to_index();
    index.save(&config.authority_path())?;
    tracing::info!(docs = docs.len(), "authority rebuild complete");
    Ok(())
}

fn run_stats(config: &CoreConfig) -> Result<()> {
    let last_index_time = seeker_index::read_last_index_time(&config.index_dir());
    let corpus_size = load_normalized_corpus(config)?.len();
    let seed_domains = seeker_seeds::get_top_domains(i64::MAX, &config.seed_log_path()).len();

    let stats = serde_json::json!({
        "last_index_time": last_index_time,
        "normalized_corpus_size": corpus_size,
        "seed_domain_count": seed_domains,
        "data_dir": config.data_dir,
    });
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
