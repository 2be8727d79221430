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

//! Append-only seed log, curated-seed merge, and the strategy registry,
//! matching the append-only JSONL stores used throughout `crates/core`'s
//! crawl bookkeeping, e.g. `crates/core/src/crawler/mod.rs`'s result log.

mod registry;

pub use registry::{
    gather_candidates, GatherOptions, Registry, RegistryEntry, Strategy, StrategyCandidate, Trust,
    TrustTier,
};

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SeedsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One line of the append-only seed log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedEntry {
    pub domain: String,
    pub score: f64,
    pub reason: String,
    pub query: String,
    pub ts: f64,
}

/// Reads every valid JSON object from the log, silently skipping malformed
/// lines -- a truncated write mid-append must not poison the whole file.
pub fn load_entries(path: &Path) -> Vec<SeedEntry> {
    let Ok(contents) = fs::read_to_string(path) else {
        return Vec::new();
    };

    contents
        .lines()
        .filter_map(|line| serde_json::from_str::<SeedEntry>(line).ok())
        .collect()
}

/// Strips a single leading "www." and lowercases, matching `domain_from_url`.
pub fn normalize_domain(domain: &str) -> String {
    let lowered = domain.trim().to_lowercase();
    lowered.strip_prefix("www.").unwrap_or(&lowered).to_string()
}

/// Extracts and normalizes the host from a URL string. Returns `None` for an
/// unparsable URL or an empty host.
pub fn domain_from_url(raw: &str) -> Option<String> {
    let url = url::Url::parse(raw).ok()?;
    let host = url.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(normalize_domain(host))
}

/// Appends one log line per `(domain, score)` pair. Creates parent
/// directories if needed. A non-finite score is coerced to 0.0 rather than
/// rejecting the whole call.
pub fn record_domains(
    domains: &BTreeMap<String, f64>,
    query: &str,
    reason: &str,
    path: &Path,
) -> Result<(), SeedsError> {
    if domains.is_empty() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let reason = if reason.is_empty() { "focused-crawl" } else { reason };
    let ts = seeker_common::time::unix_now();

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for (domain, score) in domains {
        let score = if score.is_finite() { *score } else { 0.0 };
        let entry = SeedEntry {
            domain: normalize_domain(domain),
            score,
            reason: reason.to_string(),
            query: query.to_string(),
            ts,
        };
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
    }
    Ok(())
}

impl From<serde_json::Error> for SeedsError {
    fn from(e: serde_json::Error) -> Self {
        SeedsError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Aggregates the log by `max(score)` per domain.
fn domain_weight(entries: &[SeedEntry]) -> BTreeMap<String, f64> {
    let mut weights: BTreeMap<String, f64> = BTreeMap::new();
    for entry in entries {
        let domain = normalize_domain(&entry.domain);
        let current = weights.entry(domain).or_insert(0.0);
        if entry.score > *current {
            *current = entry.score;
        }
    }
    weights
}

/// Returns the `limit` highest-scoring domain names (not full entries),
/// descending. `limit <= 0` returns an empty list.
pub fn get_top_domains(limit: i64, path: &Path) -> Vec<String> {
    if limit <= 0 {
        return Vec::new();
    }
    let entries = load_entries(path);
    let weights = domain_weight(&entries);

    let mut ranked: Vec<(String, f64)> = weights.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(limit as usize);
    ranked.into_iter().map(|(domain, _)| domain).collect()
}

#[derive(Debug, Deserialize)]
struct CuratedEntry {
    url: String,
    #[serde(default)]
    value_prior: f64,
}

/// Merges a curated-seed JSONL file (`{url, value_prior}`) into the seed
/// log, aggregating the maximum `value_prior` per host. Returns the number
/// of domains merged; 0 if the curated file is absent or empty.
pub fn merge_curated_seeds(
    curated_path: &Path,
    store_path: &Path,
    reason: &str,
) -> Result<usize, SeedsError> {
    let Ok(contents) = fs::read_to_string(curated_path) else {
        return Ok(0);
    };

    let mut domains: BTreeMap<String, f64> = BTreeMap::new();
    for line in contents.lines() {
        let Ok(entry) = serde_json::from_str::<CuratedEntry>(line) else {
            continue;
        };
        let Some(domain) = domain_from_url(&entry.url) else {
            continue;
        };
        let current = domains.entry(domain).or_insert(0.0);
        if entry.value_prior > *current {
            *current = entry.value_prior;
        }
    }

    if domains.is_empty() {
        return Ok(0);
    }

    let count = domains.len();
    record_domains(&domains, "curated-seeds", reason, store_path)?;
    Ok(count)
}
