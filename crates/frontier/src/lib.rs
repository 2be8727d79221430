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

//! Query -> candidate-URL frontier (§4.4). Pure, deterministic: given the
//! same query, seed domains, extra URLs and value overrides, the returned
//! ranking is stable regardless of call order, matching
//! `crates/core/src/crawler/planner.rs`'s candidate scoring: likewise a
//! pure function of its inputs, no network or disk access.

mod candidate;
mod heuristics;
mod tokenize;

pub use candidate::{Candidate, Source};

use std::collections::{BTreeMap, HashSet};

use seeker_authority::AuthorityIndex;
use seeker_fingerprint::UrlBloom;
use url::Url;

pub use tokenize::tokenize_query;

/// Priority blend weights (§4.4 step 6). Configurable so a caller can tune
/// the blend without recompiling; defaults match the spec's formula
/// exactly.
#[derive(Debug, Clone, Copy)]
pub struct PriorityWeights {
    pub value_prior: f64,
    pub freshness: f64,
    pub host_authority: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            value_prior: 0.5,
            freshness: 0.3,
            host_authority: 0.2,
        }
    }
}

/// Inputs to a single frontier build (§4.4).
pub struct FrontierOptions<'a> {
    pub query: &'a str,
    pub seed_domains: &'a [String],
    pub extra_urls: &'a [String],
    pub budget: usize,
    pub value_overrides: &'a BTreeMap<String, f64>,
    pub authority: &'a AuthorityIndex,
    pub weights: PriorityWeights,
}

/// Sanitizes a raw URL string: must parse as absolute http(s); the path is
/// normalized by `url::Url` itself and any fragment is dropped (§4.4 step
/// 2).
pub fn sanitize_url(raw: &str) -> Option<Url> {
    let mut url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

fn host_of(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Builds the ranked candidate set (§4.4). Streams are assembled in the
/// spec's fixed order -- extra URLs, then seed-domain templates, then
/// heuristic guesses -- before scoring and sorting, so ties in `priority`
/// preserve that order (stable sort).
pub fn build_frontier(opts: &FrontierOptions) -> Vec<Candidate> {
    let query = opts.query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let tokens = tokenize_query(query);

    let mut raw: Vec<(Url, Source)> = Vec::new();

    for extra in opts.extra_urls {
        if let Some(url) = sanitize_url(extra) {
            raw.push((url, Source::Llm));
        }
    }

    for domain in opts.seed_domains {
        for url in heuristics::seed_templates(domain, query) {
            raw.push((url, Source::Seed));
        }
    }

    for keyword in &tokens {
        for url in heuristics::heuristic_guesses(keyword) {
            raw.push((url, Source::Heuristic));
        }
    }

    let mut bloom = UrlBloom::new((raw.len() as u64).max(64), 0.01);
    let mut seen_paths: HashSet<(String, String)> = HashSet::new();
    let mut candidates = Vec::with_capacity(raw.len());

    for (url, source) in raw {
        if bloom.contains(&url) {
            continue;
        }
        let Some(host) = host_of(&url) else { continue };
        let key = (host.clone(), url.path().to_string());
        if !seen_paths.insert(key) {
            continue;
        }
        bloom.add(&url);

        let value_prior = opts
            .value_overrides
            .get(&host)
            .copied()
            .unwrap_or_else(|| heuristics::value_prior_from_path(url.path()));
        let freshness_hint = heuristics::freshness_hint_for(&url, source);
        let host_authority = opts.authority.score_for(&host);
        let weight = source.weight();

        let priority = weight
            + opts.weights.value_prior * value_prior
            + opts.weights.freshness * freshness_hint
            + opts.weights.host_authority * host_authority;

        candidates.push(Candidate {
            url,
            source,
            weight,
            value_prior,
            freshness_hint,
            host_authority,
            priority,
        });
    }

    candidates.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(opts.budget);
    candidates
}
