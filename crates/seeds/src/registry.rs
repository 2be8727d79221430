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

//! Seed registry: YAML-configured strategies for discovering candidate
//! domains (§4.3). Each strategy fetches its entrypoints and yields raw
//! candidates; `gather_candidates` applies the trust multiplier, dedupes by
//! URL keeping the max score, and truncates to the requested size.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::SeedsError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    RssHub,
    HtmlExtractLinks,
    GithubTopics,
    CuratedList,
    SitemapIndex,
}

/// `trust ∈ {low|medium|high|numeric}`: a named tier or a raw multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Trust {
    Named(TrustTier),
    Numeric(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustTier {
    Low,
    Medium,
    High,
}

impl Trust {
    pub fn multiplier(self) -> f64 {
        match self {
            Trust::Named(TrustTier::Low) => 0.85,
            Trust::Named(TrustTier::Medium) => 1.0,
            Trust::Named(TrustTier::High) => 1.2,
            Trust::Numeric(value) => value,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryEntry {
    pub id: String,
    pub kind: String,
    pub strategy: Strategy,
    #[serde(default)]
    pub entrypoints: Vec<String>,
    pub trust: Trust,
    #[serde(default)]
    pub boost: Option<f64>,
    #[serde(default)]
    pub extras: serde_json::Map<String, serde_json::Value>,
}

impl RegistryEntry {
    /// Absolute http(s) entrypoints only; anything else is dropped, not
    /// failed -- a single bad row in a hand-edited registry shouldn't sink
    /// every other source sharing the file.
    fn valid_entrypoints(&self) -> Vec<Url> {
        self.entrypoints
            .iter()
            .filter_map(|raw| Url::parse(raw).ok())
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct RawRegistry {
    #[serde(default)]
    sources: Vec<RegistryEntry>,
}

pub struct Registry {
    pub entries: Vec<RegistryEntry>,
}

impl Registry {
    pub fn load(path: &Path) -> Result<Self, SeedsError> {
        let contents = fs::read_to_string(path)?;
        let raw: RawRegistry = serde_yaml::from_str(&contents)
            .map_err(|e| SeedsError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let mut seen_ids = std::collections::HashSet::new();
        for entry in &raw.sources {
            if !seen_ids.insert(entry.id.clone()) {
                return Err(SeedsError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("duplicate registry id: {}", entry.id),
                )));
            }
        }

        Ok(Self {
            entries: raw.sources,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyCandidate {
    pub url: String,
    pub score: f64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl StrategyCandidate {
    fn new(url: String, score: f64) -> Self {
        Self {
            url,
            score,
            title: None,
            summary: None,
            metadata: serde_json::Map::new(),
        }
    }
}

const MAX_LINKS_PER_ENTRYPOINT: usize = 50;

fn extract_rss_links(body: &str) -> Vec<String> {
    let rss_link = Regex::new(r"(?si)<link>\s*([^<\s][^<]*)</link>").unwrap();
    let atom_link = Regex::new(r#"(?si)<link[^>]*\bhref\s*=\s*"([^"]+)"[^>]*/?>"#).unwrap();

    let mut links: Vec<String> = rss_link
        .captures_iter(body)
        .map(|c| c[1].trim().to_string())
        .collect();
    links.extend(atom_link.captures_iter(body).map(|c| c[1].trim().to_string()));
    links.truncate(MAX_LINKS_PER_ENTRYPOINT);
    links
}

fn extract_sitemap_locs(body: &str) -> Vec<String> {
    let loc = Regex::new(r"(?si)<loc>\s*([^<\s][^<]*)</loc>").unwrap();
    let mut locs: Vec<String> = loc.captures_iter(body).map(|c| c[1].trim().to_string()).collect();
    locs.truncate(MAX_LINKS_PER_ENTRYPOINT);
    locs
}

fn extract_links_from_html(base: &Url, html: &str) -> Vec<Url> {
    use kuchiki::traits::TendrilSink;
    let document = kuchiki::parse_html().one(html);
    let mut links = Vec::new();

    if let Ok(anchors) = document.select("a") {
        for anchor in anchors {
            let attrs = anchor.attributes.borrow();
            let Some(href) = attrs.get("href") else {
                continue;
            };
            if let Ok(resolved) = base.join(href) {
                if matches!(resolved.scheme(), "http" | "https") {
                    links.push(resolved);
                }
            }
            if links.len() >= MAX_LINKS_PER_ENTRYPOINT {
                break;
            }
        }
    }

    links
}

/// GitHub path segments that are reserved site sections rather than an
/// account/org name, so e.g. `/topics/rust` is a topic listing page, not a
/// `topics/rust` repo.
const GITHUB_RESERVED_FIRST_SEGMENTS: &[&str] = &[
    "topics", "search", "marketplace", "sponsors", "orgs", "about", "settings", "notifications",
    "issues", "pulls", "explore", "collections", "trending", "events", "features", "apps",
];

fn is_github_repo_path(url: &Url) -> bool {
    if url.host_str() != Some("github.com") {
        return false;
    }
    let Some(mut segments) = url.path_segments().map(|s| s.filter(|seg| !seg.is_empty())) else {
        return false;
    };
    let Some(first) = segments.next() else { return false };
    if GITHUB_RESERVED_FIRST_SEGMENTS.contains(&first) {
        return false;
    }
    segments.next().is_some() && segments.next().is_none()
}

async fn fetch_text(client: &reqwest::Client, url: &Url) -> Option<String> {
    match client.get(url.clone()).send().await {
        Ok(response) if response.status().is_success() => response.text().await.ok(),
        Ok(response) => {
            tracing::debug!(%url, status = %response.status(), "seed registry fetch failed");
            None
        }
        Err(e) => {
            tracing::debug!(%url, error = %e, "seed registry fetch errored");
            None
        }
    }
}

async fn run_strategy(
    entry: &RegistryEntry,
    query: &str,
    client: &reqwest::Client,
) -> Vec<StrategyCandidate> {
    let mut out = Vec::new();

    match entry.strategy {
        Strategy::CuratedList => {
            for url in entry.valid_entrypoints() {
                out.push(StrategyCandidate::new(url.to_string(), 1.0));
            }
        }
        Strategy::RssHub => {
            for entrypoint in entry.valid_entrypoints() {
                let Some(body) = fetch_text(client, &entrypoint).await else {
                    continue;
                };
                for link in extract_rss_links(&body) {
                    out.push(StrategyCandidate::new(link, 0.6));
                }
            }
        }
        Strategy::SitemapIndex => {
            for entrypoint in entry.valid_entrypoints() {
                let Some(body) = fetch_text(client, &entrypoint).await else {
                    continue;
                };
                for loc in extract_sitemap_locs(&body) {
                    out.push(StrategyCandidate::new(loc, 0.5));
                }
            }
        }
        Strategy::HtmlExtractLinks => {
            for entrypoint in entry.valid_entrypoints() {
                let Some(body) = fetch_text(client, &entrypoint).await else {
                    continue;
                };
                for link in extract_links_from_html(&entrypoint, &body) {
                    out.push(StrategyCandidate::new(link.to_string(), 0.5));
                }
            }
        }
        Strategy::GithubTopics => {
            for entrypoint in entry.valid_entrypoints() {
                let topic_url = if entrypoint.host_str() == Some("github.com") {
                    entrypoint
                } else {
                    continue;
                };
                let Some(body) = fetch_text(client, &topic_url).await else {
                    continue;
                };
                for link in extract_links_from_html(&topic_url, &body) {
                    if is_github_repo_path(&link) {
                        out.push(StrategyCandidate::new(link.to_string(), 0.7));
                    }
                }
            }
        }
    }

    let _ = query; // query is reserved for strategies that template their entrypoints; none do yet.
    out
}

#[derive(Debug, Clone, Copy)]
pub struct GatherOptions {
    pub top_n: usize,
}

impl Default for GatherOptions {
    fn default() -> Self {
        Self { top_n: 50 }
    }
}

/// Runs every registry entry's strategy, scores the results, dedupes by URL
/// keeping the maximum score, and returns the top `opts.top_n`.
pub async fn gather_candidates(
    registry: &Registry,
    query: &str,
    client: &reqwest::Client,
    opts: GatherOptions,
) -> Vec<StrategyCandidate> {
    let mut by_url: BTreeMap<String, StrategyCandidate> = BTreeMap::new();

    for entry in &registry.entries {
        let multiplier = entry.trust.multiplier() * entry.boost.unwrap_or(1.0);
        for mut candidate in run_strategy(entry, query, client).await {
            candidate.score *= multiplier;
            match by_url.get(&candidate.url) {
                Some(existing) if existing.score >= candidate.score => {}
                _ => {
                    by_url.insert(candidate.url.clone(), candidate);
                }
            }
        }
    }

    let mut ranked: Vec<StrategyCandidate> = by_url.into_values().collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(opts.top_n);
    ranked
}
