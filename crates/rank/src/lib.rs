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

//! Score blending and optional LLM rerank (§4.10). The blend is pure and
//! synchronous; the rerank step is the crate's only network call and is
//! designed to fail open -- any error at all returns the input order
//! unchanged, logged at most once a minute so a down LLM endpoint doesn't
//! spam the log on every query.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use seeker_index::SearchHit;
use serde::{Deserialize, Serialize};

pub const DEFAULT_AUTH_ALPHA: f64 = 0.15;
pub const DEFAULT_RERANK_TOP_N: usize = 5;
pub const DEFAULT_RERANK_TIMEOUT: Duration = Duration::from_secs(12);
const RERANK_SNIPPET_MAX_CHARS: usize = 280;
const WARN_INTERVAL_SECONDS: f64 = 60.0;

#[derive(Debug, Clone, serde::Serialize)]
pub struct RankedHit {
    pub hit: SearchHit,
    pub blended: f64,
}

/// `blended = score + alpha * host_authority` (§4.10). `host_authority`
/// resolution is the caller's job (it needs a `&str -> f64` lookup, which
/// differs per caller); this function only does the arithmetic and the
/// stable sort.
pub fn blend(hits: Vec<SearchHit>, alpha: f64, host_authority: impl Fn(&str) -> f64) -> Vec<RankedHit> {
    let mut ranked: Vec<RankedHit> = hits
        .into_iter()
        .map(|hit| {
            let host = host_of(&hit.url);
            let blended = hit.score + alpha * host_authority(&host);
            RankedHit { hit, blended }
        })
        .collect();

    ranked.sort_by(|a, b| b.blended.partial_cmp(&a.blended).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

fn build_prompt(candidates: &[RankedHit]) -> String {
    let mut prompt = String::from(
        "Rank the following search results by relevance and return a JSON array of their urls, most relevant first.\n",
    );
    for (i, ranked) in candidates.iter().enumerate() {
        let snippet: String = ranked.hit.snippet.chars().take(RERANK_SNIPPET_MAX_CHARS).collect();
        prompt.push_str(&format!(
            "{}. title: {} | url: {} | snippet: {}\n",
            i + 1,
            ranked.hit.title,
            ranked.hit.url,
            snippet
        ));
    }
    prompt
}

struct RerankWarnGate {
    last_warned: AtomicU64,
}

impl RerankWarnGate {
    const fn new() -> Self {
        Self { last_warned: AtomicU64::new(0) }
    }

    fn should_warn(&self, now: f64) -> bool {
        let last = self.last_warned.load(Ordering::Relaxed) as f64;
        if now - last >= WARN_INTERVAL_SECONDS {
            self.last_warned.store(now as u64, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

static RERANK_WARN_GATE: RerankWarnGate = RerankWarnGate::new();

/// Reorders the top `top_n` of `ranked` using an Ollama-style LLM endpoint
/// (§4.10, §6). On any failure -- network, timeout, non-JSON body, or a
/// response that isn't an array of urls -- returns `ranked` unchanged.
pub async fn llm_rerank(
    client: &reqwest::Client,
    endpoint: &str,
    model: &str,
    ranked: Vec<RankedHit>,
    top_n: usize,
    timeout: Duration,
) -> Vec<RankedHit> {
    if ranked.is_empty() {
        return ranked;
    }

    let top_n = top_n.min(ranked.len());
    let (head, tail) = ranked.split_at(top_n);
    let head = head.to_vec();
    let tail = tail.to_vec();

    match try_rerank(client, endpoint, model, &head, timeout).await {
        Ok(reordered) => {
            let mut result = reordered;
            result.extend(tail);
            result
        }
        Err(e) => {
            let now = seeker_common::time::unix_now();
            if RERANK_WARN_GATE.should_warn(now) {
                tracing::warn!(error = %e, "llm rerank failed, falling back to blended order");
            }
            let mut result = head;
            result.extend(tail);
            result
        }
    }
}

async fn try_rerank(
    client: &reqwest::Client,
    endpoint: &str,
    model: &str,
    head: &[RankedHit],
    timeout: Duration,
) -> anyhow::Result<Vec<RankedHit>> {
    let request = OllamaRequest {
        model,
        prompt: build_prompt(head),
        stream: false,
    };

    let response = client
        .post(endpoint)
        .json(&request)
        .timeout(timeout)
        .send()
        .await?
        .json::<OllamaResponse>()
        .await?;

    let ordered_urls: Vec<String> = serde_json::from_str(&response.response)?;

    let mut by_url: std::collections::HashMap<String, RankedHit> =
        head.iter().cloned().map(|h| (h.hit.url.clone(), h)).collect();

    let mut reordered = Vec::with_capacity(head.len());
    for url in &ordered_urls {
        if let Some(hit) = by_url.remove(url) {
            reordered.push(hit);
        }
    }
    // Any head entries the model dropped from its response keep their
    // original relative order, appended after the ones it did mention.
    let mut leftovers: Vec<RankedHit> = head
        .iter()
        .filter(|h| by_url.contains_key(&h.hit.url))
        .cloned()
        .collect();
    reordered.append(&mut leftovers);

    if reordered.len() != head.len() {
        anyhow::bail!("llm rerank response did not cover all candidates");
    }

    Ok(reordered)
}
