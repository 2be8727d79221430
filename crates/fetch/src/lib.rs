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

//! Async fetch pipeline: per-host politeness, robots.txt enforcement,
//! retry/backoff, same-run dedup, and the dynamic-render fallback (§4.6).
//!
//! Scheduling model (§5): a global semaphore caps total in-flight
//! requests; a per-host semaphore (lazily created in a `DashMap`) caps
//! concurrency to any one origin. Workers are plain `tokio::spawn`ed tasks
//! pulling from a shared FIFO queue; a shared stop flag short-circuits the
//! remaining workers once `budget` results have been collected, in the
//! spirit of `crates/core/src/crawler/worker.rs`'s bounded worker pool, but
//! single-process rather than distributed across crawl workers.

mod html;
mod page;
mod renderer;

pub use html::{extract_outlinks, visible_text_len, MAX_OUTLINKS};
pub use page::{append_raw_records, Fingerprint, PageResult, RawRecord};
pub use renderer::{
    looks_like_app_shell, DynamicRenderer, NullRenderer, RenderError, RenderedPage,
    DYNAMIC_RENDER_MIN_TEXT_LEN, DYNAMIC_RENDER_TIMEOUT,
};

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use seeker_common::Metrics;
use seeker_cooldown::{Cooldowns, DEFAULT_COOLDOWN_SECONDS};
use seeker_fingerprint::{ContentFingerprint, UrlBloom};
use seeker_frontier::Candidate;
use seeker_robots::RobotsCache;
use tokio::sync::{Mutex, Semaphore};
use url::Url;

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_RETRIES: u32 = 3;
pub const BACKOFF_BASE: Duration = Duration::from_millis(1000);
pub const BACKOFF_CAP: Duration = Duration::from_millis(8000);
pub const DEFAULT_COOLDOWN: u64 = DEFAULT_COOLDOWN_SECONDS;

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub concurrency: usize,
    pub concurrency_per_domain: usize,
    pub respect_robots: bool,
    pub force_render: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "seeker/0.1".to_string(),
            concurrency: 8,
            concurrency_per_domain: 2,
            respect_robots: true,
            force_render: false,
        }
    }
}

fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or("").to_lowercase()
}

fn backoff_for_attempt(attempt: u32) -> Duration {
    let millis = BACKOFF_BASE.as_millis() as u64 * 2u64.saturating_pow(attempt);
    Duration::from_millis(millis).min(BACKOFF_CAP)
}

struct Shared {
    client: reqwest::Client,
    config: FetcherConfig,
    robots: Arc<RobotsCache>,
    renderer: Arc<dyn DynamicRenderer>,
    metrics: Arc<Metrics>,
    cooldowns: Mutex<Cooldowns>,
    cooldown_seconds: u64,
    queue: Mutex<VecDeque<Candidate>>,
    results: Mutex<Vec<PageResult>>,
    visited: Mutex<HashSet<String>>,
    seen_md5: Mutex<HashSet<String>>,
    bloom: Mutex<UrlBloom>,
    budget: usize,
    stop: AtomicBool,
    host_semaphores: DashMap<String, Arc<Semaphore>>,
    global_semaphore: Arc<Semaphore>,
}

impl Shared {
    fn host_semaphore(&self, host: &str) -> Arc<Semaphore> {
        self.host_semaphores
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.concurrency_per_domain)))
            .clone()
    }
}

/// Fetches up to `budget` unique, robots-allowed pages from `candidates`
/// (§4.6). Owns the cooldown ledger and the content-seen set for this run.
pub struct Fetcher {
    shared: Arc<Shared>,
}

impl Fetcher {
    pub fn new(
        config: FetcherConfig,
        robots: Arc<RobotsCache>,
        metrics: Arc<Metrics>,
        cooldowns: Cooldowns,
        cooldown_seconds: u64,
        budget: usize,
    ) -> Self {
        Self::with_renderer(
            config,
            robots,
            metrics,
            cooldowns,
            cooldown_seconds,
            budget,
            Arc::new(NullRenderer),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_renderer(
        config: FetcherConfig,
        robots: Arc<RobotsCache>,
        metrics: Arc<Metrics>,
        cooldowns: Cooldowns,
        cooldown_seconds: u64,
        budget: usize,
        renderer: Arc<dyn DynamicRenderer>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .expect("reqwest client build is infallible for this configuration");

        let global_semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));

        Self {
            shared: Arc::new(Shared {
                client,
                global_semaphore,
                host_semaphores: DashMap::new(),
                config,
                robots,
                renderer,
                metrics,
                cooldowns: Mutex::new(cooldowns),
                cooldown_seconds,
                queue: Mutex::new(VecDeque::new()),
                results: Mutex::new(Vec::new()),
                visited: Mutex::new(HashSet::new()),
                seen_md5: Mutex::new(HashSet::new()),
                bloom: Mutex::new(UrlBloom::new(1024, 0.01)),
                budget,
                stop: AtomicBool::new(false),
            }),
        }
    }

    /// Runs the fetch pipeline for `query` over `candidates`, returning up
    /// to `budget` `PageResult`s plus the updated cooldown ledger for the
    /// caller to persist at run end (§4.5).
    pub async fn run(self, query: &str, candidates: Vec<Candidate>) -> (Vec<PageResult>, Cooldowns) {
        let shared = self.shared;

        {
            let mut queue = shared.queue.lock().await;
            queue.extend(filter_cooled_down(&shared, query, candidates).await);
        }

        let worker_count = shared.config.concurrency.max(1);
        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let shared = shared.clone();
            let query = query.to_string();
            handles.push(tokio::spawn(async move { worker_loop(shared, query).await }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        let results = shared.results.lock().await.clone();
        let cooldowns = shared.cooldowns.lock().await.clone();
        (results, cooldowns)
    }
}

/// Drops candidates whose host is still within its cooldown window before
/// they ever enter the queue (§4.5): cooldowns are consulted before
/// enqueue, not just before fetch.
async fn filter_cooled_down(shared: &Shared, query: &str, candidates: Vec<Candidate>) -> Vec<Candidate> {
    let cooldowns = shared.cooldowns.lock().await;
    let now = seeker_common::time::unix_now();
    candidates
        .into_iter()
        .filter(|c| {
            let host = host_of(&c.url);
            !cooldowns.skip(query, &host, now, shared.cooldown_seconds)
        })
        .collect()
}

async fn worker_loop(shared: Arc<Shared>, query: String) {
    loop {
        if shared.stop.load(Ordering::Acquire) {
            return;
        }

        let candidate = {
            let mut queue = shared.queue.lock().await;
            queue.pop_front()
        };
        let Some(candidate) = candidate else { return };

        fetch_one(&shared, &query, candidate).await;

        if shared.results.lock().await.len() >= shared.budget {
            shared.stop.store(true, Ordering::Release);
            return;
        }
    }
}

async fn fetch_one(shared: &Arc<Shared>, query: &str, candidate: Candidate) {
    let url = candidate.url;
    let key = url.to_string();

    {
        let visited = shared.visited.lock().await;
        let bloom = shared.bloom.lock().await;
        if visited.contains(&key) || bloom.contains(&url) {
            return;
        }
    }

    if shared.config.respect_robots && !shared.robots.allowed(&url).await {
        shared.metrics.robots_denied();
        tracing::debug!(%url, "robots.txt disallows fetch");
        return;
    }

    let host = host_of(&url);
    let host_semaphore = shared.host_semaphore(&host);

    let Ok(_global_permit) = shared.global_semaphore.clone().acquire_owned().await else {
        return;
    };
    let Ok(_host_permit) = host_semaphore.acquire_owned().await else {
        return;
    };

    let Some((final_url, status, mut html)) = fetch_with_retry(shared, &url).await else {
        shared.metrics.fetch_errors();
        return;
    };

    if shared.config.force_render
        || (html::visible_text_len(&html) < DYNAMIC_RENDER_MIN_TEXT_LEN
            && looks_like_app_shell(&html))
    {
        if let Ok(rendered) = shared.renderer.render(&final_url, DYNAMIC_RENDER_TIMEOUT).await {
            // Rendered output replaces the static page entirely -- the
            // spec's decided reading of the "both or rendered-only"
            // open question (§9).
            html = rendered.html;
        }
    }

    let fingerprint = ContentFingerprint::from_text(&html);

    {
        let mut seen = shared.seen_md5.lock().await;
        if !seen.insert(fingerprint.md5.clone()) {
            shared.metrics.dedupe_hits();
            return;
        }
    }

    let title = extract_title(&html);
    let outlinks = html::extract_outlinks(&final_url, &html);

    let now = seeker_common::time::unix_now();
    {
        let mut cooldowns = shared.cooldowns.lock().await;
        cooldowns.mark(query, &host, now);
    }
    {
        let mut visited = shared.visited.lock().await;
        visited.insert(key);
        visited.insert(final_url.to_string());
    }
    {
        let mut bloom = shared.bloom.lock().await;
        bloom.add(&final_url);
    }

    let page = PageResult {
        url: final_url.to_string(),
        status,
        html,
        title,
        fetched_at: now,
        fingerprint: fingerprint.into(),
        outlinks,
    };

    shared.metrics.fetched();
    shared.results.lock().await.push(page);
}

fn extract_title(html: &str) -> String {
    use kuchiki::traits::TendrilSink;
    let document = kuchiki::parse_html().one(html);
    document
        .select("title")
        .ok()
        .and_then(|mut it| it.next())
        .map(|node| node.text_contents().trim().to_string())
        .unwrap_or_default()
}

/// GET with redirect-follow already configured on the client; retries
/// network/timeout errors up to `MAX_RETRIES` with exponential backoff.
/// 4xx responses are returned as-is (not retried); 5xx responses are
/// retried within the same backoff policy (§4.6 step 7, §7).
async fn fetch_with_retry(shared: &Shared, url: &Url) -> Option<(Url, u16, String)> {
    let mut attempt = 0;
    loop {
        let result = shared
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, shared.config.user_agent.clone())
            .send()
            .await;

        match result {
            Ok(response) => {
                let final_url = response.url().clone();
                let status = response.status();
                if status.is_client_error() {
                    let body = response.text().await.unwrap_or_default();
                    return Some((final_url, status.as_u16(), body));
                }
                if status.is_server_error() {
                    if attempt >= MAX_RETRIES {
                        return None;
                    }
                } else {
                    let body = response.text().await.unwrap_or_default();
                    return Some((final_url, status.as_u16(), body));
                }
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, attempt, "fetch error");
                if attempt >= MAX_RETRIES {
                    return None;
                }
            }
        }

        tokio::time::sleep(backoff_for_attempt(attempt)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(backoff_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(backoff_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(backoff_for_attempt(3), Duration::from_millis(8000));
        assert_eq!(backoff_for_attempt(10), BACKOFF_CAP);
    }

    #[test]
    fn extract_title_reads_title_tag() {
        let html = "<html><head><title> Example Page </title></head><body></body></html>";
        assert_eq!(extract_title(html), "Example Page");
    }

    #[tokio::test]
    async fn run_with_no_candidates_returns_empty() {
        let robots = Arc::new(RobotsCache::new("TestBot", false));
        let metrics = Arc::new(Metrics::default());
        let cooldowns = Cooldowns::default();
        let fetcher = Fetcher::new(FetcherConfig::default(), robots, metrics, cooldowns, DEFAULT_COOLDOWN, 5);
        let (results, _) = fetcher.run("rust async", vec![]).await;
        assert!(results.is_empty());
    }
}
