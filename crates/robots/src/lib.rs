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

//! Per-origin robots.txt cache with TTL, in the spirit of
//! `crates/core/src/crawler/robots_txt.rs`'s `RobotsTxtManager`. That
//! manager gives a worker thread exclusive `&mut self` access; here the
//! cache must instead be a *shared* resource whose updates are serialized
//! by a per-instance lock (§4.2) — so lookups borrow the cache behind a
//! `tokio::sync::Mutex` instead of owning it per worker.

use std::{collections::BTreeMap, time::Duration};

use url::Url;

const MIN_TTL: Duration = Duration::from_secs(60);
const DEFAULT_TTL: Duration = Duration::from_secs(3600);
const ROBOTS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

enum Lookup {
    Found(Entry),
    /// robots.txt returned 404, or any other case treated as an explicit
    /// "no rules" answer.
    Unavailable(std::time::Instant),
    /// Network error or timeout fetching robots.txt.
    Unreachable(std::time::Instant),
}

impl Lookup {
    fn is_expired(&self, ttl: Duration) -> bool {
        match self {
            Lookup::Found(entry) => entry.is_expired(ttl),
            Lookup::Unavailable(fetched_at) | Lookup::Unreachable(fetched_at) => {
                fetched_at.elapsed() > ttl
            }
        }
    }
}

struct Entry {
    robots: robotstxt::Robots,
    fetched_at: std::time::Instant,
}

impl Entry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() > ttl
    }
}

fn origin(url: &Url) -> String {
    match url.port() {
        Some(port) => format!("{}://{}:{port}", url.scheme(), url.host_str().unwrap_or("")),
        None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or("")),
    }
}

struct Inner {
    cache: BTreeMap<String, Lookup>,
}

/// Shared robots.txt cache. Cheap to clone (wraps an `Arc` internally via
/// the caller holding `Arc<RobotsCache>`); `allowed`/`crawl_delay`/`sitemaps`
/// all take `&self`.
pub struct RobotsCache {
    client: reqwest::Client,
    user_agent: String,
    ttl: Duration,
    respect: bool,
    inner: tokio::sync::Mutex<Inner>,
}

impl RobotsCache {
    pub fn new(user_agent: impl Into<String>, respect: bool) -> Self {
        Self::with_ttl(user_agent, respect, DEFAULT_TTL)
    }

    pub fn with_ttl(user_agent: impl Into<String>, respect: bool, ttl: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: user_agent.into(),
            ttl: ttl.max(MIN_TTL),
            respect,
            inner: tokio::sync::Mutex::new(Inner {
                cache: BTreeMap::new(),
            }),
        }
    }

    pub async fn allowed(&self, url: &Url) -> bool {
        if !self.respect {
            return true;
        }

        let mut guard = self.inner.lock().await;
        self.refresh_if_needed(&mut guard, url).await;

        match guard.cache.get(&origin(url)) {
            Some(Lookup::Found(entry)) => entry.robots.is_allowed(url),
            // Unreachable *and* Unavailable are both treated as permissive:
            // an operator's proxy hiccup must never silently starve a crawl.
            Some(Lookup::Unavailable(_)) | Some(Lookup::Unreachable(_)) => true,
            None => true,
        }
    }

    pub async fn crawl_delay(&self, url: &Url) -> Option<Duration> {
        let mut guard = self.inner.lock().await;
        self.refresh_if_needed(&mut guard, url).await;

        match guard.cache.get(&origin(url)) {
            Some(Lookup::Found(entry)) => entry.robots.crawl_delay(),
            _ => None,
        }
    }

    pub async fn sitemaps(&self, url: &Url) -> Vec<Url> {
        let mut guard = self.inner.lock().await;
        self.refresh_if_needed(&mut guard, url).await;

        match guard.cache.get(&origin(url)) {
            Some(Lookup::Found(entry)) => entry
                .robots
                .sitemaps()
                .iter()
                .filter_map(|s| Url::parse(s).ok())
                .collect(),
            _ => vec![],
        }
    }

    async fn refresh_if_needed(&self, inner: &mut Inner, url: &Url) {
        let key = origin(url);

        let needs_refresh = match inner.cache.get(&key) {
            Some(lookup) => lookup.is_expired(self.ttl),
            None => true,
        };

        if !needs_refresh {
            return;
        }

        let lookup = self.fetch(&key).await;
        inner.cache.insert(key, lookup);
    }

    async fn fetch(&self, origin: &str) -> Lookup {
        let robots_url = format!("{origin}/robots.txt");

        let response = match self
            .client
            .get(&robots_url)
            .timeout(ROBOTS_FETCH_TIMEOUT)
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!(%origin, error = %e, "robots.txt unreachable, treating as permissive");
                return Lookup::Unreachable(std::time::Instant::now());
            }
        };

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Lookup::Unavailable(std::time::Instant::now());
        }

        if !response.status().is_success() {
            tracing::warn!(%origin, status = %response.status(), "robots.txt fetch failed, treating as permissive");
            return Lookup::Unreachable(std::time::Instant::now());
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(_) => return Lookup::Unreachable(std::time::Instant::now()),
        };

        match robotstxt::Robots::parse(&self.user_agent, &body) {
            Ok(robots) => Lookup::Found(Entry {
                robots,
                fetched_at: std::time::Instant::now(),
            }),
            Err(_) => Lookup::Unavailable(std::time::Instant::now()),
        }
    }
}
