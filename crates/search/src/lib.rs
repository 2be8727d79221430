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

//! Smart-search orchestrator (§4.11): runs a synchronous index lookup and,
//! only when results are thin, fires a best-effort background focused
//! crawl. The crawl is dispatched through a `Weak` scheduler reference so
//! that if whatever owns the scheduler has already been torn down, the
//! trigger silently becomes a no-op instead of keeping it alive or
//! panicking -- the same "fire-and-forget, no upward obligation" shape used
//! elsewhere in this codebase for best-effort background jobs.

use std::sync::{Arc, Weak};

use seeker_cooldown::Cooldowns;
use seeker_index::{SearchHit, SearchIndex};
use tokio::sync::Mutex;

/// Pseudo-host key under which the trigger cooldown is recorded, reusing
/// [`seeker_cooldown::Cooldowns`]'s `(query, host)` shape for a concern
/// that has no real host -- one entry per query rather than per query+host.
const TRIGGER_KEY: &str = "_smart_trigger";

#[async_trait::async_trait]
pub trait CrawlScheduler: Send + Sync {
    async fn schedule_focused_crawl(&self, query: String, budget: usize, use_llm: bool, model: Option<String>);
}

#[derive(Debug, Clone, Copy)]
pub struct SmartSearchConfig {
    pub min_results: usize,
    pub trigger_cooldown_seconds: u64,
    pub focused_crawl_budget: usize,
}

impl Default for SmartSearchConfig {
    fn default() -> Self {
        Self {
            min_results: 5,
            trigger_cooldown_seconds: 60,
            focused_crawl_budget: 50,
        }
    }
}

pub struct SmartSearch {
    cooldowns: Mutex<Cooldowns>,
    scheduler: Weak<dyn CrawlScheduler>,
    config: SmartSearchConfig,
}

impl SmartSearch {
    pub fn new(scheduler: &Arc<dyn CrawlScheduler>, cooldowns: Cooldowns, config: SmartSearchConfig) -> Self {
        Self {
            cooldowns: Mutex::new(cooldowns),
            scheduler: Arc::downgrade(scheduler),
            config,
        }
    }

    /// `smart_search(query, limit, use_llm?, model?)` (§4.11). Always
    /// returns immediately with whatever the index currently holds; a
    /// triggered crawl runs detached and has no bearing on this call's
    /// return value.
    pub async fn smart_search(
        &self,
        index: &SearchIndex,
        query: &str,
        limit: usize,
        use_llm: bool,
        model: Option<String>,
    ) -> Vec<SearchHit> {
        let results = index.search(
            query,
            limit,
            seeker_index::DEFAULT_MAX_LIMIT,
            seeker_index::DEFAULT_MAX_QUERY_LENGTH,
        );

        if results.len() >= self.config.min_results {
            return results;
        }

        self.maybe_trigger_crawl(query, use_llm, model).await;
        results
    }

    async fn maybe_trigger_crawl(&self, query: &str, use_llm: bool, model: Option<String>) {
        let now = seeker_common::time::unix_now();

        let allowed = {
            let cooldowns = self.cooldowns.lock().await;
            !cooldowns.skip(query, TRIGGER_KEY, now, self.config.trigger_cooldown_seconds)
        };
        if !allowed {
            return;
        }

        let Some(scheduler) = self.scheduler.upgrade() else {
            tracing::debug!(query, "crawl scheduler no longer alive, skipping trigger");
            return;
        };

        {
            let mut cooldowns = self.cooldowns.lock().await;
            cooldowns.mark(query, TRIGGER_KEY, now);
            if let Err(e) = cooldowns.save() {
                tracing::warn!(error = %e, "failed to persist smart-search trigger cooldown");
            }
        }

        let query = query.to_string();
        let budget = self.config.focused_crawl_budget;
        tokio::spawn(async move {
            scheduler.schedule_focused_crawl(query, budget, use_llm, model).await;
        });
    }
}
