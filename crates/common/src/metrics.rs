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

//! Process-lifetime counters, snapshotted on demand, in the same shape as
//! `crates/core/src/metrics.rs` instruments nearly every subsystem; the
//! counters here are the ones this crate's components actually increment.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Default)]
struct Counter(AtomicU64);

impl Counter {
    fn incr(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Shared, cheaply-cloneable metrics sink. Pass `Arc<Metrics>` to every
/// component that the spec describes as incrementing a named counter.
#[derive(Default)]
pub struct Metrics {
    pub fetched: Counter,
    pub fetch_errors: Counter,
    pub robots_denied: Counter,
    pub dedupe_hits: Counter,
    pub index_added: Counter,
    pub index_updated: Counter,
    pub index_skipped: Counter,
    pub index_deduped: Counter,
    pub llm_rerank_failures: Counter,
}

#[derive(Debug, Serialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub fetched: u64,
    pub fetch_errors: u64,
    pub robots_denied: u64,
    pub dedupe_hits: u64,
    pub index_added: u64,
    pub index_updated: u64,
    pub index_skipped: u64,
    pub index_deduped: u64,
    pub llm_rerank_failures: u64,
}

macro_rules! incr_fn {
    ($name:ident) => {
        pub fn $name(&self) {
            self.$name.incr();
        }
    };
}

impl Metrics {
    incr_fn!(fetched);
    incr_fn!(fetch_errors);
    incr_fn!(robots_denied);
    incr_fn!(dedupe_hits);
    incr_fn!(index_added);
    incr_fn!(index_updated);
    incr_fn!(index_skipped);
    incr_fn!(index_deduped);
    incr_fn!(llm_rerank_failures);

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fetched: self.fetched.get(),
            fetch_errors: self.fetch_errors.get(),
            robots_denied: self.robots_denied.get(),
            dedupe_hits: self.dedupe_hits.get(),
            index_added: self.index_added.get(),
            index_updated: self.index_updated.get(),
            index_skipped: self.index_skipped.get(),
            index_deduped: self.index_deduped.get(),
            llm_rerank_failures: self.llm_rerank_failures.get(),
        }
    }
}
