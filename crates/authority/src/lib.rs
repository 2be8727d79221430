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

//! Host-level authority estimator (§4.9). A webgraph keyed by a 128-bit
//! stable hash (`crates/core/src/webgraph/node.rs`'s `NodeID`) lets two
//! different graphs reference the same host without sharing an arena, but
//! means every edge carries a full hash pair. A focused crawl's graph is
//! orders of magnitude smaller and rebuilt from scratch each run, so this
//! keeps the same host-normalization rule but interns hosts into a
//! `Vec`-backed arena of `u32` ids instead: edges are `(u32, u32)` pairs,
//! smaller and without the un-owned, cross-run hash identity a stable
//! `NodeID` needs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

/// Strips a leading "www." and lowercases, matching
/// `webgraph::node::normalize_url`'s host rule.
pub fn normalize_host(host: &str) -> String {
    let lowered = host.to_lowercase();
    lowered.strip_prefix("www.").unwrap_or(&lowered).to_string()
}

pub fn host_of(url: &Url) -> Option<String> {
    url.host_str().map(normalize_host)
}

/// Arena-interned directed host graph, built fresh from a normalized corpus.
#[derive(Default)]
pub struct HostGraph {
    host_to_id: HashMap<String, u32>,
    id_to_host: Vec<String>,
    edges: HashSet<(u32, u32)>,
}

impl HostGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, host: &str) -> u32 {
        if let Some(id) = self.host_to_id.get(host) {
            return *id;
        }
        let id = self.id_to_host.len() as u32;
        self.id_to_host.push(host.to_string());
        self.host_to_id.insert(host.to_string(), id);
        id
    }

    /// Records a directed edge `source -> target`. Self-links are excluded.
    pub fn add_edge(&mut self, source_host: &str, target_host: &str) {
        if source_host == target_host {
            return;
        }
        let src = self.intern(source_host);
        let dst = self.intern(target_host);
        self.edges.insert((src, dst));
    }

    /// Feeds edges from a normalized document's outlinks, resolving each
    /// outlink's host and skipping unparsable or off-host-less links.
    pub fn add_document(&mut self, source_url: &Url, outlinks: &[Url]) {
        let Some(source_host) = host_of(source_url) else {
            return;
        };
        for outlink in outlinks {
            if let Some(target_host) = host_of(outlink) {
                self.add_edge(&source_host, &target_host);
            }
        }
    }

    /// Unique in-link counts per target host.
    pub fn in_link_counts(&self) -> BTreeMap<String, u64> {
        let mut counts: HashMap<u32, u64> = HashMap::new();
        for &(_, dst) in &self.edges {
            *counts.entry(dst).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(id, count)| (self.id_to_host[id as usize].clone(), count))
            .collect()
    }

    /// Wraps the raw in-link counts into an `AuthorityIndex`, sorted by host
    /// for deterministic JSON output. `log1p` is applied at read time by
    /// [`AuthorityIndex::score_for`], not here -- the persisted file (§6) is
    /// the integer count, not the derived score.
    pub fn to_index(&self) -> AuthorityIndex {
        AuthorityIndex { counts: self.in_link_counts() }
    }
}

/// Host -> in-link count table, persisted as a JSON map sorted by host
/// (§3, §6: `{host: count}`). The `log1p` authority score the ranker
/// consumes is derived from the count at read time, not stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorityIndex {
    counts: BTreeMap<String, u64>,
}

impl AuthorityIndex {
    /// Builds an index directly from precomputed host counts, bypassing the
    /// graph -- used by callers (tests, the frontier builder) that already
    /// have a `{host: count}` map on hand.
    pub fn from_counts(counts: BTreeMap<String, u64>) -> Self {
        Self { counts }
    }

    pub fn score_for(&self, host: &str) -> f64 {
        let count = self.counts.get(&normalize_host(host)).copied().unwrap_or(0);
        (count as f64).ln_1p()
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let counts: BTreeMap<String, u64> = serde_json::from_str(&contents)?;
        Ok(Self { counts })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.counts)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Merges another index's counts in by summing per host, for the
    /// "incremental (add new edges)" recomputation path (§4.9): two
    /// passes over disjoint edge sets must have their counts added
    /// before `log1p` is applied, not have their already-derived scores
    /// maxed afterward.
    pub fn merge_sum(&mut self, other: &AuthorityIndex) {
        for (host, count) in &other.counts {
            *self.counts.entry(host.clone()).or_insert(0) += count;
        }
    }
}
