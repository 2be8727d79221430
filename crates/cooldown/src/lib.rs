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

//! On-disk `{query: {host: last_ts}}` cooldown ledger (§4.5). Loaded once at
//! the start of a crawl run and saved once at the end -- a single-writer
//! lifecycle, so no internal locking is needed, matching how the cooldown
//! and seed-log stores in `crates/core/src/crawler` are likewise whole-file
//! load/save, not append-per-call.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_COOLDOWN_SECONDS: u64 = 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cooldowns {
    #[serde(flatten)]
    by_query: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(skip)]
    path: PathBuf,
}

impl Cooldowns {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let by_query = if path.exists() {
            let contents = fs::read_to_string(path)?;
            serde_json::from_str(&contents)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            by_query,
            path: path.to_path_buf(),
        })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.by_query)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }

    /// True iff `now - last_ts < cooldown_seconds` for this `(query, host)`.
    pub fn skip(&self, query: &str, host: &str, now: f64, cooldown_seconds: u64) -> bool {
        match self.by_query.get(query).and_then(|hosts| hosts.get(host)) {
            Some(last_ts) => (now - last_ts) < cooldown_seconds as f64,
            None => false,
        }
    }

    pub fn mark(&mut self, query: &str, host: &str, ts: f64) {
        self.by_query
            .entry(query.to_string())
            .or_default()
            .insert(host.to_string(), ts);
    }
}
