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

//! On-disk `ledger.json` (§6): `{url: {content_hash, last_indexed_at,
//! doc_id}}`, plus the `last_index_time` marker. Whole-file load/save,
//! single-writer-per-batch, the same shape as `seeker-cooldown`'s ledger.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub content_hash: String,
    pub last_indexed_at: f64,
    pub doc_id: u64,
}

/// Serialized as a flat `{url: {content_hash, last_indexed_at, doc_id}}`
/// map (§6) -- no wrapper keys, so `next_doc_id` is derived from the
/// entries themselves rather than persisted alongside them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: BTreeMap<String, LedgerEntry>,
    #[serde(skip)]
    next_doc_id: u64,
    #[serde(skip)]
    path: PathBuf,
}

impl Ledger {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                ..Default::default()
            });
        }
        let contents = std::fs::read_to_string(path)?;
        let mut ledger: Self = serde_json::from_str(&contents)?;
        ledger.path = path.to_path_buf();
        ledger.next_doc_id = ledger.entries.values().map(|e| e.doc_id + 1).max().unwrap_or(0);
        Ok(ledger)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn get(&self, url: &str) -> Option<&LedgerEntry> {
        self.entries.get(url)
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Allocates the next application-level doc id. Tantivy's own internal
    /// doc ids are segment-local and churn on merge, so the ledger tracks
    /// its own stable identifier instead.
    pub fn allocate_doc_id(&mut self) -> u64 {
        let id = self.next_doc_id;
        self.next_doc_id += 1;
        id
    }

    pub fn upsert(&mut self, url: &str, content_hash: &str, now: f64, doc_id: u64) {
        self.entries.insert(
            url.to_string(),
            LedgerEntry {
                content_hash: content_hash.to_string(),
                last_indexed_at: now,
                doc_id,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::load(&dir.path().join("ledger.json")).unwrap();
        assert!(ledger.get("https://example.com").is_none());
    }

    #[test]
    fn upsert_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = Ledger::load(&path).unwrap();
        let id = ledger.allocate_doc_id();
        ledger.upsert("https://example.com", "hash1", 1000.0, id);
        ledger.save().unwrap();

        let reloaded = Ledger::load(&path).unwrap();
        let entry = reloaded.get("https://example.com").unwrap();
        assert_eq!(entry.content_hash, "hash1");
        assert_eq!(entry.doc_id, id);
    }

    #[test]
    fn doc_ids_increment_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = Ledger::load(&path).unwrap();
        let first = ledger.allocate_doc_id();
        ledger.upsert("https://a.com", "h", 1.0, first);
        ledger.save().unwrap();

        let mut reloaded = Ledger::load(&path).unwrap();
        let second = reloaded.allocate_doc_id();
        assert_eq!(second, first + 1);
    }
}
