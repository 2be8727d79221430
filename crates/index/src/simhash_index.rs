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

//! Persisted near-duplicate side table (§4.8, §6 `simhash.jsonl`). Wraps
//! [`seeker_fingerprint::SimhashTable`], which only lives in memory, with
//! JSONL persistence so the bucket table survives process restarts.

use std::io::{BufRead, Write as _};
use std::path::{Path, PathBuf};

use seeker_fingerprint::{hamming_distance, SimhashTable};

pub struct SimhashIndex {
    table: SimhashTable,
    path: PathBuf,
}

impl SimhashIndex {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut table = SimhashTable::default();
        if path.exists() {
            let file = std::fs::File::open(path)?;
            for line in std::io::BufReader::new(file).lines() {
                let line = line?;
                if let Ok(hash) = line.trim().parse::<u64>() {
                    table.insert(hash);
                }
            }
        }
        Ok(Self { table, path: path.to_path_buf() })
    }

    /// True iff `hash` is within Hamming distance 3 of a previously seen
    /// hash (§4.8).
    pub fn is_near_duplicate(&self, hash: u64) -> bool {
        self.table.contains_near_duplicate(hash)
    }

    /// Inserts `hash` into the in-memory table and appends it to the
    /// on-disk log immediately, so a crash after a successful commit never
    /// loses near-dup coverage for documents already written.
    pub fn insert(&mut self, hash: u64) -> anyhow::Result<()> {
        self.table.insert(hash);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{hash}")?;
        Ok(())
    }
}

/// Re-exported for callers that only need the raw distance check without
/// constructing a full table (e.g. tests comparing two known hashes).
pub fn distance(a: u64, b: u64) -> u32 {
    hamming_distance(a, b)
}
