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

//! 64-bit SimHash and the K-bit-bucket near-duplicate table, in the spirit
//! of `crates/core/src/simhash.rs`'s `Table`/`Block` construction. That
//! construction tokenizes through tantivy's own tokenizer; this crate has no
//! index dependency, so tokenization here is direct: lowercase, split on
//! non-alphanumerics.

use std::collections::{hash_map::DefaultHasher, HashMap};
use std::hash::{Hash, Hasher};

pub type Hash64 = u64;

fn hash_token(token: &str) -> Hash64 {
    let mut hasher = DefaultHasher::default();
    token.hash(&mut hasher);
    hasher.finish()
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| !tok.is_empty())
        .map(str::to_string)
        .collect()
}

/// 64-bit locality-sensitive hash of `text`'s tokens.
pub fn simhash(text: &str) -> Hash64 {
    let mut weights = [0i64; Hash64::BITS as usize];

    for token in tokenize(text) {
        let h = hash_token(&token);
        for (i, weight) in weights.iter_mut().enumerate() {
            if (h >> i) & 1 == 1 {
                *weight = weight.saturating_add(1);
            } else {
                *weight = weight.saturating_sub(1);
            }
        }
    }

    let mut hash: Hash64 = 0;
    for (i, weight) in weights.iter().enumerate() {
        if *weight > 0 {
            hash |= 1 << i;
        }
    }
    hash
}

pub fn hamming_distance(a: Hash64, b: Hash64) -> u32 {
    (a ^ b).count_ones()
}

/// `{simhash, md5}` pair computed from normalized text. MD5 is the exact
/// duplicate fingerprint used for the fetcher's "already seen this run"
/// check; SimHash feeds the index's near-duplicate side table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ContentFingerprint {
    pub simhash: Hash64,
    pub md5: String,
}

impl ContentFingerprint {
    pub fn from_text(s: &str) -> Self {
        Self {
            simhash: simhash(s),
            md5: format!("{:x}", md5::compute(s.as_bytes())),
        }
    }
}

const NEAR_DUP_THRESHOLD: usize = 3;
const NUM_BLOCKS: usize = NEAR_DUP_THRESHOLD + 1;
const BLOCK_SIZE: usize = Hash64::BITS as usize / NUM_BLOCKS;

#[derive(PartialEq, Eq, Hash)]
struct Prefix(Hash64);

struct Block {
    buckets: HashMap<Prefix, Vec<Hash64>>,
    mask: Hash64,
}

impl Block {
    fn new(block_idx: usize) -> Self {
        Self {
            buckets: HashMap::new(),
            mask: (Hash64::MAX << (Hash64::BITS as usize - BLOCK_SIZE)) >> (BLOCK_SIZE * block_idx),
        }
    }

    fn insert(&mut self, hash: Hash64) {
        let prefix = Prefix(hash & self.mask);
        self.buckets.entry(prefix).or_default().push(hash);
    }

    fn nearest_within(&self, hash: Hash64, max_distance: usize) -> bool {
        let prefix = Prefix(hash & self.mask);
        match self.buckets.get(&prefix) {
            Some(candidates) => candidates
                .iter()
                .any(|candidate| hamming_distance(hash, *candidate) as usize <= max_distance),
            None => false,
        }
    }
}

/// A near-duplicate index: `contains` is true iff a previously inserted
/// hash is within Hamming distance 3 of the query (§4.1, §4.8).
pub struct SimhashTable {
    blocks: [Block; NUM_BLOCKS],
}

impl Default for SimhashTable {
    fn default() -> Self {
        Self {
            blocks: std::array::from_fn(Block::new),
        }
    }
}

impl SimhashTable {
    pub fn insert(&mut self, hash: Hash64) {
        for block in &mut self.blocks {
            block.insert(hash);
        }
    }

    pub fn contains_near_duplicate(&self, hash: Hash64) -> bool {
        self.blocks
            .iter()
            .any(|block| block.nearest_within(hash, NEAR_DUP_THRESHOLD))
    }
}
