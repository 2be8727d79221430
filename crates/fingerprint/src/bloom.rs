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

//! URL-set membership Bloom filter, in the spirit of `bloom::BytesBloomFilter`
//! in `crates/bloom/src/lib.rs` but specialized to an exact parameter
//! derivation and double-hashing scheme so its sizing is reproducible
//! independent of any particular hash construction.

use bitvec::vec::BitVec;
use url::Url;

/// Number of bits needed for `capacity` items at false-positive rate `fp`,
/// floored at 8 bits so a degenerate (capacity=0) filter still has a home
/// for its bit array.
fn num_bits(capacity: u64, fp: f64) -> u64 {
    let m = (-(capacity as f64) * fp.ln() / (std::f64::consts::LN_2.powi(2))).ceil();
    (m as u64).max(8)
}

/// Number of hash lanes to combine via double hashing.
fn num_hashes(num_bits: u64, capacity: u64) -> u64 {
    if capacity == 0 {
        return 1;
    }
    (((num_bits as f64) / capacity as f64) * std::f64::consts::LN_2)
        .floor()
        .max(1.0) as u64
}

/// Two independent 32-bit lanes taken from the SHA-1 and MD5 digests of the
/// url, used as the double-hashing seeds `(h1, h2)`.
fn hash_lanes(url: &str) -> (u32, u32) {
    use sha1::{Digest, Sha1};

    let sha1_digest = Sha1::digest(url.as_bytes());
    let md5_digest = md5::compute(url.as_bytes());

    let h1 = u32::from_be_bytes([sha1_digest[0], sha1_digest[1], sha1_digest[2], sha1_digest[3]]);
    let h2 = u32::from_be_bytes([md5_digest[0], md5_digest[1], md5_digest[2], md5_digest[3]]);

    (h1, h2 ^ h1)
}

/// A probabilistic set of URLs with no false negatives. Sizing follows the
/// spec's formulas exactly so two filters built with the same
/// `(capacity, error_rate)` behave identically regardless of insertion
/// order.
#[derive(Debug, Clone)]
pub struct UrlBloom {
    bits: BitVec,
    num_hashes: u64,
}

impl UrlBloom {
    pub fn new(capacity: u64, error_rate: f64) -> Self {
        let m = num_bits(capacity, error_rate);
        let k = num_hashes(m, capacity);

        Self {
            bits: BitVec::repeat(false, m as usize),
            num_hashes: k,
        }
    }

    fn positions(&self, url: &str) -> impl Iterator<Item = usize> + '_ {
        let (h1, h2) = hash_lanes(url);
        let len = self.bits.len() as u64;

        (0..self.num_hashes).map(move |i| {
            let combined = (h1 as u64).wrapping_add(i.wrapping_mul(h2 as u64));
            (combined % len) as usize
        })
    }

    pub fn add(&mut self, url: &Url) {
        let s = url.as_str();
        for pos in self.positions(s).collect::<Vec<_>>() {
            self.bits.set(pos, true);
        }
    }

    pub fn contains(&self, url: &Url) -> bool {
        let s = url.as_str();
        self.positions(s).all(|pos| self.bits[pos])
    }

    pub fn num_bits(&self) -> usize {
        self.bits.len()
    }

    pub fn num_hashes(&self) -> u64 {
        self.num_hashes
    }
}
