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

//! `NormalizedDoc` and its content hash (§4.7, §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDoc {
    pub url: String,
    pub lang: String,
    pub title: String,
    pub h1h2: String,
    pub body: String,
    pub content_hash: String,
    pub fetched_at: f64,
    pub outlinks: Vec<String>,
}

/// Collapses runs of whitespace to a single space and trims the ends --
/// applied before hashing so trivially re-whitespaced HTML still hashes
/// identically (§4.7).
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `MD5(title + "\n" + h1h2 + "\n" + body)` over whitespace-collapsed
/// fields (§4.7).
pub fn content_hash(title: &str, h1h2: &str, body: &str) -> String {
    let joined = format!(
        "{}\n{}\n{}",
        collapse_whitespace(title),
        collapse_whitespace(h1h2),
        collapse_whitespace(body)
    );
    format!("{:x}", md5::compute(joined.as_bytes()))
}
