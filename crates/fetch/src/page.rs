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

//! `PageResult` and its JSONL persistence (§3, §4.6 persistence, §6 raw
//! crawl output).

use std::io::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use seeker_fingerprint::ContentFingerprint;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub simhash: u64,
    pub md5: String,
}

impl From<ContentFingerprint> for Fingerprint {
    fn from(fp: ContentFingerprint) -> Self {
        Self {
            simhash: fp.simhash,
            md5: fp.md5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub url: String,
    pub status: u16,
    pub html: String,
    pub title: String,
    pub fetched_at: f64,
    pub fingerprint: Fingerprint,
    pub outlinks: Vec<String>,
}

/// The flattened JSONL record shape fixed by §6: fingerprint's two fields
/// are hoisted to the top level alongside the originating `query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub query: String,
    pub url: String,
    pub status: u16,
    pub title: String,
    pub html: String,
    pub fetched_at: f64,
    pub content_hash: String,
    pub simhash: u64,
    pub outlinks: Vec<String>,
}

impl RawRecord {
    pub fn new(query: &str, page: &PageResult) -> Self {
        Self {
            query: query.to_string(),
            url: page.url.clone(),
            status: page.status,
            title: page.title.clone(),
            html: page.html.clone(),
            fetched_at: page.fetched_at,
            content_hash: page.fingerprint.md5.clone(),
            simhash: page.fingerprint.simhash,
            outlinks: page.outlinks.clone(),
        }
    }
}

/// Appends one JSONL line per page to `focused_<epoch>.jsonl` (§4.6, §6).
pub fn append_raw_records(path: &Path, query: &str, pages: &[PageResult]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    for page in pages {
        let record = RawRecord::new(query, page);
        writeln!(file, "{}", serde_json::to_string(&record)?)?;
    }
    Ok(())
}
