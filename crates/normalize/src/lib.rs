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

//! HTML -> `NormalizedDoc` pipeline (§4.7): strip script/style/noscript,
//! pull out title/headings/body, best-effort language detection, and a
//! whitespace-insensitive content hash used downstream by the index
//! writer's upsert-by-url logic.

mod doc;
mod html;

pub use doc::{collapse_whitespace, content_hash, NormalizedDoc};

use std::io::{BufRead, Write as _};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// The raw crawl record shape fixed by §6 (`focused_<epoch>.jsonl`). Only
/// the fields this crate actually reads are required; `query`, `status`,
/// `content_hash` and `simhash` are the fetcher's own bookkeeping and are
/// ignored here rather than imported from `seeker-fetch`, keeping this
/// crate a one-way consumer of the documented wire shape instead of a
/// dependent of the fetch crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub url: String,
    pub title: String,
    pub html: String,
    pub fetched_at: f64,
    #[serde(default)]
    pub outlinks: Vec<String>,
}

/// Best-effort language code, "unknown" if detection fails or the text is
/// too short to classify reliably (§4.7).
fn detect_lang(body: &str) -> String {
    whatlang::detect(body)
        .map(|info| info.lang().code().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Normalizes a single raw record into a [`NormalizedDoc`] (§4.7). The
/// `<title>` tag's own text wins over the crawler's captured `title` when
/// present, since it reflects the (possibly rendered) final HTML rather
/// than whatever was true at fetch time.
pub fn normalize_record(raw: &RawRecord) -> NormalizedDoc {
    let extracted = html::extract(&raw.html);
    let title = if extracted.title.is_empty() {
        raw.title.clone()
    } else {
        extracted.title
    };
    let lang = detect_lang(&extracted.body);
    let hash = content_hash(&title, &extracted.h1h2, &extracted.body);

    NormalizedDoc {
        url: raw.url.clone(),
        lang,
        title,
        h1h2: extracted.h1h2,
        body: extracted.body,
        content_hash: hash,
        fetched_at: raw.fetched_at,
        outlinks: raw.outlinks.clone(),
    }
}

/// Reads one JSONL raw record per line, skipping malformed lines rather
/// than aborting the whole batch (a single corrupt line shouldn't sink a
/// normalization run).
pub fn read_raw_records(path: &Path) -> std::io::Result<Vec<RawRecord>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RawRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(error = %e, "skipping malformed raw record"),
        }
    }
    Ok(records)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Append,
    Replace,
}

/// Writes `docs` to `normalized.jsonl`, one JSON object per line, in
/// either append or replace mode (§4.7). Deterministic: the same input
/// docs in the same order always produce byte-identical output.
pub fn write_normalized(path: &Path, docs: &[NormalizedDoc], mode: WriteMode) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .append(matches!(mode, WriteMode::Append))
        .truncate(matches!(mode, WriteMode::Replace))
        .open(path)?;

    for doc in docs {
        writeln!(file, "{}", serde_json::to_string(doc)?)?;
    }
    Ok(())
}
