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

//! Incremental full-text index (§4.8): upsert-by-url writer backed by
//! tantivy, a ledger tracking per-url content hashes, and a SimHash side
//! table for near-duplicate elimination. Mirrors the `inverted_index` crate
//! in spirit (schema + writer + searcher triad) but without its
//! distributed-shard machinery, which this single-process index has no use
//! for.

mod ledger;
mod schema;
mod simhash_index;

pub use ledger::{Ledger, LedgerEntry};
pub use simhash_index::SimhashIndex;

use std::path::{Path, PathBuf};

use seeker_normalize::NormalizedDoc;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::{doc, Index, IndexReader, IndexWriter as TantivyWriter, Term};

pub const DEFAULT_HEAP_SIZE: usize = 50_000_000;
pub const DEFAULT_MAX_LIMIT: usize = 100;
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 512;
const SNIPPET_MAX_CHARS: usize = 280;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger error: {0}")]
    Ledger(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct IndexStats {
    pub added: u64,
    pub updated: u64,
    pub skipped: u64,
    pub deduped: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub score: f64,
    pub lang: String,
}

pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: TantivyWriter,
    fields: schema::Fields,
    ledger: Ledger,
    simhash: SimhashIndex,
    dir: PathBuf,
}

impl SearchIndex {
    /// Opens an existing index directory or creates a new one, loading the
    /// ledger and SimHash side file alongside it (§4.8, §6).
    pub fn open(dir: &Path, stemming: bool) -> Result<Self, IndexError> {
        std::fs::create_dir_all(dir)?;
        let (schema_def, fields) = schema::build_schema(stemming);

        let directory = tantivy::directory::MmapDirectory::open(dir)?;
        let index = Index::open_or_create(directory, schema_def)?;
        schema::register_tokenizers(&index);

        let reader = index.reader()?;
        let writer = index.writer(DEFAULT_HEAP_SIZE)?;
        let ledger = Ledger::load(&dir.join("ledger.json")).map_err(IndexError::Ledger)?;
        let simhash = SimhashIndex::load(&dir.join("simhash.jsonl")).map_err(IndexError::Ledger)?;

        Ok(Self {
            index,
            reader,
            writer,
            fields,
            ledger,
            simhash,
            dir: dir.to_path_buf(),
        })
    }

    /// Upserts `docs` by url (§4.8). Commits once per batch; a crash
    /// mid-batch leaves the previously committed generation intact since
    /// tantivy only advances on a successful `commit`.
    pub fn index_documents(&mut self, docs: &[NormalizedDoc], now: f64) -> Result<IndexStats, IndexError> {
        let mut stats = IndexStats::default();
        let mut seen_hashes_this_batch = std::collections::HashSet::new();

        for doc in docs {
            if !seen_hashes_this_batch.insert(doc.content_hash.clone()) {
                stats.deduped += 1;
                continue;
            }

            let is_update = self.ledger.contains_url(&doc.url);
            if let Some(entry) = self.ledger.get(&doc.url) {
                if entry.content_hash == doc.content_hash {
                    stats.skipped += 1;
                    continue;
                }
            }

            let content_fingerprint = seeker_fingerprint::simhash(&format!(
                "{} {} {}",
                doc.title, doc.h1h2, doc.body
            ));
            // Near-dup elimination is for catching a *different* url that
            // duplicates content already in the corpus (§4.8); re-indexing
            // the same url under a changed content_hash is an update, not a
            // duplicate, even if the edit happens to land within Hamming
            // distance 3 of that url's own previous fingerprint.
            if !is_update && self.simhash.is_near_duplicate(content_fingerprint) {
                stats.deduped += 1;
                continue;
            }

            self.writer.delete_term(Term::from_field_text(self.fields.url, &doc.url));
            self.writer.add_document(doc!(
                self.fields.url => doc.url.clone(),
                self.fields.title => doc.title.clone(),
                self.fields.h1h2 => doc.h1h2.clone(),
                self.fields.body => doc.body.clone(),
                self.fields.lang => doc.lang.clone(),
            ))?;

            let doc_id = self.ledger.allocate_doc_id();
            self.ledger.upsert(&doc.url, &doc.content_hash, now, doc_id);
            self.simhash.insert(content_fingerprint).map_err(IndexError::Ledger)?;

            if is_update {
                stats.updated += 1;
            } else {
                stats.added += 1;
            }
        }

        self.writer.commit()?;
        self.reader.reload()?;
        self.ledger.save().map_err(IndexError::Ledger)?;
        write_last_index_time(&self.dir, now)?;

        Ok(stats)
    }

    /// Deletes a single url from the index, outside the batch upsert path
    /// (used by operator tooling, not the ingest pipeline itself).
    pub fn delete_url(&mut self, url: &str) -> Result<(), IndexError> {
        self.writer.delete_term(Term::from_field_text(self.fields.url, url));
        self.writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    /// `search(query, limit, max_limit, max_query_length)` (§4.8). Empty or
    /// whitespace-only queries, and unparseable queries, return `[]`.
    pub fn search(&self, query: &str, limit: usize, max_limit: usize, max_query_length: usize) -> Vec<SearchHit> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return vec![];
        }

        let truncated: String = trimmed.chars().take(max_query_length).collect();
        let effective_limit = limit.min(max_limit).max(1);

        let parser = QueryParser::for_index(
            &self.index,
            vec![self.fields.title, self.fields.h1h2, self.fields.body, self.fields.url],
        );
        let parsed = match parser.parse_query(&truncated) {
            Ok(q) => q,
            Err(e) => {
                tracing::debug!(query = %truncated, error = %e, "query parse failure");
                return vec![];
            }
        };

        let searcher = self.reader.searcher();
        let top_docs = match searcher.search(&parsed, &TopDocs::with_limit(effective_limit)) {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, "search execution failure");
                return vec![];
            }
        };

        let snippet_generator =
            tantivy::SnippetGenerator::create(&searcher, &*parsed, self.fields.body).ok();

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let Ok(retrieved) = searcher.doc::<tantivy::TantivyDocument>(address) else { continue };
            let url = first_text(&retrieved, self.fields.url);
            let title = first_text(&retrieved, self.fields.title);
            let lang = first_text(&retrieved, self.fields.lang);

            let snippet = snippet_generator
                .as_ref()
                .map(|gen| gen.snippet_from_doc(&retrieved).to_html())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| truncate_chars(&first_text(&retrieved, self.fields.body), SNIPPET_MAX_CHARS));

            hits.push(SearchHit {
                url,
                title,
                snippet,
                score: score as f64,
                lang,
            });
        }

        hits
    }
}

fn first_text(doc: &tantivy::TantivyDocument, field: tantivy::schema::Field) -> String {
    use tantivy::schema::document::Value;
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn write_last_index_time(dir: &Path, now: f64) -> std::io::Result<()> {
    std::fs::write(dir.join("last_index_time"), now.to_string())
}

pub fn read_last_index_time(dir: &Path) -> Option<f64> {
    std::fs::read_to_string(dir.join("last_index_time"))
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(url: &str, title: &str, body: &str, content_hash: &str) -> NormalizedDoc {
        NormalizedDoc {
            url: url.to_string(),
            lang: "en".to_string(),
            title: title.to_string(),
            h1h2: String::new(),
            body: body.to_string(),
            content_hash: content_hash.to_string(),
            fetched_at: 1000.0,
            outlinks: vec![],
        }
    }

    #[test]
    fn new_url_counts_as_added_then_as_skipped_when_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = SearchIndex::open(dir.path(), true).unwrap();

        let docs = vec![doc(
            "https://example.com/a",
            "Rust async crawler",
            "an article about building an async web crawler in rust",
            "hash-a",
        )];
        let stats = index.index_documents(&docs, 1000.0).unwrap();
        assert_eq!(stats.added, 1);
        assert_eq!(stats.skipped, 0);

        let stats_again = index.index_documents(&docs, 1001.0).unwrap();
        assert_eq!(stats_again.added, 0);
        assert_eq!(stats_again.skipped, 1);
    }

    #[test]
    fn changed_content_hash_counts_as_updated() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = SearchIndex::open(dir.path(), true).unwrap();

        index
            .index_documents(&[doc("https://example.com/a", "T", "first version of the body", "hash-1")], 1000.0)
            .unwrap();
        let stats = index
            .index_documents(&[doc("https://example.com/a", "T", "second version of the body", "hash-2")], 1001.0)
            .unwrap();

        assert_eq!(stats.updated, 1);
        assert_eq!(stats.added, 0);
    }

    #[test]
    fn minor_edit_to_same_url_is_updated_not_deduped_as_near_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = SearchIndex::open(dir.path(), true).unwrap();

        index
            .index_documents(
                &[doc("https://example.com/a", "T", "the quick brown fox jumps over the lazy dog", "hash-1")],
                1000.0,
            )
            .unwrap();
        // Same url, a small edit -- within Hamming distance 3 of its own
        // prior fingerprint, but still the same url's own evolution, not a
        // duplicate of someone else's content.
        let stats = index
            .index_documents(
                &[doc("https://example.com/a", "T", "the quick brown fox jumps over a lazy dog", "hash-2")],
                1001.0,
            )
            .unwrap();

        assert_eq!(stats.updated, 1);
        assert_eq!(stats.deduped, 0);
    }

    #[test]
    fn duplicate_content_hash_across_urls_in_batch_is_deduped() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = SearchIndex::open(dir.path(), true).unwrap();

        let docs = vec![
            doc("https://example.com/a", "T", "identical body text here", "same-hash"),
            doc("https://example.com/b", "T", "identical body text here", "same-hash"),
        ];
        let stats = index.index_documents(&docs, 1000.0).unwrap();
        assert_eq!(stats.added, 1);
        assert_eq!(stats.deduped, 1);
    }

    #[test]
    fn search_finds_indexed_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = SearchIndex::open(dir.path(), true).unwrap();
        index
            .index_documents(
                &[doc(
                    "https://example.com/a",
                    "Rust async crawler",
                    "an article about building an async web crawler in rust",
                    "hash-a",
                )],
                1000.0,
            )
            .unwrap();

        let hits = index.search("crawler", 10, DEFAULT_MAX_LIMIT, DEFAULT_MAX_QUERY_LENGTH);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://example.com/a");
    }

    #[test]
    fn empty_query_returns_no_hits() {
        let dir = tempfile::tempdir().unwrap();
        let index = SearchIndex::open(dir.path(), true).unwrap();
        assert!(index.search("   ", 10, DEFAULT_MAX_LIMIT, DEFAULT_MAX_QUERY_LENGTH).is_empty());
    }

    #[test]
    fn last_index_time_is_recorded_after_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = SearchIndex::open(dir.path(), true).unwrap();
        index
            .index_documents(&[doc("https://example.com/a", "T", "some body content", "hash-a")], 1234.0)
            .unwrap();

        assert_eq!(read_last_index_time(dir.path()), Some(1234.0));
    }
}

