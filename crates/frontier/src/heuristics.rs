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

//! Seed-domain templates and heuristic URL guesses (§4.4 steps 3-4).

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use url::Url;

use crate::Source;

const SEED_PATHS: &[&str] = &["/", "/docs", "/documentation", "/blog", "/kb", "/help"];
const HEURISTIC_TLDS: &[&str] = &["com", "org", "io", "dev", "net"];

/// Builds the `/`, `/docs`, ..., `/search?q=<query>` template set for one
/// seed domain (§4.4 step 3).
pub fn seed_templates(domain: &str, query: &str) -> Vec<Url> {
    let mut urls = Vec::with_capacity(SEED_PATHS.len() + 1);
    for path in SEED_PATHS {
        if let Ok(url) = Url::parse(&format!("https://{domain}{path}")) {
            urls.push(url);
        }
    }
    let encoded_query: String = utf8_percent_encode(query, NON_ALPHANUMERIC).to_string();
    if let Ok(url) = Url::parse(&format!("https://{domain}/search?q={encoded_query}")) {
        urls.push(url);
    }
    urls
}

/// Builds `https://<keyword>.<tld>` / `docs.<keyword>.<tld>` guesses plus
/// the readthedocs/github.io/gitbook variants (§4.4 step 3).
pub fn heuristic_guesses(keyword: &str) -> Vec<Url> {
    let mut urls = Vec::with_capacity(HEURISTIC_TLDS.len() * 2 + 3);

    for tld in HEURISTIC_TLDS {
        if let Ok(url) = Url::parse(&format!("https://{keyword}.{tld}")) {
            urls.push(url);
        }
        if let Ok(url) = Url::parse(&format!("https://docs.{keyword}.{tld}")) {
            urls.push(url);
        }
    }

    for suffix in ["readthedocs.io", "github.io", "gitbook.io"] {
        if let Ok(url) = Url::parse(&format!("https://{keyword}.{suffix}")) {
            urls.push(url);
        }
    }

    urls
}

/// Heuristic `value_prior` for a candidate with no explicit override,
/// based on path tokens (§4.4 step 4). Docs-like paths score highest,
/// blog/api paths moderately, everything else gets a low baseline.
pub fn value_prior_from_path(path: &str) -> f64 {
    let lower = path.to_lowercase();
    let has = |needle: &str| lower.contains(needle);

    if has("documentation") || has("/docs") || has("docs.") {
        0.9
    } else if has("guide") || has("handbook") {
        0.8
    } else if has("api") {
        0.6
    } else if has("blog") {
        0.5
    } else {
        0.3
    }
}

/// Heuristic `freshness_hint` combining path signals with the candidate's
/// source (§4.4 step 4).
pub fn freshness_hint(url: &Url) -> f64 {
    let path = url.path().to_lowercase();
    if path.contains("sitemap") {
        1.0
    } else if path.contains("feed") || path.contains("rss") {
        0.9
    } else if path.contains("blog") || path.contains("news") {
        0.6
    } else {
        0.1
    }
}

/// Source-aware floor applied on top of [`freshness_hint`]: a bare
/// seed-domain candidate with no distinguishing path still carries the
/// spec's 0.2 "seed" baseline rather than falling to 0.1.
pub fn freshness_hint_for(url: &Url, source: Source) -> f64 {
    let path_hint = freshness_hint(url);
    if matches!(source, Source::Seed) && path_hint <= 0.1 {
        0.2
    } else {
        path_hint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_templates_cover_spec_paths() {
        let urls = seed_templates("example.com", "rust async");
        let paths: Vec<String> = urls.iter().map(|u| u.path().to_string()).collect();
        assert!(paths.contains(&"/docs".to_string()));
        assert!(paths.contains(&"/search".to_string()));
        assert!(urls.iter().any(|u| u.query() == Some("q=rust%20async")));
    }

    #[test]
    fn heuristic_guesses_cover_tlds_and_hosting() {
        let urls = heuristic_guesses("tokio");
        let hosts: Vec<String> = urls.iter().filter_map(|u| u.host_str().map(str::to_string)).collect();
        assert!(hosts.contains(&"tokio.com".to_string()));
        assert!(hosts.contains(&"docs.tokio.io".to_string()));
        assert!(hosts.contains(&"tokio.readthedocs.io".to_string()));
        assert!(hosts.contains(&"tokio.github.io".to_string()));
    }

    #[test]
    fn value_prior_prefers_docs_paths() {
        assert_eq!(value_prior_from_path("/documentation/intro"), 0.9);
        assert_eq!(value_prior_from_path("/blog/post-1"), 0.5);
        assert_eq!(value_prior_from_path("/"), 0.3);
    }

    #[test]
    fn freshness_prefers_sitemap_then_feed_then_blog() {
        let sitemap = Url::parse("https://example.com/sitemap.xml").unwrap();
        let feed = Url::parse("https://example.com/feed.xml").unwrap();
        let blog = Url::parse("https://example.com/blog/post").unwrap();
        let other = Url::parse("https://example.com/about").unwrap();

        assert_eq!(freshness_hint(&sitemap), 1.0);
        assert_eq!(freshness_hint(&feed), 0.9);
        assert_eq!(freshness_hint(&blog), 0.6);
        assert_eq!(freshness_hint(&other), 0.1);
    }

    #[test]
    fn seed_source_floors_at_point_two() {
        let root = Url::parse("https://example.com/").unwrap();
        assert_eq!(freshness_hint_for(&root, Source::Seed), 0.2);
        assert_eq!(freshness_hint_for(&root, Source::Heuristic), 0.1);
    }
}
