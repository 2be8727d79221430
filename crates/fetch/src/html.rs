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

//! Small HTML helpers shared by the fetch pipeline: outlink extraction and
//! a cheap visible-text length estimate used to decide on the dynamic
//! render fallback (§4.6 step 6). Full normalization lives downstream in
//! `seeker-normalize`; this crate only needs enough to make a same-run
//! duplicate/render decision.

use kuchiki::traits::TendrilSink;
use url::Url;

pub const MAX_OUTLINKS: usize = 100;

/// Absolute `http(s)` outlinks resolved against `base`, capped at
/// [`MAX_OUTLINKS`] (§4.6 step 5).
pub fn extract_outlinks(base: &Url, html: &str) -> Vec<String> {
    let document = kuchiki::parse_html().one(html);
    let mut outlinks = Vec::new();

    let Ok(anchors) = document.select("a") else {
        return outlinks;
    };

    for anchor in anchors {
        let attrs = anchor.attributes.borrow();
        let Some(href) = attrs.get("href") else { continue };
        if let Ok(resolved) = base.join(href) {
            if matches!(resolved.scheme(), "http" | "https") {
                outlinks.push(resolved.to_string());
            }
        }
        if outlinks.len() >= MAX_OUTLINKS {
            break;
        }
    }

    outlinks
}

/// Visible text length after stripping script/style/noscript -- the
/// dynamic-render trigger compares this against a 1500-char floor.
pub fn visible_text_len(html: &str) -> usize {
    let document = kuchiki::parse_html().one(html);
    if let Ok(matches) = document.select("script, style, noscript") {
        let nodes: Vec<_> = matches.map(|m| m.as_node().clone()).collect();
        for node in nodes {
            node.detach();
        }
    }
    document.text_contents().trim().len()
}
