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

//! HTML -> (title, h1h2, body) extraction (§4.7). Script/style/noscript
//! nodes are detached before any text is read off the tree, mirroring the
//! fetcher's own `visible_text_len` helper but kept as a separate, simpler
//! implementation here since this crate has no render-fallback decision to
//! make -- it only needs the final extracted text.

use kuchiki::traits::TendrilSink;

fn parse_stripped(html: &str) -> kuchiki::NodeRef {
    let document = kuchiki::parse_html().one(html);
    if let Ok(matches) = document.select("script, style, noscript") {
        let nodes: Vec<_> = matches.map(|m| m.as_node().clone()).collect();
        for node in nodes {
            node.detach();
        }
    }
    document
}

pub fn extract_title(document: &kuchiki::NodeRef) -> String {
    document
        .select("title")
        .ok()
        .and_then(|mut it| it.next())
        .map(|node| node.text_contents().trim().to_string())
        .unwrap_or_default()
}

/// Concatenated, order-preserving text of every `<h1>`/`<h2>` element.
pub fn extract_h1h2(document: &kuchiki::NodeRef) -> String {
    let Ok(headings) = document.select("h1, h2") else {
        return String::new();
    };
    headings
        .map(|node| node.text_contents().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn extract_body(document: &kuchiki::NodeRef) -> String {
    document.text_contents().trim().to_string()
}

pub struct Extracted {
    pub title: String,
    pub h1h2: String,
    pub body: String,
}

/// Parses `html` once and extracts all three text fields, stripping
/// script/style/noscript first (§4.7).
pub fn extract(html: &str) -> Extracted {
    let document = parse_stripped(html);
    Extracted {
        title: extract_title(&document),
        h1h2: extract_h1h2(&document),
        body: extract_body(&document),
    }
}
