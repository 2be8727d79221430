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

//! Query tokenization (§4.4 step 1).

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "were", "will", "with", "how", "what", "when",
    "where", "why", "do", "does", "i",
];

/// Lowercases, splits on non-alphanumerics, and drops stopwords -- unless
/// every token is a stopword, in which case the original tokenization is
/// kept so a query like "how to" still yields something to work with.
pub fn tokenize_query(query: &str) -> Vec<String> {
    let all: Vec<String> = query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| !tok.is_empty())
        .map(str::to_string)
        .collect();

    let filtered: Vec<String> = all
        .iter()
        .filter(|tok| !STOPWORDS.contains(&tok.as_str()))
        .cloned()
        .collect();

    if filtered.is_empty() {
        all
    } else {
        filtered
    }
}
