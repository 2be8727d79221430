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

//! The `Candidate` type produced by [`crate::build_frontier`] (§3 data
//! model).

use serde::{Deserialize, Serialize};
use url::Url;

/// Provenance of a candidate URL. Scoring weights follow §4.4 step 4;
/// `Sitemap` and `Registry` are spec expansions (the distilled spec names
/// them in the `Candidate` enum but only fixes weights for llm/seed/
/// heuristic) slotted between seed and heuristic trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Seed,
    Llm,
    Heuristic,
    Sitemap,
    Registry,
}

impl Source {
    pub fn weight(self) -> f64 {
        match self {
            Source::Llm => 1.3,
            Source::Sitemap => 1.1,
            Source::Seed => 1.0,
            Source::Registry => 0.9,
            Source::Heuristic => 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub url: Url,
    pub source: Source,
    pub weight: f64,
    pub value_prior: f64,
    pub freshness_hint: f64,
    pub host_authority: f64,
    pub priority: f64,
}
