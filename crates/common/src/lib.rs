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

//! Shared configuration, metrics and logging glue used by every `seeker-*`
//! crate. Mirrors the split between `crates/config` (environment knobs) and
//! `crates/core/src/metrics.rs` (process counters), but collapsed into a
//! single small crate since this project has no distributed coordination
//! layer to keep them apart for.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod time;

pub use config::CoreConfig;
pub use metrics::Metrics;
