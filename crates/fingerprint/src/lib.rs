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

//! URL-set membership and content-hashing primitives shared by the fetcher
//! and index writer. Both halves are pure: no I/O, no errors (§4.1).

mod bloom;
mod simhash;

pub use bloom::UrlBloom;
pub use simhash::{hamming_distance, simhash, ContentFingerprint, Hash64, SimhashTable};
