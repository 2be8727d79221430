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

//! Tantivy schema and tokenizer registration (§4.8). Follows the
//! `Stemmed`/`Normal` tokenizer split in `crates/core/src/tokenizer/fields`
//! but collapsed to the two variants this index actually needs: a plain
//! lowercasing analyzer, and the same analyzer with an English Snowball
//! stemmer appended, gated by the `stemming` config flag rather than by
//! per-document language detection.

use tantivy::schema::{Schema, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, Stemmer, TextAnalyzer};

pub const PLAIN_TOKENIZER: &str = "seeker_plain";
pub const STEMMED_TOKENIZER: &str = "seeker_stemmed";

pub struct Fields {
    pub url: tantivy::schema::Field,
    pub title: tantivy::schema::Field,
    pub h1h2: tantivy::schema::Field,
    pub body: tantivy::schema::Field,
    pub lang: tantivy::schema::Field,
}

/// Builds the schema fixed by §6: `{url (unique key), title, h1h2, body,
/// lang}`, all stored so search hits need no secondary lookup.
pub fn build_schema(stemming: bool) -> (Schema, Fields) {
    let tokenizer_name = if stemming { STEMMED_TOKENIZER } else { PLAIN_TOKENIZER };

    let text_indexing = tantivy::schema::TextFieldIndexing::default()
        .set_tokenizer(tokenizer_name)
        .set_index_option(tantivy::schema::IndexRecordOption::WithFreqsAndPositions);
    let text_options = tantivy::schema::TextOptions::default()
        .set_indexing_options(text_indexing)
        .set_stored();

    let mut builder = Schema::builder();
    let url = builder.add_text_field("url", STRING | STORED);
    let title = builder.add_text_field("title", text_options.clone());
    let h1h2 = builder.add_text_field("h1h2", text_options.clone());
    let body = builder.add_text_field("body", text_options);
    let lang = builder.add_text_field("lang", STRING | STORED);
    let schema = builder.build();

    (schema, Fields { url, title, h1h2, body, lang })
}

/// Registers both analyzer variants on `index`'s tokenizer manager so a
/// schema built with either name always resolves (§4.8, decided Open
/// Question on analyzer family).
pub fn register_tokenizers(index: &tantivy::Index) {
    let plain = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .build();
    index.tokenizers().register(PLAIN_TOKENIZER, plain);

    let stemmed = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(Stemmer::new(tantivy::tokenizer::Language::English))
        .build();
    index.tokenizers().register(STEMMED_TOKENIZER, stemmed);
}
