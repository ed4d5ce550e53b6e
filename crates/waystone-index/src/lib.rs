//! Full-text indexing and querying over crawled pages (spec.md C7).
//!
//! Grounded in `original_source/src/core/search/search_engine.py`'s
//! `SearchEngine`, with `whoosh`'s on-disk inverted index replaced by an
//! in-process one (see `index.rs` for why) and tokenization delegated to
//! the teacher's own `charabia` dependency.

mod bm25;
mod cache;
mod highlight;
mod index;
mod schema;
mod snapshot;
mod tokenizer;

pub use cache::QueryCache;
pub use index::Index;
pub use schema::Field;
