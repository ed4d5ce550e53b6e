//! Citation graph maintenance (C6: diff-apply on crawl) and PageRank
//! (C8: power iteration over active citation edges).
//!
//! Grounded in `original_source/src/core/data/citations.py` and
//! `original_source/src/core/search/pagerank.py`. The teacher's
//! `index-scheduler` crate contributes the batching/progress-reporting
//! idiom for the long-running rank computation (`IndexScheduler::tick`
//! style loops with periodic yields), since `meilisearch` itself has no
//! graph-ranking component.

mod citations;
mod pagerank;

pub use citations::update_citations;
pub use pagerank::{pagerank, run_and_persist, PageRankConfig};
