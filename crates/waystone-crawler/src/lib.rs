//! Crawl worker pool, overlay fetcher boundary and crawl-cycle orchestration
//! (spec.md C4/C5).
//!
//! Grounded in `original_source/src/core/crawler/crawler.py` (the pool),
//! `original_source/src/core/crawler/rns_request.py` (the fetcher, modeled
//! as the [`OverlayTransport`] trait) and `original_source/src/core/crawl.py`
//! (load/extract wiring and the top-level `crawl()` cycle).

mod pipeline;
mod pool;
mod transport;

pub use pipeline::{extract, load, run_crawl, CrawlConfig, FetchedDocument};
pub use pool::Crawler;
pub use transport::{FetchResponse, OverlayTransport, FETCH_TIMEOUT};
