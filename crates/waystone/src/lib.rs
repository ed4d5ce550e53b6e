//! Process wiring for the Waystone discovery-and-search engine: config
//! parsing, logging setup, announce ingestion, the page-request `Engine`,
//! and the periodic job scheduler. `main.rs` is a thin binary entry point
//! over this crate, the way `meilisearch-http`'s `main.rs` is a thin
//! wrapper over `meilisearch::{..., run_http}`.

pub mod announce;
pub mod engine;
pub mod logging;
pub mod option;
pub mod rss;
pub mod scheduler;
pub mod transport;
