//! Markup stripper and link parser for the overlay's `.mu` page format (C1).
//!
//! Grounded in `original_source/src/core/crawl.py` (`strip_micron`) and
//! `original_source/src/core/crawler/parser.py` (`extract_links`). The
//! regex pass order is preserved exactly, per spec.md §9's Open Question
//! about the short-form/long-form color-escape overlap.

mod links;
mod strip;

pub use links::{extract_links, parse_link_block, LinkParseError};
pub use strip::strip_micron;
