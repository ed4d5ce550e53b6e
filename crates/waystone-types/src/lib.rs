//! Shared data model for the Waystone discovery-and-search engine.
//!
//! This crate has no I/O of its own: it only defines the record shapes that
//! `waystone-store`, `waystone-index`, `waystone-graph` and friends pass
//! around, plus the error taxonomy every other crate reports through.

pub mod address;
pub mod document;
pub mod error;
pub mod node;

pub use address::{address_of, encode_hex, is_valid_address, Address};
pub use document::{SearchDocument, SearchResult};
pub use error::{Error, Result};
pub use node::{Citation, Node, Peer, SearchHistoryEntry, SearchQueryLogEntry, VisitedUrl};
