//! Documents as they flow into and out of the full-text index.
//!
//! Mirrors `SearchDocument`/`SearchResult` in
//! `original_source/src/core/search/models.py`.

use crate::address::Address;
use serde::{Deserialize, Serialize};

/// A page ready to be indexed (or re-indexed, by `url`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub url: String,
    pub text: String,
    pub owner: String,
    pub address: Address,
    pub node_name: Option<String>,
}

/// A single ranked/highlighted search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub text: String,
    pub owner: String,
    pub address: Address,
    pub name: String,
    pub score: f64,
    /// Populated by the re-ranker (C10); `None` before reranking.
    pub p_dead_low: Option<f64>,
    pub p_dead_high: Option<f64>,
    /// The owning node's `last_seen`, also filled in by the re-ranker.
    pub last_seen: Option<f64>,
}

impl SearchResult {
    pub fn new(url: String, text: String, owner: String, address: Address, name: String, score: f64) -> Self {
        SearchResult {
            url,
            text,
            owner,
            address,
            name,
            score,
            p_dead_low: None,
            p_dead_high: None,
            last_seen: None,
        }
    }
}
