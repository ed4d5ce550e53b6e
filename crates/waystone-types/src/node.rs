//! Node, peer, citation and history record shapes.
//!
//! These mirror the SQLAlchemy models in
//! `original_source/src/core/data/models.py`, minus the bracketed
//! `destination` presentation column (an RNS-library display artifact, not
//! part of the address model).

use crate::address::Address;
use serde::{Deserialize, Serialize};

/// Posterior parameters for the Gamma-prior announce-rate model (see
/// `waystone-survival`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnouncePosterior {
    pub alpha: f64,
    pub beta: f64,
    pub window_seconds: f64,
    pub k_events: i64,
}

impl Default for AnnouncePosterior {
    /// Matches `PRIOR_ANNOUNCE = (1.0, 60 * 30)` from
    /// `original_source/src/core/search/nodes_downtime.py`: one announce
    /// expected every 30 minutes, before any evidence is observed.
    fn default() -> Self {
        AnnouncePosterior { alpha: 1.0, beta: 1800.0, window_seconds: 0.0, k_events: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub dst: Address,
    pub identity: String,
    pub name: String,
    pub last_seen: f64,
    pub created_at: f64,
    pub updated_at: f64,
    pub rank: f64,
    pub removed: bool,
    pub posterior: AnnouncePosterior,
}

impl Node {
    pub fn new(dst: Address, identity: String, name: String, ts: f64) -> Self {
        Node {
            dst,
            identity,
            name,
            last_seen: ts,
            created_at: ts,
            updated_at: ts,
            rank: 0.0,
            removed: false,
            posterior: AnnouncePosterior::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    pub dst: Address,
    pub identity: String,
    pub name: String,
    pub last_seen: f64,
    pub created_at: f64,
    pub updated_at: f64,
}

impl Peer {
    pub fn new(dst: Address, identity: String, name: String, ts: f64) -> Self {
        Peer { dst, identity, name, last_seen: ts, created_at: ts, updated_at: ts }
    }
}

/// A directed citation edge `(src_address -> target_address)` with
/// soft-delete semantics; unique on `(target, src)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub src_address: Address,
    pub target_address: Address,
    pub removed: bool,
    pub created_at: f64,
}

/// A row of the visited-URL cache: `(url, created_at, last_visited_at)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitedUrl {
    pub url: String,
    pub created_at: f64,
    pub last_visited_at: f64,
}

/// Append-only search query log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQueryLogEntry {
    pub query_text: String,
    pub created_at: f64,
}

/// Append-only per-user search history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub remote_identity: String,
    pub query: String,
    pub time: f64,
    pub created_at: f64,
}
