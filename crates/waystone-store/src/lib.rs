//! Relational persistence for nodes, peers, citations, the crawler's
//! visited-URL cache and search history (spec.md C2/C3).
//!
//! Grounded in `original_source/src/core/data/db.py` (connection setup,
//! the `check_same_thread=False` equivalent) and the rusqlite usage in
//! `examples/other_examples/252f118d_bobisme-bones__crates-bones-cli-src-cmd-triage_support.rs.rs`.
//! The teacher (`meilisearch`) stores everything in heed/LMDB key-value maps
//! instead of a relational schema, so this crate's shape follows the
//! original Python implementation's table layout rather than the teacher's
//! storage engine; its transaction-per-write and error-propagation style is
//! still carried over.

mod citations;
mod nodes;
mod queries;
mod schema;
mod store;
mod visited;

pub use citations::{
    all_active_edges, citation_count, get_citation, rows_for_src, rows_for_target,
    soft_delete_citation, sources_of, upsert_citation, CitationRow,
};
pub use nodes::{
    active_node_addresses, count_nodes, find_active_node_by_address, find_owner, get_node,
    get_nodes_for_addresses, get_nodes_page, get_peers_page, list_stale_nodes, mark_node_removed,
    mark_stale_nodes_removed, node_name_by_address, persist_posterior, persist_ranks,
    ranking_snapshot, recent_node_addresses_for_crawl, touch_peer, upsert_node, NodeForRanking,
};
pub use queries::{history_count, recent_history, record_search_history, record_search_query};
pub use store::Store;
pub use visited::check_or_stamp_visited;
