//! The page-request interface (spec.md §6, SPEC_FULL.md §4.11): every
//! operation the (out-of-scope) request/response framework calls into.
//!
//! Grounded in `original_source/src/core/views.py`'s route handlers, with
//! the framework's URL binding and template rendering stripped away per
//! spec.md's Non-goals — callers get a plain `Result`-returning method
//! instead of a rendered page.

use std::sync::{Arc, Mutex};

use waystone_index::{Index, QueryCache};
use waystone_store::{
    citation_count, count_nodes, find_active_node_by_address, find_owner,
    get_nodes_for_addresses, get_nodes_page, get_peers_page, history_count,
    record_search_history, record_search_query, recent_history, sources_of, Store,
};
use waystone_types::{Error, Node, Peer, Result, SearchHistoryEntry, SearchResult};

const DEFAULT_HISTORY_PAGE_SIZE: u32 = 20;

/// Matches `original_source/src/core/search/search_engine.py`'s
/// `_query_cache` knobs: 5 minutes, 200 entries.
const QUERY_CACHE_TTL_SECONDS: f64 = 300.0;
const QUERY_CACHE_MAX_ENTRIES: usize = 200;

/// Owns the store and full-text index and exposes every page-request
/// operation as an inherent method; constructed once at startup and shared
/// (via `Arc`) with the scheduler and announce handlers.
pub struct Engine {
    store: Arc<Store>,
    index: Arc<Mutex<Index>>,
    query_cache: Mutex<QueryCache>,
}

impl Engine {
    pub fn new(store: Arc<Store>, index: Arc<Mutex<Index>>) -> Self {
        let query_cache = Mutex::new(QueryCache::new(QUERY_CACHE_TTL_SECONDS, QUERY_CACHE_MAX_ENTRIES));
        Engine { store, index, query_cache }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn index(&self) -> &Arc<Mutex<Index>> {
        &self.index
    }

    pub fn get_index_size(&self) -> usize {
        self.index.lock().unwrap().get_index_size()
    }

    /// Runs a full-text query, re-ranks the candidates, logs the query for
    /// aggregate analytics, and — when `remote_identity` is `Some` — also
    /// records it to that identity's personal search history.
    ///
    /// The reranked list is cached for `QUERY_CACHE_TTL_SECONDS`: two calls
    /// for the same `q` within that window return byte-equal results and
    /// invoke the index searcher and reranker only once, since the rerank
    /// fusion (C10) depends on `now`-varying node liveness and would
    /// otherwise drift between calls.
    pub fn query(&self, q: &str, remote_identity: Option<&str>, now: f64) -> Result<Vec<SearchResult>> {
        let key = q.trim();
        if key.is_empty() {
            return Err(Error::bad_request().omit("q", "String").build());
        }

        let cached = self.query_cache.lock().unwrap().get(key, now);
        let reranked = match cached {
            Some(results) => results,
            None => {
                let hits = self.index.lock().unwrap().query(key, true)?;
                let reranked = waystone_rerank::rerank(&self.store, hits, now)?;
                self.query_cache.lock().unwrap().set(key, reranked.clone(), now);
                reranked
            }
        };

        record_search_query(&self.store, q, now)?;
        if let Some(identity) = remote_identity {
            record_search_history(&self.store, identity, q, now)?;
        }
        Ok(reranked)
    }

    pub fn count_nodes(&self) -> Result<u32> {
        count_nodes(&self.store)
    }

    pub fn get_nodes_page(&self, page: u32, page_size: u32, query: Option<&str>) -> Result<Vec<Node>> {
        get_nodes_page(&self.store, page, page_size, query)
    }

    pub fn get_peers_page(&self, page: u32, page_size: u32, query: Option<&str>) -> Result<Vec<Peer>> {
        get_peers_page(&self.store, page, page_size, query)
    }

    pub fn get_nodes_for_addresses(&self, addresses: &[String]) -> Result<Vec<Node>> {
        get_nodes_for_addresses(&self.store, addresses)
    }

    /// Active source addresses citing `address`.
    pub fn citations_of(&self, address: &str) -> Result<Vec<String>> {
        sources_of(&self.store, address)
    }

    pub fn citation_count(&self, address: &str) -> Result<usize> {
        citation_count(&self.store, address)
    }

    pub fn find_owner(&self, identity: &str) -> Result<Option<Peer>> {
        find_owner(&self.store, identity)
    }

    pub fn find_node_by_address(&self, address: &str) -> Result<Option<Node>> {
        find_active_node_by_address(&self.store, address)
    }

    pub fn add_search_query(&self, query_text: &str, now: f64) -> Result<()> {
        if query_text.trim().is_empty() {
            return Err(Error::bad_request().omit("query_text", "String").build());
        }
        record_search_query(&self.store, query_text, now)
    }

    /// Per-user history append; requires an identity, matching the
    /// original's `identifying_required=True` route decorator.
    pub fn add_history(&self, remote_identity: Option<&str>, query: &str, now: f64) -> Result<()> {
        let identity = remote_identity.ok_or(Error::NotIdentified)?;
        record_search_history(&self.store, identity, query, now)
    }

    pub fn history(
        &self,
        remote_identity: Option<&str>,
        page: u32,
        page_size: Option<u32>,
    ) -> Result<Vec<SearchHistoryEntry>> {
        let identity = remote_identity.ok_or(Error::NotIdentified)?;
        let page_size = page_size.unwrap_or(DEFAULT_HISTORY_PAGE_SIZE).max(1);
        let all = recent_history(&self.store, identity, page_size * (page + 1))?;
        let start = (page * page_size) as usize;
        Ok(all.into_iter().skip(start).take(page_size as usize).collect())
    }

    pub fn history_count(&self, remote_identity: Option<&str>) -> Result<u32> {
        let identity = remote_identity.ok_or(Error::NotIdentified)?;
        history_count(&self.store, identity)
    }
}
