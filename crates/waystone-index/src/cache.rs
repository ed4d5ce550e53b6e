//! A tiny TTL'd LRU query-result cache.
//!
//! Grounded in `original_source/src/core/search/search_engine.py`'s
//! `OrderedDict`-based `_query_cache` (300s TTL, 200-entry cap, move-to-end
//! on both read and write, evict-from-front when over capacity).

use std::collections::{HashMap, VecDeque};

use waystone_types::SearchResult;

pub struct QueryCache {
    entries: HashMap<String, (f64, Vec<SearchResult>)>,
    order: VecDeque<String>,
    ttl_seconds: f64,
    max_entries: usize,
}

impl QueryCache {
    pub fn new(ttl_seconds: f64, max_entries: usize) -> Self {
        QueryCache { entries: HashMap::new(), order: VecDeque::new(), ttl_seconds, max_entries }
    }

    pub fn get(&mut self, key: &str, now: f64) -> Option<Vec<SearchResult>> {
        let (expires_at, results) = self.entries.get(key)?;
        if *expires_at <= now {
            self.entries.remove(key);
            self.order.retain(|k| k != key);
            return None;
        }
        let results = results.clone();
        self.touch(key);
        Some(results)
    }

    pub fn set(&mut self, key: &str, results: Vec<SearchResult>, now: f64) {
        self.entries.insert(key.to_string(), (now + self.ttl_seconds, results));
        self.touch(key);
        while self.order.len() > self.max_entries {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn touch(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.to_string());
    }
}
