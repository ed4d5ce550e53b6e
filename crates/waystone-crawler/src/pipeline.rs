//! Load/extract wiring and top-level crawl orchestration.
//!
//! Grounded in `original_source/src/core/crawl.py`: `load` filters non-`.mu`
//! URLs before ever touching the transport; `extract` decodes the response,
//! strips markup, queues the document, extracts links and diffs citations;
//! `crawl` seeds the queue from recently-seen nodes, runs the pool to
//! completion and flushes the index writer.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use waystone_markup::{extract_links, strip_micron};
use waystone_store::{node_name_by_address, recent_node_addresses_for_crawl, Store};
use waystone_types::{address::address_of, Result, SearchDocument};

use crate::pool::Crawler;
use crate::transport::{FetchResponse, OverlayTransport, FETCH_TIMEOUT};

/// A fetched response paired with the URL it was fetched for, the unit of
/// work the crawler pool moves between `load` and `extract`.
pub struct FetchedDocument {
    pub url: String,
    pub response: FetchResponse,
}

/// `load(url)`: a cheap `.mu` filter, then a single blocking transport call.
/// Any fetch failure (timeout or otherwise) is logged and dropped, matching
/// the original's silent-drop-on-exception behavior.
pub fn load(transport: &dyn OverlayTransport, url: &str) -> Option<FetchedDocument> {
    if !url.contains(".mu") {
        debug!(url, "skipping non-page url");
        return None;
    }
    match transport.request(url, None, FETCH_TIMEOUT) {
        Ok(response) => Some(FetchedDocument { url: url.to_string(), response }),
        Err(e) => {
            debug!(url, error = %e, "fetch failed, dropping");
            None
        }
    }
}

/// `extract(doc)`: decode, strip markup, queue the document, diff citations,
/// and return every link (internal + external) for the pool to enqueue.
pub fn extract(doc: FetchedDocument, index: &Mutex<waystone_index::Index>, store: &Store, now: f64) -> Vec<String> {
    let FetchedDocument { url, response } = doc;
    let text = match String::from_utf8(response.body) {
        Ok(t) => t,
        Err(_) => {
            debug!(url, "response body was not valid utf-8, dropping");
            return Vec::new();
        }
    };

    let address = address_of(&url);
    let node_name = match node_name_by_address(store, &address) {
        Ok(name) => name,
        Err(e) => {
            warn!(address, error = %e, "node name lookup failed");
            None
        }
    };

    let doc = SearchDocument {
        url: url.clone(),
        text: strip_micron(&text),
        owner: response.remote_identity,
        address: address.clone(),
        node_name,
    };
    index.lock().unwrap().queue_document(doc);

    // Link extraction runs on the raw body, not the stripped text: stripping
    // drops every back-tick (strip.rs's final pass), and the link regex
    // requires a leading back-tick, so stripped text never matches.
    let (internal, external) = extract_links(&address, &text);
    if let Err(e) = waystone_graph::update_citations(store, &url, &external, now) {
        warn!(url, error = %e, "failed to update citations");
    }

    debug!(url, internal = internal.len(), external = external.len(), "extracted links");

    let mut links = internal;
    links.extend(external);
    links
}

/// Parameters for a single crawl cycle (spec.md §4.9's crawl-window/thread
/// count/queue-size knobs, sourced from env config by the surrounding
/// binary).
#[derive(Debug, Clone, Copy)]
pub struct CrawlConfig {
    pub threads: usize,
    pub queue_maxsize: usize,
    pub visited_cache_seconds: f64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        CrawlConfig { threads: 5, queue_maxsize: 5000, visited_cache_seconds: 86_400.0 }
    }
}

/// Runs one full crawl cycle: seed the queue with `<dst>:/page/index.mu`
/// for every node seen within the visited-cache window, drive the worker
/// pool to completion, then flush the index writer's queue.
pub fn run_crawl<T>(
    transport: Arc<T>,
    store: Arc<Store>,
    index: Arc<Mutex<waystone_index::Index>>,
    config: CrawlConfig,
    now: f64,
) -> Result<usize>
where
    T: OverlayTransport + 'static,
{
    let seeds = recent_node_addresses_for_crawl(&store, now, config.visited_cache_seconds)?;
    if seeds.is_empty() {
        warn!("no known nodes to crawl");
        return Ok(0);
    }

    let load_transport = Arc::clone(&transport);
    let load_fn = move |url: &str| load(load_transport.as_ref(), url);

    let extract_store = Arc::clone(&store);
    let extract_index = Arc::clone(&index);
    let extract_fn = move |doc: FetchedDocument| extract(doc, extract_index.as_ref(), &extract_store, now);

    let mut crawler =
        Crawler::new(Arc::clone(&store), config.queue_maxsize, config.visited_cache_seconds, load_fn, extract_fn);

    let seed_count = seeds.len();
    for dst in seeds {
        crawler.add_url(format!("{dst}:/page/index.mu"), now)?;
    }
    debug!(seed_count, "enqueued seed urls");

    crawler.start(config.threads);
    let total = crawler.join();

    index.lock().unwrap().flush_index_queue(true);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct FakeTransport {
        pages: StdMutex<std::collections::HashMap<String, String>>,
    }

    impl OverlayTransport for FakeTransport {
        fn request(
            &self,
            url: &str,
            _data: Option<&[(String, String)]>,
            _timeout: Duration,
        ) -> Result<FetchResponse> {
            let pages = self.pages.lock().unwrap();
            match pages.get(url) {
                Some(body) => {
                    Ok(FetchResponse { remote_identity: "owner1".to_string(), body: body.clone().into_bytes() })
                }
                None => Err(waystone_types::Error::Transient(format!("no such page {url}"))),
            }
        }
    }

    #[test]
    fn load_skips_non_page_urls() {
        let transport = FakeTransport { pages: StdMutex::new(Default::default()) };
        assert!(load(&transport, "aaaa:/not-a-page").is_none());
    }

    #[test]
    fn load_drops_on_fetch_failure() {
        let transport = FakeTransport { pages: StdMutex::new(Default::default()) };
        assert!(load(&transport, "aaaa:/page/index.mu").is_none());
    }

    #[test]
    fn extract_queues_document_and_returns_links() {
        let addr = "a".repeat(32);
        let target = "b".repeat(32);
        let store = Store::open_in_memory().unwrap();
        let index = Mutex::new(waystone_index::Index::new());

        let body = format!("Hello `[:/page/about.mu] and `[{target}:/page/index.mu]");
        let doc = FetchedDocument {
            url: format!("{addr}:/page/index.mu"),
            response: FetchResponse { remote_identity: "owner1".to_string(), body: body.into_bytes() },
        };
        let links = extract(doc, &index, &store, 0.0);
        assert_eq!(links.len(), 2);
        assert_eq!(index.lock().unwrap().get_index_size(), 0); // queued, not yet flushed
    }

    #[test]
    fn run_crawl_seeds_from_recent_nodes_and_flushes_index() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let dst = "c".repeat(32);
        waystone_store::upsert_node(&store, &dst, "identA", "node-a", 0.0).unwrap();

        let seed_url = format!("{dst}:/page/index.mu");
        let mut pages = std::collections::HashMap::new();
        pages.insert(seed_url, "just some text, no links here".to_string());
        let transport = Arc::new(FakeTransport { pages: StdMutex::new(pages) });
        let index = Arc::new(Mutex::new(waystone_index::Index::new()));

        let total = run_crawl(transport, Arc::clone(&store), Arc::clone(&index), CrawlConfig::default(), 10.0)
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(index.lock().unwrap().get_index_size(), 1);
    }
}
