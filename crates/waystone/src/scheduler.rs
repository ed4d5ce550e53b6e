//! Periodic background jobs (C11, spec.md §4.9).
//!
//! Grounded in `original_source/src/core/main.py`'s `schedule` library
//! wiring (`every(10).minutes.do(...)`, `run_pending()` polled every
//! second). Rust has no direct equivalent of `schedule` in the example
//! pack, so each job tracks its own last-run `Instant` and the main loop
//! polls once a second, which reproduces the same "check every job, run
//! whichever is due" behavior without pulling in a cron-expression crate
//! the corpus never reaches for.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{error, info, warn};

use waystone_crawler::{run_crawl, CrawlConfig, OverlayTransport};
use waystone_graph::{run_and_persist, PageRankConfig};
use waystone_index::Index;
use waystone_store::{mark_stale_nodes_removed, upsert_node, Store};
use waystone_survival::recalc_node_survival_params;

use crate::option::Opt;

const TICK: Duration = Duration::from_secs(1);
const REANNOUNCE_EVERY: Duration = Duration::from_secs(10 * 60);
const CRAWL_EVERY: Duration = Duration::from_secs(60 * 60);
const PAGERANK_EVERY: Duration = Duration::from_secs(6 * 60 * 60);
const STALE_REMOVAL_EVERY: Duration = Duration::from_secs(24 * 60 * 60);
const RSS_LOG_EVERY: Duration = Duration::from_secs(5 * 60);
/// Not part of the original `main.py` schedule (see DESIGN.md): paired
/// with stale-node removal on a daily cadence since both jobs read the
/// whole node set once and a node whose announce history just fell stale
/// should get a fresh posterior the same day it's evaluated for removal.
const SURVIVAL_REFIT_EVERY: Duration = Duration::from_secs(24 * 60 * 60);
const SURVIVAL_LOOKBACK_DAYS: u32 = 30;

fn unix_now() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

struct Job {
    name: &'static str,
    interval: Duration,
    last_run: Instant,
}

impl Job {
    fn new(name: &'static str, interval: Duration) -> Self {
        // Fire on the first tick rather than waiting a full interval after startup.
        Job { name, interval, last_run: Instant::now() - interval }
    }

    fn due(&self, now: Instant) -> bool {
        now.duration_since(self.last_run) >= self.interval
    }
}

pub struct Scheduler<T: OverlayTransport + 'static> {
    store: Arc<Store>,
    index: Arc<Mutex<Index>>,
    transport: Arc<T>,
    opt: Opt,
    self_dst: String,
    self_identity: String,
    crawl_in_progress: Arc<AtomicBool>,
}

impl<T: OverlayTransport + 'static> Scheduler<T> {
    pub fn new(
        store: Arc<Store>,
        index: Arc<Mutex<Index>>,
        transport: Arc<T>,
        opt: Opt,
        self_dst: String,
        self_identity: String,
    ) -> Self {
        Scheduler {
            store,
            index,
            transport,
            opt,
            self_dst,
            self_identity,
            crawl_in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs the scheduler loop forever. Never returns under normal
    /// operation; intended to be the last call in `main`.
    pub fn run(&self) -> ! {
        let mut jobs = [
            Job::new("reannounce", REANNOUNCE_EVERY),
            Job::new("crawl", CRAWL_EVERY),
            Job::new("pagerank", PAGERANK_EVERY),
            Job::new("stale_removal", STALE_REMOVAL_EVERY),
            Job::new("rss_log", RSS_LOG_EVERY),
            Job::new("survival_refit", SURVIVAL_REFIT_EVERY),
        ];

        loop {
            let now = Instant::now();
            for job in &mut jobs {
                if job.due(now) {
                    job.last_run = now;
                    self.dispatch(job.name);
                }
            }
            std::thread::sleep(TICK);
        }
    }

    fn dispatch(&self, job: &str) {
        match job {
            "reannounce" => self.reannounce_self(),
            "crawl" => self.start_crawl(),
            "pagerank" => self.run_pagerank(),
            "stale_removal" => self.remove_stale_nodes(),
            "rss_log" => self.log_rss_usage(),
            "survival_refit" => self.refit_survival_params(),
            _ => unreachable!("unknown job {job}"),
        }
    }

    /// Refreshes this node's own row. Broadcasting the announce itself is
    /// the overlay transport library's job (out of scope, spec.md §1);
    /// this only keeps our own bookkeeping current between broadcasts.
    fn reannounce_self(&self) {
        let now = unix_now();
        if let Err(e) =
            upsert_node(&self.store, &self.self_dst, &self.self_identity, &self.opt.announce_name, now)
        {
            error!(error = %e, "failed to refresh self node row");
        }
    }

    fn start_crawl(&self) {
        if self.crawl_in_progress.swap(true, Ordering::SeqCst) {
            warn!("crawl already in progress, skipping this cycle");
            return;
        }
        info!("starting crawl");
        let store = Arc::clone(&self.store);
        let index = Arc::clone(&self.index);
        let transport = Arc::clone(&self.transport);
        let config = CrawlConfig {
            threads: self.opt.crawler_threads,
            queue_maxsize: self.opt.crawler_queue_maxsize,
            visited_cache_seconds: self.opt.crawler_visited_cache_seconds,
        };
        let in_progress = Arc::clone(&self.crawl_in_progress);
        let now = unix_now();
        std::thread::spawn(move || {
            match run_crawl(transport, store, index, config, now) {
                Ok(visited) => info!(visited, "crawl cycle finished"),
                Err(e) => error!(error = %e, "crawl cycle failed"),
            }
            in_progress.store(false, Ordering::SeqCst);
        });
    }

    fn run_pagerank(&self) {
        info!("running pagerank");
        if let Err(e) = run_and_persist(&self.store, PageRankConfig::default()) {
            error!(error = %e, "pagerank run failed");
        }
    }

    fn remove_stale_nodes(&self) {
        let now = unix_now();
        let max_age = self.opt.node_remove_after_seconds();
        match mark_stale_nodes_removed(&self.store, now, max_age) {
            Ok(removed) if !removed.is_empty() => {
                info!(count = removed.len(), "marked stale nodes removed");
                let addresses = removed.into_iter().collect();
                self.index.lock().unwrap().delete_by_address(&addresses);
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "stale node removal failed"),
        }
    }

    fn log_rss_usage(&self) {
        match crate::rss::process_rss_bytes() {
            Some(bytes) => info!(rss_bytes = bytes, "process memory usage"),
            None => warn!("process RSS not available on this platform"),
        }
    }

    fn refit_survival_params(&self) {
        let now = unix_now();
        match recalc_node_survival_params(&self.store, &self.opt.announce_log_dir(), SURVIVAL_LOOKBACK_DAYS, now) {
            Ok(updated) => info!(updated, "refit node survival parameters"),
            Err(e) => error!(error = %e, "survival refit failed"),
        }
    }
}
