//! Process configuration (spec.md §6's "Configuration (env)" table).
//!
//! Grounded in `meilisearch`'s `option.rs`: a single `clap::Parser` struct
//! with one constant per env var name and `#[clap(long, env = ...)]`
//! annotations, so the same binary reads either a flag or an environment
//! variable. Required fields have no default and `clap` rejects startup
//! if they're absent; everything else mirrors
//! `original_source/src/config/__init__.py`'s defaults.

use std::path::PathBuf;

use clap::Parser;

const STORAGE_PATH: &str = "STORAGE_PATH";
const RNS_CONFIGDIR: &str = "RNS_CONFIGDIR";
const NODE_IDENTITY_PATH: &str = "NODE_IDENTITY_PATH";
const TEMPLATES_DIR: &str = "TEMPLATES_DIR";
const LOG_PATH: &str = "LOG_PATH";
const LOG_LEVEL: &str = "LOG_LEVEL";
const ANNOUNCE_NAME: &str = "ANNOUNCE_NAME";
const CRAWLER_THREADS: &str = "CRAWLER_THREADS";
const CRAWLER_QUEUE_MAXSIZE: &str = "CRAWLER_QUEUE_MAXSIZE";
const CRAWLER_VISITED_CACHE_SECONDS: &str = "CRAWLER_VISITED_CACHE_SECONDS";
const NODE_REMOVE_AFTER_DAYS: &str = "NODE_REMOVE_AFTER_DAYS";
const TIME_FORMAT: &str = "TIME_FORMAT";

fn default_log_path() -> PathBuf {
    PathBuf::from("app.log")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_announce_name() -> String {
    "Waystone".to_string()
}

fn default_crawler_threads() -> usize {
    5
}

fn default_crawler_queue_maxsize() -> usize {
    5000
}

fn default_crawler_visited_cache_seconds() -> f64 {
    86_400.0
}

fn default_node_remove_after_days() -> u32 {
    30
}

fn default_time_format() -> String {
    "%d.%m.%Y, %H:%M:%S".to_string()
}

#[derive(Debug, Clone, Parser)]
#[clap(version, next_display_order = None)]
pub struct Opt {
    /// Directory holding the relational store and the full-text index
    /// snapshot (`STORAGE_PATH/nomadapi.db`, `STORAGE_PATH/search_index/`).
    #[clap(long, env = STORAGE_PATH)]
    pub storage_path: PathBuf,

    /// Passed through to the overlay transport library's own config
    /// loading; not read by the core itself.
    #[clap(long, env = RNS_CONFIGDIR)]
    pub rns_configdir: PathBuf,

    /// This node's own overlay identity file.
    #[clap(long, env = NODE_IDENTITY_PATH)]
    pub node_identity_path: PathBuf,

    /// Passed through to the (out-of-scope) template rendering layer.
    #[clap(long, env = TEMPLATES_DIR)]
    pub templates_dir: PathBuf,

    /// Base path for application logs; `<LOG_PATH>/announces/` holds the
    /// announce log the survival refit job reads.
    #[clap(long, env = LOG_PATH, default_value_os_t = default_log_path())]
    pub log_path: PathBuf,

    /// `tracing-subscriber` `EnvFilter` directive, e.g. `info` or
    /// `waystone_crawler=debug,info`.
    #[clap(long, env = LOG_LEVEL, default_value_t = default_log_level())]
    pub log_level: String,

    /// This node's own announced display name.
    #[clap(long, env = ANNOUNCE_NAME, default_value_t = default_announce_name())]
    pub announce_name: String,

    /// Crawl worker pool size.
    #[clap(long, env = CRAWLER_THREADS, default_value_t = default_crawler_threads())]
    pub crawler_threads: usize,

    /// Bounded crawl queue capacity.
    #[clap(long, env = CRAWLER_QUEUE_MAXSIZE, default_value_t = default_crawler_queue_maxsize())]
    pub crawler_queue_maxsize: usize,

    /// Sliding window, in seconds, within which a crawled node is
    /// considered recent enough to reseed a crawl.
    #[clap(long, env = CRAWLER_VISITED_CACHE_SECONDS, default_value_t = default_crawler_visited_cache_seconds())]
    pub crawler_visited_cache_seconds: f64,

    /// Days of silence before a node is marked removed.
    #[clap(long, env = NODE_REMOVE_AFTER_DAYS, default_value_t = default_node_remove_after_days())]
    pub node_remove_after_days: u32,

    /// `strftime`-style format used when rendering timestamps for display.
    #[clap(long, env = TIME_FORMAT, default_value_t = default_time_format())]
    pub time_format: String,
}

impl Opt {
    pub fn node_remove_after_seconds(&self) -> f64 {
        self.node_remove_after_days as f64 * 86_400.0
    }

    pub fn announce_log_dir(&self) -> PathBuf {
        self.log_path.join("announces")
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage_path.join("nomadapi.db")
    }

    pub fn search_index_dir(&self) -> PathBuf {
        self.storage_path.join("search_index")
    }
}
