//! Crawl visited-URL cache: lets the crawler skip URLs it fetched
//! recently without re-fetching, per spec.md's `CRAWLER_VISITED_CACHE_SECONDS`.
//!
//! Grounded in `original_source/src/core/data/crawl_visited_urls.py`'s
//! `check_or_stamp_visited`, which is a single atomic check-or-insert to
//! avoid two worker threads racing on the same URL.

use rusqlite::{params, OptionalExtension};
use waystone_types::Result;

use crate::store::{map_sqlite_err, Store};

/// Returns `true` if `url` should be (re-)crawled: either never seen, or
/// last visited more than `ttl_seconds` ago. Either way, stamps the URL's
/// `last_visited_at` to `now` as part of the same locked critical section,
/// so two threads asking about the same URL concurrently can't both get
/// `true`.
pub fn check_or_stamp_visited(
    store: &Store,
    url: &str,
    now: f64,
    ttl_seconds: f64,
) -> Result<bool> {
    let conn = store.conn.lock().unwrap();
    let last_visited: Option<f64> = conn
        .query_row(
            "SELECT last_visited_at FROM crawl_visited_urls WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_sqlite_err)?;

    let should_visit = match last_visited {
        None => true,
        Some(last) => now - last >= ttl_seconds,
    };

    conn.execute(
        "INSERT INTO crawl_visited_urls (url, created_at, last_visited_at)
         VALUES (?1, ?2, ?2)
         ON CONFLICT(url) DO UPDATE SET last_visited_at = excluded.last_visited_at",
        params![url, now],
    )
    .map_err(map_sqlite_err)?;

    Ok(should_visit)
}
