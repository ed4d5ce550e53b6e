//! Append-only search query log and per-user search history.
//!
//! Grounded in `original_source/src/core/data/user_search_history.py`.

use rusqlite::params;
use waystone_types::{Result, SearchHistoryEntry};

use crate::store::{map_sqlite_err, Store};

/// Logs a query for aggregate popularity/analytics purposes, independent of
/// who asked it.
pub fn record_search_query(store: &Store, query_text: &str, now: f64) -> Result<()> {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO search_queries (query, created_at) VALUES (?1, ?2)",
        params![query_text, now],
    )
    .map_err(map_sqlite_err)?;
    Ok(())
}

/// Logs a query against a specific remote identity, for that identity's
/// personal search history. Only called when the requester is identified
/// (spec.md's `NotIdentified` error covers the alternative).
pub fn record_search_history(
    store: &Store,
    remote_identity: &str,
    query: &str,
    now: f64,
) -> Result<()> {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO user_search_history (remote_identity, query, time, created_at)
         VALUES (?1, ?2, ?3, ?3)",
        params![remote_identity, query, now],
    )
    .map_err(map_sqlite_err)?;
    Ok(())
}

/// Most recent `limit` history entries for `remote_identity`, newest first.
pub fn recent_history(
    store: &Store,
    remote_identity: &str,
    limit: u32,
) -> Result<Vec<SearchHistoryEntry>> {
    let conn = store.conn.lock().unwrap();
    let mut stmt = conn
        .prepare(
            "SELECT remote_identity, query, time, created_at FROM user_search_history
             WHERE remote_identity = ?1 ORDER BY time DESC LIMIT ?2",
        )
        .map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map(params![remote_identity, limit], |row| {
            Ok(SearchHistoryEntry {
                remote_identity: row.get(0)?,
                query: row.get(1)?,
                time: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .map_err(map_sqlite_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sqlite_err)?;
    Ok(rows)
}

/// Total number of history entries for `remote_identity`, for the
/// page-request interface's history count method.
pub fn history_count(store: &Store, remote_identity: &str) -> Result<u32> {
    let conn = store.conn.lock().unwrap();
    conn.query_row(
        "SELECT COUNT(*) FROM user_search_history WHERE remote_identity = ?1",
        params![remote_identity],
        |row| row.get(0),
    )
    .map_err(map_sqlite_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn records_and_reads_back_history_newest_first() {
        let store = Store::open_in_memory().unwrap();
        record_search_history(&store, "idA", "first query", 1.0).unwrap();
        record_search_history(&store, "idA", "second query", 2.0).unwrap();
        record_search_history(&store, "idB", "other user", 1.5).unwrap();

        let history = recent_history(&store, "idA", 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].query, "second query");
        assert_eq!(history[1].query, "first query");
    }

    #[test]
    fn history_respects_limit() {
        let store = Store::open_in_memory().unwrap();
        for i in 0..5 {
            record_search_history(&store, "idA", &format!("q{i}"), i as f64).unwrap();
        }
        let history = recent_history(&store, "idA", 2).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn search_query_log_accepts_anonymous_queries() {
        let store = Store::open_in_memory().unwrap();
        record_search_query(&store, "anonymous query", 1.0).unwrap();
    }
}
