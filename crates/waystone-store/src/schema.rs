//! Table definitions and light migrations.
//!
//! Grounded in the SQLAlchemy models of `original_source/src/core/data/models.py`
//! and the `init_db`/`_migrate_crawl_visited_urls_schema` functions of
//! `original_source/src/core/data/db.py`, translated to plain `CREATE TABLE`
//! statements since this workspace has no ORM.

use rusqlite::{Connection, Result as SqliteResult};

const CREATE_NODES: &str = "
CREATE TABLE IF NOT EXISTS nodes (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    dst         TEXT NOT NULL UNIQUE,
    identity    TEXT NOT NULL,
    name        TEXT NOT NULL,
    last_seen   REAL NOT NULL,
    created_at  REAL NOT NULL,
    updated_at  REAL NOT NULL,
    rank        REAL NOT NULL DEFAULT 0,
    removed     INTEGER NOT NULL DEFAULT 0,
    announce_alpha  REAL NOT NULL DEFAULT 1.0,
    announce_beta   REAL NOT NULL DEFAULT 1800.0,
    announce_window_seconds REAL NOT NULL DEFAULT 0,
    announce_k_events INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_nodes_identity ON nodes(identity);
CREATE INDEX IF NOT EXISTS idx_nodes_time ON nodes(last_seen);
";

const CREATE_PEERS: &str = "
CREATE TABLE IF NOT EXISTS peers (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    dst         TEXT NOT NULL UNIQUE,
    identity    TEXT NOT NULL,
    name        TEXT NOT NULL,
    last_seen   REAL NOT NULL,
    created_at  REAL NOT NULL,
    updated_at  REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_peers_identity ON peers(identity);
CREATE INDEX IF NOT EXISTS idx_peers_time ON peers(last_seen);
";

const CREATE_CITATIONS: &str = "
CREATE TABLE IF NOT EXISTS citations (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    target_address  TEXT NOT NULL,
    src_address     TEXT NOT NULL,
    removed         INTEGER NOT NULL DEFAULT 0,
    created_at      REAL NOT NULL,
    UNIQUE(target_address, src_address)
);
CREATE INDEX IF NOT EXISTS idx_citations_target ON citations(target_address);
CREATE INDEX IF NOT EXISTS idx_citations_src ON citations(src_address);
";

const CREATE_VISITED: &str = "
CREATE TABLE IF NOT EXISTS crawl_visited_urls (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    url               TEXT NOT NULL UNIQUE,
    created_at        REAL NOT NULL,
    last_visited_at   REAL NOT NULL
);
";

const CREATE_SEARCH_QUERIES: &str = "
CREATE TABLE IF NOT EXISTS search_queries (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    query       TEXT NOT NULL,
    created_at  REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_search_queries_created ON search_queries(created_at);
";

const CREATE_USER_SEARCH_HISTORY: &str = "
CREATE TABLE IF NOT EXISTS user_search_history (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_identity   TEXT NOT NULL,
    query             TEXT NOT NULL,
    time              REAL NOT NULL,
    created_at        REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_user_search_history_identity ON user_search_history(remote_identity);
CREATE INDEX IF NOT EXISTS idx_user_search_history_identity_time ON user_search_history(remote_identity, time);
";

/// Creates every table/index if missing, then runs light forward-only
/// migrations for columns added after the initial release.
pub fn init(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(CREATE_NODES)?;
    conn.execute_batch(CREATE_PEERS)?;
    conn.execute_batch(CREATE_CITATIONS)?;
    conn.execute_batch(CREATE_VISITED)?;
    conn.execute_batch(CREATE_SEARCH_QUERIES)?;
    conn.execute_batch(CREATE_USER_SEARCH_HISTORY)?;
    migrate_visited_urls_last_visited_at(conn)?;
    Ok(())
}

/// Matches `_migrate_crawl_visited_urls_schema` in `original_source`: backfills
/// `last_visited_at` from `created_at` for databases created before the
/// column existed. A no-op on a freshly created table (the column is
/// already present via `CREATE_VISITED` above), kept for databases upgraded
/// from an older on-disk layout.
fn migrate_visited_urls_last_visited_at(conn: &Connection) -> SqliteResult<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(crawl_visited_urls)")?;
    let columns: Vec<String> =
        stmt.query_map([], |row| row.get::<_, String>(1))?.collect::<Result<_, _>>()?;
    if columns.iter().any(|c| c == "last_visited_at") {
        return Ok(());
    }
    conn.execute_batch(
        "ALTER TABLE crawl_visited_urls ADD COLUMN last_visited_at REAL;
         UPDATE crawl_visited_urls SET last_visited_at = created_at WHERE last_visited_at IS NULL;",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();
        init(&conn).unwrap();
    }
}
