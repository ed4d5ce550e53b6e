//! Node and peer upsert/query operations (C3's persistence half; the
//! msgpack decoding and dispatch between `lxmf.delivery`/`nomadnetwork.node`
//! announces lives in the `waystone` binary crate's announce handler).
//!
//! Grounded in `original_source/src/core/data/nodes_and_peers.py`'s
//! `upsert_node`/`upsert_peer`/`get_stale_nodes` functions.

use rusqlite::{params, OptionalExtension};
use waystone_types::{AnnouncePosterior, Node, Peer, Result};

use crate::store::{map_sqlite_err, Store};

/// A node's rank and liveness posterior, the slice `waystone-graph` and
/// `waystone-survival` need without pulling a full `Node`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeForRanking {
    pub dst: String,
    pub rank: f64,
}

/// Inserts a brand-new node row, or — if `dst` is already known — refreshes
/// `identity`, `name`, `last_seen`, `updated_at` and clears `removed`
/// (an announce from a previously stale node reactivates it). Returns the
/// row as it stands after the write.
pub fn upsert_node(store: &Store, dst: &str, identity: &str, name: &str, now: f64) -> Result<Node> {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO nodes (dst, identity, name, last_seen, created_at, updated_at, rank, removed)
         VALUES (?1, ?2, ?3, ?4, ?4, ?4, 0, 0)
         ON CONFLICT(dst) DO UPDATE SET
             identity = excluded.identity,
             name = excluded.name,
             last_seen = excluded.last_seen,
             updated_at = excluded.updated_at,
             removed = 0",
        params![dst, identity, name, now],
    )
    .map_err(map_sqlite_err)?;
    get_node(store, dst)?.ok_or_else(|| {
        waystone_types::Error::Transient(format!("node {dst} missing immediately after upsert"))
    })
}

/// Same contract as [`upsert_node`] but for the `peers` table (entries seen
/// via `lxmf.delivery` announces, which carry no rank or survival model).
pub fn touch_peer(store: &Store, dst: &str, identity: &str, name: &str, now: f64) -> Result<Peer> {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO peers (dst, identity, name, last_seen, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4, ?4)
         ON CONFLICT(dst) DO UPDATE SET
             identity = excluded.identity,
             name = excluded.name,
             last_seen = excluded.last_seen,
             updated_at = excluded.updated_at",
        params![dst, identity, name, now],
    )
    .map_err(map_sqlite_err)?;
    conn.query_row(
        "SELECT dst, identity, name, last_seen, created_at, updated_at FROM peers WHERE dst = ?1",
        params![dst],
        |row| {
            Ok(Peer {
                dst: row.get(0)?,
                identity: row.get(1)?,
                name: row.get(2)?,
                last_seen: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        },
    )
    .map_err(map_sqlite_err)
}

pub fn get_node(store: &Store, dst: &str) -> Result<Option<Node>> {
    let conn = store.conn.lock().unwrap();
    conn.query_row(
        "SELECT dst, identity, name, last_seen, created_at, updated_at, rank, removed,
                announce_alpha, announce_beta, announce_window_seconds, announce_k_events
         FROM nodes WHERE dst = ?1",
        params![dst],
        row_to_node,
    )
    .optional()
    .map_err(map_sqlite_err)
}

/// Like [`get_node`] but excludes soft-deleted rows, matching the
/// `removed.is_(False)` filter every other page-request read applies (e.g.
/// [`get_nodes_for_addresses`]). Used by callers that surface a single node
/// to a page-request caller, where a stale/removed node must look absent.
pub fn find_active_node_by_address(store: &Store, dst: &str) -> Result<Option<Node>> {
    let conn = store.conn.lock().unwrap();
    conn.query_row(
        "SELECT dst, identity, name, last_seen, created_at, updated_at, rank, removed,
                announce_alpha, announce_beta, announce_window_seconds, announce_k_events
         FROM nodes WHERE dst = ?1 AND removed = 0",
        params![dst],
        row_to_node,
    )
    .optional()
    .map_err(map_sqlite_err)
}

/// Nodes whose `last_seen` is older than `now - max_age_seconds` and are not
/// already marked removed. Used by the scheduler's daily stale-removal job
/// (spec.md §5, `NODE_REMOVE_AFTER_DAYS`).
pub fn list_stale_nodes(store: &Store, now: f64, max_age_seconds: f64) -> Result<Vec<Node>> {
    let conn = store.conn.lock().unwrap();
    let cutoff = now - max_age_seconds;
    let mut stmt = conn
        .prepare(
            "SELECT dst, identity, name, last_seen, created_at, updated_at, rank, removed,
                    announce_alpha, announce_beta, announce_window_seconds, announce_k_events
             FROM nodes WHERE last_seen < ?1 AND removed = 0",
        )
        .map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map(params![cutoff], row_to_node)
        .map_err(map_sqlite_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sqlite_err)?;
    Ok(rows)
}

pub fn mark_node_removed(store: &Store, dst: &str) -> Result<()> {
    let conn = store.conn.lock().unwrap();
    conn.execute("UPDATE nodes SET removed = 1 WHERE dst = ?1", params![dst])
        .map_err(map_sqlite_err)?;
    Ok(())
}

/// Total non-removed nodes, for the page-request interface's `count_nodes`.
pub fn count_nodes(store: &Store) -> Result<u32> {
    let conn = store.conn.lock().unwrap();
    conn.query_row("SELECT COUNT(*) FROM nodes WHERE removed = 0", [], |row| row.get(0))
        .map_err(map_sqlite_err)
}

/// A page of non-removed nodes ordered like the original's
/// `order_by(desc(Node.rank), desc(Node.time))`, optionally filtered by a
/// case-insensitive substring match on `name` or `dst`.
pub fn get_nodes_page(store: &Store, page: u32, page_size: u32, query: Option<&str>) -> Result<Vec<Node>> {
    let page_size = page_size.clamp(1, 1000);
    let offset = page as i64 * page_size as i64;
    let conn = store.conn.lock().unwrap();
    let base = "SELECT dst, identity, name, last_seen, created_at, updated_at, rank, removed,
                       announce_alpha, announce_beta, announce_window_seconds, announce_k_events
                FROM nodes WHERE removed = 0";
    let rows = match query.filter(|q| !q.is_empty()) {
        Some(q) => {
            let like = format!("%{q}%");
            let sql = format!("{base} AND (name LIKE ?1 OR dst LIKE ?1) ORDER BY rank DESC, last_seen DESC LIMIT ?2 OFFSET ?3");
            let mut stmt = conn.prepare(&sql).map_err(map_sqlite_err)?;
            stmt.query_map(params![like, page_size, offset], row_to_node)
                .map_err(map_sqlite_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sqlite_err)?
        }
        None => {
            let sql = format!("{base} ORDER BY rank DESC, last_seen DESC LIMIT ?1 OFFSET ?2");
            let mut stmt = conn.prepare(&sql).map_err(map_sqlite_err)?;
            stmt.query_map(params![page_size, offset], row_to_node)
                .map_err(map_sqlite_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sqlite_err)?
        }
    };
    Ok(rows)
}

/// A page of peers ordered by `last_seen` descending, matching
/// `get_peers_page` in the original: peers carry no rank to sort by.
pub fn get_peers_page(store: &Store, page: u32, page_size: u32, query: Option<&str>) -> Result<Vec<Peer>> {
    let page_size = page_size.clamp(1, 1000);
    let offset = page as i64 * page_size as i64;
    let conn = store.conn.lock().unwrap();
    let base = "SELECT dst, identity, name, last_seen, created_at, updated_at FROM peers";
    let rows = match query.filter(|q| !q.is_empty()) {
        Some(q) => {
            let like = format!("%{q}%");
            let sql = format!("{base} WHERE name LIKE ?1 OR dst LIKE ?1 ORDER BY last_seen DESC LIMIT ?2 OFFSET ?3");
            let mut stmt = conn.prepare(&sql).map_err(map_sqlite_err)?;
            stmt.query_map(params![like, page_size, offset], row_to_peer)
                .map_err(map_sqlite_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sqlite_err)?
        }
        None => {
            let sql = format!("{base} ORDER BY last_seen DESC LIMIT ?1 OFFSET ?2");
            let mut stmt = conn.prepare(&sql).map_err(map_sqlite_err)?;
            stmt.query_map(params![page_size, offset], row_to_peer)
                .map_err(map_sqlite_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sqlite_err)?
        }
    };
    Ok(rows)
}

/// Active nodes among `addresses`, in whatever order SQLite returns them.
/// Empty input short-circuits to an empty result without touching the
/// connection, matching the original's `if not addresses: return []`.
pub fn get_nodes_for_addresses(store: &Store, addresses: &[String]) -> Result<Vec<Node>> {
    if addresses.is_empty() {
        return Ok(Vec::new());
    }
    let conn = store.conn.lock().unwrap();
    let placeholders = std::iter::repeat("?").take(addresses.len()).collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT dst, identity, name, last_seen, created_at, updated_at, rank, removed,
                announce_alpha, announce_beta, announce_window_seconds, announce_k_events
         FROM nodes WHERE removed = 0 AND dst IN ({placeholders})"
    );
    let mut stmt = conn.prepare(&sql).map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(addresses.iter()), row_to_node)
        .map_err(map_sqlite_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sqlite_err)?;
    Ok(rows)
}

/// The peer (if any) whose `identity` matches, for the page-request
/// interface's `find_owner` (`original_source/src/core/data/nods_and_peers.py::find_owner`).
pub fn find_owner(store: &Store, identity: &str) -> Result<Option<Peer>> {
    let conn = store.conn.lock().unwrap();
    conn.query_row(
        "SELECT dst, identity, name, last_seen, created_at, updated_at FROM peers WHERE identity = ?1",
        params![identity],
        row_to_peer,
    )
    .optional()
    .map_err(map_sqlite_err)
}

/// Marks every node last seen before `now - max_age_seconds` as removed and
/// cascades the removal to its citation edges (both as source and as
/// target), matching `mark_stale_nodes_removed` in the original. Returns
/// the addresses that were newly removed, so the caller can also purge
/// their documents from the full-text index.
pub fn mark_stale_nodes_removed(store: &Store, now: f64, max_age_seconds: f64) -> Result<Vec<String>> {
    let stale = list_stale_nodes(store, now, max_age_seconds)?;
    let addresses: Vec<String> = stale.into_iter().map(|n| n.dst).collect();
    if addresses.is_empty() {
        return Ok(addresses);
    }

    let mut conn = store.conn.lock().unwrap();
    let tx = conn.transaction().map_err(map_sqlite_err)?;
    {
        let placeholders = std::iter::repeat("?").take(addresses.len()).collect::<Vec<_>>().join(",");
        let mut mark_stmt = tx
            .prepare(&format!("UPDATE nodes SET removed = 1 WHERE dst IN ({placeholders})"))
            .map_err(map_sqlite_err)?;
        mark_stmt.execute(rusqlite::params_from_iter(addresses.iter())).map_err(map_sqlite_err)?;

        let mut citation_stmt = tx
            .prepare(&format!(
                "UPDATE citations SET removed = 1 WHERE src_address IN ({placeholders}) OR target_address IN ({placeholders})"
            ))
            .map_err(map_sqlite_err)?;
        let doubled: Vec<&String> = addresses.iter().chain(addresses.iter()).collect();
        citation_stmt.execute(rusqlite::params_from_iter(doubled)).map_err(map_sqlite_err)?;
    }
    tx.commit().map_err(map_sqlite_err)?;
    Ok(addresses)
}

fn row_to_peer(row: &rusqlite::Row) -> rusqlite::Result<Peer> {
    Ok(Peer {
        dst: row.get(0)?,
        identity: row.get(1)?,
        name: row.get(2)?,
        last_seen: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// All active (non-removed) nodes with just the fields `waystone-graph`
/// needs to run a PageRank pass, and a companion writer to persist the
/// results back in one transaction (`ranking_snapshot`/`persist_ranks` pair
/// mirrors `original_source/src/core/search/pagerank.py`'s read-all,
/// compute, write-all-back shape).
pub fn ranking_snapshot(store: &Store) -> Result<Vec<NodeForRanking>> {
    let conn = store.conn.lock().unwrap();
    let mut stmt = conn
        .prepare("SELECT dst, rank FROM nodes WHERE removed = 0")
        .map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map([], |row| Ok(NodeForRanking { dst: row.get(0)?, rank: row.get(1)? }))
        .map_err(map_sqlite_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sqlite_err)?;
    Ok(rows)
}

/// Writes back a full set of computed ranks in a single transaction.
/// Entries for `dst` values no longer present (node removed mid-computation)
/// are silently skipped rather than erroring.
pub fn persist_ranks(store: &Store, ranks: &[(String, f64)]) -> Result<()> {
    let mut conn = store.conn.lock().unwrap();
    let tx = conn.transaction().map_err(map_sqlite_err)?;
    {
        let mut stmt = tx
            .prepare("UPDATE nodes SET rank = ?1 WHERE dst = ?2")
            .map_err(map_sqlite_err)?;
        for (dst, rank) in ranks {
            stmt.execute(params![rank, dst]).map_err(map_sqlite_err)?;
        }
    }
    tx.commit().map_err(map_sqlite_err)?;
    Ok(())
}

/// Writes back a node's refitted announce-rate posterior (`waystone-survival`'s
/// `recalc_node_survival_params`).
pub fn persist_posterior(store: &Store, dst: &str, posterior: &AnnouncePosterior) -> Result<()> {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "UPDATE nodes SET announce_alpha = ?1, announce_beta = ?2,
                          announce_window_seconds = ?3, announce_k_events = ?4
         WHERE dst = ?5",
        params![
            posterior.alpha,
            posterior.beta,
            posterior.window_seconds,
            posterior.k_events,
            dst
        ],
    )
    .map_err(map_sqlite_err)?;
    Ok(())
}

/// All active node addresses, the minimal set `recalc_node_survival_params`
/// needs to iterate without pulling full `Node` rows.
pub fn active_node_addresses(store: &Store) -> Result<Vec<String>> {
    let conn = store.conn.lock().unwrap();
    let mut stmt =
        conn.prepare("SELECT dst FROM nodes WHERE removed = 0").map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(map_sqlite_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sqlite_err)?;
    Ok(rows)
}

/// Non-removed node addresses last seen within `within_seconds` of `now`,
/// the crawl scheduler's seed set (`original_source/src/core/data/nods_and_peers.py::get_recent_nodes_for_crawl`).
pub fn recent_node_addresses_for_crawl(store: &Store, now: f64, within_seconds: f64) -> Result<Vec<String>> {
    let conn = store.conn.lock().unwrap();
    let cutoff = now - within_seconds;
    let mut stmt = conn
        .prepare("SELECT dst FROM nodes WHERE removed = 0 AND last_seen >= ?1")
        .map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map(params![cutoff], |row| row.get::<_, String>(0))
        .map_err(map_sqlite_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sqlite_err)?;
    Ok(rows)
}

/// The node's display name, used by the crawler to fill in
/// `SearchDocument.node_name` (falls back to `None` when the address is
/// unknown, matching `get_name_by_address`'s `Optional[str]` return).
pub fn node_name_by_address(store: &Store, address: &str) -> Result<Option<String>> {
    Ok(get_node(store, address)?.map(|n| n.name))
}

fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<Node> {
    Ok(Node {
        dst: row.get(0)?,
        identity: row.get(1)?,
        name: row.get(2)?,
        last_seen: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        rank: row.get(6)?,
        removed: row.get::<_, i64>(7)? != 0,
        posterior: AnnouncePosterior {
            alpha: row.get(8)?,
            beta: row.get(9)?,
            window_seconds: row.get(10)?,
            k_events: row.get(11)?,
        },
    })
}
