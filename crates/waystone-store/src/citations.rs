//! Raw citation-row persistence. The diff-apply algorithm that decides
//! which edges to add/soft-delete/reactivate lives in `waystone-graph`;
//! this module only offers the CRUD primitives it's built on.
//!
//! Grounded in `original_source/src/core/data/citations.py`.

use rusqlite::{params, OptionalExtension};
use waystone_types::Result;

use crate::store::{map_sqlite_err, Store};

#[derive(Debug, Clone, PartialEq)]
pub struct CitationRow {
    pub src_address: String,
    pub target_address: String,
    pub removed: bool,
    pub created_at: f64,
}

/// Inserts a new edge, or reactivates (clearing `removed`) an existing one.
/// Does not touch `created_at` on reactivation: a citation's age tracks
/// when it was first observed, not when it was last confirmed present.
pub fn upsert_citation(store: &Store, target: &str, src: &str, now: f64) -> Result<()> {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO citations (target_address, src_address, removed, created_at)
         VALUES (?1, ?2, 0, ?3)
         ON CONFLICT(target_address, src_address) DO UPDATE SET removed = 0",
        params![target, src, now],
    )
    .map_err(map_sqlite_err)?;
    Ok(())
}

pub fn soft_delete_citation(store: &Store, target: &str, src: &str) -> Result<()> {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "UPDATE citations SET removed = 1 WHERE target_address = ?1 AND src_address = ?2",
        params![target, src],
    )
    .map_err(map_sqlite_err)?;
    Ok(())
}

/// Active (non-removed) source addresses citing `target`, the adjacency
/// `waystone-graph`'s PageRank pass consumes directly.
pub fn sources_of(store: &Store, target: &str) -> Result<Vec<String>> {
    let conn = store.conn.lock().unwrap();
    let mut stmt = conn
        .prepare(
            "SELECT src_address FROM citations WHERE target_address = ?1 AND removed = 0",
        )
        .map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map(params![target], |row| row.get::<_, String>(0))
        .map_err(map_sqlite_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sqlite_err)?;
    Ok(rows)
}

/// All rows for a given target, including soft-deleted ones — the shape
/// the diff-apply algorithm needs to compute additions/removals against
/// a freshly-parsed page's outbound link list.
pub fn rows_for_target(store: &Store, target: &str) -> Result<Vec<CitationRow>> {
    let conn = store.conn.lock().unwrap();
    let mut stmt = conn
        .prepare(
            "SELECT src_address, target_address, removed, created_at
             FROM citations WHERE target_address = ?1",
        )
        .map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map(params![target], |row| {
            Ok(CitationRow {
                src_address: row.get(0)?,
                target_address: row.get(1)?,
                removed: row.get::<_, i64>(2)? != 0,
                created_at: row.get(3)?,
            })
        })
        .map_err(map_sqlite_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sqlite_err)?;
    Ok(rows)
}

/// Cardinality of `sources_of(target)`, for the page-request interface's
/// `citation_count`.
pub fn citation_count(store: &Store, target: &str) -> Result<usize> {
    let conn = store.conn.lock().unwrap();
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM citations WHERE target_address = ?1 AND removed = 0",
            params![target],
            |row| row.get(0),
        )
        .map_err(map_sqlite_err)?;
    Ok(count as usize)
}

/// All active `(src, target)` edges in the graph, the input
/// `waystone-graph`'s PageRank pass needs in one shot.
pub fn all_active_edges(store: &Store) -> Result<Vec<(String, String)>> {
    let conn = store.conn.lock().unwrap();
    let mut stmt = conn
        .prepare("SELECT src_address, target_address FROM citations WHERE removed = 0")
        .map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(map_sqlite_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sqlite_err)?;
    Ok(rows)
}

/// All rows with `src_address = src`, including soft-deleted ones. The
/// diff-apply algorithm reads this to compare a freshly-crawled page's
/// outbound links against what was previously recorded for it.
pub fn rows_for_src(store: &Store, src: &str) -> Result<Vec<CitationRow>> {
    let conn = store.conn.lock().unwrap();
    let mut stmt = conn
        .prepare(
            "SELECT src_address, target_address, removed, created_at
             FROM citations WHERE src_address = ?1",
        )
        .map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map(params![src], |row| {
            Ok(CitationRow {
                src_address: row.get(0)?,
                target_address: row.get(1)?,
                removed: row.get::<_, i64>(2)? != 0,
                created_at: row.get(3)?,
            })
        })
        .map_err(map_sqlite_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sqlite_err)?;
    Ok(rows)
}

pub fn get_citation(store: &Store, target: &str, src: &str) -> Result<Option<CitationRow>> {
    let conn = store.conn.lock().unwrap();
    conn.query_row(
        "SELECT src_address, target_address, removed, created_at
         FROM citations WHERE target_address = ?1 AND src_address = ?2",
        params![target, src],
        |row| {
            Ok(CitationRow {
                src_address: row.get(0)?,
                target_address: row.get(1)?,
                removed: row.get::<_, i64>(2)? != 0,
                created_at: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(map_sqlite_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_soft_delete_then_reactivate() {
        let store = Store::open_in_memory().unwrap();
        let (target, src) = ("t".repeat(32), "s".repeat(32));

        upsert_citation(&store, &target, &src, 1.0).unwrap();
        assert!(!get_citation(&store, &target, &src).unwrap().unwrap().removed);

        soft_delete_citation(&store, &target, &src).unwrap();
        assert!(get_citation(&store, &target, &src).unwrap().unwrap().removed);
        assert!(sources_of(&store, &target).unwrap().is_empty());

        upsert_citation(&store, &target, &src, 2.0).unwrap();
        let row = get_citation(&store, &target, &src).unwrap().unwrap();
        assert!(!row.removed);
        assert_eq!(row.created_at, 1.0, "created_at should not move on reactivation");
    }

    #[test]
    fn all_active_edges_excludes_soft_deleted() {
        let store = Store::open_in_memory().unwrap();
        let (t1, t2, s1) = ("t1".repeat(16), "t2".repeat(16), "s1".repeat(16));
        upsert_citation(&store, &t1, &s1, 0.0).unwrap();
        upsert_citation(&store, &t2, &s1, 0.0).unwrap();
        soft_delete_citation(&store, &t2, &s1).unwrap();

        let edges = all_active_edges(&store).unwrap();
        assert_eq!(edges, vec![(s1, t1)]);
    }

    #[test]
    fn sources_of_only_returns_active_edges() {
        let store = Store::open_in_memory().unwrap();
        let target = "u".repeat(32);
        let (src1, src2) = ("v".repeat(32), "w".repeat(32));
        upsert_citation(&store, &target, &src1, 0.0).unwrap();
        upsert_citation(&store, &target, &src2, 0.0).unwrap();
        soft_delete_citation(&store, &target, &src2).unwrap();

        let active = sources_of(&store, &target).unwrap();
        assert_eq!(active, vec![src1]);
    }

    #[test]
    fn citation_count_reflects_only_active_edges() {
        let store = Store::open_in_memory().unwrap();
        let target = "x".repeat(32);
        let (src1, src2) = ("y".repeat(32), "z".repeat(32));
        upsert_citation(&store, &target, &src1, 0.0).unwrap();
        upsert_citation(&store, &target, &src2, 0.0).unwrap();
        assert_eq!(citation_count(&store, &target).unwrap(), 2);

        soft_delete_citation(&store, &target, &src2).unwrap();
        assert_eq!(citation_count(&store, &target).unwrap(), 1);
    }
}
