use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use waystone_types::{Error, Result};

use crate::schema;

/// A single shared connection guarded by a mutex, approximating the
/// original's `check_same_thread=False` single-writer SQLite connection
/// used from multiple crawler/scheduler threads.
pub struct Store {
    pub(crate) conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Store> {
        let conn = Connection::open(path)
            .map_err(|e| Error::Fatal(format!("failed to open database: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| Error::Fatal(format!("failed to set journal_mode: {e}")))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| Error::Fatal(format!("failed to set foreign_keys: {e}")))?;
        schema::init(&conn).map_err(|e| Error::Fatal(format!("failed to init schema: {e}")))?;
        Ok(Store { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Store> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Fatal(format!("failed to open in-memory database: {e}")))?;
        schema::init(&conn).map_err(|e| Error::Fatal(format!("failed to init schema: {e}")))?;
        Ok(Store { conn: Mutex::new(conn) })
    }
}

pub(crate) fn map_sqlite_err(e: rusqlite::Error) -> Error {
    Error::Transient(format!("sqlite error: {e}"))
}
