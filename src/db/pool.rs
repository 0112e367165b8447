//! SQLite connection wrapper (lightweight for CLI usage).

use crate::db::initialize::init_db;
use crate::errors::AppResult;
use rusqlite::{Connection, Result};
use std::path::Path;
use std::time::Duration;

/// Concurrent writers wait this long for the write lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DbPool {
    pub conn: Connection,
}

impl DbPool {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(Path::new(path))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // Sessions may outlive the rows they reference; orphans are
        // detected and purged explicitly instead of being rejected.
        conn.pragma_update(None, "foreign_keys", "OFF")?;
        Ok(Self { conn })
    }

    /// Open and bring the schema up to date.
    pub fn open(path: &str) -> AppResult<Self> {
        let pool = Self::new(path)?;
        init_db(&pool.conn)?;
        Ok(pool)
    }
}
