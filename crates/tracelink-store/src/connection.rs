//! `SQLite` connection pool.
//!
//! Every store operation checks a connection out, runs one unit of work and
//! hands it back; no handle is shared across requests. The pool customizer
//! applies WAL mode and the busy timeout to each new connection so concurrent
//! single-row inserts from both listeners serialize inside `SQLite`.

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::error::StoreError;

pub type ConnectionPool = Pool<SqliteConnectionManager>;

pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Maximum pool size (default: 16).
    pub pool_size: u32,
    /// Busy timeout in milliseconds (default: 5000).
    pub busy_timeout_ms: u32,
    /// How long a checkout may wait for a free connection.
    pub checkout_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 16,
            busy_timeout_ms: 5_000,
            checkout_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA busy_timeout = {};\
             PRAGMA synchronous = FULL;",
            self.busy_timeout_ms
        ))
    }
}

/// Create a file-backed pool, creating parent directories as needed.
///
/// No in-memory variant: each pooled in-memory connection would see its own
/// private database.
pub fn new_file(path: &Path, config: &ConnectionConfig) -> Result<ConnectionPool, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| StoreError::Unavailable(format!("create dir {}: {e}", parent.display())))?;
    }

    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(config.checkout_timeout)
        .connection_customizer(Box::new(PragmaCustomizer {
            busy_timeout_ms: config.busy_timeout_ms,
        }))
        .build(manager)?;
    Ok(pool)
}

/// `PRAGMA synchronous` of a connection (`2` is FULL).
pub fn synchronous_level(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("PRAGMA synchronous", [], |row| row.get(0))?)
}

/// Current journal mode of a connection.
pub fn journal_mode(conn: &Connection) -> Result<String, StoreError> {
    Ok(conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_pool_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let pool = new_file(&dir.path().join("t.db"), &ConnectionConfig::default()).unwrap();
        let conn = pool.get().unwrap();
        assert_eq!(journal_mode(&conn).unwrap(), "wal");
    }

    #[test]
    fn every_pooled_connection_syncs_each_commit() {
        let dir = tempfile::tempdir().unwrap();
        let pool = new_file(&dir.path().join("t.db"), &ConnectionConfig::default()).unwrap();
        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        assert_eq!(synchronous_level(&a).unwrap(), 2);
        assert_eq!(synchronous_level(&b).unwrap(), 2);
    }

    #[test]
    fn creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("t.db");
        let pool = new_file(&path, &ConnectionConfig::default()).unwrap();
        drop(pool.get().unwrap());
        assert!(path.exists());
    }

    #[test]
    fn connections_share_one_database() {
        let dir = tempfile::tempdir().unwrap();
        let pool = new_file(&dir.path().join("t.db"), &ConnectionConfig::default()).unwrap();
        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        a.execute_batch("CREATE TABLE shared_check (x INTEGER); INSERT INTO shared_check VALUES (7);")
            .unwrap();
        let x: i64 = b.query_row("SELECT x FROM shared_check", [], |row| row.get(0)).unwrap();
        assert_eq!(x, 7);
    }

    #[test]
    fn directory_path_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConnectionConfig {
            checkout_timeout: Duration::from_millis(200),
            ..ConnectionConfig::default()
        };
        let result = new_file(dir.path(), &config);
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
