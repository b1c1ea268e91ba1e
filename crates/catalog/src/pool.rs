//! SQLite connection pool

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;

use crate::CatalogError;

/// Pooled SQLite connections for the catalog store.
pub type CatalogPool = Pool<SqliteConnectionManager>;

const BUSY_TIMEOUT_MS: u64 = 5_000;
const POOL_MAX_SIZE: u32 = 8;

/// Create a connection pool with WAL mode and a busy timeout.
///
/// Pass `:memory:` for an in-memory database (tests only): each pooled
/// connection would otherwise see a distinct memory database, so tests
/// using `:memory:` cap the pool at one connection.
pub fn create_pool(db_path: &str) -> Result<CatalogPool, CatalogError> {
    let in_memory = db_path == ":memory:";

    let manager = if in_memory {
        SqliteConnectionManager::memory()
    } else {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        SqliteConnectionManager::file(db_path).with_flags(flags)
    };

    let manager = manager.with_init(|conn| {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
        ))
    });

    let pool = Pool::builder()
        .max_size(if in_memory { 1 } else { POOL_MAX_SIZE })
        .build(manager)?;

    Ok(pool)
}
