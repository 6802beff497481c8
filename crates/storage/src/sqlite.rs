//! SQLite connection setup and error mapping.

use rusqlite::{Connection, ErrorCode, OpenFlags};
use std::path::Path;
use tempora_core::{Error, Result};

/// Map `rusqlite` failures into the journal error type.
pub trait SqliteResultExt<T> {
    /// Convert an error into [`Error::Storage`] tagged with `operation`.
    fn or_storage(self, operation: &str) -> Result<T>;
}

impl<T> SqliteResultExt<T> for rusqlite::Result<T> {
    fn or_storage(self, operation: &str) -> Result<T> {
        self.map_err(|e| Error::storage(operation, e))
    }
}

/// True if `err` is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

/// Open (or create) a database file. WAL journal mode is enabled so readers
/// in other processes do not block the writer.
pub fn open_file(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .or_storage("open database")?;
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .or_storage("enable WAL")?;
    tracing::debug!(path = %path.display(), journal_mode = %mode, "opened database");
    configure(&conn)?;
    Ok(conn)
}

/// Open a private in-memory database.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().or_storage("open in-memory database")?;
    configure(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "synchronous", "NORMAL")
        .or_storage("set synchronous")?;
    conn.pragma_update(None, "temp_store", "MEMORY")
        .or_storage("set temp_store")
}
