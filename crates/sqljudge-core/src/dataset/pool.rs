use deadpool::managed::{self, Metrics, RecycleError, RecycleResult};
use rusqlite::limits::Limit;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

pub type DatasetPool = managed::Pool<ReadOnlyManager>;
pub type PooledConnection = managed::Object<ReadOnlyManager>;

/// Opens dataset files read-only. The probe in `recycle` runs before every
/// checkout so connections that went stale while idle are replaced.
#[derive(Debug, Clone)]
pub struct ReadOnlyManager {
    path: PathBuf,
}

impl ReadOnlyManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl managed::Manager for ReadOnlyManager {
    type Type = Connection;
    type Error = rusqlite::Error;

    async fn create(&self) -> Result<Connection, rusqlite::Error> {
        open_read_only(&self.path)
    }

    async fn recycle(&self, conn: &mut Connection, _: &Metrics) -> RecycleResult<rusqlite::Error> {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(RecycleError::Backend)?;
        Ok(())
    }
}

/// Read-only at the file level and at the session level. `ATTACH` is
/// disabled so a learner query can only ever see this one dataset file,
/// and nothing it does survives on the pooled connection.
pub fn open_read_only(path: &Path) -> rusqlite::Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)?;
    conn.execute_batch("PRAGMA query_only = ON;")?;
    let _ = conn.set_limit(Limit::SQLITE_LIMIT_ATTACHED, 0);
    Ok(conn)
}
