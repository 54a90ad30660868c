use std::time::Duration;

use deadpool::managed::{Metrics, RecycleError, RecycleResult};
use rusqlite::{Connection, OpenFlags};

use crate::Storage;

/// How long a statement waits for a file database locked by another connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqlitePoolManager {
    storage: Storage,
}

impl SqlitePoolManager {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

impl deadpool::managed::Manager for SqlitePoolManager {
    type Type = Connection;
    type Error = rusqlite::Error;

    async fn create(&self) -> Result<Connection, rusqlite::Error> {
        let conn = match &self.storage {
            Storage::File(path) => {
                let conn = Connection::open(path)?;
                conn.busy_timeout(BUSY_TIMEOUT)?;
                conn
            }
            // Table locks of a shared cache are waited out through `unlock_notify`,
            // busy_timeout does not apply to them.
            Storage::Memory(name) => Connection::open_with_flags(
                format!("file:{name}?mode=memory&cache=shared"),
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )?,
        };
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(conn)
    }

    async fn recycle(
        &self,
        conn: &mut Connection,
        _: &Metrics,
    ) -> RecycleResult<rusqlite::Error> {
        // never hand out a connection with a dangling transaction
        if !conn.is_autocommit() {
            return Err(RecycleError::message("connection returned inside a transaction"));
        }

        Ok(())
    }
}
