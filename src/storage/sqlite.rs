use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use super::Storage;
use crate::data::Event;
use crate::error::StorageError;

static SCHEMA_SQL: &str = include_str!("../schema.sql");
static INSERT_EVENT_SQL: &str =
    "INSERT INTO events (key, path, body, timestamp) VALUES (?1, ?2, ?3, ?4)";
static COUNT_EVENTS_SQL: &str = "SELECT COUNT(*) FROM events";
#[cfg(test)]
static SELECT_EVENTS_SQL: &str =
    "SELECT key, path, body, timestamp FROM events WHERE key = ?1 ORDER BY id";

const BACKEND: &str = "sqlite";

type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Archival store: one row per accepted event.
pub struct SqliteStorage {
    conn: SharedConnection,
}

impl SqliteStorage {
    /// Opens (or creates) the database file and makes sure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SqliteStorage, StorageError> {
        SqliteStorage::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<SqliteStorage, StorageError> {
        SqliteStorage::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<SqliteStorage, StorageError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(SqliteStorage { conn: Arc::new(Mutex::new(Some(conn))) })
    }

    /// Every archived event stored under `key`, oldest first.
    #[cfg(test)]
    async fn events_for_key(&self, key: &str) -> Result<Vec<Event>, StorageError> {
        let key = key.to_owned();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(SELECT_EVENTS_SQL)?;
            let events = stmt
                .query_map(params![key], |row| {
                    Ok(Event {
                        key: row.get(0)?,
                        path: row.get(1)?,
                        body: row.get(2)?,
                        timestamp: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(events)
        })
        .await
    }

    // rusqlite is synchronous; keep it off the async workers.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let shared = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = shared.lock().unwrap_or_else(|e| e.into_inner());
            match guard.as_ref() {
                Some(conn) => f(conn),
                None => Err(StorageError::Closed(BACKEND)),
            }
        })
        .await?
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn store(&self, key: &str, path: &str, body: &[u8]) -> Result<(), StorageError> {
        let event = Event::new(key, path, body);
        self.with_conn(move |conn| {
            conn.execute(
                INSERT_EVENT_SQL,
                params![event.key, event.path, event.body, event.timestamp],
            )?;
            Ok(())
        })
        .await
    }

    async fn count(&self) -> Result<i64, StorageError> {
        self.with_conn(|conn| Ok(conn.query_row(COUNT_EVENTS_SQL, [], |row| row.get(0))?))
            .await
    }

    async fn close(&self) -> Result<(), StorageError> {
        let shared = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let taken = shared.lock().unwrap_or_else(|e| e.into_inner()).take();
            match taken {
                Some(conn) => conn.close().map_err(|(_, err)| StorageError::from(err)),
                None => Ok(()),
            }
        })
        .await?
    }
}
