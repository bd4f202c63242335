//! Event persistence.
//!
//! A backend is picked once at startup: Redis alone, or Redis backed by a
//! SQLite archive through [`DualStorage`]. All backends are shared by every
//! request task, so implementations handle their own synchronisation.
//!
//! After [`Storage::close`] a backend is terminal: `store` and `count` return
//! [`StorageError::Closed`] and a repeated `close` succeeds without doing
//! anything.

mod dual;
mod redis;
mod sqlite;

pub use self::dual::DualStorage;
pub use self::redis::RedisStorage;
pub use self::sqlite::SqliteStorage;

use async_trait::async_trait;

use crate::error::StorageError;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Persists one event.
    async fn store(&self, key: &str, path: &str, body: &[u8]) -> Result<(), StorageError>;

    /// Number of events this backend can currently see. Used for metrics only.
    async fn count(&self) -> Result<i64, StorageError>;

    /// Count reported by an archival backend, if there is one.
    async fn secondary_count(&self) -> Option<Result<i64, StorageError>> {
        None
    }

    async fn close(&self) -> Result<(), StorageError>;
}
