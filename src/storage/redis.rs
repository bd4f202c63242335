use std::sync::Mutex;

use async_trait::async_trait;
use log::debug;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::Storage;
use crate::error::StorageError;
use crate::key::KEY_PREFIX;

const BACKEND: &str = "redis";

/// Primary store. Bodies are written under their key with no expiry.
pub struct RedisStorage {
    conn: Mutex<Option<ConnectionManager>>,
}

impl RedisStorage {
    /// Connects to `redis://<host>:6379/` and pings the server.
    pub async fn connect(host: &str) -> Result<RedisStorage, StorageError> {
        RedisStorage::open(&format!("redis://{}:6379/", host)).await
    }

    pub async fn open(url: &str) -> Result<RedisStorage, StorageError> {
        let client = Client::open(url)?;
        let mut conn = ConnectionManager::new(client).await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(RedisStorage { conn: Mutex::new(Some(conn)) })
    }

    // ConnectionManager is a cheap handle over one multiplexed connection.
    fn conn(&self) -> Result<ConnectionManager, StorageError> {
        let guard = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone().ok_or(StorageError::Closed(BACKEND))
    }
}

#[async_trait]
impl Storage for RedisStorage {
    async fn store(&self, key: &str, _path: &str, body: &[u8]) -> Result<(), StorageError> {
        let mut conn = self.conn()?;
        let _: () = conn.set(key, body).await?;
        Ok(())
    }

    async fn count(&self) -> Result<i64, StorageError> {
        let mut conn = self.conn()?;
        let keys: Vec<String> = conn.keys(format!("{}*", KEY_PREFIX)).await?;
        Ok(keys.len() as i64)
    }

    async fn close(&self) -> Result<(), StorageError> {
        let taken = self.conn.lock().unwrap_or_else(|e| e.into_inner()).take();
        if taken.is_some() {
            debug!("Redis connection released");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use super::*;

    // Database 15 keeps test keys away from a developer's data.
    async fn local_redis() -> Option<RedisStorage> {
        let host = std::env::var("REDIS").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let url = format!("redis://{}:6379/15", host);
        match tokio::time::timeout(Duration::from_secs(2), RedisStorage::open(&url)).await {
            Ok(Ok(storage)) => Some(storage),
            _ => {
                eprintln!("skipping: no Redis reachable at {}", url);
                None
            }
        }
    }

    fn unique(prefix: &str) -> String {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        format!("{}{}-{}", prefix, std::process::id(), nanos)
    }

    #[tokio::test]
    async fn store_writes_body_without_expiry_and_counts_prefix_only() {
        let Some(storage) = local_redis().await else { return };
        let mut conn = storage.conn().unwrap();
        let key = unique("webhook-redis-test-");
        let other = unique("unrelated-redis-test-");

        let before = storage.count().await.unwrap();
        storage.store(&key, "/redis/test", br#"{"a":1}"#).await.unwrap();
        let _: () = conn.set(&other, "x").await.unwrap();
        let after = storage.count().await.unwrap();

        let body: Vec<u8> = conn.get(&key).await.unwrap();
        let ttl: i64 = conn.ttl(&key).await.unwrap();
        let _: () = conn.del(vec![key.clone(), other.clone()]).await.unwrap();

        assert_eq!(body, br#"{"a":1}"#);
        assert_eq!(ttl, -1);
        assert_eq!(after, before + 1);
    }

    #[tokio::test]
    async fn calls_after_close_report_closed() {
        let Some(storage) = local_redis().await else { return };
        storage.close().await.unwrap();

        assert!(matches!(storage.count().await, Err(StorageError::Closed("redis"))));
        assert!(matches!(
            storage.store("webhook-closed-1", "/closed", b"{}").await,
            Err(StorageError::Closed("redis"))
        ));
        storage.close().await.unwrap();
    }
}
