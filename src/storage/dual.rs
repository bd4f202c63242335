use std::sync::Arc;

use async_trait::async_trait;
use log::{error, warn};

use super::Storage;
use crate::error::StorageError;

/// Primary store gated by a best-effort archival store.
///
/// The primary write decides whether an event is accepted. The secondary is
/// only written after the primary succeeds, and its failures are logged and
/// swallowed.
pub struct DualStorage {
    primary: Arc<dyn Storage>,
    secondary: Arc<dyn Storage>,
}

impl DualStorage {
    pub fn new(primary: Arc<dyn Storage>, secondary: Arc<dyn Storage>) -> DualStorage {
        DualStorage { primary, secondary }
    }

    pub async fn primary_count(&self) -> Result<i64, StorageError> {
        self.primary.count().await
    }

    pub async fn archive_count(&self) -> Result<i64, StorageError> {
        self.secondary.count().await
    }
}

#[async_trait]
impl Storage for DualStorage {
    async fn store(&self, key: &str, path: &str, body: &[u8]) -> Result<(), StorageError> {
        self.primary.store(key, path, body).await?;
        if let Err(err) = self.secondary.store(key, path, body).await {
            warn!("Failed to archive {} in secondary storage: {}", key, err);
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, StorageError> {
        self.primary_count().await
    }

    async fn secondary_count(&self) -> Option<Result<i64, StorageError>> {
        Some(self.archive_count().await)
    }

    async fn close(&self) -> Result<(), StorageError> {
        let primary = self.primary.close().await;
        if let Err(err) = &primary {
            error!("Error closing primary storage: {}", err);
        }
        let secondary = self.secondary.close().await;
        if let Err(err) = &secondary {
            error!("Error closing secondary storage: {}", err);
        }
        primary.and(secondary)
    }
}
