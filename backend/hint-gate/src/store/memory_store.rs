use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{AttemptStore, StoreError};
use crate::models::{AttemptKey, AttemptRecord};
use crate::utils::time::{seconds_after, Clock};

struct StoredRecord {
    record: AttemptRecord,
    expires_at: DateTime<Utc>,
}

/// Process-local store. Expiry is judged against the injected clock, so
/// tests can jump a day ahead without sleeping.
pub struct InMemoryAttemptStore {
    entries: RwLock<HashMap<String, StoredRecord>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryAttemptStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Drops expired entries and returns how many live ones remain.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, stored| stored.expires_at > now);
        entries.len()
    }

    fn expiry(&self, ttl_seconds: u64) -> DateTime<Utc> {
        seconds_after(self.clock.now(), ttl_seconds.max(1))
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn get(&self, key: &AttemptKey) -> Result<Option<AttemptRecord>, StoreError> {
        let now = self.clock.now();
        let entries = self.entries.read().await;

        Ok(entries
            .get(&key.storage_key())
            .filter(|stored| stored.expires_at > now)
            .map(|stored| stored.record.clone()))
    }

    async fn put(
        &self,
        key: &AttemptKey,
        record: &AttemptRecord,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let expires_at = self.expiry(ttl_seconds);
        self.entries.write().await.insert(
            key.storage_key(),
            StoredRecord {
                record: record.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn compare_and_put(
        &self,
        key: &AttemptKey,
        expected_revision: Option<u64>,
        record: &AttemptRecord,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let storage_key = key.storage_key();
        let mut entries = self.entries.write().await;

        let current_revision = entries
            .get(&storage_key)
            .filter(|stored| stored.expires_at > now)
            .map(|stored| stored.record.revision);

        if current_revision != expected_revision {
            return Ok(false);
        }

        entries.insert(
            storage_key,
            StoredRecord {
                record: record.clone(),
                expires_at: self.expiry(ttl_seconds),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &AttemptKey) -> Result<(), StoreError> {
        self.entries.write().await.remove(&key.storage_key());
        Ok(())
    }
}
