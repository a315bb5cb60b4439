//! Attempt store: keyed, whole-record reads and writes with TTL expiry.

use async_trait::async_trait;
use std::time::Duration;

use crate::models::{AttemptKey, AttemptRecord};

mod memory_store;
mod redis_store;

pub use memory_store::InMemoryAttemptStore;
pub use redis_store::RedisAttemptStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("failed to (de)serialize attempt record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("attempt store did not answer within {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// Corrupt payloads will not fix themselves; everything else might.
    pub fn is_transient(&self) -> bool {
        !matches!(self, StoreError::Serialization(_))
    }
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Expired and missing records both come back as `None`.
    async fn get(&self, key: &AttemptKey) -> Result<Option<AttemptRecord>, StoreError>;

    /// Replaces the whole record and restarts its TTL.
    async fn put(
        &self,
        key: &AttemptKey,
        record: &AttemptRecord,
        ttl_seconds: u64,
    ) -> Result<(), StoreError>;

    /// Writes `record` only if the stored record's `revision` still equals
    /// `expected_revision`, where `None` means "no live record". Returns
    /// whether the write happened.
    async fn compare_and_put(
        &self,
        key: &AttemptKey,
        expected_revision: Option<u64>,
        record: &AttemptRecord,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError>;

    async fn delete(&self, key: &AttemptKey) -> Result<(), StoreError>;
}
