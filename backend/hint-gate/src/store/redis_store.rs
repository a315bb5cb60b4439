use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{AttemptStore, StoreError};
use crate::models::{AttemptKey, AttemptRecord};

// Lua keeps the count check and the write atomic on the Redis side.
const COMPARE_AND_PUT_SCRIPT: &str = r#"
    local key = KEYS[1]
    local expected = ARGV[1]
    local payload = ARGV[2]
    local ttl = tonumber(ARGV[3])

    -- '' means the caller saw no record
    local current = redis.call('GET', key)
    if current then
        if expected == '' then
            return 0
        end
        local decoded = cjson.decode(current)
        if tonumber(decoded['revision'] or 0) ~= tonumber(expected) then
            return 0
        end
    elseif expected ~= '' then
        return 0
    end

    redis.call('SET', key, payload, 'EX', ttl)
    return 1
"#;

#[derive(Clone)]
pub struct RedisAttemptStore {
    redis: ConnectionManager,
    compare_and_put: redis::Script,
}

impl RedisAttemptStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            compare_and_put: redis::Script::new(COMPARE_AND_PUT_SCRIPT),
        }
    }
}

#[async_trait]
impl AttemptStore for RedisAttemptStore {
    async fn get(&self, key: &AttemptKey) -> Result<Option<AttemptRecord>, StoreError> {
        let mut conn = self.redis.clone();

        let raw: Option<String> = redis::cmd("GET")
            .arg(key.storage_key())
            .query_async(&mut conn)
            .await?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &AttemptKey,
        record: &AttemptRecord,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();
        let payload = serde_json::to_string(record)?;

        redis::cmd("SET")
            .arg(key.storage_key())
            .arg(payload)
            .arg("EX")
            .arg(ttl_seconds.max(1))
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }

    async fn compare_and_put(
        &self,
        key: &AttemptKey,
        expected_revision: Option<u64>,
        record: &AttemptRecord,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.redis.clone();
        let payload = serde_json::to_string(record)?;

        let written: u32 = self
            .compare_and_put
            .key(key.storage_key())
            .arg(expected_revision.map(|r| r.to_string()).unwrap_or_default())
            .arg(payload)
            .arg(ttl_seconds.max(1))
            .invoke_async(&mut conn)
            .await?;

        Ok(written == 1)
    }

    async fn delete(&self, key: &AttemptKey) -> Result<(), StoreError> {
        let mut conn = self.redis.clone();

        redis::cmd("DEL")
            .arg(key.storage_key())
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }
}
