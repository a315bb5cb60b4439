use std::sync::Arc;

use anyhow::Context;
use redis::aio::ConnectionManager;

use crate::config::{Config, StoreBackend};
use crate::store::{AttemptStore, InMemoryAttemptStore, RedisAttemptStore};
use crate::utils::time::{Clock, SystemClock};

pub mod hint_gate_service;

pub use hint_gate_service::HintGateService;

pub struct AppState {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub store: Arc<dyn AttemptStore>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let store: Arc<dyn AttemptStore> = match config.store_backend {
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory attempt store; state is lost on restart");
                Arc::new(InMemoryAttemptStore::new(clock.clone()))
            }
            StoreBackend::Redis => Arc::new(RedisAttemptStore::new(
                Self::connect_redis(&config.redis_uri).await?,
            )),
        };

        Ok(Self {
            config,
            clock,
            store,
        })
    }

    pub fn hint_gate(&self) -> HintGateService {
        HintGateService::new(
            self.store.clone(),
            self.clock.clone(),
            self.config.gate.clone(),
            self.config.store_timeout,
        )
    }

    async fn connect_redis(redis_uri: &str) -> anyhow::Result<ConnectionManager> {
        let client = redis::Client::open(redis_uri).context("Failed to create Redis client")?;

        tracing::info!("Attempting to connect to Redis...");

        let redis = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 30s"))??;

        tracing::info!("Redis ConnectionManager created, testing with PING...");

        let mut conn = redis.clone();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Redis PING timeout after 5s"))??;

        tracing::info!("Redis connection established successfully");
        Ok(redis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EvaluateRequest;

    #[tokio::test]
    async fn memory_backend_builds_a_working_gate() {
        let config = Config {
            store_backend: StoreBackend::Memory,
            ..Config::default()
        };
        let state = AppState::new(config).await.unwrap();
        let gate = state.hint_gate();

        let decision = gate
            .evaluate_now(&EvaluateRequest::new(
                "u1",
                "l1",
                "q1",
                "how do I start this puzzle",
            ))
            .await
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.hint_level, 1);
    }
}
