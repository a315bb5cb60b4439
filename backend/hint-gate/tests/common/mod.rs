#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hint_gate::{
    config::GateConfig,
    models::{AttemptRecord, Decision},
    store::{AttemptStore, InMemoryAttemptStore, StoreError},
    utils::{retry::RetryConfig, time::ManualClock},
    AttemptKey, EvaluateRequest, GateError, HintGateService,
};

pub const STORE_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(200);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

pub fn key() -> AttemptKey {
    AttemptKey::new("user-1", "level-1", "question-1")
}

pub fn request(message: &str) -> EvaluateRequest {
    EvaluateRequest::new("user-1", "level-1", "question-1", message)
}

/// Service over the in-memory store, with one manual clock shared by both so
/// store expiry and gate time agree.
pub struct TestGate {
    pub service: Arc<HintGateService>,
    pub store: Arc<InMemoryAttemptStore>,
    pub clock: Arc<ManualClock>,
}

impl TestGate {
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    pub fn with_config(config: GateConfig) -> Self {
        init_tracing();

        let clock = Arc::new(ManualClock::new(t0()));
        let store = Arc::new(InMemoryAttemptStore::new(clock.clone()));
        let service = HintGateService::new(store.clone(), clock.clone(), config, STORE_TIMEOUT);

        Self {
            service: Arc::new(service),
            store,
            clock,
        }
    }

    /// Evaluates `message` for the default key `secs` seconds after `t0`.
    pub async fn ask(&self, secs: i64, message: &str) -> Decision {
        let now = at(secs);
        self.clock.set(now);
        self.service
            .evaluate(&request(message), now)
            .await
            .expect("evaluate should not fail against the in-memory store")
    }

    pub async fn record(&self) -> Option<AttemptRecord> {
        self.store.get(&key()).await.unwrap()
    }
}

pub enum Failure {
    /// Every call fails immediately.
    Error,
    /// Every call never completes.
    Hang,
}

/// Store that never works, counting how often it was called.
pub struct BrokenStore {
    failure: Failure,
    calls: AtomicUsize,
}

impl BrokenStore {
    pub fn new(failure: Failure) -> Self {
        Self {
            failure,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn fail<T>(&self) -> Result<T, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Failure::Error => Err(StoreError::Timeout(std::time::Duration::from_millis(1))),
            Failure::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl AttemptStore for BrokenStore {
    async fn get(&self, _key: &AttemptKey) -> Result<Option<AttemptRecord>, StoreError> {
        self.fail().await
    }

    async fn put(
        &self,
        _key: &AttemptKey,
        _record: &AttemptRecord,
        _ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        self.fail().await
    }

    async fn compare_and_put(
        &self,
        _key: &AttemptKey,
        _expected_revision: Option<u64>,
        _record: &AttemptRecord,
        _ttl_seconds: u64,
    ) -> Result<bool, StoreError> {
        self.fail().await
    }

    async fn delete(&self, _key: &AttemptKey) -> Result<(), StoreError> {
        self.fail().await
    }
}

pub fn broken_gate(store: Arc<BrokenStore>) -> HintGateService {
    init_tracing();

    HintGateService::new(
        store,
        Arc::new(ManualClock::new(t0())),
        GateConfig::default(),
        std::time::Duration::from_millis(50),
    )
    .with_read_retry(RetryConfig::no_retry())
}

pub fn assert_store_unavailable(result: Result<Decision, GateError>) {
    match result {
        Err(e) => assert_eq!(e.code(), "store_unavailable", "unexpected error: {}", e),
        Ok(decision) => panic!("expected store_unavailable, got {:?}", decision),
    }
}
