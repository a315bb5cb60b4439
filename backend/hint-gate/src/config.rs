use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

const DEFAULT_REDIS_URI: &str = "redis://127.0.0.1:6379/0";
const DEFAULT_STORE_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" | "in_memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("Unknown attempt store backend: {}", other)),
        }
    }
}

/// Tunables for the hint gate pipeline. Every field has a default, so a
/// partial `[gate]` table (or a handful of `APP__GATE__*` variables) is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GateConfig {
    #[validate(range(
        min = 1,
        max = 86_400,
        message = "base_interval_seconds must be within [1, 86400]"
    ))]
    pub base_interval_seconds: u64,
    pub progressive_delay: bool,
    #[validate(range(max = 86_400, message = "min_thinking_seconds must be at most 86400"))]
    pub min_thinking_seconds: u64,
    #[validate(range(min = 1, message = "max_per_hour must be positive"))]
    pub max_per_hour: u32,
    #[validate(range(min = 1, message = "min_question_length must be positive"))]
    pub min_question_length: usize,
    #[validate(range(min = 1, message = "min_word_length must be positive"))]
    pub min_word_length: usize,
    pub min_word_count: usize,
    #[validate(range(
        min = 0.0,
        max = 1.0,
        message = "duplicate_similarity_threshold must be within [0, 1]"
    ))]
    pub duplicate_similarity_threshold: f64,
    // 30 days
    #[validate(range(
        min = 1,
        max = 2_592_000,
        message = "record_ttl_seconds must be within [1, 2592000]"
    ))]
    pub record_ttl_seconds: u64,
    // 7 days
    #[validate(range(
        min = 1,
        max = 604_800,
        message = "rate_window_seconds must be within [1, 604800]"
    ))]
    pub rate_window_seconds: u64,
    pub prune_history: bool,
    #[validate(range(min = 1, max = 10, message = "max_commit_retries must be within [1, 10]"))]
    pub max_commit_retries: u32,

    pub time_throttle_enabled: bool,
    pub content_validation_enabled: bool,
    pub duplicate_detection_enabled: bool,
    pub engagement_enabled: bool,
    pub rate_limit_enabled: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            base_interval_seconds: 10,
            progressive_delay: true,
            min_thinking_seconds: 5,
            max_per_hour: 20,
            min_question_length: 3,
            min_word_length: 3,
            min_word_count: 1,
            duplicate_similarity_threshold: 0.8,
            record_ttl_seconds: 86_400,
            rate_window_seconds: 3_600,
            prune_history: true,
            max_commit_retries: 3,
            time_throttle_enabled: true,
            content_validation_enabled: true,
            duplicate_detection_enabled: true,
            engagement_enabled: true,
            rate_limit_enabled: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub redis_uri: String,
    pub store_backend: StoreBackend,
    pub store_timeout: Duration,
    pub gate: GateConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_uri: DEFAULT_REDIS_URI.to_string(),
            store_backend: StoreBackend::Redis,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            gate: GateConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/{env}.toml + APP__SECTION__KEY overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration sources")?;

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .unwrap_or_else(|_| DEFAULT_REDIS_URI.to_string());

        let store_backend = settings
            .get_string("store.backend")
            .or_else(|_| env::var("HINT_GATE_STORE"))
            .unwrap_or_else(|_| "redis".to_string())
            .parse::<StoreBackend>()?;

        let store_timeout_ms = match settings.get_int("store.timeout_ms") {
            Ok(ms) if ms > 0 => ms as u64,
            Ok(ms) => return Err(anyhow!("store.timeout_ms must be positive, got {}", ms)),
            Err(config::ConfigError::NotFound(_)) => DEFAULT_STORE_TIMEOUT_MS,
            Err(e) => return Err(e).context("Invalid store.timeout_ms"),
        };

        let gate = match settings.get::<GateConfig>("gate") {
            Ok(gate) => gate,
            Err(config::ConfigError::NotFound(_)) => GateConfig::default(),
            Err(e) => return Err(e).context("Invalid [gate] configuration"),
        };
        gate.validate()
            .map_err(|e| anyhow!("Invalid gate configuration: {}", e))?;

        tracing::debug!(
            "Configuration loaded: env={}, store={:?}, timeout={}ms",
            env,
            store_backend,
            store_timeout_ms
        );

        Ok(Config {
            redis_uri,
            store_backend,
            store_timeout: Duration::from_millis(store_timeout_ms),
            gate,
        })
    }
}
