//! The individual checks a hint request must pass.
//!
//! Gates are pure: they look at the current [`AttemptRecord`], the trimmed
//! message and `now`, and either pass or return a [`Rejection`]. None of them
//! touch the store or the clock.

use chrono::{DateTime, Utc};

use crate::config::GateConfig;
use crate::models::{AttemptRecord, Rejection};

pub mod content;
pub mod duplicate;
pub mod engagement;
pub mod rate;
pub mod throttle;

pub use content::ContentValidator;
pub use duplicate::{jaccard_similarity, DuplicateDetector};
pub use engagement::EngagementGate;
pub use rate::HourlyRateLimiter;
pub use throttle::TimeThrottle;

pub struct GateContext<'a> {
    pub record: &'a AttemptRecord,
    /// Already trimmed.
    pub message: &'a str,
    pub now: DateTime<Utc>,
}

impl<'a> GateContext<'a> {
    pub fn new(record: &'a AttemptRecord, message: &'a str, now: DateTime<Utc>) -> Self {
        Self {
            record,
            message,
            now,
        }
    }
}

pub trait Gate: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &GateContext<'_>) -> Result<(), Rejection>;
}

/// Enabled gates in evaluation order:
/// time throttle, content, duplicate, engagement, hourly rate.
pub struct GateChain {
    gates: Vec<Box<dyn Gate>>,
}

impl GateChain {
    pub fn from_config(config: &GateConfig) -> Self {
        let mut gates: Vec<Box<dyn Gate>> = Vec::with_capacity(5);

        if config.time_throttle_enabled {
            gates.push(Box::new(TimeThrottle::new(
                config.base_interval_seconds,
                config.progressive_delay,
            )));
        }
        if config.content_validation_enabled {
            gates.push(Box::new(ContentValidator::new(
                config.min_question_length,
                config.min_word_length,
                config.min_word_count,
            )));
        }
        if config.duplicate_detection_enabled {
            gates.push(Box::new(DuplicateDetector::new(
                config.duplicate_similarity_threshold,
            )));
        }
        if config.engagement_enabled {
            gates.push(Box::new(EngagementGate::new(config.min_thinking_seconds)));
        }
        if config.rate_limit_enabled {
            gates.push(Box::new(HourlyRateLimiter::new(
                config.max_per_hour,
                config.rate_window_seconds,
            )));
        }

        Self { gates }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.gates.iter().map(|gate| gate.name()).collect()
    }

    /// Runs every gate in order and stops at the first rejection.
    pub fn run(&self, ctx: &GateContext<'_>) -> Result<(), Rejection> {
        for gate in &self.gates {
            if let Err(rejection) = gate.check(ctx) {
                tracing::debug!(
                    gate = gate.name(),
                    reason = %rejection.reason,
                    "Gate rejected hint request"
                );
                return Err(rejection);
            }
            tracing::trace!(gate = gate.name(), "Gate passed");
        }
        Ok(())
    }
}
