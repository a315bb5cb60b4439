use super::{Gate, GateContext};
use crate::models::{Rejection, RejectionReason};
use crate::utils::time::elapsed_seconds;

/// Requires `min_thinking_seconds` of elapsed time per hint already granted,
/// measured from the first accepted request.
pub struct EngagementGate {
    min_thinking_seconds: u64,
}

impl EngagementGate {
    pub fn new(min_thinking_seconds: u64) -> Self {
        Self {
            min_thinking_seconds,
        }
    }

    pub fn expected_thinking_seconds(&self, count: u32) -> u64 {
        self.min_thinking_seconds.saturating_mul(u64::from(count))
    }
}

impl Gate for EngagementGate {
    fn name(&self) -> &'static str {
        "engagement"
    }

    fn check(&self, ctx: &GateContext<'_>) -> Result<(), Rejection> {
        let Some(first_asked_at) = ctx.record.first_asked_at else {
            return Ok(());
        };

        let expected = self.expected_thinking_seconds(ctx.record.count) as f64;
        let elapsed = elapsed_seconds(first_asked_at, ctx.now);

        if elapsed < expected {
            let retry_after = (expected - elapsed).ceil() as u64;
            return Err(
                Rejection::new(RejectionReason::InsufficientThinking).retry_after(retry_after)
            );
        }

        Ok(())
    }
}
