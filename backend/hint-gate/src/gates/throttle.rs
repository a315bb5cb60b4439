use super::{Gate, GateContext};
use crate::models::{Rejection, RejectionReason};
use crate::utils::time::elapsed_seconds;

/// Minimum spacing between accepted requests.
pub struct TimeThrottle {
    base_interval_seconds: u64,
    progressive: bool,
}

impl TimeThrottle {
    pub fn new(base_interval_seconds: u64, progressive: bool) -> Self {
        Self {
            base_interval_seconds,
            progressive,
        }
    }

    /// With progressive delay the wait grows by one base interval per hint
    /// already granted.
    pub fn required_delay_seconds(&self, count: u32) -> u64 {
        if self.progressive {
            self.base_interval_seconds
                .saturating_mul(u64::from(count) + 1)
        } else {
            self.base_interval_seconds
        }
    }
}

impl Gate for TimeThrottle {
    fn name(&self) -> &'static str {
        "time_throttle"
    }

    fn check(&self, ctx: &GateContext<'_>) -> Result<(), Rejection> {
        let Some(last_asked_at) = ctx.record.last_asked_at else {
            return Ok(());
        };

        let required = self.required_delay_seconds(ctx.record.count) as f64;
        let elapsed = elapsed_seconds(last_asked_at, ctx.now);

        if elapsed < required {
            let retry_after = (required - elapsed).ceil() as u64;
            return Err(Rejection::new(RejectionReason::TimeThrottle).retry_after(retry_after));
        }

        Ok(())
    }
}
