use super::{Gate, GateContext};
use crate::models::{Rejection, RejectionReason};
use crate::utils::time::{elapsed_seconds, seconds_after, seconds_before};

/// Sliding-window cap on accepted requests. Only accepted attempts are in
/// the record, so rejected spam never eats into the budget.
pub struct HourlyRateLimiter {
    max_per_window: u32,
    window_seconds: u64,
}

impl HourlyRateLimiter {
    pub fn new(max_per_window: u32, window_seconds: u64) -> Self {
        Self {
            max_per_window,
            window_seconds,
        }
    }
}

impl Gate for HourlyRateLimiter {
    fn name(&self) -> &'static str {
        "hourly_rate"
    }

    fn check(&self, ctx: &GateContext<'_>) -> Result<(), Rejection> {
        let window_start = seconds_before(ctx.now, self.window_seconds);

        let mut in_window = ctx.record.attempts_after(window_start);
        let oldest = in_window.next();
        let count = oldest.map_or(0, |_| 1 + in_window.count());

        if count < self.max_per_window as usize {
            return Ok(());
        }

        let mut rejection = Rejection::new(RejectionReason::RateLimit);
        if let Some(oldest) = oldest {
            // The budget frees up when the oldest counted attempt leaves the window.
            let frees_at = seconds_after(oldest.timestamp, self.window_seconds);
            let until_free = elapsed_seconds(ctx.now, frees_at);
            rejection = rejection.retry_after(until_free.ceil().max(1.0) as u64);
        }
        Err(rejection)
    }
}
