use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Source of "now" for everything that needs wall-clock time.
///
/// Gates never read the system clock themselves; the pipeline takes `now`
/// from a `Clock` (or from the caller) and threads it through.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used by tests and replay tooling.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Seconds elapsed from `since` to `now`, with millisecond precision.
/// Negative when `now` is before `since`.
pub fn elapsed_seconds(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - since).num_milliseconds() as f64 / 1000.0
}

fn whole_seconds(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// `at - secs`, clamped to the earliest representable instant.
pub fn seconds_before(at: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    at.checked_sub_signed(whole_seconds(secs))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// `at + secs`, clamped to the latest representable instant.
pub fn seconds_after(at: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    at.checked_add_signed(whole_seconds(secs))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
