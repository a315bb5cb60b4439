use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::utils::time::elapsed_seconds;

const KEY_PREFIX: &str = "hint_attempts";

const REVISION_MASK: u64 = (1 << 53) - 1;

// ':' separates key segments, so it (and '%') must never appear raw inside one.
const KEY_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS.add(b':').add(b'%').add(b' ');

/// Identifies one attempt record: a user working on one question of one level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
pub struct AttemptKey {
    #[validate(length(min = 1, max = 256, message = "user_id is required"))]
    pub user_id: String,
    #[validate(length(min = 1, max = 256, message = "level_id is required"))]
    pub level_id: String,
    #[validate(length(min = 1, max = 256, message = "question_id is required"))]
    pub question_id: String,
}

impl AttemptKey {
    pub fn new(
        user_id: impl Into<String>,
        level_id: impl Into<String>,
        question_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            level_id: level_id.into(),
            question_id: question_id.into(),
        }
    }

    /// Deterministic store key, e.g. `hint_attempts:u1:lvl-2:q%3A7`.
    pub fn storage_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            KEY_PREFIX,
            utf8_percent_encode(&self.user_id, KEY_SEGMENT_ENCODE_SET),
            utf8_percent_encode(&self.level_id, KEY_SEGMENT_ENCODE_SET),
            utf8_percent_encode(&self.question_id, KEY_SEGMENT_ENCODE_SET),
        )
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.level_id, self.question_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptEntry {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    /// Hint level this acceptance unlocked.
    pub hint_level_at_time: u32,
}

/// Per-key gate state.
///
/// `count` is the hint level handed to the content generator. `attempts` is
/// append-only and ascending by timestamp; when history pruning is on it only
/// keeps the entries still inside the rate-limit window, and `count` stays
/// authoritative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub first_asked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_asked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_question_text: Option<String>,
    #[serde(default)]
    pub attempts: Vec<AttemptEntry>,
    /// Write token for conditional puts. Redrawn on every accepted write, so
    /// unlike `count` it does not come back after a reset or expiry.
    #[serde(default)]
    pub revision: u64,
}

impl AttemptRecord {
    /// Applies an accepted request and returns the new hint level.
    pub fn record_acceptance(&mut self, message: &str, now: DateTime<Utc>) -> u32 {
        self.count += 1;
        self.first_asked_at.get_or_insert(now);
        self.last_asked_at = Some(now);
        self.last_question_text = Some(message.to_string());
        self.attempts.push(AttemptEntry {
            timestamp: now,
            text: message.to_string(),
            hint_level_at_time: self.count,
        });
        self.count
    }

    /// Replaces `revision` with a fresh random value.
    pub fn next_revision(&mut self) -> u64 {
        let previous = self.revision;
        while self.revision == previous {
            // Kept below 2^53 so the value survives Lua's double-based cjson.
            self.revision = rand::random::<u64>() & REVISION_MASK;
        }
        self.revision
    }

    /// Drops history entries at or before `cutoff`. Returns how many were removed.
    pub fn prune_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.attempts.len();
        self.attempts.retain(|entry| entry.timestamp > cutoff);
        before - self.attempts.len()
    }

    /// Accepted attempts strictly after `cutoff`.
    pub fn attempts_after(&self, cutoff: DateTime<Utc>) -> impl Iterator<Item = &AttemptEntry> {
        self.attempts
            .iter()
            .filter(move |entry| entry.timestamp > cutoff)
    }
}

/// Administrative view of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptStats {
    pub count: u32,
    pub attempts: Vec<AttemptEntry>,
    pub total_time_seconds: f64,
    pub average_interval_seconds: f64,
}

impl From<AttemptRecord> for AttemptStats {
    fn from(record: AttemptRecord) -> Self {
        let total_time_seconds = match (record.first_asked_at, record.last_asked_at) {
            (Some(first), Some(last)) => elapsed_seconds(first, last),
            _ => 0.0,
        };

        // Pruned history no longer holds every gap, but first/last and count do.
        let average_interval_seconds = if record.count > 1 {
            total_time_seconds / f64::from(record.count - 1)
        } else {
            0.0
        };

        Self {
            count: record.count,
            attempts: record.attempts,
            total_time_seconds,
            average_interval_seconds,
        }
    }
}
