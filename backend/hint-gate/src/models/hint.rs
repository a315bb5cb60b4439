use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use super::attempt::AttemptKey;

/// One chat message asking for a stronger hint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EvaluateRequest {
    #[validate(length(min = 1, max = 256, message = "user_id is required"))]
    pub user_id: String,
    #[validate(length(min = 1, max = 256, message = "level_id is required"))]
    pub level_id: String,
    #[validate(length(min = 1, max = 256, message = "question_id is required"))]
    pub question_id: String,
    #[serde(default)]
    pub message: String,
}

impl EvaluateRequest {
    pub fn new(
        user_id: impl Into<String>,
        level_id: impl Into<String>,
        question_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            level_id: level_id.into(),
            question_id: question_id.into(),
            message: message.into(),
        }
    }

    pub fn key(&self) -> AttemptKey {
        AttemptKey::new(&self.user_id, &self.level_id, &self.question_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    TimeThrottle,
    TooShort,
    SpamPattern,
    NoMeaningfulWords,
    Duplicate,
    InsufficientThinking,
    RateLimit,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::TimeThrottle => "time_throttle",
            RejectionReason::TooShort => "too_short",
            RejectionReason::SpamPattern => "spam_pattern",
            RejectionReason::NoMeaningfulWords => "no_meaningful_words",
            RejectionReason::Duplicate => "duplicate",
            RejectionReason::InsufficientThinking => "insufficient_thinking",
            RejectionReason::RateLimit => "rate_limit",
        }
    }

    /// Text shown to the player in the chat.
    pub fn user_message(&self, retry_after_seconds: Option<u64>) -> String {
        match (self, retry_after_seconds) {
            (RejectionReason::TimeThrottle, Some(secs)) => format!(
                "Please wait {} more second{} before asking for another hint.",
                secs,
                if secs == 1 { "" } else { "s" }
            ),
            (RejectionReason::TimeThrottle, None) => {
                "Please wait a moment before asking for another hint.".to_string()
            }
            (RejectionReason::TooShort, _) => {
                "Your message is too short. Tell me what you are stuck on.".to_string()
            }
            (RejectionReason::SpamPattern, _) => {
                "That doesn't look like a question. Ask about the quiz and I'll help.".to_string()
            }
            (RejectionReason::NoMeaningfulWords, _) => {
                "Use a few real words to describe what you need help with.".to_string()
            }
            (RejectionReason::Duplicate, _) => {
                "You just asked that. Try rephrasing, or think over the last hint first."
                    .to_string()
            }
            (RejectionReason::InsufficientThinking, Some(secs)) => format!(
                "Spend a little more time with the last hint. Try again in {} second{}.",
                secs,
                if secs == 1 { "" } else { "s" }
            ),
            (RejectionReason::InsufficientThinking, None) => {
                "Spend a little more time with the last hint before asking for the next one."
                    .to_string()
            }
            (RejectionReason::RateLimit, _) => {
                "You've asked for a lot of hints this hour. Take a break and come back later."
                    .to_string()
            }
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gate's verdict against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub reason: RejectionReason,
    pub retry_after_seconds: Option<u64>,
}

impl Rejection {
    pub fn new(reason: RejectionReason) -> Self {
        Self {
            reason,
            retry_after_seconds: None,
        }
    }

    pub fn retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_seconds = Some(seconds);
        self
    }
}

impl From<RejectionReason> for Rejection {
    fn from(reason: RejectionReason) -> Self {
        Rejection::new(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    /// Record count after this call.
    pub hint_level: u32,
    pub reason: Option<RejectionReason>,
    pub retry_after_seconds: Option<u64>,
    pub user_message: String,
}

impl Decision {
    pub fn allowed(hint_level: u32) -> Self {
        Self {
            allowed: true,
            hint_level,
            reason: None,
            retry_after_seconds: None,
            user_message: format!("Hint level {} unlocked.", hint_level),
        }
    }

    pub fn rejected(rejection: Rejection, hint_level: u32) -> Self {
        Self {
            allowed: false,
            hint_level,
            reason: Some(rejection.reason),
            retry_after_seconds: rejection.retry_after_seconds,
            user_message: rejection
                .reason
                .user_message(rejection.retry_after_seconds),
        }
    }

    /// Metric label: `allowed` or the rejection reason.
    pub fn outcome(&self) -> &'static str {
        self.reason.map_or("allowed", |reason| reason.as_str())
    }
}
