use std::collections::HashSet;

use super::{Gate, GateContext};
use crate::models::{Rejection, RejectionReason};

/// Rejects a message that is nearly the same as the last accepted one.
///
/// Only the immediately preceding message is compared, so alternating
/// between two phrasings is not caught.
pub struct DuplicateDetector {
    threshold: f64,
}

impl DuplicateDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Gate for DuplicateDetector {
    fn name(&self) -> &'static str {
        "duplicate"
    }

    fn check(&self, ctx: &GateContext<'_>) -> Result<(), Rejection> {
        let Some(previous) = ctx.record.last_question_text.as_deref() else {
            return Ok(());
        };

        let similarity = jaccard_similarity(ctx.message, previous);
        if similarity > self.threshold {
            tracing::debug!(similarity, "Message too close to the previous one");
            return Err(Rejection::new(RejectionReason::Duplicate));
        }

        Ok(())
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Jaccard index over lower-cased whitespace tokens. Two empty texts count
/// as identical.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let left = word_set(a);
    let right = word_set(b);

    if left.is_empty() && right.is_empty() {
        return 1.0;
    }

    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f64 / union as f64
}
