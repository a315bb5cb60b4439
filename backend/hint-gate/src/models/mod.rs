pub mod attempt;
pub mod hint;

pub use attempt::{AttemptEntry, AttemptKey, AttemptRecord, AttemptStats};
pub use hint::{Decision, EvaluateRequest, Rejection, RejectionReason};
