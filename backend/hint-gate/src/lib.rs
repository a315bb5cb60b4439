//! Throttling and abuse-prevention gate for in-conversation quiz hints.
//!
//! Every chat message asking for a stronger hint goes through
//! [`HintGateService::evaluate`], which either raises the hint level for the
//! (user, level, question) key or returns a rejection with a reason the chat
//! layer can show to the player.

pub mod config;
pub mod error;
pub mod gates;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod utils;

pub use config::{Config, GateConfig};
pub use error::GateError;
pub use models::{AttemptKey, AttemptStats, Decision, EvaluateRequest, RejectionReason};
pub use services::{AppState, HintGateService};
