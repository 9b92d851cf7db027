//! Daily pollution alerts
//!
//! Rules are scheduled once per day at their fire time in the monitored
//! location's timezone. Each firing fetches a fresh reading, evaluates it
//! against the rule threshold and emails the outcome.

pub mod evaluator;
pub mod rule;
pub mod runner;
pub mod scheduler;

pub use evaluator::{evaluate, Verdict};
pub use rule::{AlertRule, FireTime, RuleError};
pub use runner::{AlertRunner, CheckOutcome};
pub use scheduler::{next_fire_after, AlertScheduler, RebuildSummary, TimerInfo};
