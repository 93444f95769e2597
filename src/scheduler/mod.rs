//! Scheduling of the daily run.
//!
//! The tracker itself is a plain batch job. This module adds what is needed
//! to run it unattended: the configured time of day, a bounded retry policy
//! for failed attempts, single-flight execution, and run notifications.

mod notify;
mod retry;
mod runner;
mod schedule;

pub use notify::{NotificationHub, RunEvent, RunSubscription, SubscriberId};
pub use retry::{Backoff, RetryPolicy};
pub use runner::TaskRunner;
pub use schedule::DailySchedule;
