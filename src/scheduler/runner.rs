//! Retrying, single-flight execution of the daily run.

use super::notify::{NotificationHub, RunEvent};
use super::retry::RetryPolicy;
use crate::config::SchedulerConfig;
use crate::error::{Result, TrackerError};
use crate::report::DailyReport;
use crate::tracker::InventoryTracker;
use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Runs the tracker under a retry policy, one run at a time.
///
/// A second `run` while one is in progress (scheduled or manual) is refused
/// with `AlreadyRunning` rather than queued.
pub struct TaskRunner {
    tracker: InventoryTracker,
    policy: RetryPolicy,
    hub: Arc<NotificationHub>,
    running: Mutex<()>,
    sleeper: Sleeper,
}

impl TaskRunner {
    pub fn new(tracker: InventoryTracker, policy: RetryPolicy) -> Self {
        Self {
            tracker,
            policy,
            hub: Arc::new(NotificationHub::new()),
            running: Mutex::new(()),
            sleeper: Box::new(std::thread::sleep),
        }
    }

    pub fn from_config(tracker: InventoryTracker, config: &SchedulerConfig) -> Self {
        Self::new(tracker, config.retry_policy())
    }

    /// Replace how the runner waits between attempts.
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Publish to an existing hub instead of a private one.
    pub fn with_hub(mut self, hub: Arc<NotificationHub>) -> Self {
        self.hub = hub;
        self
    }

    pub fn hub(&self) -> &Arc<NotificationHub> {
        &self.hub
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn is_running(&self) -> bool {
        self.running.is_locked()
    }

    /// Run for today's local date.
    pub fn run_now(&self) -> Result<DailyReport> {
        self.run(Local::now().date_naive())
    }

    /// Run for `date`, retrying failed attempts until the policy gives up.
    pub fn run(&self, date: NaiveDate) -> Result<DailyReport> {
        let Some(_guard) = self.running.try_lock() else {
            tracing::warn!(%date, "run requested while another is in progress");
            return Err(TrackerError::AlreadyRunning);
        };

        self.hub.publish(&RunEvent::Started { date });

        let mut attempt = 1;
        loop {
            match self.tracker.track(date) {
                Ok(report) => {
                    self.hub.publish(&RunEvent::Succeeded {
                        date,
                        attempt,
                        zero_stock: report.zero_stock.count(),
                        significant_changes: report
                            .changes
                            .as_ref()
                            .map_or(0, |c| c.significant_count()),
                        deactivations: report.deactivations.as_ref().map_or(0, |d| d.count()),
                    });
                    return Ok(report);
                }
                Err(e) if self.policy.should_retry(attempt) => {
                    let wait = self.policy.delay_after(attempt);
                    tracing::warn!(%date, attempt, error = %e, retry_in_secs = wait.as_secs(), "run attempt failed");
                    self.hub.publish(&RunEvent::AttemptFailed {
                        date,
                        attempt,
                        error: e.to_string(),
                        retry_in_secs: wait.as_secs(),
                    });
                    (self.sleeper)(wait);
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(%date, attempts = attempt, error = %e, "run failed, giving up");
                    self.hub.publish(&RunEvent::Failed {
                        date,
                        attempts: attempt,
                        error: e.to_string(),
                    });
                    return Err(TrackerError::RetriesExhausted {
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
            }
        }
    }
}
