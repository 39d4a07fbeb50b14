//! Cron-driven trigger for the weekly report.
//!
//! Fires a job on a cron schedule, optionally once at startup, and notes when
//! a firing starts later than planned.

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

/// Every Friday at 08:00 UTC (fields: sec min hour day-of-month month day-of-week).
///
/// Weekdays are written by name. Numeric weekdays count from `1` = Sunday, so
/// `5` is Thursday here while NCRONTAB (Azure Functions) reads it as Friday.
pub const DEFAULT_SCHEDULE: &str = "0 0 8 * * Fri";

/// How late a firing may start before it counts as past due.
pub const PAST_DUE_GRACE: Duration = Duration::from_secs(1);

/// Parses a cron expression with a leading seconds field.
///
/// Numeric day-of-week values run from `1` (Sunday) to `7` (Saturday), one
/// ahead of NCRONTAB. Prefer names such as `Fri`.
///
/// # Errors
///
/// Returns an error if the expression is not valid cron syntax.
pub fn parse_schedule(expression: &str) -> Result<Schedule, cron::error::Error> {
    Schedule::from_str(expression)
}

/// Returns whether a firing started more than `grace` after its planned time.
#[must_use]
pub fn is_past_due(scheduled: DateTime<Utc>, started: DateTime<Utc>, grace: Duration) -> bool {
    (started - scheduled)
        .to_std()
        .is_ok_and(|late| late > grace)
}

/// Describes one firing, handed to the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerInfo {
    /// Planned time, or `None` for the startup run.
    pub scheduled: Option<DateTime<Utc>>,
    /// The firing started later than the grace period allows.
    pub past_due: bool,
}

/// Drives a job from a cron schedule.
#[derive(Debug, Clone)]
pub struct Scheduler {
    schedule: Schedule,
    run_on_startup: bool,
}

impl Scheduler {
    /// Creates a scheduler from a cron expression.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression is not valid cron syntax.
    pub fn new(expression: &str, run_on_startup: bool) -> Result<Self, cron::error::Error> {
        Ok(Self {
            schedule: parse_schedule(expression)?,
            run_on_startup,
        })
    }

    /// Returns the first firing strictly after `after`.
    #[must_use]
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Returns the next `count` firings from now.
    #[must_use]
    pub fn upcoming(&self, count: usize) -> Vec<DateTime<Utc>> {
        self.schedule.upcoming(Utc).take(count).collect()
    }

    /// Runs `job` on every firing until `shutdown` completes.
    ///
    /// Firings never overlap: the next one is computed after the job returns.
    /// A run that overlaps later firings is followed by a single catch-up run,
    /// not one per missed firing. Shutdown is only observed while waiting, so
    /// a job in progress always completes.
    ///
    /// # Example
    ///
    /// ```
    /// use reporter::Scheduler;
    ///
    /// # tokio_test::block_on(async {
    /// let scheduler = Scheduler::new("0 0 8 * * Fri", true).unwrap();
    /// let mut runs = 0;
    /// scheduler
    ///     .run(
    ///         |_| {
    ///             runs += 1;
    ///             async {}
    ///         },
    ///         async {},
    ///     )
    ///     .await;
    /// assert_eq!(runs, 1);
    /// # });
    /// ```
    pub async fn run<F, Fut>(&self, mut job: F, shutdown: impl Future<Output = ()>)
    where
        F: FnMut(TimerInfo) -> Fut,
        Fut: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if self.run_on_startup {
            tracing::info!("Running report at startup");
            job(TimerInfo {
                scheduled: None,
                past_due: false,
            })
            .await;
        }

        let mut cursor = Utc::now();
        loop {
            let Some(next) = self.next_after(cursor) else {
                tracing::warn!("Schedule has no future firings, stopping");
                return;
            };
            tracing::info!(next = %next, "Next report scheduled");

            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                () = &mut shutdown => {
                    tracing::info!("Scheduler stopping");
                    return;
                }
            }

            let past_due = is_past_due(next, Utc::now(), PAST_DUE_GRACE);
            if past_due {
                tracing::info!(scheduled = %next, "The timer is past due!");
            }

            job(TimerInfo {
                scheduled: Some(next),
                past_due,
            })
            .await;

            cursor = if past_due { Utc::now() } else { next };
        }
    }
}
