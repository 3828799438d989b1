//! Daily report trigger.
//!
//! [`DailySchedule`] holds the pure timing rules; [`run_daily`] is the loop
//! that sleeps until each firing and runs the report job for the UTC date of
//! that firing. A firing that starts later than the grace window (host asleep,
//! process paused) is skipped and logged.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ScheduleSettings;
use crate::services::{ReportError, ReportJob, RunOptions, RunOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    /// Time of day, UTC.
    pub at: NaiveTime,
    pub grace: Duration,
}

impl From<&ScheduleSettings> for DailySchedule {
    fn from(settings: &ScheduleSettings) -> Self {
        Self {
            at: settings.at,
            grace: settings.grace,
        }
    }
}

impl DailySchedule {
    pub fn new(at: NaiveTime, grace: Duration) -> Self {
        Self { at, grace }
    }

    /// First firing strictly after `now`.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.at).and_utc();
        if today > now {
            today
        } else {
            today + ChronoDuration::days(1)
        }
    }

    /// Whether a firing scheduled at `scheduled` may still start at `now`.
    pub fn is_within_grace(&self, scheduled: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if now < scheduled {
            return false;
        }
        match (now - scheduled).to_std() {
            Ok(late) => late <= self.grace,
            Err(_) => false,
        }
    }
}

/// What happened to one firing.
#[derive(Debug)]
pub enum Firing {
    /// Started after the grace window; not run.
    Missed { late_by: Duration },
    Ran(Result<RunOutcome, ReportError>),
}

/// Handle the firing scheduled at `scheduled`, observed at `now`.
pub async fn fire(
    job: &ReportJob,
    schedule: &DailySchedule,
    scheduled: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Firing {
    if !schedule.is_within_grace(scheduled, now) {
        let late_by = (now - scheduled).to_std().unwrap_or_default();
        log::warn!(
            "Skipping report firing scheduled at {}: started {:?} late, grace is {:?}",
            scheduled,
            late_by,
            schedule.grace
        );
        return Firing::Missed { late_by };
    }

    let date = scheduled.date_naive();
    log::info!("Scheduled report run for {}", date);
    let result = job.run(date, RunOptions::default()).await;
    match &result {
        Ok(outcome) => log::info!("Scheduled report for {}: {}", date, outcome.message()),
        Err(e) => log::error!("Scheduled report for {} failed: {}", date, e),
    }
    Firing::Ran(result)
}

/// Run the daily trigger until `shutdown` resolves.
pub async fn run_daily<S>(job: Arc<ReportJob>, schedule: DailySchedule, shutdown: S)
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    log::info!(
        "Daily report trigger at {} UTC (grace {:?})",
        schedule.at,
        schedule.grace
    );

    loop {
        let now = Utc::now();
        let next = schedule.next_fire_after(now);
        let wait = (next - now).to_std().unwrap_or_default();
        log::debug!("Next report firing at {} (in {:?})", next, wait);

        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Daily report trigger stopped");
                break;
            }
            _ = tokio::time::sleep(wait) => {
                fire(&job, &schedule, next, Utc::now()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests;
