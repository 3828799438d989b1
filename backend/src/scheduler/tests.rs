//! Timing rules and firing behaviour of the daily trigger.

use super::*;
use crate::api::NewBid;
use crate::config::ReportSettings;
use crate::db::repositories::LocalRepository;
use crate::db::repository::BidRepository;
use crate::services::{DeliveryError, Mailer, OutgoingMail};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone};

struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send(&self, _mail: &OutgoingMail) -> Result<(), DeliveryError> {
        Ok(())
    }
}

fn schedule() -> DailySchedule {
    DailySchedule::new(
        NaiveTime::from_hms_opt(23, 10, 0).unwrap(),
        Duration::from_secs(3600),
    )
}

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

#[test]
fn test_next_fire_later_today() {
    let next = schedule().next_fire_after(utc(2025, 2, 14, 12, 0, 0));
    assert_eq!(next, utc(2025, 2, 14, 23, 10, 0));
}

#[test]
fn test_next_fire_tomorrow_once_passed() {
    let next = schedule().next_fire_after(utc(2025, 2, 14, 23, 30, 0));
    assert_eq!(next, utc(2025, 2, 15, 23, 10, 0));
}

#[test]
fn test_next_fire_is_strictly_after_now() {
    let at = utc(2025, 2, 14, 23, 10, 0);
    assert_eq!(schedule().next_fire_after(at), utc(2025, 2, 15, 23, 10, 0));
}

#[test]
fn test_next_fire_crosses_month_end() {
    let next = schedule().next_fire_after(utc(2025, 2, 28, 23, 59, 0));
    assert_eq!(next, utc(2025, 3, 1, 23, 10, 0));
}

#[test]
fn test_grace_window() {
    let s = schedule();
    let scheduled = utc(2025, 2, 14, 23, 10, 0);

    assert!(s.is_within_grace(scheduled, scheduled));
    assert!(s.is_within_grace(scheduled, utc(2025, 2, 15, 0, 10, 0)));
    assert!(!s.is_within_grace(scheduled, utc(2025, 2, 15, 0, 10, 1)));
    assert!(!s.is_within_grace(scheduled, utc(2025, 2, 14, 23, 9, 59)));
}

#[test]
fn test_schedule_from_settings() {
    let s = DailySchedule::from(&ScheduleSettings::default());
    assert_eq!(s, schedule());
}

async fn job_with_bid(dir: &std::path::Path) -> ReportJob {
    let repo = Arc::new(LocalRepository::new());
    repo.insert_bid(&NewBid {
        bid_id: "1".to_string(),
        bid_timestamp: NaiveDate::from_ymd_opt(2025, 2, 14)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap(),
        direction: "A".to_string(),
        branch: "МСК".to_string(),
        source_id: "crm".to_string(),
        is_repeat: false,
    })
    .await
    .unwrap();
    ReportJob::new(
        repo,
        Arc::new(NullMailer),
        ReportSettings {
            output_dir: dir.to_path_buf(),
            ..ReportSettings::default()
        },
    )
}

#[tokio::test]
async fn test_fire_runs_for_scheduled_date() {
    let dir = tempfile::tempdir().unwrap();
    let job = job_with_bid(dir.path()).await;
    let scheduled = utc(2025, 2, 14, 23, 10, 0);

    let firing = fire(&job, &schedule(), scheduled, utc(2025, 2, 14, 23, 10, 2)).await;
    match firing {
        Firing::Ran(Ok(RunOutcome::Written { path, .. })) => {
            assert!(path.ends_with("report_2025-02-14.xlsx"));
        }
        other => panic!("unexpected firing {:?}", other),
    }
}

#[tokio::test]
async fn test_fire_uses_date_of_firing_not_of_start() {
    let dir = tempfile::tempdir().unwrap();
    let job = job_with_bid(dir.path()).await;

    // next day's firing has no bids
    let scheduled = utc(2025, 2, 15, 23, 10, 0);
    let firing = fire(&job, &schedule(), scheduled, scheduled).await;
    assert!(matches!(firing, Firing::Ran(Ok(RunOutcome::NothingToReport))));
}

#[tokio::test]
async fn test_late_firing_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let job = job_with_bid(dir.path()).await;
    let scheduled = utc(2025, 2, 14, 23, 10, 0);

    let firing = fire(&job, &schedule(), scheduled, utc(2025, 2, 15, 1, 0, 0)).await;
    match firing {
        Firing::Missed { late_by } => assert_eq!(late_by, Duration::from_secs(110 * 60)),
        other => panic!("unexpected firing {:?}", other),
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_run_daily_stops_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let job = Arc::new(job_with_bid(dir.path()).await);

    let handle = tokio::spawn(run_daily(job, schedule(), async {}));
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("trigger did not stop")
        .unwrap();
}
