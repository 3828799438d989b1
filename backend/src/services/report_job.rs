//! One report run: query the day's bids, build, render, write, deliver.

use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::delivery::{Attachment, DeliveryError, Mailer, OutgoingMail, XLSX_CONTENT_TYPE};
use super::report_builder::build_report;
use super::spreadsheet::{RenderError, SpreadsheetRenderer};
use crate::api::REPORT_DATE_FORMAT;
use crate::config::ReportSettings;
use crate::db::repository::{BidRepository, RepositoryError};

pub const MAIL_BODY: &str = "В приложении отчёт";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to load bids: {0}")]
    Store(#[from] RepositoryError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Failed to write report file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Report task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Write the file but do not send it.
    pub dry_run: bool,
}

/// How a run ended. Delivery failures are an outcome, not an error: the file
/// exists and can be sent again by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    NothingToReport,
    Written {
        path: PathBuf,
        checksum: String,
    },
    Delivered {
        path: PathBuf,
        checksum: String,
        recipients: Vec<String>,
    },
    DeliveryFailed {
        path: PathBuf,
        checksum: String,
        error: String,
    },
}

impl RunOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            RunOutcome::NothingToReport => None,
            RunOutcome::Written { path, .. }
            | RunOutcome::Delivered { path, .. }
            | RunOutcome::DeliveryFailed { path, .. } => Some(path),
        }
    }

    pub fn checksum(&self) -> Option<&str> {
        match self {
            RunOutcome::NothingToReport => None,
            RunOutcome::Written { checksum, .. }
            | RunOutcome::Delivered { checksum, .. }
            | RunOutcome::DeliveryFailed { checksum, .. } => Some(checksum),
        }
    }

    /// Short human readable status.
    pub fn message(&self) -> &'static str {
        match self {
            RunOutcome::NothingToReport => "no bids for date",
            RunOutcome::Written { .. } => "report written",
            RunOutcome::Delivered { .. } => "report sent",
            RunOutcome::DeliveryFailed { .. } => "report written, delivery failed",
        }
    }
}

/// File name of the report for `date`.
pub fn report_file_name(date: NaiveDate) -> String {
    format!("report_{}.xlsx", date.format(REPORT_DATE_FORMAT))
}

pub fn mail_subject(date: NaiveDate) -> String {
    format!("Ежедневный отчёт {}", date.format(REPORT_DATE_FORMAT))
}

/// Write `bytes` to `dir/name` through a `.part` file so the final path only
/// ever holds a complete workbook.
pub fn write_report_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, ReportError> {
    let path = dir.join(name);
    let partial = dir.join(format!("{}.part", name));

    let result = (|| -> std::io::Result<()> {
        fs::create_dir_all(dir)?;
        let mut file = fs::File::create(&partial)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&partial, &path)
    })();

    match result {
        Ok(()) => Ok(path),
        Err(source) => {
            let _ = fs::remove_file(&partial);
            Err(ReportError::Write { path, source })
        }
    }
}

/// Report generation and delivery for one date at a time.
#[derive(Clone)]
pub struct ReportJob {
    repository: Arc<dyn BidRepository>,
    mailer: Arc<dyn Mailer>,
    renderer: SpreadsheetRenderer,
    settings: ReportSettings,
}

impl ReportJob {
    pub fn new(
        repository: Arc<dyn BidRepository>,
        mailer: Arc<dyn Mailer>,
        settings: ReportSettings,
    ) -> Self {
        Self {
            repository,
            mailer,
            renderer: SpreadsheetRenderer::default(),
            settings,
        }
    }

    /// Build the report for `date`, write it and send it.
    pub async fn run(&self, date: NaiveDate, options: RunOptions) -> Result<RunOutcome, ReportError> {
        let records = self.repository.bids_for_day(date).await?;
        log::info!("Report for {}: {} bid(s)", date, records.len());

        let document = match build_report(&records, &self.settings.branch_order) {
            Some(document) => document,
            None => {
                log::info!("No bids for {}, nothing to report", date);
                return Ok(RunOutcome::NothingToReport);
            }
        };
        let checksum = document.checksum();

        let renderer = self.renderer.clone();
        let dir = self.settings.output_dir.clone();
        let name = report_file_name(date);
        let (path, bytes) = tokio::task::spawn_blocking(move || -> Result<_, ReportError> {
            let bytes = renderer.render(&document)?;
            let path = write_report_file(&dir, &name, &bytes)?;
            Ok((path, bytes))
        })
        .await??;
        log::info!(
            "Report for {} written to {} (checksum {})",
            date,
            path.display(),
            checksum
        );

        let recipients = self.settings.recipients.clone();
        if options.dry_run || self.settings.dry_run {
            log::info!("Dry run, delivery of {} skipped", path.display());
            return Ok(RunOutcome::Written { path, checksum });
        }
        if recipients.is_empty() {
            log::info!("No recipients configured, delivery of {} skipped", path.display());
            return Ok(RunOutcome::Written { path, checksum });
        }

        let mail = mail_for(date, &recipients, bytes);
        match self.mailer.send(&mail).await {
            Ok(()) => {
                log::info!("Report for {} sent to {}", date, recipients.join(", "));
                Ok(RunOutcome::Delivered {
                    path,
                    checksum,
                    recipients,
                })
            }
            Err(e) => {
                log_delivery_failure(&path, &e);
                Ok(RunOutcome::DeliveryFailed {
                    path,
                    checksum,
                    error: e.to_string(),
                })
            }
        }
    }
}

fn log_delivery_failure(path: &Path, error: &DeliveryError) {
    log::error!(
        "Report delivery failed, file kept at {}: {}",
        path.display(),
        error
    );
}

/// The report mail for `date` carrying `bytes` as attachment.
pub fn mail_for(date: NaiveDate, recipients: &[String], bytes: Vec<u8>) -> OutgoingMail {
    OutgoingMail {
        recipients: recipients.to_vec(),
        subject: mail_subject(date),
        body: MAIL_BODY.to_string(),
        attachment: Attachment {
            filename: report_file_name(date),
            content_type: XLSX_CONTENT_TYPE.to_string(),
            bytes,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::NewBid;
    use crate::db::repositories::LocalRepository;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<OutgoingMail>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for Recorder {
        async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError::Transport("535 authentication failed".into()));
            }
            self.sent.lock().push(mail.clone());
            Ok(())
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 14).unwrap()
    }

    async fn repo_with_bids() -> Arc<LocalRepository> {
        let repo = Arc::new(LocalRepository::new());
        for (id, branch, hour) in [("1", "МСК", 10), ("2", "СПБ", 9)] {
            repo.insert_bid(&NewBid {
                bid_id: id.to_string(),
                bid_timestamp: date().and_hms_opt(hour, 0, 0).unwrap(),
                direction: "A".to_string(),
                branch: branch.to_string(),
                source_id: "crm".to_string(),
                is_repeat: false,
            })
            .await
            .unwrap();
        }
        repo
    }

    fn settings(dir: &Path, recipients: &[&str]) -> ReportSettings {
        ReportSettings {
            output_dir: dir.to_path_buf(),
            recipients: recipients.iter().map(|s| s.to_string()).collect(),
            ..ReportSettings::default()
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(report_file_name(date()), "report_2025-02-14.xlsx");
        assert_eq!(mail_subject(date()), "Ежедневный отчёт 2025-02-14");
    }

    #[test]
    fn test_write_report_file_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report_file(dir.path(), "r.xlsx", b"data").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"data");
        assert!(!dir.path().join("r.xlsx.part").exists());
    }

    #[test]
    fn test_write_report_file_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where the directory should be
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, b"").unwrap();

        let err = write_report_file(&blocker, "r.xlsx", b"data").unwrap_err();
        assert!(matches!(err, ReportError::Write { .. }));
        assert!(!blocker.join("r.xlsx").exists());
    }

    #[tokio::test]
    async fn test_run_without_bids_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(Recorder::default());
        let job = ReportJob::new(
            Arc::new(LocalRepository::new()),
            mailer.clone(),
            settings(dir.path(), &["a@example.com"]),
        );

        let outcome = job.run(date(), RunOptions::default()).await.unwrap();
        assert_eq!(outcome, RunOutcome::NothingToReport);
        assert!(mailer.sent.lock().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_run_delivers_report() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(Recorder::default());
        let job = ReportJob::new(
            repo_with_bids().await,
            mailer.clone(),
            settings(dir.path(), &["a@example.com", "b@example.com"]),
        );

        let outcome = job.run(date(), RunOptions::default()).await.unwrap();
        let expected_path = dir.path().join("report_2025-02-14.xlsx");
        match &outcome {
            RunOutcome::Delivered {
                path, recipients, ..
            } => {
                assert_eq!(path, &expected_path);
                assert_eq!(recipients.len(), 2);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let sent = mailer.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Ежедневный отчёт 2025-02-14");
        assert_eq!(sent[0].body, MAIL_BODY);
        assert_eq!(sent[0].attachment.filename, "report_2025-02-14.xlsx");
        assert_eq!(sent[0].attachment.bytes, fs::read(&expected_path).unwrap());
    }

    #[tokio::test]
    async fn test_dry_run_skips_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(Recorder::default());
        let job = ReportJob::new(
            repo_with_bids().await,
            mailer.clone(),
            settings(dir.path(), &["a@example.com"]),
        );

        let outcome = job.run(date(), RunOptions { dry_run: true }).await.unwrap();
        assert!(matches!(outcome, RunOutcome::Written { .. }));
        assert!(outcome.path().unwrap().exists());
        assert!(mailer.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_setting_skips_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(Recorder::default());
        let job = ReportJob::new(
            repo_with_bids().await,
            mailer.clone(),
            ReportSettings {
                dry_run: true,
                ..settings(dir.path(), &["a@example.com"])
            },
        );

        let outcome = job.run(date(), RunOptions::default()).await.unwrap();
        assert!(matches!(outcome, RunOutcome::Written { .. }));
        assert!(mailer.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_no_recipients_writes_only() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(Recorder::default());
        let job = ReportJob::new(repo_with_bids().await, mailer.clone(), settings(dir.path(), &[]));

        let outcome = job.run(date(), RunOptions::default()).await.unwrap();
        assert!(matches!(outcome, RunOutcome::Written { .. }));
        assert!(mailer.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let job = ReportJob::new(
            repo_with_bids().await,
            mailer,
            settings(dir.path(), &["a@example.com"]),
        );

        let outcome = job.run(date(), RunOptions::default()).await.unwrap();
        match &outcome {
            RunOutcome::DeliveryFailed { path, error, .. } => {
                assert!(path.exists());
                assert!(error.contains("535"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo_with_bids().await;
        repo.set_healthy(false);
        let job = ReportJob::new(
            repo,
            Arc::new(Recorder::default()),
            settings(dir.path(), &["a@example.com"]),
        );

        let err = job.run(date(), RunOptions::default()).await.unwrap_err();
        assert!(matches!(err, ReportError::Store(_)));
    }

    #[tokio::test]
    async fn test_rerun_produces_same_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let job = ReportJob::new(
            repo_with_bids().await,
            Arc::new(Recorder::default()),
            settings(dir.path(), &[]),
        );

        let first = job.run(date(), RunOptions::default()).await.unwrap();
        let second = job.run(date(), RunOptions::default()).await.unwrap();
        assert_eq!(first.checksum(), second.checksum());
    }
}
