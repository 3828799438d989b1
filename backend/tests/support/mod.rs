//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use bid_report::api::NewBid;
use bid_report::config::{BranchOrder, ReportSettings};
use bid_report::services::{DeliveryError, Mailer, OutgoingMail};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK poisoned");
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Mailer double that records every message, optionally failing instead.
#[derive(Default)]
pub struct RecordingMailer {
    sent: parking_lot::Mutex<Vec<OutgoingMail>>,
    failure: Option<String>,
}

impl RecordingMailer {
    pub fn failing(message: &str) -> Self {
        Self {
            sent: parking_lot::Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        if let Some(message) = &self.failure {
            return Err(DeliveryError::Transport(message.clone()));
        }
        self.sent.lock().push(mail.clone());
        Ok(())
    }
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 14).unwrap()
}

pub fn at(hms: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(&format!("2025-02-14 {}", hms), "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn new_bid(id: &str, branch: &str, direction: &str, hms: &str, is_repeat: bool) -> NewBid {
    NewBid {
        bid_id: id.to_string(),
        bid_timestamp: at(hms),
        direction: direction.to_string(),
        branch: branch.to_string(),
        source_id: "crm".to_string(),
        is_repeat,
    }
}

pub fn report_settings(dir: &Path, recipients: &[&str]) -> ReportSettings {
    ReportSettings {
        output_dir: dir.to_path_buf(),
        recipients: recipients.iter().map(|s| s.to_string()).collect(),
        dry_run: false,
        branch_order: BranchOrder::default(),
    }
}
