//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `HOST` / `PORT`: HTTP bind address (default `0.0.0.0:8080`)
//! - `SECRET_KEY`: shared secret expected in the `Authorization` header
//! - `SMTP_SERVER` (required), `SMTP_PORT` (default 465): SMTP relay, implicit TLS
//! - `SMTP_USER`, `SMTP_PASS` (required): credentials; the user is also the sender address
//! - `SMTP_SENDER_NAME` (default `А-Айсберг`): display name of the sender
//! - `SMTP_TIMEOUT_SEC` (default 30): connection and IO timeout for delivery
//! - `REPORT_EMAIL_TO`: comma-separated recipient list
//! - `REPORT_DIR` (default `/tmp`): where report files are written
//! - `REPORT_DRY_RUN` (default false): write reports but never send them
//! - `REPORT_TIME` (default `23:10`, UTC) and `REPORT_GRACE_SEC` (default 3600): daily trigger
//! - `REPORT_SCHEDULER` (default true): run the daily trigger inside the HTTP server
//! - `BRANCH_ORDER_FILE`: TOML file with the branch display ranks

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("{key} has an invalid value '{value}': {message}")]
    Invalid {
        key: &'static str,
        value: String,
        message: String,
    },

    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// Display rank of each named branch.
///
/// Branches with a lower rank come first. Branches missing from the table
/// sort after every ranked branch; equal ranks and unranked branches are
/// ordered by name.
///
/// Loaded from TOML:
///
/// ```toml
/// [branches]
/// "МСК" = 1
/// "СПБ" = 2
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchOrder {
    #[serde(default)]
    branches: BTreeMap<String, i64>,
}

impl Default for BranchOrder {
    fn default() -> Self {
        Self::from_ranks([("МСК", 1), ("СПБ", 2)])
    }
}

impl BranchOrder {
    /// Build a table from `(branch, rank)` pairs.
    pub fn from_ranks<I, S>(ranks: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            branches: ranks.into_iter().map(|(b, r)| (b.into(), r)).collect(),
        }
    }

    /// An empty table: every branch is ordered by name.
    pub fn empty() -> Self {
        Self {
            branches: BTreeMap::new(),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn rank(&self, branch: &str) -> Option<i64> {
        self.branches.get(branch).copied()
    }

    /// Display ordering of two branch names.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.rank(a), self.rank(b)) {
            (Some(ra), Some(rb)) => ra.cmp(&rb).then_with(|| a.cmp(b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }
}

/// SMTP delivery settings.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub sender_name: String,
    pub timeout: Duration,
}

/// Report generation settings.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
    pub recipients: Vec<String>,
    /// Write the report file but skip delivery.
    pub dry_run: bool,
    pub branch_order: BranchOrder,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("/tmp"),
            recipients: Vec::new(),
            dry_run: false,
            branch_order: BranchOrder::default(),
        }
    }
}

/// Daily trigger settings.
#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub enabled: bool,
    /// Time of day (UTC) of the daily run.
    pub at: NaiveTime,
    /// How late a run may still start after its nominal time.
    pub grace: Duration,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            at: NaiveTime::from_hms_opt(23, 10, 0).unwrap_or(NaiveTime::MIN),
            grace: Duration::from_secs(3600),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub secret_key: Option<String>,
    pub smtp: SmtpSettings,
    pub report: ReportSettings,
    pub schedule: ScheduleSettings,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let smtp = SmtpSettings {
            server: required("SMTP_SERVER")?,
            port: parse_or(&lookup, "SMTP_PORT", 465)?,
            user: required("SMTP_USER")?,
            password: required("SMTP_PASS")?,
            sender_name: lookup("SMTP_SENDER_NAME").unwrap_or_else(|| "А-Айсберг".to_string()),
            timeout: Duration::from_secs(parse_or(&lookup, "SMTP_TIMEOUT_SEC", 30u64)?),
        };

        let branch_order = match lookup("BRANCH_ORDER_FILE") {
            Some(path) if !path.trim().is_empty() => BranchOrder::from_file(path.trim())?,
            _ => BranchOrder::default(),
        };

        let report = ReportSettings {
            output_dir: lookup("REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp")),
            recipients: parse_recipients(&lookup("REPORT_EMAIL_TO").unwrap_or_default()),
            dry_run: parse_or(&lookup, "REPORT_DRY_RUN", false)?,
            branch_order,
        };

        let defaults = ScheduleSettings::default();
        let at = match lookup("REPORT_TIME") {
            Some(value) => NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
                ConfigError::Invalid {
                    key: "REPORT_TIME",
                    value: value.clone(),
                    message: e.to_string(),
                }
            })?,
            None => defaults.at,
        };
        let schedule = ScheduleSettings {
            enabled: parse_or(&lookup, "REPORT_SCHEDULER", defaults.enabled)?,
            at,
            grace: Duration::from_secs(parse_or(
                &lookup,
                "REPORT_GRACE_SEC",
                defaults.grace.as_secs(),
            )?),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            secret_key: lookup("SECRET_KEY").filter(|v| !v.is_empty()),
            smtp,
            report,
            schedule,
        })
    }

    /// The shared secret, required by the HTTP server.
    pub fn require_secret(&self) -> Result<&str, ConfigError> {
        self.secret_key
            .as_deref()
            .ok_or(ConfigError::Missing("SECRET_KEY"))
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                value: value.clone(),
                message: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

/// Split a comma-separated recipient list, dropping blanks.
pub fn parse_recipients(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
