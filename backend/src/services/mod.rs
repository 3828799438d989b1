//! Service layer for report generation and delivery.
//!
//! This module sits between the bid store and the transports (HTTP, timer).
//! The builder is pure; the renderer, the mailer and the report job carry the
//! I/O.

pub mod delivery;
pub mod report_builder;
pub mod report_job;
pub mod spreadsheet;

pub use delivery::{Attachment, DeliveryError, Mailer, OutgoingMail, SmtpMailer};
pub use report_builder::{build_report, GroupKind, OutlineGroup, ReportDocument, ReportRow, RowKind};
pub use report_job::{ReportError, ReportJob, RunOptions, RunOutcome};
pub use spreadsheet::{RenderError, SpreadsheetRenderer};
