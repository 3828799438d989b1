//! Public API surface for the bid report backend.
//!
//! This file consolidates the record types shared by the store, the report
//! builder and the HTTP layer. All types derive Serialize/Deserialize for JSON
//! serialization.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire format of bid timestamps accepted on ingestion and shown in reports.
pub const BID_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Wire format of report dates (`report_date` query parameter, file names).
pub const REPORT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Bid row identifier (database primary key).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BidRowId(pub i64);

impl BidRowId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for BidRowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bid event as submitted by an external caller, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBid {
    /// External bid identifier. Not unique: duplicates are stored as-is.
    pub bid_id: String,
    /// Moment of the bid as reported by the caller (no timezone).
    pub bid_timestamp: NaiveDateTime,
    pub direction: String,
    pub branch: String,
    /// Identifier of the submitting system.
    pub source_id: String,
    #[serde(default)]
    pub is_repeat: bool,
}

/// A stored bid event.
///
/// Immutable once read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRecord {
    pub id: BidRowId,
    pub bid_id: String,
    pub branch: String,
    pub direction: String,
    pub bid_timestamp: NaiveDateTime,
    /// Server-assigned insertion time.
    pub recorded_at: DateTime<Utc>,
    pub source_id: String,
    #[serde(default)]
    pub is_repeat: bool,
}

impl BidRecord {
    /// Calendar day of the bid, taken from the stored timestamp as-is.
    pub fn bid_day(&self) -> NaiveDate {
        self.bid_timestamp.date()
    }
}

/// Parse a bid timestamp in `DD.MM.YYYY HH:MM:SS` format.
pub fn parse_bid_timestamp(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value.trim(), BID_TIMESTAMP_FORMAT).map_err(|e| {
        format!(
            "biddate must be in format DD.MM.YYYY HH:MM:SS, got '{}': {}",
            value, e
        )
    })
}

/// Parse a report date in `YYYY-MM-DD` format.
pub fn parse_report_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), REPORT_DATE_FORMAT)
        .map_err(|_| format!("Invalid date format '{}', expected YYYY-MM-DD", value))
}
