//! Data Transfer Objects for the HTTP API.
//!
//! Field names follow the wire format existing bid sources already send
//! (`bidid`, `biddate`, `isrepeat`).

use serde::{Deserialize, Serialize};

use crate::api::{parse_bid_timestamp, NewBid};

/// Request body of `POST /add_bid/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBidRequest {
    #[serde(rename = "bidid", alias = "bid_id")]
    pub bid_id: String,
    /// `DD.MM.YYYY HH:MM:SS`
    #[serde(rename = "biddate", alias = "bid_date")]
    pub bid_date: String,
    pub direction: String,
    pub branch: String,
    pub source_id: String,
    #[serde(rename = "isrepeat", alias = "is_repeat", default)]
    pub is_repeat: bool,
}

impl AddBidRequest {
    /// Validate the timestamp and convert into a storable bid.
    pub fn into_new_bid(self) -> Result<NewBid, String> {
        let bid_timestamp = parse_bid_timestamp(&self.bid_date)?;
        Ok(NewBid {
            bid_id: self.bid_id,
            bid_timestamp,
            direction: self.direction,
            branch: self.branch,
            source_id: self.source_id,
            is_repeat: self.is_repeat,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBidResponse {
    pub status: String,
    pub id: i64,
}

/// Query of `GET /send_report_now/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    /// `YYYY-MM-DD`; today (UTC) when absent
    pub report_date: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportTriggerResponse {
    pub status: String,
    pub message: String,
    pub report_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_error: Option<String>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}
