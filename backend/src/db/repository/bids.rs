//! Bid store repository trait.
//!
//! The store is append-only: bids are inserted one at a time and read back by
//! calendar day for report generation.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::error::RepositoryResult;
use crate::api::{BidRecord, BidRowId, NewBid};

/// Repository trait for bid persistence.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` so a single handle can be shared by
/// the HTTP handlers and the daily scheduler.
#[async_trait]
pub trait BidRepository: Send + Sync {
    /// Check if the store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if connection is healthy
    /// - `Ok(false)` if connection is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Append a bid and return the assigned row id.
    ///
    /// No deduplication is performed: inserting the same `bid_id` twice
    /// stores two rows. `recorded_at` is assigned by the store.
    async fn insert_bid(&self, bid: &NewBid) -> RepositoryResult<BidRowId>;

    /// All bids whose bid timestamp falls on `day`.
    ///
    /// The comparison is made on the date part of the stored timestamp, with
    /// no timezone conversion. Rows are returned ordered by
    /// `(branch, direction, bid_timestamp)`, ties in insertion order.
    async fn bids_for_day(&self, day: NaiveDate) -> RepositoryResult<Vec<BidRecord>>;
}
