//! In-memory local repository implementation.
//!
//! Suitable for unit testing and local development. All rows live in a `Vec`
//! behind a lock, providing fast, deterministic, and isolated execution.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::api::{BidRecord, BidRowId, NewBid};
use crate::db::repository::{BidRepository, ErrorContext, RepositoryError, RepositoryResult};

/// In-memory local repository.
///
/// # Example
/// ```
/// use bid_report::db::repositories::LocalRepository;
/// use bid_report::db::repository::BidRepository;
///
/// # async fn demo(bid: bid_report::api::NewBid) {
/// let repo = LocalRepository::new();
/// let id = repo.insert_bid(&bid).await.unwrap();
/// let rows = repo.bids_for_day(bid.bid_timestamp.date()).await.unwrap();
/// assert_eq!(rows[0].id, id);
/// # }
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    bids: Vec<BidRecord>,
    next_id: i64,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            bids: Vec::new(),
            next_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Store a fully formed record, keeping its `recorded_at`.
    ///
    /// Test helper for seeding rows with a known insertion time; the row id
    /// is reassigned.
    pub fn seed(&self, mut record: BidRecord) -> BidRowId {
        let mut data = self.data.write();
        record.id = BidRowId(data.next_id);
        data.next_id += 1;
        let id = record.id;
        data.bids.push(record);
        id
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.data.read().bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Simulate a lost connection (or restore it).
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    fn ensure_healthy(data: &LocalData, operation: &str) -> RepositoryResult<()> {
        if data.is_healthy {
            Ok(())
        } else {
            Err(RepositoryError::connection_with_context(
                "local repository marked unhealthy",
                ErrorContext::new(operation),
            ))
        }
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BidRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn insert_bid(&self, bid: &NewBid) -> RepositoryResult<BidRowId> {
        let mut data = self.data.write();
        Self::ensure_healthy(&data, "insert_bid")?;

        let id = BidRowId(data.next_id);
        data.next_id += 1;
        data.bids.push(BidRecord {
            id,
            bid_id: bid.bid_id.clone(),
            branch: bid.branch.clone(),
            direction: bid.direction.clone(),
            bid_timestamp: bid.bid_timestamp,
            recorded_at: Utc::now(),
            source_id: bid.source_id.clone(),
            is_repeat: bid.is_repeat,
        });
        Ok(id)
    }

    async fn bids_for_day(&self, day: NaiveDate) -> RepositoryResult<Vec<BidRecord>> {
        let data = self.data.read();
        Self::ensure_healthy(&data, "bids_for_day")?;

        let mut rows: Vec<BidRecord> = data
            .bids
            .iter()
            .filter(|b| b.bid_day() == day)
            .cloned()
            .collect();
        // Same ordering as the SQL query; sort_by is stable so ties keep insertion order
        rows.sort_by(|a, b| {
            (&a.branch, &a.direction, a.bid_timestamp).cmp(&(&b.branch, &b.direction, b.bid_timestamp))
        });
        Ok(rows)
    }
}
