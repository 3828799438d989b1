use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;

use super::schema::bids;
use crate::api::{BidRecord, BidRowId, NewBid};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bids)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BidRow {
    pub id: i64,
    pub bidid: String,
    pub biddate: NaiveDateTime,
    pub direction: String,
    pub branch: String,
    pub isrepeat: bool,
    pub source_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bids)]
pub struct NewBidRow {
    pub bidid: String,
    pub biddate: NaiveDateTime,
    pub direction: String,
    pub branch: String,
    pub isrepeat: bool,
    pub source_id: String,
}

impl From<&NewBid> for NewBidRow {
    fn from(bid: &NewBid) -> Self {
        Self {
            bidid: bid.bid_id.clone(),
            biddate: bid.bid_timestamp,
            direction: bid.direction.clone(),
            branch: bid.branch.clone(),
            isrepeat: bid.is_repeat,
            source_id: bid.source_id.clone(),
        }
    }
}

impl From<BidRow> for BidRecord {
    fn from(row: BidRow) -> Self {
        Self {
            id: BidRowId(row.id),
            bid_id: row.bidid,
            branch: row.branch,
            direction: row.direction,
            bid_timestamp: row.biddate,
            recorded_at: row.created_at,
            source_id: row.source_id,
            is_repeat: row.isrepeat,
        }
    }
}
