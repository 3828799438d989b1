//! Daily bid report builder.
//!
//! Turns the flat list of bids recorded for one day into a
//! [`ReportDocument`]: a header row, body rows arranged as
//! branch → direction → bid, and the collapsible outline groups the renderer
//! applies over those rows.
//!
//! ```text
//! row 0   header
//! row 1   МСК            paid repeat total   ┐ branch group, level 1
//! row 2     A            paid repeat total   │
//! row 3       bid 2 ...  0    1      1       │ ┐ direction group, level 2
//! row 4       bid 1 ...  1    0      1       ┘ ┘ detail group, level 3 (collapsed)
//! row 5   СПБ ...
//! ```
//!
//! The builder is pure: the same records and branch table always produce the
//! same document, and the document carries no generation timestamp.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::api::{BidRecord, BID_TIMESTAMP_FORMAT};
use crate::config::BranchOrder;

/// Column labels of the report, in order:
/// branch, direction, bid id, bid date, created at, paid, repeat, total.
pub const COLUMN_LABELS: [&str; 8] = [
    "Филиал",
    "Направление",
    "Заявка",
    "Дата",
    "Создано",
    "Оплаченные",
    "Повторные",
    "Всего",
];

/// Bid counts of one branch or one branch/direction pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub total: u32,
    pub repeat: u32,
}

impl GroupStats {
    pub fn paid(&self) -> u32 {
        self.total - self.repeat
    }

    fn add(&mut self, is_repeat: bool) {
        self.total += 1;
        if is_repeat {
            self.repeat += 1;
        }
    }
}

/// What a body row stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    BranchHeader,
    DirectionHeader,
    Detail,
}

impl RowKind {
    pub fn is_header(&self) -> bool {
        !matches!(self, RowKind::Detail)
    }
}

/// One spreadsheet cell as rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Blank,
    Text(String),
    Number(u32),
}

impl Cell {
    /// Text shown for this cell, used for column sizing.
    pub fn display_text(&self) -> String {
        match self {
            Cell::Blank => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

/// One body row of the report.
///
/// Every row carries its branch and direction so it can be located in the
/// hierarchy; header rows only display the name of their own level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub kind: RowKind,
    pub branch: String,
    pub direction: Option<String>,
    pub bid_id: Option<String>,
    pub bid_timestamp: Option<NaiveDateTime>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub paid: u32,
    pub repeat: u32,
    pub total: u32,
}

impl ReportRow {
    fn branch_header(branch: &str, stats: GroupStats) -> Self {
        Self {
            kind: RowKind::BranchHeader,
            branch: branch.to_string(),
            direction: None,
            bid_id: None,
            bid_timestamp: None,
            recorded_at: None,
            paid: stats.paid(),
            repeat: stats.repeat,
            total: stats.total,
        }
    }

    fn direction_header(branch: &str, direction: &str, stats: GroupStats) -> Self {
        Self {
            kind: RowKind::DirectionHeader,
            direction: Some(direction.to_string()),
            ..Self::branch_header(branch, stats)
        }
    }

    fn detail(record: &BidRecord) -> Self {
        let repeat = u32::from(record.is_repeat);
        Self {
            kind: RowKind::Detail,
            branch: record.branch.clone(),
            direction: Some(record.direction.clone()),
            bid_id: Some(record.bid_id.clone()),
            bid_timestamp: Some(record.bid_timestamp),
            recorded_at: Some(record.recorded_at),
            paid: 1 - repeat,
            repeat,
            total: 1,
        }
    }

    /// Cells as written to the sheet, one per entry of [`COLUMN_LABELS`].
    pub fn cells(&self) -> [Cell; 8] {
        let text = |value: Option<&str>| match value {
            Some(v) => Cell::Text(v.to_string()),
            None => Cell::Blank,
        };
        let (branch, direction) = match self.kind {
            RowKind::BranchHeader => (Cell::Text(self.branch.clone()), Cell::Blank),
            RowKind::DirectionHeader => (Cell::Blank, text(self.direction.as_deref())),
            RowKind::Detail => (Cell::Blank, Cell::Blank),
        };
        [
            branch,
            direction,
            text(self.bid_id.as_deref()),
            text(
                self.bid_timestamp
                    .map(|ts| ts.format(BID_TIMESTAMP_FORMAT).to_string())
                    .as_deref(),
            ),
            text(
                self.recorded_at
                    .map(|ts| ts.format(BID_TIMESTAMP_FORMAT).to_string())
                    .as_deref(),
            ),
            Cell::Number(self.paid),
            Cell::Number(self.repeat),
            Cell::Number(self.total),
        ]
    }
}

/// Which block of rows an outline group folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// Everything under a branch header.
    Branch,
    /// Everything under a direction header.
    Direction,
    /// The bid rows of a direction.
    DirectionDetail,
}

impl GroupKind {
    pub fn outline_level(&self) -> u8 {
        match self {
            GroupKind::Branch => 1,
            GroupKind::Direction => 2,
            GroupKind::DirectionDetail => 3,
        }
    }

    pub fn initially_collapsed(&self) -> bool {
        matches!(self, GroupKind::DirectionDetail)
    }
}

/// A collapsible range of worksheet rows.
///
/// Rows are zero-based worksheet rows: row 0 is the column header, body row
/// `i` sits on worksheet row `i + 1`. Both ends are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineGroup {
    pub kind: GroupKind,
    pub first_row: u32,
    pub last_row: u32,
    pub level: u8,
    pub collapsed: bool,
}

impl OutlineGroup {
    /// Group over `first..=last`, or `None` for an empty range.
    fn covering(kind: GroupKind, first_row: u32, last_row: u32) -> Option<Self> {
        (last_row >= first_row).then(|| Self {
            kind,
            first_row,
            last_row,
            level: kind.outline_level(),
            collapsed: kind.initially_collapsed(),
        })
    }

    pub fn contains(&self, other: &OutlineGroup) -> bool {
        self.first_row <= other.first_row && other.last_row <= self.last_row
    }
}

/// Render-ready report for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub header: Vec<String>,
    pub rows: Vec<ReportRow>,
    /// Groups in the order their blocks close while walking the rows.
    pub groups: Vec<OutlineGroup>,
}

impl ReportDocument {
    /// Number of bid (detail) rows.
    pub fn bid_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| !r.kind.is_header())
            .count()
    }

    /// Worksheet row of body row `index`.
    pub fn sheet_row(index: usize) -> u32 {
        index as u32 + 1
    }

    /// SHA-256 of the serialized document, hex encoded.
    pub fn checksum(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&json);
        hex::encode(hasher.finalize())
    }
}

/// Bids of one direction, in bid-time order.
struct DirectionNode<'a> {
    name: &'a str,
    bids: Vec<&'a BidRecord>,
}

/// Directions of one branch, in first-seen order.
struct BranchNode<'a> {
    name: &'a str,
    directions: Vec<DirectionNode<'a>>,
    direction_index: HashMap<&'a str, usize>,
}

/// Insertion-ordered branch → direction → bids tree.
struct ReportTree<'a> {
    branches: Vec<BranchNode<'a>>,
    branch_index: HashMap<&'a str, usize>,
}

impl<'a> ReportTree<'a> {
    fn from_records(records: &[&'a BidRecord]) -> Self {
        let mut tree = ReportTree {
            branches: Vec::new(),
            branch_index: HashMap::new(),
        };
        for record in records {
            tree.insert(record);
        }
        tree
    }

    fn insert(&mut self, record: &'a BidRecord) {
        let branch_pos = *self
            .branch_index
            .entry(record.branch.as_str())
            .or_insert_with(|| {
                self.branches.push(BranchNode {
                    name: record.branch.as_str(),
                    directions: Vec::new(),
                    direction_index: HashMap::new(),
                });
                self.branches.len() - 1
            });
        let branch = &mut self.branches[branch_pos];

        let direction_pos = *branch
            .direction_index
            .entry(record.direction.as_str())
            .or_insert_with(|| {
                branch.directions.push(DirectionNode {
                    name: record.direction.as_str(),
                    bids: Vec::new(),
                });
                branch.directions.len() - 1
            });
        branch.directions[direction_pos].bids.push(record);
    }

    /// Branches in display order; directions keep their first-seen order.
    fn into_display_order(mut self, order: &BranchOrder) -> Vec<BranchNode<'a>> {
        self.branches.sort_by(|a, b| order.compare(a.name, b.name));
        self.branches
    }
}

/// Build the report for one day's bids.
///
/// Returns `None` when there is nothing to report.
pub fn build_report(records: &[BidRecord], order: &BranchOrder) -> Option<ReportDocument> {
    if records.is_empty() {
        return None;
    }

    // Stable: equal keys keep the store's order
    let mut sorted: Vec<&BidRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        a.branch
            .cmp(&b.branch)
            .then_with(|| a.direction.cmp(&b.direction))
            .then_with(|| a.bid_timestamp.cmp(&b.bid_timestamp))
    });

    let mut branch_stats: HashMap<&str, GroupStats> = HashMap::new();
    let mut direction_stats: HashMap<(&str, &str), GroupStats> = HashMap::new();
    for record in &sorted {
        branch_stats
            .entry(record.branch.as_str())
            .or_default()
            .add(record.is_repeat);
        direction_stats
            .entry((record.branch.as_str(), record.direction.as_str()))
            .or_default()
            .add(record.is_repeat);
    }

    let branches = ReportTree::from_records(&sorted).into_display_order(order);

    let mut rows = Vec::with_capacity(records.len() + branch_stats.len() + direction_stats.len());
    let mut groups = Vec::new();

    for branch in &branches {
        let stats = branch_stats.get(branch.name).copied().unwrap_or_default();
        rows.push(ReportRow::branch_header(branch.name, stats));
        let branch_first = ReportDocument::sheet_row(rows.len());

        for direction in &branch.directions {
            let stats = direction_stats
                .get(&(branch.name, direction.name))
                .copied()
                .unwrap_or_default();
            rows.push(ReportRow::direction_header(branch.name, direction.name, stats));
            let direction_first = ReportDocument::sheet_row(rows.len());

            rows.extend(direction.bids.iter().map(|bid| ReportRow::detail(bid)));
            let direction_last = ReportDocument::sheet_row(rows.len()) - 1;

            groups.extend(OutlineGroup::covering(
                GroupKind::Direction,
                direction_first,
                direction_last,
            ));
            groups.extend(OutlineGroup::covering(
                GroupKind::DirectionDetail,
                direction_first,
                direction_last,
            ));
        }

        let branch_last = ReportDocument::sheet_row(rows.len()) - 1;
        groups.extend(OutlineGroup::covering(
            GroupKind::Branch,
            branch_first,
            branch_last,
        ));
    }

    log::debug!(
        "Built report: {} branches, {} rows, {} groups",
        branches.len(),
        rows.len(),
        groups.len()
    );

    Some(ReportDocument {
        header: COLUMN_LABELS.iter().map(|s| s.to_string()).collect(),
        rows,
        groups,
    })
}

#[cfg(test)]
#[path = "report_builder_tests.rs"]
mod report_builder_tests;
