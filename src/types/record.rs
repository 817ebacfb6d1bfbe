//! Orderable records.
//!
//! The engine only ever reads or writes the `group_id` and `rank` of a
//! record. Whatever business entity owns the record (a card, a task, a
//! checklist item) keeps its other attributes elsewhere.

use crate::types::Rank;

/// Stable identifier of an orderable record
pub type RecordId = u64;

/// Identifier of an ordering scope
pub type GroupId = u64;

/// A record's placement: its group and its rank within that group.
///
/// ## Example
///
/// ```
/// use stage_rank::types::{Rank, RankedRecord};
///
/// let record = RankedRecord::new(7, 1, Rank::parse("V").unwrap());
/// assert_eq!(record.id, 7);
/// assert_eq!(record.group_id, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RankedRecord {
    /// Unique record identifier (never changes)
    pub id: RecordId,

    /// Group the record is ordered within
    pub group_id: GroupId,

    /// Ordering key inside the group
    pub rank: Rank,
}

impl RankedRecord {
    /// Create a record placement
    pub fn new(id: RecordId, group_id: GroupId, rank: Rank) -> Self {
        Self { id, group_id, rank }
    }
}

/// Side of an anchor a neighbour lookup is made on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Slot immediately before the anchor (or the front of the group)
    Before,
    /// Slot immediately after the anchor (or the back of the group)
    After,
}

/// Target position for [`reposition`](crate::engine::RankEngine::reposition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// Front of the group
    First,
    /// Back of the group
    Last,
    /// Swap places with the previous record
    Up,
    /// Swap places with the next record
    Down,
    /// Zero-based index, clamped to the back of the group
    Index(usize),
}
