//! Per-group rank table.
//!
//! ## Design
//!
//! A `GroupTable` holds every record of one group. It uses a hybrid layout:
//!
//! - **Slab**: entry storage, O(1) insert/remove by slot
//! - **BTreeMap**: rank -> slot, the group's order
//! - **HashMap**: record id -> slot, O(1) lookup by id
//!
//! ```text
//! by_rank:  "1" -> 0   "V" -> 2   "k" -> 1
//! slab:     [0] A      [1] C      [2] B
//! order:    A, B, C
//! ```
//!
//! Ranks are unique within the table; an insert that would reuse a rank
//! held by another record is refused before anything is modified.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use slab::Slab;

use crate::error::StoreError;
use crate::types::{GroupId, Rank, RecordId};

/// One record's slot in a group table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    /// Record identifier
    pub record_id: RecordId,

    /// Current rank
    pub rank: Rank,
}

/// All records of one group, ordered by rank.
#[derive(Debug)]
pub struct GroupTable {
    group_id: GroupId,

    /// Entry storage
    entries: Slab<RankEntry>,

    /// Rank to slab key, in order
    by_rank: BTreeMap<Rank, usize>,

    /// Record id to slab key
    by_id: HashMap<RecordId, usize>,
}

impl GroupTable {
    /// Create an empty table
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            entries: Slab::new(),
            by_rank: BTreeMap::new(),
            by_id: HashMap::new(),
        }
    }

    /// Group this table orders
    #[inline]
    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// Number of records in the group
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the group is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if a record belongs to the group
    #[inline]
    pub fn contains(&self, record_id: RecordId) -> bool {
        self.by_id.contains_key(&record_id)
    }

    /// Current rank of a record
    pub fn rank_of(&self, record_id: RecordId) -> Option<&Rank> {
        let key = *self.by_id.get(&record_id)?;
        self.entries.get(key).map(|entry| &entry.rank)
    }

    /// Record currently holding a rank
    pub fn holder_of(&self, rank: &Rank) -> Option<RecordId> {
        let key = *self.by_rank.get(rank)?;
        self.entries.get(key).map(|entry| entry.record_id)
    }

    /// Insert a record or move it to a new rank
    ///
    /// Fails with `Conflict` (and changes nothing) when another record
    /// already holds `rank`.
    pub fn upsert(&mut self, record_id: RecordId, rank: Rank) -> Result<(), StoreError> {
        match self.holder_of(&rank) {
            Some(holder) if holder == record_id => return Ok(()),
            Some(_) => {
                return Err(StoreError::Conflict {
                    group_id: self.group_id,
                    rank,
                })
            }
            None => {}
        }

        match self.by_id.get(&record_id).copied() {
            Some(key) => {
                let entry = &mut self.entries[key];
                self.by_rank.remove(&entry.rank);
                entry.rank = rank.clone();
                self.by_rank.insert(rank, key);
            }
            None => {
                let key = self.entries.insert(RankEntry {
                    record_id,
                    rank: rank.clone(),
                });
                self.by_rank.insert(rank, key);
                self.by_id.insert(record_id, key);
            }
        }
        Ok(())
    }

    /// Remove a record from the group
    pub fn remove(&mut self, record_id: RecordId) -> Option<RankEntry> {
        let key = self.by_id.remove(&record_id)?;
        let entry = self.entries.remove(key);
        self.by_rank.remove(&entry.rank);
        Some(entry)
    }

    /// Lowest rank, skipping `exclude`
    pub fn first(&self, exclude: Option<RecordId>) -> Option<&Rank> {
        self.scan(self.by_rank.iter(), exclude)
    }

    /// Highest rank, skipping `exclude`
    pub fn last(&self, exclude: Option<RecordId>) -> Option<&Rank> {
        self.scan(self.by_rank.iter().rev(), exclude)
    }

    /// Next rank above `rank`, skipping `exclude`
    pub fn successor(&self, rank: &Rank, exclude: Option<RecordId>) -> Option<&Rank> {
        let range = self.by_rank.range((Bound::Excluded(rank), Bound::Unbounded));
        self.scan(range, exclude)
    }

    /// Next rank below `rank`, skipping `exclude`
    pub fn predecessor(&self, rank: &Rank, exclude: Option<RecordId>) -> Option<&Rank> {
        let range = self.by_rank.range((Bound::Unbounded, Bound::Excluded(rank)));
        self.scan(range.rev(), exclude)
    }

    fn scan<'a, I>(&'a self, iter: I, exclude: Option<RecordId>) -> Option<&'a Rank>
    where
        I: Iterator<Item = (&'a Rank, &'a usize)>,
    {
        iter.filter(|(_, &key)| Some(self.entries[key].record_id) != exclude)
            .map(|(rank, _)| rank)
            .next()
    }

    /// Snapshot of the group in rank order
    pub fn ordered(&self) -> Vec<(RecordId, Rank)> {
        self.by_rank
            .iter()
            .map(|(rank, &key)| (self.entries[key].record_id, rank.clone()))
            .collect()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
