//! In-memory rank store.
//!
//! ## Architecture
//!
//! - **GroupTable per group**: slab storage with a rank-ordered index
//! - **HashMap**: record id -> group id, to find a record's table in O(1)
//! - **RwLock**: one lock over both; every trait call takes it exactly once,
//!   so each call observes and produces a consistent state
//!
//! Critical sections are a few map operations long. Per-group
//! serialization of whole placements (read, compute, write) is the
//! engine's job, not the store's.
//!
//! ## Outages
//!
//! [`MemoryRankStore::set_available`] switches the store off, making every
//! call fail with `StoreError::Unavailable`. It stands in for a database
//! connection going away.
//!
//! ## Example
//!
//! ```
//! use stage_rank::store::{MemoryRankStore, RankStore};
//! use stage_rank::types::Rank;
//!
//! let store = MemoryRankStore::new();
//! store.write(1, 10, &Rank::parse("V").unwrap()).unwrap();
//! store.write(2, 10, &Rank::parse("k").unwrap()).unwrap();
//!
//! let ordered = store.all_ordered(10).unwrap();
//! assert_eq!(ordered.len(), 2);
//! assert_eq!(ordered[0].0, 1);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::store::{GroupTable, Neighbors, RankStore};
use crate::types::{Direction, GroupId, Rank, RankedRecord, RecordId};

#[derive(Debug, Default)]
struct StoreState {
    /// Ordered tables, one per non-empty group
    groups: HashMap<GroupId, GroupTable>,

    /// Record id to the group holding it
    locations: HashMap<RecordId, GroupId>,
}

/// Rank store kept entirely in memory.
#[derive(Debug)]
pub struct MemoryRankStore {
    state: RwLock<StoreState>,
    available: AtomicBool,
}

impl Default for MemoryRankStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRankStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Create a store with room for `records` record locations
    pub fn with_capacity(records: usize) -> Self {
        let state = StoreState {
            groups: HashMap::new(),
            locations: HashMap::with_capacity(records),
        };
        Self {
            state: RwLock::new(state),
            available: AtomicBool::new(true),
        }
    }

    /// Switch simulated availability on or off
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Total number of records across all groups
    pub fn record_count(&self) -> usize {
        self.state.read().locations.len()
    }

    /// Number of non-empty groups
    pub fn group_count(&self) -> usize {
        self.state.read().groups.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".into()))
        }
    }
}

impl RankStore for MemoryRankStore {
    fn locate(&self, record_id: RecordId) -> Result<Option<RankedRecord>, StoreError> {
        self.check_available()?;
        let state = self.state.read();

        let Some(&group_id) = state.locations.get(&record_id) else {
            return Ok(None);
        };
        let rank = state
            .groups
            .get(&group_id)
            .and_then(|table| table.rank_of(record_id))
            .cloned();
        Ok(rank.map(|rank| RankedRecord::new(record_id, group_id, rank)))
    }

    fn neighbors(
        &self,
        group_id: GroupId,
        anchor_id: Option<RecordId>,
        direction: Direction,
        exclude: Option<RecordId>,
    ) -> Result<Neighbors, StoreError> {
        self.check_available()?;
        let state = self.state.read();
        let table = state.groups.get(&group_id);

        let Some(anchor_id) = anchor_id else {
            let ends = match direction {
                Direction::After => (table.and_then(|t| t.last(exclude)).cloned(), None),
                Direction::Before => (None, table.and_then(|t| t.first(exclude)).cloned()),
            };
            return Ok(ends);
        };

        let anchor_rank = table
            .filter(|_| Some(anchor_id) != exclude)
            .and_then(|t| t.rank_of(anchor_id).map(|rank| (t, rank)));
        let Some((table, rank)) = anchor_rank else {
            return Err(StoreError::AnchorNotFound {
                group_id,
                record_id: anchor_id,
            });
        };

        let around = match direction {
            Direction::After => (Some(rank.clone()), table.successor(rank, exclude).cloned()),
            Direction::Before => (table.predecessor(rank, exclude).cloned(), Some(rank.clone())),
        };
        Ok(around)
    }

    fn write(&self, record_id: RecordId, group_id: GroupId, rank: &Rank) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.state.write();
        let StoreState { groups, locations } = &mut *state;

        // Refuse before touching anything
        let held_by_other = groups
            .get(&group_id)
            .and_then(|t| t.holder_of(rank))
            .is_some_and(|holder| holder != record_id);
        if held_by_other {
            tracing::debug!(
                target: "stage_rank::store",
                record_id, group_id, rank = %rank,
                "write refused: rank already held"
            );
            return Err(StoreError::Conflict {
                group_id,
                rank: rank.clone(),
            });
        }

        let previous = locations.insert(record_id, group_id);
        if let Some(old_group) = previous.filter(|&g| g != group_id) {
            if let Some(table) = groups.get_mut(&old_group) {
                table.remove(record_id);
                if table.is_empty() {
                    groups.remove(&old_group);
                }
            }
        }

        groups
            .entry(group_id)
            .or_insert_with(|| GroupTable::new(group_id))
            .upsert(record_id, rank.clone())?;

        tracing::trace!(
            target: "stage_rank::store",
            record_id, group_id, rank = %rank,
            "rank written"
        );
        Ok(())
    }

    fn remove(&self, record_id: RecordId) -> Result<Option<RankedRecord>, StoreError> {
        self.check_available()?;
        let mut state = self.state.write();
        let StoreState { groups, locations } = &mut *state;

        let Some(group_id) = locations.remove(&record_id) else {
            return Ok(None);
        };
        let Some(table) = groups.get_mut(&group_id) else {
            return Ok(None);
        };
        let removed = table.remove(record_id);
        if table.is_empty() {
            groups.remove(&group_id);
        }
        Ok(removed.map(|entry| RankedRecord::new(entry.record_id, group_id, entry.rank)))
    }

    fn all_ordered(&self, group_id: GroupId) -> Result<Vec<(RecordId, Rank)>, StoreError> {
        self.check_available()?;
        let state = self.state.read();
        Ok(state
            .groups
            .get(&group_id)
            .map(GroupTable::ordered)
            .unwrap_or_default())
    }

    fn group_len(&self, group_id: GroupId) -> Result<usize, StoreError> {
        self.check_available()?;
        let state = self.state.read();
        Ok(state.groups.get(&group_id).map_or(0, GroupTable::len))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rank(s: &str) -> Rank {
        Rank::parse(s).unwrap()
    }

    fn store_with(entries: &[(RecordId, GroupId, &str)]) -> MemoryRankStore {
        let store = MemoryRankStore::with_capacity(16);
        for &(id, group, r) in entries {
            store.write(id, group, &rank(r)).unwrap();
        }
        store
    }

    #[test]
    fn test_store_new() {
        let store = MemoryRankStore::new();

        assert_eq!(store.record_count(), 0);
        assert_eq!(store.group_count(), 0);
        assert!(store.all_ordered(1).unwrap().is_empty());
        assert!(store.locate(1).unwrap().is_none());
    }

    #[test]
    fn test_store_locate() {
        let store = store_with(&[(1, 10, "V")]);

        let record = store.locate(1).unwrap().unwrap();
        assert_eq!(record, RankedRecord::new(1, 10, rank("V")));
    }

    #[test]
    fn test_store_neighbors_at_ends() {
        let store = store_with(&[(1, 10, "1"), (2, 10, "V")]);

        assert_eq!(
            store.neighbors(10, None, Direction::After, None).unwrap(),
            (Some(rank("V")), None)
        );
        assert_eq!(
            store.neighbors(10, None, Direction::Before, None).unwrap(),
            (None, Some(rank("1")))
        );
        // Empty group
        assert_eq!(store.neighbors(99, None, Direction::After, None).unwrap(), (None, None));
    }

    #[test]
    fn test_store_neighbors_around_anchor() {
        let store = store_with(&[(1, 10, "1"), (2, 10, "V"), (3, 10, "k")]);

        assert_eq!(
            store.neighbors(10, Some(1), Direction::After, None).unwrap(),
            (Some(rank("1")), Some(rank("V")))
        );
        assert_eq!(
            store.neighbors(10, Some(3), Direction::Before, None).unwrap(),
            (Some(rank("V")), Some(rank("k")))
        );
        // The record being placed is not its own neighbour
        assert_eq!(
            store.neighbors(10, Some(1), Direction::After, Some(2)).unwrap(),
            (Some(rank("1")), Some(rank("k")))
        );
    }

    #[test]
    fn test_store_neighbors_unknown_anchor() {
        let store = store_with(&[(1, 10, "1"), (2, 20, "V")]);

        let err = store.neighbors(10, Some(2), Direction::After, None).unwrap_err();
        assert_eq!(err, StoreError::AnchorNotFound { group_id: 10, record_id: 2 });

        // Anchoring on the record being placed is meaningless
        assert!(store.neighbors(10, Some(1), Direction::After, Some(1)).is_err());
    }

    #[test]
    fn test_store_write_conflict() {
        let store = store_with(&[(1, 10, "V")]);

        let err = store.write(2, 10, &rank("V")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { group_id: 10, .. }));
        assert!(store.locate(2).unwrap().is_none());

        // Same rank in another group is fine
        store.write(2, 20, &rank("V")).unwrap();
    }

    #[test]
    fn test_store_write_moves_between_groups() {
        let store = store_with(&[(1, 10, "1"), (2, 10, "V")]);

        store.write(1, 20, &rank("k")).unwrap();

        assert_eq!(store.all_ordered(10).unwrap(), vec![(2, rank("V"))]);
        assert_eq!(store.all_ordered(20).unwrap(), vec![(1, rank("k"))]);
        assert_eq!(store.locate(1).unwrap().unwrap().group_id, 20);
        assert_eq!(store.record_count(), 2);
    }

    #[test]
    fn test_store_remove() {
        let store = store_with(&[(1, 10, "1"), (2, 10, "V")]);

        let removed = store.remove(1).unwrap().unwrap();
        assert_eq!(removed.rank, rank("1"));
        assert_eq!(store.group_len(10).unwrap(), 1);
        assert!(store.remove(1).unwrap().is_none());

        store.remove(2).unwrap();
        assert_eq!(store.group_count(), 0);
    }

    #[test]
    fn test_store_unavailable() {
        let store = store_with(&[(1, 10, "1")]);
        store.set_available(false);

        assert!(matches!(store.all_ordered(10), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.write(2, 10, &rank("V")), Err(StoreError::Unavailable(_))));

        store.set_available(true);
        assert_eq!(store.group_len(10).unwrap(), 1);
    }
}
