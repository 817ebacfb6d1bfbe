//! The ranking engine.
//!
//! ## Placement
//!
//! Every placement goes through the same loop:
//!
//! 1. Lock the target group (and the source group for cross-group moves)
//! 2. Read the neighbour keys of the target slot from the store
//! 3. Ask the codec for a key between them; if the key space is exhausted,
//!    rebalance the group, re-read the neighbours and ask once more
//! 4. Write the key; on a uniqueness conflict, start over
//!
//! Steps 1-4 are retried up to `max_attempts` times. Lock timeouts and
//! store conflicts each consume one attempt; running out surfaces
//! [`RankError::Contention`].
//!
//! ## Anchors
//!
//! `before_id` names the record that should end up directly before the
//! placed record, `after_id` the one directly after it. When both are given
//! and something was inserted between them in the meantime, the record is
//! placed directly after `before_id`, which is still between the two.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::codec::{Exhausted, RankCodec};
use crate::config::RankConfig;
use crate::engine::locks::GroupLocks;
use crate::engine::rebalance::RebalanceJob;
use crate::error::{ConfigError, RankError, StoreError};
use crate::store::{MemoryRankStore, Neighbors, RankStore};
use crate::types::{Direction, GroupId, Position, Rank, RankedRecord, RebalanceReceipt, RecordId};

/// Where a record should land within its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Start,
    End,
    After(RecordId),
    Before(RecordId),
    Between(RecordId, RecordId),
}

impl Slot {
    fn from_anchors(before_id: Option<RecordId>, after_id: Option<RecordId>) -> Self {
        match (before_id, after_id) {
            (None, None) => Slot::End,
            (Some(before), None) => Slot::After(before),
            (None, Some(after)) => Slot::Before(after),
            (Some(before), Some(after)) => Slot::Between(before, after),
        }
    }

    fn names(&self, record_id: RecordId) -> bool {
        match *self {
            Slot::Start | Slot::End => false,
            Slot::After(id) | Slot::Before(id) => id == record_id,
            Slot::Between(a, b) => a == record_id || b == record_id,
        }
    }
}

/// Outcome of one attempt that did not commit.
#[derive(Debug)]
enum Failure {
    /// Lost a race; try again with fresh neighbours
    Retry,
    /// Give up and report
    Fatal(RankError),
}

impl From<RankError> for Failure {
    fn from(err: RankError) -> Self {
        Failure::Fatal(err)
    }
}

fn store_failure(record_id: RecordId) -> impl Fn(StoreError) -> Failure {
    move |err| match err {
        StoreError::Conflict { .. } => Failure::Retry,
        other => Failure::Fatal(lift(other, record_id)),
    }
}

fn lift(err: StoreError, record_id: RecordId) -> RankError {
    match err {
        StoreError::AnchorNotFound { .. } => RankError::InvalidAnchor {
            record_id,
            reason: "anchor is not in the target group",
        },
        StoreError::Unavailable(detail) => RankError::StorageUnavailable { detail },
        StoreError::Conflict { group_id, .. } => RankError::Contention { group_id, attempts: 1 },
    }
}

#[derive(Debug, Default)]
struct Counters {
    commits: AtomicU64,
    retries: AtomicU64,
    rebalances: AtomicU64,
    removals: AtomicU64,
}

/// Point-in-time engine counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStats {
    /// Placements committed
    pub commits: u64,
    /// Attempts lost to lock timeouts or store conflicts
    pub retries: u64,
    /// Groups rebalanced (reactive and proactive)
    pub rebalances: u64,
    /// Records removed
    pub removals: u64,
}

/// Orchestrates placements over a [`RankStore`].
///
/// The engine is `Send + Sync`; share it between request handlers with an
/// `Arc`. Operations on different groups never wait for each other.
///
/// ## Example
///
/// ```
/// use stage_rank::RankEngine;
///
/// let engine = RankEngine::in_memory();
/// engine.append(1, 10).unwrap();       // A
/// engine.append(2, 10).unwrap();       // B
/// engine.insert_between(3, 10, 1, 2).unwrap();
///
/// assert_eq!(engine.order_of(10).unwrap(), vec![1, 3, 2]);
/// ```
#[derive(Debug)]
pub struct RankEngine<S: RankStore = MemoryRankStore> {
    store: Arc<S>,
    codec: RankCodec,
    config: RankConfig,
    locks: GroupLocks,
    counters: Counters,
}

impl RankEngine<MemoryRankStore> {
    /// Engine over a fresh in-memory store with default settings
    pub fn in_memory() -> Self {
        Self::build(Arc::new(MemoryRankStore::new()), RankConfig::default())
    }
}

impl<S: RankStore> RankEngine<S> {
    /// Create an engine over `store`
    pub fn new(store: Arc<S>, config: RankConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(store, config))
    }

    fn build(store: Arc<S>, config: RankConfig) -> Self {
        Self {
            store,
            codec: RankCodec::new(config.max_rank_len),
            config,
            locks: GroupLocks::new(),
            counters: Counters::default(),
        }
    }

    /// The underlying store
    #[inline]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Active configuration
    #[inline]
    pub fn config(&self) -> &RankConfig {
        &self.config
    }

    /// Snapshot of the engine counters
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            commits: self.counters.commits.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
            rebalances: self.counters.rebalances.load(Ordering::Relaxed),
            removals: self.counters.removals.load(Ordering::Relaxed),
        }
    }

    // ========================================================================
    // Placement
    // ========================================================================

    /// Place a record at the back of a group
    pub fn append(&self, record_id: RecordId, group_id: GroupId) -> Result<(), RankError> {
        self.place(record_id, group_id, Slot::End)
    }

    /// Place a record at the front of a group
    pub fn prepend(&self, record_id: RecordId, group_id: GroupId) -> Result<(), RankError> {
        self.place(record_id, group_id, Slot::Start)
    }

    /// Place a record between two records of the same group
    ///
    /// `before_id` must currently sort before `after_id`.
    pub fn insert_between(
        &self,
        record_id: RecordId,
        group_id: GroupId,
        before_id: RecordId,
        after_id: RecordId,
    ) -> Result<(), RankError> {
        self.place(record_id, group_id, Slot::Between(before_id, after_id))
    }

    /// Move a record into `new_group_id`, next to the given anchors
    ///
    /// Anchors follow [`reorder`](Self::reorder): none means the back of
    /// the group.
    pub fn move_to(
        &self,
        record_id: RecordId,
        new_group_id: GroupId,
        before_id: Option<RecordId>,
        after_id: Option<RecordId>,
    ) -> Result<(), RankError> {
        self.place(record_id, new_group_id, Slot::from_anchors(before_id, after_id))
    }

    /// Single entry point for drag-and-drop
    ///
    /// - no anchors: back of the group
    /// - only `after_id`: directly before it
    /// - only `before_id`: directly after it
    /// - both: between them
    ///
    /// `group_id` defaults to the record's current group; a record that has
    /// no rank yet must name one.
    pub fn reorder(
        &self,
        record_id: RecordId,
        before_id: Option<RecordId>,
        after_id: Option<RecordId>,
        group_id: Option<GroupId>,
    ) -> Result<(), RankError> {
        let group_id = match group_id {
            Some(group_id) => group_id,
            None => self
                .locate(record_id)?
                .map(|record| record.group_id)
                .ok_or(RankError::InvalidAnchor {
                    record_id,
                    reason: "record has no group and none was given",
                })?,
        };
        self.place(record_id, group_id, Slot::from_anchors(before_id, after_id))
    }

    /// Move a record to a position within its current group
    pub fn reposition(&self, record_id: RecordId, position: Position) -> Result<(), RankError> {
        let record = self.locate(record_id)?.ok_or(RankError::InvalidAnchor {
            record_id,
            reason: "record has no rank",
        })?;
        let group_id = record.group_id;

        // Index and neighbours from one snapshot; the lock is taken in `place`
        let order = self.order_of(group_id)?;
        let Some(index) = order.iter().position(|&id| id == record_id) else {
            return Err(RankError::InvalidAnchor {
                record_id,
                reason: "record left its group",
            });
        };
        let others: Vec<RecordId> = order.into_iter().filter(|&id| id != record_id).collect();

        let slot = match position {
            Position::First => Slot::Start,
            Position::Last => Slot::End,
            Position::Up if index == 0 => return Ok(()),
            Position::Up => others.get(index - 1).map_or(Slot::Start, |&id| Slot::Before(id)),
            Position::Down if index >= others.len() => return Ok(()),
            Position::Down => others.get(index).map_or(Slot::End, |&id| Slot::After(id)),
            Position::Index(target) => others.get(target).map_or(Slot::End, |&id| Slot::Before(id)),
        };
        self.place(record_id, group_id, slot)
    }

    /// Delete a record's rank; other records keep their keys
    ///
    /// Returns whether the record had a rank.
    pub fn remove(&self, record_id: RecordId) -> Result<bool, RankError> {
        let mut observed = None;
        for _ in 0..self.config.max_attempts {
            let Some(record) = self.locate(record_id)? else {
                return Ok(false);
            };
            let group_id = record.group_id;
            observed = Some(group_id);

            let attempt = self.locks.with_groups(
                &[group_id],
                self.config.lock_timeout,
                || -> Result<Option<bool>, RankError> {
                    // The record may have moved while we waited
                    match self.locate(record_id)? {
                        Some(current) if current.group_id == group_id => {
                            self.store.remove(record_id).map_err(|e| lift(e, record_id))?;
                            Ok(Some(true))
                        }
                        Some(_) => Ok(None),
                        None => Ok(Some(false)),
                    }
                },
            );

            match attempt {
                Ok(Ok(Some(removed))) => {
                    if removed {
                        self.counters.removals.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(target: "stage_rank::engine", record_id, group_id, "record removed");
                    }
                    return Ok(removed);
                }
                Ok(Err(err)) => return Err(err),
                Ok(Ok(None)) | Err(_) => {
                    self.counters.retries.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        match observed {
            Some(group_id) => Err(self.contention(record_id, group_id)),
            None => Ok(false),
        }
    }

    fn place(&self, record_id: RecordId, group_id: GroupId, slot: Slot) -> Result<(), RankError> {
        if slot.names(record_id) {
            return Err(RankError::InvalidAnchor {
                record_id,
                reason: "a record cannot be anchored on itself",
            });
        }

        for attempt in 1..=self.config.max_attempts {
            let source = self.locate(record_id)?.map(|r| r.group_id);
            let groups: Vec<GroupId> = std::iter::once(group_id).chain(source).collect();

            let outcome = self
                .locks
                .with_groups(&groups, self.config.lock_timeout, || {
                    self.try_place(record_id, group_id, slot, &groups)
                })
                .unwrap_or(Err(Failure::Retry));

            match outcome {
                Ok(rank) => {
                    self.counters.commits.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        target: "stage_rank::engine",
                        record_id, group_id, rank = %rank, attempt,
                        "placement committed"
                    );
                    if self.config.proactive_rebalance {
                        if let Err(err) = self.maintain(group_id) {
                            tracing::warn!(
                                target: "stage_rank::engine",
                                group_id, error = %err,
                                "proactive rebalance skipped"
                            );
                        }
                    }
                    return Ok(());
                }
                Err(Failure::Retry) => {
                    self.counters.retries.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(target: "stage_rank::engine", record_id, group_id, attempt, "placement retried");
                }
                Err(Failure::Fatal(err)) => return Err(err),
            }
        }

        Err(self.contention(record_id, group_id))
    }

    /// One locked attempt: resolve, compute, commit
    fn try_place(
        &self,
        record_id: RecordId,
        group_id: GroupId,
        slot: Slot,
        locked: &[GroupId],
    ) -> Result<Rank, Failure> {
        let source = self.locate(record_id)?.map(|r| r.group_id);
        if source.is_some_and(|g| !locked.contains(&g)) {
            // Moved by someone else between locate and lock
            return Err(Failure::Retry);
        }

        let rank = match self.next_rank(record_id, group_id, slot)? {
            Ok(rank) => rank,
            Err(Exhausted) => {
                tracing::debug!(target: "stage_rank::engine", group_id, "key space exhausted, rebalancing");
                let len = self.store.group_len(group_id).map_err(store_failure(record_id))?;
                // Canonical spacing leaves room for one more key at the same length
                if RankCodec::canonical_len(len) > self.codec.max_len() {
                    return Err(Failure::Fatal(self.exhausted(group_id)));
                }
                self.rebalance_locked(group_id).map_err(|err| match err {
                    RankError::Contention { .. } => Failure::Retry,
                    other => Failure::Fatal(other),
                })?;
                self.next_rank(record_id, group_id, slot)?
                    .map_err(|Exhausted| Failure::Fatal(self.exhausted(group_id)))?
            }
        };

        self.store
            .write(record_id, group_id, &rank)
            .map_err(store_failure(record_id))?;
        Ok(rank)
    }

    /// Neighbour keys of the slot, then the codec's key between them
    fn next_rank(
        &self,
        record_id: RecordId,
        group_id: GroupId,
        slot: Slot,
    ) -> Result<Result<Rank, Exhausted>, Failure> {
        let (low, high) = self.resolve(record_id, group_id, slot)?;
        let rank = match (&low, &high, slot) {
            (None, None, Slot::End) => Ok(RankCodec::first()),
            (None, None, Slot::Start) => Ok(RankCodec::last()),
            _ => self.codec.midpoint(low.as_ref(), high.as_ref()),
        };
        Ok(rank)
    }

    fn resolve(&self, record_id: RecordId, group_id: GroupId, slot: Slot) -> Result<Neighbors, Failure> {
        let around = |anchor: Option<RecordId>, direction: Direction| {
            self.store
                .neighbors(group_id, anchor, direction, Some(record_id))
                .map_err(store_failure(record_id))
        };

        match slot {
            Slot::End => around(None, Direction::After),
            Slot::Start => around(None, Direction::Before),
            Slot::After(anchor) => around(Some(anchor), Direction::After),
            Slot::Before(anchor) => around(Some(anchor), Direction::Before),
            Slot::Between(before_id, after_id) => {
                let (low, successor) = around(Some(before_id), Direction::After)?;
                let (_, after_rank) = around(Some(after_id), Direction::Before)?;

                if after_rank <= low {
                    return Err(Failure::Fatal(RankError::InvalidAnchor {
                        record_id,
                        reason: "before anchor does not sort before after anchor",
                    }));
                }
                if successor != after_rank {
                    tracing::debug!(
                        target: "stage_rank::engine",
                        record_id, before_id, after_id,
                        "anchors not adjacent, placing after the before anchor"
                    );
                }
                Ok((low, successor))
            }
        }
    }

    fn exhausted(&self, group_id: GroupId) -> RankError {
        let max_rank_len = self.codec.max_len();
        tracing::error!(
            target: "stage_rank::engine",
            group_id, max_rank_len,
            "group does not fit in the key space"
        );
        RankError::KeySpaceExhausted { group_id, max_rank_len }
    }

    fn contention(&self, record_id: RecordId, group_id: GroupId) -> RankError {
        tracing::warn!(
            target: "stage_rank::engine",
            record_id, group_id, attempts = self.config.max_attempts,
            "giving up after repeated contention"
        );
        RankError::Contention {
            group_id,
            attempts: self.config.max_attempts,
        }
    }

    // ========================================================================
    // Rebalancing
    // ========================================================================

    /// Rebalance `group_id`; the caller holds its lock
    fn rebalance_locked(&self, group_id: GroupId) -> Result<RebalanceReceipt, RankError> {
        let receipt = RebalanceJob::new(&*self.store, group_id)
            .run()
            .map_err(|err| lift(err, 0))?;
        self.counters.rebalances.fetch_add(1, Ordering::Relaxed);
        Ok(receipt)
    }

    /// Rebalance a group if its keys have grown past the proactive threshold
    ///
    /// Returns the receipt when the group was rewritten.
    pub fn maintain(&self, group_id: GroupId) -> Result<Option<RebalanceReceipt>, RankError> {
        let attempt = self.locks.with_groups(
            &[group_id],
            self.config.lock_timeout,
            || -> Result<Option<RebalanceReceipt>, RankError> {
                let ordered = self.ordered(group_id)?;
                let ranks = ordered.iter().map(|(_, rank)| rank);
                if !RankCodec::needs_rebalance(ranks, self.config.length_factor) {
                    return Ok(None);
                }
                if RankCodec::canonical_len(ordered.len()) > self.codec.max_len() {
                    return Err(self.exhausted(group_id));
                }
                self.rebalance_locked(group_id).map(Some)
            },
        );

        attempt.unwrap_or(Err(RankError::Contention {
            group_id,
            attempts: 1,
        }))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Record ids of a group, in order
    pub fn order_of(&self, group_id: GroupId) -> Result<Vec<RecordId>, RankError> {
        Ok(self
            .ordered(group_id)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// `(record_id, rank)` pairs of a group, in order
    pub fn ordered(&self, group_id: GroupId) -> Result<Vec<(RecordId, Rank)>, RankError> {
        self.store
            .all_ordered(group_id)
            .map_err(|err| lift(err, 0))
    }

    /// Current group and rank of a record
    pub fn locate(&self, record_id: RecordId) -> Result<Option<RankedRecord>, RankError> {
        self.store.locate(record_id).map_err(|err| lift(err, record_id))
    }

    /// Current rank of a record
    pub fn rank_of(&self, record_id: RecordId) -> Result<Option<Rank>, RankError> {
        Ok(self.locate(record_id)?.map(|record| record.rank))
    }

    /// Zero-based index of a record within its group
    pub fn position_of(&self, record_id: RecordId) -> Result<Option<usize>, RankError> {
        let Some(record) = self.locate(record_id)? else {
            return Ok(None);
        };
        Ok(self
            .order_of(record.group_id)?
            .iter()
            .position(|&id| id == record_id))
    }

    /// First record of a group
    pub fn first_of(&self, group_id: GroupId) -> Result<Option<RecordId>, RankError> {
        Ok(self.order_of(group_id)?.first().copied())
    }

    /// Last record of a group
    pub fn last_of(&self, group_id: GroupId) -> Result<Option<RecordId>, RankError> {
        Ok(self.order_of(group_id)?.last().copied())
    }

    /// SHA-256 over a group's ordered `(record_id, rank)` pairs
    pub fn state_root(&self, group_id: GroupId) -> Result<[u8; 32], RankError> {
        let ordered = self.ordered(group_id)?;
        Ok(RebalanceReceipt::compute_state_root(
            ordered.iter().map(|(id, rank)| (*id, rank)),
        ))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(config: RankConfig) -> RankEngine {
        RankEngine::new(Arc::new(MemoryRankStore::new()), config).unwrap()
    }

    #[test]
    fn test_append_to_empty_group_uses_first_key() {
        let engine = RankEngine::in_memory();
        engine.append(1, 10).unwrap();

        let record = engine.locate(1).unwrap().unwrap();
        assert_eq!(record.rank, RankCodec::first());
        assert_eq!(record.group_id, 10);
    }

    #[test]
    fn test_prepend_to_empty_group_uses_last_key() {
        let engine = RankEngine::in_memory();
        engine.prepend(1, 10).unwrap();

        assert_eq!(engine.locate(1).unwrap().unwrap().rank, RankCodec::last());
    }

    #[test]
    fn test_append_and_prepend() {
        let engine = RankEngine::in_memory();
        engine.append(1, 10).unwrap();
        engine.append(2, 10).unwrap();
        engine.prepend(3, 10).unwrap();

        assert_eq!(engine.order_of(10).unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn test_insert_between_adjacent() {
        let engine = RankEngine::in_memory();
        engine.append(1, 10).unwrap();
        engine.append(2, 10).unwrap();
        engine.insert_between(3, 10, 1, 2).unwrap();

        assert_eq!(engine.order_of(10).unwrap(), vec![1, 3, 2]);
    }

    #[test]
    fn test_insert_between_non_adjacent_lands_after_before_anchor() {
        let engine = RankEngine::in_memory();
        for id in 1..=3 {
            engine.append(id, 10).unwrap();
        }
        engine.insert_between(4, 10, 1, 3).unwrap();

        assert_eq!(engine.order_of(10).unwrap(), vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_insert_between_rejects_reversed_anchors() {
        let engine = RankEngine::in_memory();
        engine.append(1, 10).unwrap();
        engine.append(2, 10).unwrap();

        let err = engine.insert_between(3, 10, 2, 1).unwrap_err();
        assert!(matches!(err, RankError::InvalidAnchor { record_id: 3, .. }));
        assert!(engine.locate(3).unwrap().is_none());
    }

    #[test]
    fn test_insert_between_rejects_foreign_anchor() {
        let engine = RankEngine::in_memory();
        engine.append(1, 10).unwrap();
        engine.append(2, 20).unwrap();

        let err = engine.insert_between(3, 10, 1, 2).unwrap_err();
        assert!(matches!(err, RankError::InvalidAnchor { .. }));
    }

    #[test]
    fn test_self_anchor_is_invalid() {
        let engine = RankEngine::in_memory();
        engine.append(1, 10).unwrap();

        let err = engine.reorder(1, Some(1), None, None).unwrap_err();
        assert!(matches!(err, RankError::InvalidAnchor { record_id: 1, .. }));
    }

    #[test]
    fn test_reorder_within_group() {
        let engine = RankEngine::in_memory();
        for id in 1..=4 {
            engine.append(id, 10).unwrap();
        }

        // Drag 4 between 1 and 2
        engine.reorder(4, Some(1), Some(2), None).unwrap();
        assert_eq!(engine.order_of(10).unwrap(), vec![1, 4, 2, 3]);

        // Drag 1 directly before 3
        engine.reorder(1, None, Some(3), None).unwrap();
        assert_eq!(engine.order_of(10).unwrap(), vec![4, 2, 1, 3]);

        // Drag 3 directly after 4
        engine.reorder(3, Some(4), None, None).unwrap();
        assert_eq!(engine.order_of(10).unwrap(), vec![4, 3, 2, 1]);

        // No anchors: back of the group
        engine.reorder(4, None, None, None).unwrap();
        assert_eq!(engine.order_of(10).unwrap(), vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_reorder_unknown_record_needs_group() {
        let engine = RankEngine::in_memory();

        let err = engine.reorder(9, None, None, None).unwrap_err();
        assert!(matches!(err, RankError::InvalidAnchor { record_id: 9, .. }));

        engine.reorder(9, None, None, Some(10)).unwrap();
        assert_eq!(engine.order_of(10).unwrap(), vec![9]);
    }

    #[test]
    fn test_move_to_other_group() {
        let engine = RankEngine::in_memory();
        for id in 1..=3 {
            engine.append(id, 10).unwrap();
        }
        engine.append(4, 20).unwrap();

        let first = engine.first_of(20).unwrap();
        engine.move_to(1, 20, None, first).unwrap();

        assert_eq!(engine.order_of(10).unwrap(), vec![2, 3]);
        assert_eq!(engine.order_of(20).unwrap(), vec![1, 4]);
        assert_eq!(engine.locate(1).unwrap().unwrap().group_id, 20);
    }

    #[test]
    fn test_remove_keeps_other_keys() {
        let engine = RankEngine::in_memory();
        for id in 1..=3 {
            engine.append(id, 10).unwrap();
        }
        let before = engine.ordered(10).unwrap();

        assert!(engine.remove(2).unwrap());
        assert!(!engine.remove(2).unwrap());

        let after = engine.ordered(10).unwrap();
        assert_eq!(after, vec![before[0].clone(), before[2].clone()]);
        assert_eq!(engine.stats().removals, 1);
    }

    #[test]
    fn test_reposition() {
        let engine = RankEngine::in_memory();
        for id in 1..=4 {
            engine.append(id, 10).unwrap();
        }

        engine.reposition(4, Position::First).unwrap();
        assert_eq!(engine.order_of(10).unwrap(), vec![4, 1, 2, 3]);

        engine.reposition(4, Position::Last).unwrap();
        assert_eq!(engine.order_of(10).unwrap(), vec![1, 2, 3, 4]);

        engine.reposition(3, Position::Up).unwrap();
        assert_eq!(engine.order_of(10).unwrap(), vec![1, 3, 2, 4]);

        engine.reposition(1, Position::Down).unwrap();
        assert_eq!(engine.order_of(10).unwrap(), vec![3, 1, 2, 4]);

        engine.reposition(4, Position::Index(1)).unwrap();
        assert_eq!(engine.order_of(10).unwrap(), vec![3, 4, 1, 2]);

        engine.reposition(3, Position::Index(99)).unwrap();
        assert_eq!(engine.order_of(10).unwrap(), vec![4, 1, 2, 3]);

        // Already at the edges
        engine.reposition(4, Position::Up).unwrap();
        engine.reposition(3, Position::Down).unwrap();
        assert_eq!(engine.order_of(10).unwrap(), vec![4, 1, 2, 3]);
        assert_eq!(engine.position_of(2).unwrap(), Some(2));
    }

    #[test]
    fn test_reposition_unknown_record() {
        let engine = RankEngine::in_memory();
        assert!(matches!(
            engine.reposition(1, Position::First),
            Err(RankError::InvalidAnchor { .. })
        ));
    }

    #[test]
    fn test_exhaustion_triggers_rebalance() {
        let engine = engine_with(RankConfig::default().with_max_rank_len(2));
        engine.append(1, 10).unwrap();
        engine.append(2, 10).unwrap();

        for id in 100..120 {
            engine.insert_between(id, 10, 1, 2).unwrap();
        }

        let order = engine.order_of(10).unwrap();
        assert_eq!(order.len(), 22);
        assert_eq!(order[0], 1);
        assert_eq!(order[1], 119);
        assert_eq!(order[21], 2);
        assert!(engine.stats().rebalances > 0);
        assert!(engine.ordered(10).unwrap().iter().all(|(_, r)| r.len() <= 2));
    }

    #[test]
    fn test_key_space_exhausted_is_reported() {
        // Two digits hold 122 appends ("1".."z", "z1".."zz"); canonical
        // spacing for 122 records needs three
        let engine = engine_with(RankConfig::default().with_max_rank_len(2));
        let mut appended = 0;
        let err = loop {
            match engine.append(appended, 10) {
                Ok(()) => appended += 1,
                Err(err) => break err,
            }
            assert!(appended < 200, "group never filled up");
        };

        assert_eq!(appended, 122);
        assert_eq!(err, RankError::KeySpaceExhausted { group_id: 10, max_rank_len: 2 });
        assert_eq!(engine.order_of(10).unwrap().len(), 122);
        assert_eq!(engine.stats().rebalances, 0);
    }

    #[test]
    fn test_full_two_digit_group_rebalances_instead_of_failing() {
        // 61 records: the most two canonical digits can space out
        let store = MemoryRankStore::new();
        for id in 1..=59u64 {
            let rank = Rank::from_digit(id as u8 + 1);
            store.write(id, 10, &rank).unwrap();
        }
        store.write(100, 10, &Rank::parse("1V").unwrap()).unwrap();
        store.write(101, 10, &Rank::parse("1W").unwrap()).unwrap();
        let engine = RankEngine::new(
            Arc::new(store),
            RankConfig::default().with_max_rank_len(2),
        )
        .unwrap();

        engine.insert_between(200, 10, 100, 101).unwrap();

        let order = engine.order_of(10).unwrap();
        assert_eq!(order.len(), 62);
        assert_eq!(&order[..3], &[100, 200, 101]);
        assert_eq!(engine.stats().rebalances, 1);
        assert!(engine.ordered(10).unwrap().iter().all(|(_, r)| r.len() <= 2));
    }

    #[test]
    fn test_reposition_uses_one_snapshot() {
        let engine = RankEngine::in_memory();
        for id in 1..=3 {
            engine.append(id, 10).unwrap();
        }
        engine.reposition(3, Position::Index(0)).unwrap();
        engine.reposition(2, Position::Up).unwrap();

        assert_eq!(engine.order_of(10).unwrap(), vec![3, 2, 1]);
    }

    #[test]
    fn test_storage_unavailable_is_surfaced() {
        let engine = RankEngine::in_memory();
        engine.append(1, 10).unwrap();
        engine.store().set_available(false);

        assert!(matches!(
            engine.append(2, 10),
            Err(RankError::StorageUnavailable { .. })
        ));
        assert!(matches!(
            engine.order_of(10),
            Err(RankError::StorageUnavailable { .. })
        ));
    }

    #[test]
    fn test_maintain_rebalances_long_keys() {
        let engine = engine_with(RankConfig::default().with_max_rank_len(32));
        engine.append(1, 10).unwrap();
        engine.append(2, 10).unwrap();
        for id in 3..60 {
            engine.insert_between(id, 10, 1, 2).unwrap();
        }
        let order = engine.order_of(10).unwrap();

        let receipt = engine.maintain(10).unwrap().expect("keys should be long");
        assert_eq!(receipt.records, 59);
        assert_eq!(engine.order_of(10).unwrap(), order);
        assert_eq!(engine.state_root(10).unwrap(), receipt.state_root);

        // Canonical now; nothing to do
        assert!(engine.maintain(10).unwrap().is_none());
    }

    #[test]
    fn test_proactive_rebalance_after_commit() {
        let engine = engine_with(
            RankConfig::default()
                .with_max_rank_len(32)
                .with_proactive_rebalance(true),
        );
        engine.append(1, 10).unwrap();
        engine.append(2, 10).unwrap();
        for id in 3..60 {
            engine.insert_between(id, 10, 1, 2).unwrap();
        }

        assert!(engine.stats().rebalances > 0);
        let ordered = engine.ordered(10).unwrap();
        assert!(!RankCodec::needs_rebalance(ordered.iter().map(|(_, r)| r), 2));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = RankEngine::new(
            Arc::new(MemoryRankStore::new()),
            RankConfig::default().with_max_attempts(0),
        );
        assert!(matches!(result, Err(ConfigError::ZeroAttempts)));
    }
}
