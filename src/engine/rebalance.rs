//! Rebalancing: rewrite a group's keys to canonical, evenly spaced values.
//!
//! ## Write Order
//!
//! Keys are rewritten one record at a time, and the group must read in the
//! same order after every single write. Records are split by where their
//! new key lies relative to their old one:
//!
//! ```text
//! pass 1: records moving up,   right to left
//! pass 2: records moving down, left to right
//! ```
//!
//! In pass 1 a record's right neighbour has either already moved up past
//! the new key or is still at an old key above it; its left neighbour still
//! sits at an old key below. Pass 2 mirrors this. Every write therefore
//! lands strictly between its current neighbours and never collides.
//!
//! ## Resumability
//!
//! Targets depend only on the group size. A job that stops half-way leaves
//! a correctly ordered group; running it again finishes the rewrite, and
//! running it on a canonical group writes nothing.

use crate::codec::RankCodec;
use crate::error::StoreError;
use crate::store::RankStore;
use crate::types::{GroupId, Rank, RebalanceReceipt, RecordId};

/// Rewrites one group's keys to `RankCodec::spread`.
///
/// Callers must hold the group's lock for the duration of [`run`](Self::run).
#[derive(Debug)]
pub struct RebalanceJob<'a, S: RankStore + ?Sized> {
    store: &'a S,
    group_id: GroupId,
}

impl<'a, S: RankStore + ?Sized> RebalanceJob<'a, S> {
    pub fn new(store: &'a S, group_id: GroupId) -> Self {
        Self { store, group_id }
    }

    /// Write order for moving `current` onto `targets`
    ///
    /// Returns indices into `current`; unchanged records are omitted.
    pub fn write_order(current: &[(RecordId, Rank)], targets: &[Rank]) -> Vec<usize> {
        let moving_up = (0..current.len()).rev().filter(|&i| targets[i] > current[i].1);
        let moving_down = (0..current.len()).filter(|&i| targets[i] < current[i].1);
        moving_up.chain(moving_down).collect()
    }

    /// Rewrite the group and return a receipt
    pub fn run(&self) -> Result<RebalanceReceipt, StoreError> {
        let current = self.store.all_ordered(self.group_id)?;
        let targets = RankCodec::spread(current.len());

        let order = Self::write_order(&current, &targets);
        for &i in &order {
            let record_id = current[i].0;
            self.store.write(record_id, self.group_id, &targets[i])?;
        }

        let state_root = RebalanceReceipt::compute_state_root(
            current.iter().map(|(id, _)| *id).zip(targets.iter()),
        );
        let receipt = RebalanceReceipt::new(
            self.group_id,
            current.len() as u64,
            order.len() as u64,
            RankCodec::canonical_len(current.len()) as u64,
            state_root,
        );

        tracing::info!(
            target: "stage_rank::rebalance",
            group_id = self.group_id,
            records = receipt.records,
            rewritten = receipt.keys_rewritten,
            key_len = receipt.key_len,
            state_root = %receipt.state_root_hex(),
            "group rebalanced"
        );
        Ok(receipt)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
