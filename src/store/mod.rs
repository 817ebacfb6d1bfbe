//! Rank store: the persistence boundary.
//!
//! ## Architecture
//!
//! [`RankStore`] is the only place ranks are read from and written to. The
//! engine never caches ranks between calls; every placement re-reads its
//! neighbours through the store.
//!
//! Any backend that can answer these questions atomically per call is a
//! valid store: a relational table with a `(group_id, rank)` unique index,
//! a document store, or the in-memory [`MemoryRankStore`].
//!
//! ## Contract
//!
//! | Method         | Guarantee                                                   |
//! |----------------|-------------------------------------------------------------|
//! | `neighbors`    | Keys around one position, from a single consistent read    |
//! | `write`        | Atomic; refuses a rank held by another record (`Conflict`)  |
//! | `all_ordered`  | Consistent snapshot: no record twice, none skipped          |
//! | `remove`       | Frees the slot; other ranks untouched                       |
//!
//! ## Components
//!
//! - [`GroupTable`]: slab-backed ordered table for one group
//! - [`MemoryRankStore`]: in-memory store over `GroupTable`s

pub mod group;
pub mod memory;

pub use group::{GroupTable, RankEntry};
pub use memory::MemoryRankStore;

use crate::error::StoreError;
use crate::types::{Direction, GroupId, Rank, RankedRecord, RecordId};

/// Keys immediately below and above a target position
pub type Neighbors = (Option<Rank>, Option<Rank>);

/// Durable boundary for rank state, scoped by group.
pub trait RankStore: Send + Sync {
    /// Current group and rank of a record
    fn locate(&self, record_id: RecordId) -> Result<Option<RankedRecord>, StoreError>;

    /// Keys around a position in `group_id`
    ///
    /// With an anchor: the anchor's key and its successor (`After`), or its
    /// predecessor and its key (`Before`). Without an anchor: the group's
    /// last key and `None` (`After`, append), or `None` and the first key
    /// (`Before`, prepend). `exclude` is skipped when looking for
    /// neighbours; it is the record being placed.
    ///
    /// Fails with `AnchorNotFound` when the anchor is not in the group.
    fn neighbors(
        &self,
        group_id: GroupId,
        anchor_id: Option<RecordId>,
        direction: Direction,
        exclude: Option<RecordId>,
    ) -> Result<Neighbors, StoreError>;

    /// Persist a record's group and rank atomically
    ///
    /// Moves the record out of its previous group when `group_id` differs.
    fn write(&self, record_id: RecordId, group_id: GroupId, rank: &Rank) -> Result<(), StoreError>;

    /// Delete a record's rank entry
    fn remove(&self, record_id: RecordId) -> Result<Option<RankedRecord>, StoreError>;

    /// Consistent ordered snapshot of a group
    fn all_ordered(&self, group_id: GroupId) -> Result<Vec<(RecordId, Rank)>, StoreError>;

    /// Number of records in a group
    fn group_len(&self, group_id: GroupId) -> Result<usize, StoreError> {
        Ok(self.all_ordered(group_id)?.len())
    }
}
