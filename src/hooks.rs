//! Lifecycle hooks for host records.
//!
//! A host application calls these from its own create, update and delete
//! paths so ranks follow the record without explicit drag-and-drop calls:
//!
//! | Event                        | Effect                             |
//! |------------------------------|------------------------------------|
//! | created without a position   | appended to its group              |
//! | group changed                | moved to the back of the new group |
//! | deleted                      | rank removed                       |
//!
//! ## Example
//!
//! ```
//! use stage_rank::hooks::{RankHooks, Ranked};
//! use stage_rank::RankEngine;
//!
//! struct Card { id: u64, stage_id: u64 }
//!
//! impl Ranked for Card {
//!     fn record_id(&self) -> u64 { self.id }
//!     fn group_id(&self) -> u64 { self.stage_id }
//! }
//!
//! let engine = RankEngine::in_memory();
//! let mut card = Card { id: 1, stage_id: 10 };
//! engine.on_create(&card).unwrap();
//!
//! card.stage_id = 20;
//! engine.on_group_change(&card).unwrap();
//! assert_eq!(engine.order_of(20).unwrap(), vec![1]);
//!
//! engine.on_delete(&card).unwrap();
//! assert!(engine.order_of(20).unwrap().is_empty());
//! ```

use crate::engine::RankEngine;
use crate::error::RankError;
use crate::store::RankStore;
use crate::types::{GroupId, RecordId};

/// A host entity that is ordered within a group.
pub trait Ranked {
    fn record_id(&self) -> RecordId;

    /// The group the entity currently belongs to
    fn group_id(&self) -> GroupId;
}

/// Lifecycle callbacks keeping ranks in step with host records.
pub trait RankHooks {
    /// New record: back of its group
    fn on_create<R: Ranked + ?Sized>(&self, record: &R) -> Result<(), RankError>;

    /// Group changed: back of the new group
    ///
    /// No-op when the record is already ranked in its current group.
    fn on_group_change<R: Ranked + ?Sized>(&self, record: &R) -> Result<(), RankError>;

    /// Record deleted: drop its rank
    fn on_delete<R: Ranked + ?Sized>(&self, record: &R) -> Result<(), RankError>;
}

impl<S: RankStore> RankHooks for RankEngine<S> {
    fn on_create<R: Ranked + ?Sized>(&self, record: &R) -> Result<(), RankError> {
        self.append(record.record_id(), record.group_id())
    }

    fn on_group_change<R: Ranked + ?Sized>(&self, record: &R) -> Result<(), RankError> {
        let group_id = record.group_id();
        let current = self.locate(record.record_id())?.map(|r| r.group_id);
        if current == Some(group_id) {
            return Ok(());
        }
        self.move_to(record.record_id(), group_id, None, None)
    }

    fn on_delete<R: Ranked + ?Sized>(&self, record: &R) -> Result<(), RankError> {
        self.remove(record.record_id()).map(|_| ())
    }
}
