//! Per-group serialization points.
//!
//! Every mutating engine operation runs while holding the lock of each group
//! it touches. Locks are always taken in ascending group id order, so a move
//! from G to H and a move from H to G cannot deadlock. Acquisition waits at
//! most `timeout` per lock; a timeout is reported to the caller, who counts
//! it as one contended attempt.
//!
//! The registry only holds groups that are locked or awaited right now; an
//! entry is dropped once its last holder releases it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::types::GroupId;

/// A group lock could not be acquired in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTimeout {
    pub group_id: GroupId,
}

/// Registry of one mutex per group.
#[derive(Debug, Default)]
pub struct GroupLocks {
    locks: Mutex<HashMap<GroupId, Arc<Mutex<()>>>>,
}

impl GroupLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the locks of all `groups`
    ///
    /// Duplicates are ignored. The locks are not re-entrant: `f` must not
    /// try to lock any of the same groups again.
    pub fn with_groups<T, F>(&self, groups: &[GroupId], timeout: Duration, f: F) -> Result<T, LockTimeout>
    where
        F: FnOnce() -> T,
    {
        let mut ordered = groups.to_vec();
        ordered.sort_unstable();
        ordered.dedup();
        let result = self.lock_all(&ordered, timeout, f);
        self.release(&ordered);
        result
    }

    /// Drop registry entries nobody else holds a handle to
    fn release(&self, groups: &[GroupId]) {
        let mut locks = self.locks.lock();
        for group_id in groups {
            if locks.get(group_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
                locks.remove(group_id);
            }
        }
    }

    fn lock_all<T, F>(&self, groups: &[GroupId], timeout: Duration, f: F) -> Result<T, LockTimeout>
    where
        F: FnOnce() -> T,
    {
        let Some((&group_id, rest)) = groups.split_first() else {
            return Ok(f());
        };
        let lock = self.lock_for(group_id);
        let Some(_guard) = lock.try_lock_for(timeout) else {
            return Err(LockTimeout { group_id });
        };
        self.lock_all(rest, timeout, f)
    }

    fn lock_for(&self, group_id: GroupId) -> Arc<Mutex<()>> {
        self.locks.lock().entry(group_id).or_default().clone()
    }

    /// Number of groups currently locked or waited on
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
