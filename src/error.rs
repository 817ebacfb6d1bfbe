//! Error types surfaced by the ranking engine.
//!
//! Every failure that leaves [`RankEngine`](crate::engine::RankEngine) is a
//! [`RankError`]. Store-level failures ([`StoreError`]) stay behind the
//! engine: conflicts are retried, unavailability is reported as
//! [`RankError::StorageUnavailable`].

use thiserror::Error;

use crate::types::{GroupId, Rank, RecordId};

/// Primary error type for ranking operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankError {
    /// Caller-specified anchors cannot be honoured.
    ///
    /// The caller should re-read the current order before retrying.
    #[error("invalid anchor for record {record_id}: {reason}")]
    InvalidAnchor {
        record_id: RecordId,
        reason: &'static str,
    },

    /// Bounded retries exhausted by concurrent writers. Safe to retry.
    #[error("contention on group {group_id}: gave up after {attempts} attempts")]
    Contention { group_id: GroupId, attempts: u32 },

    /// The durable boundary failed.
    #[error("storage unavailable: {detail}")]
    StorageUnavailable { detail: String },

    /// No key fits even after rebalancing the group.
    ///
    /// Only reachable when `max_rank_len` is too short for the group size.
    #[error("key space exhausted in group {group_id} (max rank length {max_rank_len})")]
    KeySpaceExhausted { group_id: GroupId, max_rank_len: usize },
}

impl RankError {
    /// True when repeating the whole operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Contention { .. })
    }
}

/// Failures at the store boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another record of the group already holds the rank.
    #[error("rank {rank} already held in group {group_id}")]
    Conflict { group_id: GroupId, rank: Rank },

    /// The anchor record is not a member of the group.
    #[error("record {record_id} is not in group {group_id}")]
    AnchorNotFound { group_id: GroupId, record_id: RecordId },

    /// The backing storage could not be reached.
    #[error("{0}")]
    Unavailable(String),
}

/// Invalid [`RankConfig`](crate::config::RankConfig) values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_rank_len must be at least {min}, got {got}")]
    RankLenTooSmall { min: usize, got: usize },

    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("length_factor must be at least 1")]
    ZeroLengthFactor,
}
