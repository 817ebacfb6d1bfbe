//! Rebalance receipts and group state roots.
//!
//! A `RebalanceReceipt` summarises one rebalance of a group, including the
//! state root of the group after the rewrite.

use ssz_rs::prelude::*;
use sha2::{Sha256, Digest};

use crate::types::{Rank, RecordId};

/// Receipt summarising one rebalance of a group.
///
/// ## State Root
///
/// The 32-byte state root is a SHA-256 hash over the group's ordered
/// `(record_id, rank)` pairs (see [`RebalanceReceipt::compute_state_root`]).
/// Two groups with the same members in the same order under the same keys
/// share a root.
///
/// ## Example
///
/// ```
/// use stage_rank::types::RebalanceReceipt;
///
/// let receipt = RebalanceReceipt::new(
///     4,                      // group_id
///     120,                    // records
///     118,                    // keys_rewritten
///     3,                      // key_len
///     [0u8; 32],              // state_root (would be computed)
/// );
/// assert!(!receipt.is_noop());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct RebalanceReceipt {
    /// Group that was rebalanced
    pub group_id: u64,

    /// Number of records in the group
    pub records: u64,

    /// Number of records whose key actually changed
    pub keys_rewritten: u64,

    /// Digit length of the canonical keys
    pub key_len: u64,

    /// State root after the rebalance (SHA-256, 32 bytes)
    pub state_root: [u8; 32],
}

impl RebalanceReceipt {
    /// Create a new rebalance receipt
    pub fn new(
        group_id: u64,
        records: u64,
        keys_rewritten: u64,
        key_len: u64,
        state_root: [u8; 32],
    ) -> Self {
        Self {
            group_id,
            records,
            keys_rewritten,
            key_len,
            state_root,
        }
    }

    /// Compute the state root of an ordered group
    ///
    /// Each entry contributes its id (little-endian), the rank length
    /// (little-endian u32) and the rank bytes.
    pub fn compute_state_root<'a, I>(entries: I) -> [u8; 32]
    where
        I: IntoIterator<Item = (RecordId, &'a Rank)>,
    {
        let mut hasher = Sha256::new();
        for (id, rank) in entries {
            hasher.update(id.to_le_bytes());
            hasher.update((rank.len() as u32).to_le_bytes());
            hasher.update(rank.as_str().as_bytes());
        }
        let result = hasher.finalize();

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        hash
    }

    /// Get the state root as a hex string
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root)
    }

    /// True when the group was already canonical and nothing was written
    pub fn is_noop(&self) -> bool {
        self.keys_rewritten == 0
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
