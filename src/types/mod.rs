//! Core data types for stage-rank
//!
//! ## Types
//!
//! - [`Rank`]: Ordering key, a base-62 token compared byte-wise
//! - [`RankedRecord`]: A record's group and rank
//! - [`Direction`] / [`Position`]: Placement vocabulary
//! - [`RebalanceReceipt`]: Summary of one rebalance
//!
//! Record and group identifiers are plain `u64` values
//! ([`RecordId`], [`GroupId`]).

mod rank;
mod record;
mod receipt;

// Re-export all types at module level
pub use rank::{digit_char, digit_value, Rank, RankParseError, ALPHABET, BASE};
pub use record::{Direction, GroupId, Position, RankedRecord, RecordId};
pub use receipt::RebalanceReceipt;
