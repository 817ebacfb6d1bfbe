//! Ranking engine module for Stage Rank.
//!
//! ## Design Principles
//!
//! The engine is designed for:
//!
//! 1. **Locality**: A placement rewrites exactly one key; other records keep theirs
//! 2. **Group Isolation**: Groups are locked independently, in ascending id order
//! 3. **Store Authority**: Neighbour keys are always re-read inside the lock
//! 4. **Bounded Retry**: Lost races are retried a configured number of times
//!
//! ## Placement Rules
//!
//! - **Append** lands after the group's last key (`"1"` in an empty group)
//! - **Prepend** lands before the group's first key (`"z"` in an empty group)
//! - **Between** lands directly after `before_id`, below its successor
//! - **Exhausted** key space triggers one rebalance of the group
//!
//! ## Example
//!
//! ```
//! use stage_rank::engine::RankEngine;
//!
//! let engine = RankEngine::in_memory();
//! engine.append(1, 7).unwrap();
//! engine.append(2, 7).unwrap();
//! engine.prepend(3, 7).unwrap();
//!
//! // Drag 3 back between 1 and 2
//! engine.reorder(3, Some(1), Some(2), None).unwrap();
//!
//! assert_eq!(engine.order_of(7).unwrap(), vec![1, 3, 2]);
//! ```

pub mod locks;
pub mod rank_engine;
pub mod rebalance;

pub use locks::{GroupLocks, LockTimeout};
pub use rank_engine::{EngineStats, RankEngine};
pub use rebalance::RebalanceJob;
