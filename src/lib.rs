//! # Stage Rank
//!
//! Ranked ordering for records grouped into ordered scopes (cards in a
//! stage, items in a list).
//!
//! ## Architecture
//!
//! The crate consists of:
//! - **Types**: Core data structures (Rank, RankedRecord, RebalanceReceipt)
//! - **Codec**: Base-62 key arithmetic (midpoint, spread)
//! - **Store**: Persistence boundary with a slab-backed in-memory backend
//! - **Engine**: Placement orchestration, per-group locking, rebalancing
//! - **Hooks**: Lifecycle callbacks for host records
//!
//! ## Design Principles
//!
//! 1. **One Write per Move**: A placement rewrites exactly one key
//! 2. **Byte Order is Rank Order**: Keys compare as plain strings
//! 3. **No Floating Point**: Midpoints are exact digit arithmetic
//! 4. **Synchronous Execution**: No async; engine methods take `&self`
//!
//! ## Key Space
//!
//! - Alphabet: `0-9A-Za-z` (62 digits, ASCII order)
//! - A key is the fraction `0.d1d2...` and never ends in `0`
//! - Keys grow by one digit per ~6 bisections; rebalancing restores them

// ============================================================================
// Module declarations
// ============================================================================

/// Core data types: Rank, RankedRecord, RebalanceReceipt
pub mod types;

/// Rank codec: midpoint and spread arithmetic
pub mod codec;

/// Rank store: persistence boundary
pub mod store;

/// Ranking engine: placement, locking, rebalancing
pub mod engine;

/// Engine configuration
pub mod config;

/// Error types
pub mod error;

/// Lifecycle hooks for host records
pub mod hooks;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use codec::RankCodec;
pub use config::RankConfig;
pub use engine::{EngineStats, RankEngine};
pub use error::{ConfigError, RankError, StoreError};
pub use hooks::{RankHooks, Ranked};
pub use store::{MemoryRankStore, RankStore};
pub use types::{GroupId, Position, Rank, RankedRecord, RebalanceReceipt, RecordId};
