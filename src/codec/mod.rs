//! Rank codec module.
//!
//! ## Components
//!
//! - [`digits`]: Base-62 fraction arithmetic on raw digit slices
//! - [`RankCodec`]: Midpoint, extremal and evenly spaced keys
//!
//! ## Determinism
//!
//! Every function in this module is a pure function of its inputs. The
//! same bounds always produce the same key, and the same group size always
//! produces the same rebalanced keys.

pub mod digits;
pub mod rank_codec;

pub use rank_codec::{Exhausted, RankCodec};
