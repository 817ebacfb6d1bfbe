//! Rank codec: pure key arithmetic.
//!
//! ## Midpoint Rules
//!
//! | low       | high      | Strategy                                          |
//! |-----------|-----------|---------------------------------------------------|
//! | `Some`    | `Some`    | Digit-wise average, trimmed to shortest prefix    |
//! | `Some`    | `None`    | Increment the first digit that can take it        |
//! | `None`    | `Some`    | Decrement the first digit that can take it        |
//! | `None`    | `None`    | `"V"` (one half)                                  |
//!
//! Open-ended placement steps rather than bisects, so repeated appends grow
//! the key by one digit every 61 inserts instead of every ~6.
//!
//! ## Exhaustion
//!
//! A midpoint is refused with [`Exhausted`] when the bounds are not
//! strictly increasing, or when the key would be longer than the codec's
//! `max_len`. The engine answers exhaustion by rebalancing the group.

use std::cmp::Ordering;

use thiserror::Error;

use crate::codec::digits;
use crate::types::{Rank, BASE};

/// No key fits strictly between the bounds within the length limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no rank fits between the bounds")]
pub struct Exhausted;

/// Stateless rank arithmetic with a length limit.
///
/// ## Example
///
/// ```
/// use stage_rank::codec::RankCodec;
/// use stage_rank::types::Rank;
///
/// let codec = RankCodec::new(8);
/// let a = RankCodec::first();
/// let b = codec.midpoint(Some(&a), None).unwrap();
/// let c = codec.midpoint(Some(&a), Some(&b)).unwrap();
///
/// assert!(a < c && c < b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankCodec {
    max_len: usize,
}

impl RankCodec {
    /// Create a codec producing keys of at most `max_len` digits
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// Longest key this codec produces
    #[inline]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Smallest single-digit key (`"1"`)
    pub fn first() -> Rank {
        Rank::from_digit(1)
    }

    /// Largest single-digit key (`"z"`)
    pub fn last() -> Rank {
        Rank::from_digit((BASE - 1) as u8)
    }

    /// Key strictly between `low` and `high`
    ///
    /// `None` stands for the open end of the group: below every key for
    /// `low`, above every key for `high`.
    pub fn midpoint(&self, low: Option<&Rank>, high: Option<&Rank>) -> Result<Rank, Exhausted> {
        let low_digits: Vec<u8> = low.map(|r| r.digits().collect()).unwrap_or_default();
        let high_digits: Option<Vec<u8>> = high.map(|r| r.digits().collect());

        let key = match (low, &high_digits) {
            (None, None) => vec![(BASE / 2) as u8],
            (Some(_), None) => digits::step_up(&low_digits),
            (None, Some(high)) => match digits::step_down(high) {
                Some(key) => key,
                None => digits::shortest_above(&digits::average(&[], Some(high)), &[]).to_vec(),
            },
            (Some(_), Some(high)) => {
                if digits::compare(&low_digits, high) != Ordering::Less {
                    return Err(Exhausted);
                }
                let mid = digits::average(&low_digits, Some(high));
                digits::shortest_above(&mid, &low_digits).to_vec()
            }
        };

        let rank = Rank::from_digits(&key).ok_or(Exhausted)?;
        if rank.len() > self.max_len {
            return Err(Exhausted);
        }
        Ok(rank)
    }

    /// Digit length of canonical keys for a group of `n` records
    pub fn canonical_len(n: usize) -> usize {
        digits::canonical_len(n)
    }

    /// Canonical evenly spaced keys for a group of `n` records
    ///
    /// Pure function of `n`: the `i`-th key is the `i`-th of `n` evenly
    /// divided points of the key space, with at least one full digit of
    /// room between neighbours.
    pub fn spread(n: usize) -> Vec<Rank> {
        let len = Self::canonical_len(n);
        (0..n)
            .filter_map(|i| Rank::from_digits(&digits::spread_point(i, n, len)))
            .collect()
    }

    /// Whether a group's keys have grown past the proactive threshold
    ///
    /// True when the average key length exceeds `factor` times the canonical
    /// length for the group's size.
    pub fn needs_rebalance<'a, I>(ranks: I, factor: usize) -> bool
    where
        I: IntoIterator<Item = &'a Rank>,
    {
        let (count, total) = ranks
            .into_iter()
            .fold((0usize, 0usize), |(count, total), rank| (count + 1, total + rank.len()));
        if count == 0 {
            return false;
        }
        total > factor * Self::canonical_len(count) * count
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
