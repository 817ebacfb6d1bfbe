//! Rank tokens.
//!
//! ## Representation
//!
//! A rank is a non-empty string over the base-62 alphabet
//! `0-9A-Za-z`. ASCII order of the alphabet matches digit order, so
//! plain byte-wise string comparison orders ranks.
//!
//! A rank reads as the base-62 fraction `0.d1 d2 d3 ...`. Ranks never end
//! in `0`: `"V"` and `"V0"` would denote the same fraction, and forbidding
//! the trailing zero keeps byte order identical to numeric order.
//!
//! ```text
//! "1"  = 1/62      (smallest single-digit rank)
//! "V"  = 31/62     (one half)
//! "z"  = 61/62     (largest single-digit rank)
//! "0V" = 31/3844   (sorts before "1")
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Ordered digit alphabet (byte order == digit order)
pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Number of digits in the alphabet
pub const BASE: u32 = 62;

/// Digit value of an alphabet byte
#[inline]
pub fn digit_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'Z' => Some(byte - b'A' + 10),
        b'a'..=b'z' => Some(byte - b'a' + 36),
        _ => None,
    }
}

/// Alphabet byte for a digit value (< 62)
#[inline]
pub fn digit_char(value: u8) -> u8 {
    ALPHABET[value as usize]
}

/// Reasons a string is not a valid rank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankParseError {
    #[error("rank is empty")]
    Empty,

    #[error("invalid rank digit {byte:#04x} at offset {offset}")]
    InvalidDigit { offset: usize, byte: u8 },

    #[error("rank ends in a zero digit")]
    TrailingZero,
}

/// An ordering key within a group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rank(String);

impl Rank {
    /// Parse and validate a rank token
    ///
    /// # Example
    ///
    /// ```
    /// use stage_rank::types::Rank;
    ///
    /// let rank = Rank::parse("V").unwrap();
    /// assert_eq!(rank.as_str(), "V");
    /// assert!(Rank::parse("V0").is_err());
    /// ```
    pub fn parse(token: &str) -> Result<Self, RankParseError> {
        let bytes = token.as_bytes();
        if bytes.is_empty() {
            return Err(RankParseError::Empty);
        }
        for (offset, &byte) in bytes.iter().enumerate() {
            if digit_value(byte).is_none() {
                return Err(RankParseError::InvalidDigit { offset, byte });
            }
        }
        if bytes[bytes.len() - 1] == b'0' {
            return Err(RankParseError::TrailingZero);
        }
        Ok(Self(token.to_owned()))
    }

    /// Build a rank from digit values, trimming trailing zeros.
    ///
    /// Returns `None` when nothing but zeros remain.
    pub(crate) fn from_digits(digits: &[u8]) -> Option<Self> {
        let end = digits.iter().rposition(|&d| d != 0)? + 1;
        let token = digits[..end].iter().map(|&d| digit_char(d) as char).collect();
        Some(Self(token))
    }

    /// Single-digit rank; `value` must be a non-zero digit
    pub(crate) fn from_digit(value: u8) -> Self {
        debug_assert!(value > 0 && (value as u32) < BASE);
        Self((digit_char(value) as char).to_string())
    }

    /// Digit values of this rank, most significant first
    pub fn digits(&self) -> impl Iterator<Item = u8> + '_ {
        // Validated on construction
        self.0.bytes().map(|b| digit_value(b).unwrap_or(0))
    }

    /// Token as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Token length in digits
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; ranks are never empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Rank {
    type Err = RankParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Rank {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
