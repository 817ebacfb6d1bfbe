//! Engine configuration.
//!
//! ## Defaults
//!
//! | Setting               | Default | Meaning                                        |
//! |-----------------------|---------|------------------------------------------------|
//! | `max_rank_len`        | 24      | Longest key the codec will produce             |
//! | `max_attempts`        | 8       | Commit attempts before `Contention`            |
//! | `lock_timeout`        | 250 ms  | Longest wait for a group lock per attempt      |
//! | `length_factor`       | 2       | Proactive threshold, x canonical key length    |
//! | `proactive_rebalance` | false   | Check the threshold after every commit         |
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use stage_rank::RankConfig;
//!
//! let config = RankConfig::default()
//!     .with_max_rank_len(8)
//!     .with_lock_timeout(Duration::from_millis(50));
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use crate::error::ConfigError;

/// Smallest usable key length: one digit of canonical spacing plus one
/// digit of headroom.
pub const MIN_RANK_LEN: usize = 2;

/// Default longest key length
pub const DEFAULT_MAX_RANK_LEN: usize = 24;

/// Default number of commit attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Default group lock wait
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

/// Default proactive rebalance factor
pub const DEFAULT_LENGTH_FACTOR: usize = 2;

/// Tunables for [`RankEngine`](crate::engine::RankEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankConfig {
    /// Longest key the codec may produce before reporting exhaustion
    pub max_rank_len: usize,

    /// Commit attempts before giving up with `Contention`
    pub max_attempts: u32,

    /// Wait bound for each group lock acquisition
    pub lock_timeout: Duration,

    /// A group is rebalanced proactively when its average key length exceeds
    /// `length_factor` times the canonical length for its size
    pub length_factor: usize,

    /// Apply the proactive threshold after every commit
    pub proactive_rebalance: bool,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            max_rank_len: DEFAULT_MAX_RANK_LEN,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            length_factor: DEFAULT_LENGTH_FACTOR,
            proactive_rebalance: false,
        }
    }
}

impl RankConfig {
    pub fn with_max_rank_len(mut self, max_rank_len: usize) -> Self {
        self.max_rank_len = max_rank_len;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn with_length_factor(mut self, length_factor: usize) -> Self {
        self.length_factor = length_factor;
        self
    }

    pub fn with_proactive_rebalance(mut self, enabled: bool) -> Self {
        self.proactive_rebalance = enabled;
        self
    }

    /// Check that the settings are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rank_len < MIN_RANK_LEN {
            return Err(ConfigError::RankLenTooSmall {
                min: MIN_RANK_LEN,
                got: self.max_rank_len,
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.length_factor == 0 {
            return Err(ConfigError::ZeroLengthFactor);
        }
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RankConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_rank_len, DEFAULT_MAX_RANK_LEN);
        assert!(!config.proactive_rebalance);
    }

    #[test]
    fn test_builder_chain() {
        let config = RankConfig::default()
            .with_max_rank_len(4)
            .with_max_attempts(3)
            .with_length_factor(3)
            .with_proactive_rebalance(true);

        assert_eq!(config.max_rank_len, 4);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.length_factor, 3);
        assert!(config.proactive_rebalance);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert_eq!(
            RankConfig::default().with_max_rank_len(1).validate(),
            Err(ConfigError::RankLenTooSmall { min: 2, got: 1 })
        );
        assert_eq!(
            RankConfig::default().with_max_attempts(0).validate(),
            Err(ConfigError::ZeroAttempts)
        );
        assert_eq!(
            RankConfig::default().with_length_factor(0).validate(),
            Err(ConfigError::ZeroLengthFactor)
        );
    }
}
