//! Shared parallel processing configuration.

use crate::core::constants::DEFAULT_DISPATCH_THRESHOLD;
use crate::core::errors::VisionError;
use crate::core::validation::validate_positive;
use serde::{Deserialize, Serialize};

/// Centralized configuration for parallel processing behavior.
///
/// Consolidates the knobs that decide when work fans out across threads
/// instead of being scattered through the scheduler and batch helpers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Maximum number of threads for the dispatch pool.
    /// If None, rayon picks its default (typically the CPU core count).
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Number of detector requests at or below which dispatch stays
    /// sequential. Default: 2.
    #[serde(default = "ParallelPolicy::default_dispatch_threshold")]
    pub dispatch_threshold: usize,

    /// Number of images at or below which batch preprocessing stays
    /// sequential. Default: 4.
    #[serde(default = "ParallelPolicy::default_batch_threshold")]
    pub batch_threshold: usize,
}

impl ParallelPolicy {
    fn default_dispatch_threshold() -> usize {
        DEFAULT_DISPATCH_THRESHOLD
    }

    fn default_batch_threshold() -> usize {
        4
    }

    /// Creates a policy with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the dispatch pool at `threads`.
    pub fn with_max_threads(mut self, threads: usize) -> Self {
        self.max_threads = Some(threads);
        self
    }

    /// Sets the request count threshold for parallel dispatch.
    pub fn with_dispatch_threshold(mut self, threshold: usize) -> Self {
        self.dispatch_threshold = threshold;
        self
    }

    /// Validates the policy values.
    pub fn validate(&self) -> Result<(), VisionError> {
        if let Some(threads) = self.max_threads {
            validate_positive(threads, "max_threads")?;
        }
        Ok(())
    }

    /// Returns true if `item_count` items should be processed in parallel.
    pub fn should_parallelize(&self, item_count: usize) -> bool {
        item_count > self.dispatch_threshold
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            dispatch_threshold: Self::default_dispatch_threshold(),
            batch_threshold: Self::default_batch_threshold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = ParallelPolicy::default();
        assert_eq!(policy.dispatch_threshold, DEFAULT_DISPATCH_THRESHOLD);
        assert!(policy.max_threads.is_none());
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_should_parallelize() {
        let policy = ParallelPolicy::default().with_dispatch_threshold(2);
        assert!(!policy.should_parallelize(1));
        assert!(!policy.should_parallelize(2));
        assert!(policy.should_parallelize(3));
    }

    #[test]
    fn test_zero_max_threads_rejected() {
        let policy = ParallelPolicy::default().with_max_threads(0);
        assert!(policy.validate().is_err());
    }
}
