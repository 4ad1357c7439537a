// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;
use core::time::Duration;

/// Errors reported when the condition budget or the wall-clock ceiling is enforced.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum LimitError {
    /// Reported when evaluating one more condition would exceed the shared budget.
    ConditionLimitReached {
        /// Configured number of conditions for the whole batch.
        limit: usize,
    },
    /// Reported when the run observes elapsed time beyond the configured limit.
    TimeLimitExceeded {
        /// Elapsed duration when the threshold was exceeded.
        elapsed: Duration,
        /// Configured time limit.
        limit: Duration,
    },
}

impl fmt::Debug for LimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConditionLimitReached { limit } => f
                .debug_struct("ConditionLimitReached")
                .field("limit", limit)
                .finish(),
            Self::TimeLimitExceeded { elapsed, limit } => f
                .debug_struct("TimeLimitExceeded")
                .field("elapsed", elapsed)
                .field("limit", limit)
                .finish(),
        }
    }
}

impl fmt::Display for LimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConditionLimitReached { limit } => {
                write!(f, "condition limit reached (limit={limit})")
            }
            Self::TimeLimitExceeded { elapsed, limit } => {
                write!(
                    f,
                    "execution exceeded time limit (elapsed={}ms, limit={}ms)",
                    elapsed.as_millis(),
                    limit.as_millis()
                )
            }
        }
    }
}

impl std::error::Error for LimitError {}
