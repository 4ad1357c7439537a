// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Condition budget and cooperative wall-clock limits.

mod error;
mod time;

pub use error::LimitError;
pub use time::ExecutionTimer;

/// Monotonic condition counter shared by every filter of one run.
///
/// The counter is checked before it is raised, so a failed raise leaves
/// `consumed() == limit()`.
#[derive(Debug, Clone)]
pub struct ConditionCounter {
    limit: usize,
    consumed: usize,
    enforced: bool,
}

impl ConditionCounter {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            consumed: 0,
            enforced: true,
        }
    }

    /// A counter that only measures. Used by syntax checks and the calculator mode.
    pub fn unlimited() -> Self {
        Self {
            limit: usize::MAX,
            consumed: 0,
            enforced: false,
        }
    }

    pub fn raise(&mut self, n: usize) -> Result<(), LimitError> {
        let next = self.consumed.saturating_add(n);
        if self.enforced && next > self.limit {
            self.consumed = self.limit;
            return Err(LimitError::ConditionLimitReached { limit: self.limit });
        }
        self.consumed = next;
        Ok(())
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_exhausted(&self) -> bool {
        self.enforced && self.consumed >= self.limit
    }
}
