// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/*
ExecutionTimer bounds the wall-clock time of one filter run. It is only
checked between filters: a filter that started always finishes, and the
remaining filters are skipped once the limit has passed.
*/

use core::time::Duration;
use std::time::Instant;

use super::LimitError;

/// Cooperative time-limit tracker for one filter run.
#[derive(Debug, Clone)]
pub struct ExecutionTimer {
    limit: Option<Duration>,
    start: Instant,
}

impl ExecutionTimer {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            limit,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn check(&self) -> Result<(), LimitError> {
        match self.limit {
            Some(limit) => {
                let elapsed = self.elapsed();
                if elapsed > limit {
                    Err(LimitError::TimeLimitExceeded { elapsed, limit })
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }
}
