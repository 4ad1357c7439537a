// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::consequences::parameters::Parameters;
use crate::consequences::ExecContext;
use crate::error::InternalError;

use anyhow::Result;
use log::debug;

pub const DEFAULT_WARNING: &str = "abusefilter-warning";

/// Shows a warning the first time, lets the action through on resubmission.
#[derive(Debug, Clone)]
pub struct Warn {
    pub(crate) params: Parameters,
    pub(crate) message: String,
    should_warn: Option<bool>,
}

impl Warn {
    pub fn new(params: Parameters, args: &[String]) -> Self {
        let message = args
            .first()
            .filter(|m| !m.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_WARNING.to_string());
        Self {
            params,
            message,
            should_warn: None,
        }
    }

    pub fn session_key(&self) -> String {
        format!(
            "abusefilter-warned-{}-{}",
            self.params.action.page, self.params.filter
        )
    }

    pub fn should_disable_other_consequences(&mut self, ctx: &ExecContext<'_>) -> Result<bool> {
        let warned = ctx.session.has_flag(&self.session_key());
        debug!(
            "warning of filter {} already shown: {warned}",
            self.params.filter
        );
        self.should_warn = Some(!warned);
        Ok(!warned)
    }

    pub fn execute(&mut self, ctx: &mut ExecContext<'_>) -> Result<bool> {
        let Some(should_warn) = self.should_warn else {
            return Err(InternalError::ConsequenceNotPrechecked("warn").into());
        };
        let key = self.session_key();
        if should_warn {
            ctx.session.set_flag(&key);
        } else {
            ctx.session.clear_flag(&key);
        }
        Ok(should_warn)
    }
}
