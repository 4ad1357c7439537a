// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::consequences::parameters::Parameters;
use crate::consequences::ExecContext;

use anyhow::Result;

pub const DEFAULT_DISALLOW: &str = "abusefilter-disallowed";

#[derive(Debug, Clone)]
pub struct Disallow {
    pub(crate) params: Parameters,
    pub(crate) message: String,
}

impl Disallow {
    pub fn new(params: Parameters, args: &[String]) -> Self {
        let message = args
            .first()
            .filter(|m| !m.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_DISALLOW.to_string());
        Self { params, message }
    }
}

/// Adds change tags to the action.
#[derive(Debug, Clone)]
pub struct Tag {
    pub(crate) params: Parameters,
    tags: Vec<String>,
}

impl Tag {
    pub fn new(params: Parameters, args: &[String]) -> Self {
        Self {
            params,
            tags: args.iter().filter(|t| !t.is_empty()).cloned().collect(),
        }
    }

    pub fn execute(&mut self, ctx: &mut ExecContext<'_>) -> Result<bool> {
        ctx.tags.extend(self.tags.iter().map(String::as_str));
        Ok(!self.tags.is_empty())
    }
}

/// An action the core does not know, carried out by the sink.
#[derive(Debug, Clone)]
pub struct Custom {
    pub(crate) params: Parameters,
    pub(crate) name: String,
    args: Vec<String>,
}

impl Custom {
    pub fn new(params: Parameters, name: &str, args: &[String]) -> Self {
        Self {
            params,
            name: name.to_string(),
            args: args.to_vec(),
        }
    }

    pub fn execute(&mut self, ctx: &mut ExecContext<'_>) -> Result<bool> {
        ctx.sink.custom(&self.name, &self.args, &self.params)
    }
}
