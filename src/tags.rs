// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeSet;

/// Change tags gathered while one action is processed.
///
/// Owned by the caller for the duration of a request and flushed once at the
/// end, so concurrent actions never share tag state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCollector {
    tags: BTreeSet<String>,
}

impl TagCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tag: &str) {
        self.tags.insert(tag.to_string());
    }

    pub fn extend<'a>(&mut self, tags: impl IntoIterator<Item = &'a str>) {
        for t in tags {
            self.add(t);
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.tags.iter()
    }

    /// Empties the collector and returns what it held, in sorted order.
    pub fn flush(&mut self) -> Vec<String> {
        std::mem::take(&mut self.tags).into_iter().collect()
    }
}
