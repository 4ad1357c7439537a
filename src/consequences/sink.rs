// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::consequences::parameters::Parameters;
use crate::filter::FilterId;

use core::time::Duration;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A block to be placed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRequest {
    pub filter: FilterId,
    /// User name, address or CIDR range.
    pub target: String,
    /// `None` blocks indefinitely.
    pub expiry: Option<Duration>,
    pub range: bool,
    pub block_talk: bool,
    pub reason: String,
}

/// One row of the abuse log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub filter: FilterId,
    pub filter_name: String,
    pub action: String,
    pub user_name: String,
    pub page: String,
    pub actions_taken: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub var_dump: Option<String>,
}

/// Durable state and side effects consequences rely on.
///
/// Implementations shared between concurrent actions must make
/// `incr_with_init` a single atomic step.
pub trait ConsequenceSink {
    /// Increments `key`, creating it with value 1 and the given lifetime when absent.
    fn incr_with_init(&self, key: &str, ttl: Duration) -> Result<i64>;
    fn get(&self, key: &str) -> Result<Option<i64>>;
    fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;

    fn block(&self, request: &BlockRequest) -> Result<bool>;
    fn degroup(&self, params: &Parameters) -> Result<bool>;
    fn custom(&self, name: &str, args: &[String], params: &Parameters) -> Result<bool>;

    fn log_hit(&self, entry: &AuditEntry) -> Result<()>;
    fn bump_hit_count(&self, filter: FilterId) -> Result<()>;
}

/// Per-session flags of the acting user.
pub trait SessionStore {
    fn has_flag(&self, key: &str) -> bool;
    fn set_flag(&self, key: &str);
    fn clear_flag(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemorySession {
    flags: Mutex<HashSet<String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySession {
    fn has_flag(&self, key: &str) -> bool {
        self.flags.lock().contains(key)
    }

    fn set_flag(&self, key: &str) {
        self.flags.lock().insert(key.to_string());
    }

    fn clear_flag(&self, key: &str) {
        self.flags.lock().remove(key);
    }
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    value: i64,
    expires: Instant,
}

/// In-process sink that records every effect for inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    counters: Mutex<HashMap<String, Counter>>,
    blocks: Mutex<Vec<BlockRequest>>,
    degrouped: Mutex<Vec<String>>,
    custom: Mutex<Vec<(String, Vec<String>)>>,
    audit: Mutex<Vec<AuditEntry>>,
    hits: Mutex<BTreeMap<FilterId, u64>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> Vec<BlockRequest> {
        self.blocks.lock().clone()
    }

    pub fn degrouped(&self) -> Vec<String> {
        self.degrouped.lock().clone()
    }

    pub fn custom_actions(&self) -> Vec<(String, Vec<String>)> {
        self.custom.lock().clone()
    }

    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.audit.lock().clone()
    }

    pub fn hit_count(&self, filter: FilterId) -> u64 {
        self.hits.lock().get(&filter).copied().unwrap_or(0)
    }
}

fn expiry(now: Instant, ttl: Duration) -> Result<Instant> {
    match now.checked_add(ttl) {
        Some(expires) => Ok(expires),
        None => bail!("counter lifetime of {}s is out of range", ttl.as_secs()),
    }
}

impl ConsequenceSink for MemorySink {
    fn incr_with_init(&self, key: &str, ttl: Duration) -> Result<i64> {
        let now = Instant::now();
        let expires = expiry(now, ttl)?;
        let mut counters = self.counters.lock();
        let counter = counters
            .entry(key.to_string())
            .or_insert(Counter { value: 0, expires });
        if counter.expires <= now {
            *counter = Counter { value: 0, expires };
        }
        counter.value += 1;
        Ok(counter.value)
    }

    fn get(&self, key: &str) -> Result<Option<i64>> {
        let counters = self.counters.lock();
        Ok(counters
            .get(key)
            .filter(|c| c.expires > Instant::now())
            .map(|c| c.value))
    }

    fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<()> {
        let expires = expiry(Instant::now(), ttl)?;
        self.counters
            .lock()
            .insert(key.to_string(), Counter { value, expires });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.counters.lock().remove(key);
        Ok(())
    }

    fn block(&self, request: &BlockRequest) -> Result<bool> {
        self.blocks.lock().push(request.clone());
        Ok(true)
    }

    fn degroup(&self, params: &Parameters) -> Result<bool> {
        self.degrouped.lock().push(params.action.user_name.clone());
        Ok(true)
    }

    fn custom(&self, name: &str, args: &[String], _: &Parameters) -> Result<bool> {
        self.custom.lock().push((name.to_string(), args.to_vec()));
        Ok(true)
    }

    fn log_hit(&self, entry: &AuditEntry) -> Result<()> {
        self.audit.lock().push(entry.clone());
        Ok(())
    }

    fn bump_hit_count(&self, filter: FilterId) -> Result<()> {
        *self.hits.lock().entry(filter).or_insert(0) += 1;
        Ok(())
    }
}
