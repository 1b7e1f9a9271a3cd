//! Per-host robots.txt cache
//!
//! Entries are created on first access to a host and never expire during a
//! crawl. The populate-on-miss path runs at most once per host, even when
//! many workers ask for the same host at the same time.

use crate::robots::RobotsRules;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Arc<RobotsRules>>>;

/// Host-keyed cache of parsed robots.txt rules
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, Slot>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached rules for `host`, running `fetch` on a miss
    ///
    /// Concurrent callers for the same host wait on the first caller's fetch
    /// instead of issuing their own. If the fetching future is dropped
    /// (crawl cancelled), the slot stays empty and the next caller fetches.
    ///
    /// # Arguments
    ///
    /// * `host` - The cache key (scheme, host and port of the site)
    /// * `fetch` - Produces the rules when the host is not cached yet
    pub async fn get_or_fetch<F, Fut>(&self, host: &str, fetch: F) -> Arc<RobotsRules>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RobotsRules>,
    {
        let slot = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.entry(host.to_string()).or_default().clone()
        };

        slot.get_or_init(|| async move { Arc::new(fetch().await) })
            .await
            .clone()
    }

    /// Returns the cached rules for `host` without fetching
    #[cfg(test)]
    fn get(&self, host: &str) -> Option<Arc<RobotsRules>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(host).and_then(|slot| slot.get().cloned())
    }

    /// Number of hosts with populated entries
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
