//! Tracker decision and third-party host cache
//!
//! A host the tracking engine flags is still allowed when it belongs to the
//! base host's own site (per the engine's first-party data) or when it is on
//! the fixed embed allowlist below.

use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::cache::LruCache;
use crate::config::DEFAULT_THIRD_PARTY_CACHE_CAPACITY;
use crate::dataset::{DatasetKind, DatasetResolver};
use crate::engine::TrackerEngine;
use crate::store::FilterStore;
use crate::tokens::split_tokens;

/// Embed hosts that are never blocked as trackers. The engine's first-party
/// data for these is not granular enough.
pub const EMBED_ALLOWLIST: &[&str] = &[
    "connect.facebook.net",
    "connect.facebook.com",
    "staticxx.facebook.com",
    "www.facebook.com",
    "scontent.xx.fbcdn.net",
    "pbs.twimg.com",
    "scontent-sjc2-1.xx.fbcdn.net",
    "platform.twitter.com",
    "syndication.twitter.com",
];

// =============================================================================
// Third-Party Host Cache
// =============================================================================

/// Base host -> first-party-affiliated hosts, bounded with LRU eviction.
pub struct ThirdPartyHostCache {
    entries: Mutex<LruCache<String, Arc<[String]>>>,
}

impl Default for ThirdPartyHostCache {
    fn default() -> Self {
        Self::new(DEFAULT_THIRD_PARTY_CACHE_CAPACITY)
    }
}

impl ThirdPartyHostCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Affiliated hosts for `base_host`, asking the engine on a miss.
    ///
    /// The lock is released while the engine is queried, so two threads
    /// missing on the same base host may both query it; the last insert wins.
    pub fn lookup<T: TrackerEngine>(&self, engine: &T, base_host: &str) -> Arc<[String]> {
        if let Some(hosts) = self.entries.lock().get(base_host) {
            return hosts.clone();
        }

        let hosts: Arc<[String]> = engine
            .find_first_party_hosts(base_host)
            .map(|list| split_tokens(&list, ','))
            .unwrap_or_default()
            .into();

        self.entries.lock().insert(base_host.to_string(), hosts.clone());
        hosts
    }

    pub fn contains(&self, base_host: &str) -> bool {
        self.entries.lock().contains(base_host)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

// =============================================================================
// Tracker Blocker
// =============================================================================

/// Whether `host` is `affiliate` or a sub-domain of it, anchored at a label
/// boundary.
pub fn is_affiliated(host: &str, affiliate: &str) -> bool {
    if affiliate.is_empty() {
        return false;
    }
    if host == affiliate {
        return true;
    }
    host.len() > affiliate.len()
        && host.ends_with(affiliate)
        && host.as_bytes()[host.len() - affiliate.len() - 1] == b'.'
}

pub struct TrackerBlocker<T> {
    store: FilterStore<T>,
    first_party: ThirdPartyHostCache,
}

impl<T: TrackerEngine> TrackerBlocker<T> {
    pub fn new(resolver: Arc<dyn DatasetResolver>, cache_capacity: usize) -> Self {
        Self {
            store: FilterStore::new(DatasetKind::TrackingProtection, resolver),
            first_party: ThirdPartyHostCache::new(cache_capacity),
        }
    }

    /// Whether `host`, loaded from a page on `base_host`, is a third-party
    /// tracker. Fails open when the engine is unavailable.
    pub fn should_block(&self, base_host: &str, host: &str) -> bool {
        let Some(engine) = self.store.engine() else {
            return false;
        };

        if !engine.matches_tracker(base_host, host) {
            return false;
        }

        let affiliates = self.first_party.lookup(engine, base_host);
        if affiliates.iter().any(|affiliate| is_affiliated(host, affiliate)) {
            debug!("Tracker {} is first-party for {}", host, base_host);
            return false;
        }

        if EMBED_ALLOWLIST.contains(&host) {
            debug!("Tracker {} is an allowlisted embed", host);
            return false;
        }

        debug!("Tracker blocked: {} on {}", host, base_host);
        true
    }

    pub fn first_party_cache(&self) -> &ThirdPartyHostCache {
        &self.first_party
    }

    pub fn is_loaded(&self) -> bool {
        self.store.is_loaded()
    }

    pub fn unload(&mut self) {
        self.store.unload();
        self.first_party.clear();
    }
}
