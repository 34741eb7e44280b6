//! HTTPS upgrade engine
//!
//! `http` URLs are looked up in the rule database by domain-suffix key and
//! rewritten by the first rule set that produces a different URL. Results
//! (including "no upgrade") are cached per URL, and the redirect guard stops a
//! URL from being upgraded again once it hits the cap.

mod redirect;
mod rules;

pub use redirect::RedirectGuard;
pub use rules::{translate_replacement, Rule, RuleGroup, RuleSet};

use std::borrow::Cow;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::cache::LruCache;
use crate::config::BlockersConfig;
use crate::dataset::{DatasetKind, DatasetResolver};
use crate::engine::RuleDatabase;
use crate::store::FilterStore;
use crate::tokens::lookup_keys;
use crate::url::{extract_host, is_plain_http};

/// Cached marker for "evaluated, no upgrade".
const NO_UPGRADE: &str = "";

pub struct HttpsUpgrader<R> {
    store: FilterStore<R>,
    results: Mutex<LruCache<String, String>>,
    guard: RedirectGuard,
}

impl<R: RuleDatabase> HttpsUpgrader<R> {
    pub fn new(resolver: Arc<dyn DatasetResolver>, config: &BlockersConfig) -> Self {
        Self::from_store(FilterStore::new(DatasetKind::HttpsRules, resolver), config)
    }

    pub fn from_store(store: FilterStore<R>, config: &BlockersConfig) -> Self {
        Self {
            store,
            results: Mutex::new(LruCache::new(config.upgrade_cache_capacity)),
            guard: RedirectGuard::new(config.max_redirects, config.redirect_tracked_urls),
        }
    }

    /// Upgraded URL, or `url` itself when there is nothing to do.
    pub fn upgrade<'a>(&self, url: &'a str) -> Cow<'a, str> {
        if !is_plain_http(url) {
            return Cow::Borrowed(url);
        }

        let Some(db) = self.store.engine() else {
            return Cow::Borrowed(url);
        };

        if !self.guard.can_redirect(url) {
            debug!("Redirect cap reached, not upgrading: {}", url);
            return Cow::Borrowed(url);
        }

        let cached = self.results.lock().get(url).cloned();
        if let Some(cached) = cached {
            self.guard.record_redirect(url);
            if cached == NO_UPGRADE {
                return Cow::Borrowed(url);
            }
            return Cow::Owned(cached);
        }

        match self.evaluate(db, url) {
            Some(upgraded) => {
                debug!("Upgraded {} -> {}", url, upgraded);
                self.results.lock().insert(url.to_string(), upgraded.clone());
                self.guard.record_redirect(url);
                Cow::Owned(upgraded)
            }
            None => {
                self.results.lock().insert(url.to_string(), NO_UPGRADE.to_string());
                Cow::Borrowed(url)
            }
        }
    }

    /// Walk the lookup keys and apply the first rule set that rewrites `url`.
    fn evaluate(&self, db: &R, url: &str) -> Option<String> {
        let host = extract_host(url)?.to_ascii_lowercase();

        for key in lookup_keys(&host) {
            let Some(value) = db.get(&key) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }

            let rule_set = match RuleSet::decode(&value) {
                Ok(rule_set) => rule_set,
                Err(e) => {
                    warn!("Rule set for '{}' is unusable: {}", key, e);
                    return None;
                }
            };

            if let Some(upgraded) = rule_set.apply(url) {
                return Some(upgraded);
            }
        }

        None
    }

    pub fn guard(&self) -> &RedirectGuard {
        &self.guard
    }

    pub fn cached_results(&self) -> usize {
        self.results.lock().len()
    }

    /// Load the rule database now instead of on the first `http` URL.
    pub fn ensure_loaded(&self) -> bool {
        self.store.ensure_loaded()
    }

    pub fn is_loaded(&self) -> bool {
        self.store.is_loaded()
    }

    pub fn clear_caches(&self) {
        self.results.lock().clear();
        self.guard.clear();
    }

    pub fn unload(&mut self) {
        self.store.unload();
        self.clear_caches();
    }
}
