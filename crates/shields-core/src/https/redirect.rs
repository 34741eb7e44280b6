//! Redirect loop guard
//!
//! Counts upgrades applied per original URL so conflicting rules cannot bounce
//! a request between schemes forever. Tracks a bounded number of URLs and
//! forgets the oldest first (FIFO, no promotion on access).

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::config::{DEFAULT_MAX_REDIRECTS, DEFAULT_REDIRECT_TRACKED_URLS};

#[derive(Debug, Default)]
struct RedirectCounts {
    counts: HashMap<String, u32>,
    order: VecDeque<String>,
}

#[derive(Debug)]
pub struct RedirectGuard {
    max_redirects: u32,
    tracked_urls: usize,
    inner: Mutex<RedirectCounts>,
}

impl Default for RedirectGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REDIRECTS, DEFAULT_REDIRECT_TRACKED_URLS)
    }
}

impl RedirectGuard {
    pub fn new(max_redirects: u32, tracked_urls: usize) -> Self {
        Self {
            max_redirects,
            tracked_urls: tracked_urls.max(1),
            inner: Mutex::new(RedirectCounts::default()),
        }
    }

    /// False once `url` has been upgraded `max_redirects - 1` times.
    pub fn can_redirect(&self, url: &str) -> bool {
        let limit = self.max_redirects.saturating_sub(1);
        let inner = self.inner.lock();
        inner.counts.get(url).copied().unwrap_or(0) < limit
    }

    pub fn record_redirect(&self, url: &str) {
        let mut inner = self.inner.lock();

        if let Some(count) = inner.counts.get_mut(url) {
            *count += 1;
            return;
        }

        if inner.counts.len() >= self.tracked_urls {
            if let Some(oldest) = inner.order.pop_front() {
                inner.counts.remove(&oldest);
            }
        }

        inner.order.push_back(url.to_string());
        inner.counts.insert(url.to_string(), 1);
    }

    pub fn redirect_count(&self, url: &str) -> u32 {
        self.inner.lock().counts.get(url).copied().unwrap_or(0)
    }

    pub fn tracked(&self) -> usize {
        self.inner.lock().counts.len()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.counts.clear();
        inner.order.clear();
    }
}
