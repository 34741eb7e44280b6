//! Ad-block decision
//!
//! Primary engine first, then every loaded regional engine in load order.
//! Nothing is cached here: the engines own their own indexes.

use std::sync::Arc;

use log::debug;

use crate::dataset::{DatasetKind, DatasetResolver};
use crate::engine::AdBlockEngine;
use crate::store::{FilterStore, RegionalFilterStore};
use crate::types::{RequestType, ResourceOption};

pub struct AdBlocker<A> {
    primary: FilterStore<A>,
    regional: RegionalFilterStore<A>,
}

impl<A: AdBlockEngine> AdBlocker<A> {
    pub fn new(resolver: Arc<dyn DatasetResolver>) -> Self {
        Self {
            primary: FilterStore::new(DatasetKind::AdBlock, resolver.clone()),
            regional: RegionalFilterStore::new(DatasetKind::AdBlockRegional, resolver),
        }
    }

    /// Whether `url`, requested from a page on `base_host`, is an ad.
    /// Fails open: an unavailable primary engine allows everything.
    pub fn should_block(
        &self,
        base_host: &str,
        url: &str,
        request_type: RequestType,
        regional_enabled: bool,
    ) -> bool {
        let Some(primary) = self.primary.engine() else {
            return false;
        };

        let option = ResourceOption::from(request_type);
        if primary.matches(url, option, base_host) {
            debug!("Ad blocked by primary list: {}", url);
            return true;
        }

        if !regional_enabled {
            return false;
        }

        let blocked = self
            .regional
            .engines()
            .iter()
            .any(|engine| engine.matches(url, option, base_host));
        if blocked {
            debug!("Ad blocked by regional list: {}", url);
        }
        blocked
    }

    pub fn is_loaded(&self) -> bool {
        self.primary.is_loaded()
    }

    pub fn unload(&mut self) {
        self.primary.unload();
        self.regional.unload();
    }
}
