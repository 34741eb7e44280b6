//! Engine contracts
//!
//! The ad-block and tracking-protection matchers are external libraries; this
//! crate only needs the capabilities below. All engines are created empty via
//! `Default`, filled once by `deserialize`, and then only read, so they must
//! tolerate concurrent read-only queries.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::types::ResourceOption;

/// An engine built from a binary (or serialized) blob.
pub trait FilterEngine: Default + Send + Sync {
    /// Load the engine from `buffer`. Returns false if the blob is rejected.
    fn deserialize(&mut self, buffer: &[u8]) -> bool;
}

/// Ad-block pattern engine.
pub trait AdBlockEngine: FilterEngine {
    fn matches(&self, url: &str, option: ResourceOption, base_host: &str) -> bool;
}

/// Tracking-protection engine.
pub trait TrackerEngine: FilterEngine {
    fn matches_tracker(&self, base_host: &str, host: &str) -> bool;

    /// Comma-separated hosts the engine treats as part of `base_host`'s site.
    fn find_first_party_hosts(&self, base_host: &str) -> Option<String>;
}

/// Ordered key-value store of HTTPS upgrade rule sets, keyed by domain suffix.
pub trait RuleDatabase: FilterEngine {
    fn get(&self, key: &str) -> Option<String>;
}

// =============================================================================
// JSON Rule Database
// =============================================================================

/// Rule database loaded from a JSON object blob.
///
/// Values may be strings holding the rule-group array, or the array itself.
#[derive(Debug, Default, Clone)]
pub struct JsonRuleDatabase {
    entries: BTreeMap<String, String>,
}

impl JsonRuleDatabase {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate keys and raw rule-set values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FilterEngine for JsonRuleDatabase {
    fn deserialize(&mut self, buffer: &[u8]) -> bool {
        let object: BTreeMap<String, Value> = match serde_json::from_slice(buffer) {
            Ok(object) => object,
            Err(e) => {
                log::warn!("Rule database is not a JSON object: {}", e);
                return false;
            }
        };

        self.entries = object
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(text) => (key, text),
                other => (key, other.to_string()),
            })
            .collect();

        true
    }
}

impl RuleDatabase for JsonRuleDatabase {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}
