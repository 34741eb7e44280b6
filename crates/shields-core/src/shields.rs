//! Per-host shields settings
//!
//! The host application owns these; the worker only asks whether shields are
//! on for a top-level host and whether regional lists are enabled.
//!
//! Persisted format: `host,settings;host,settings;...` where `settings` is an
//! opaque string whose first character is `'0'` when shields are off.

use std::collections::HashMap;
use std::fmt;

use log::debug;
use parking_lot::RwLock;

/// Settings string used for hosts with no entry.
pub const DEFAULT_SETTINGS: &str = "1";

const RECORD_SEPARATOR: char = ';';
const FIELD_SEPARATOR: char = ',';

/// Settings string for one top-level host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings(String);

impl HostSettings {
    pub fn new(settings: impl Into<String>) -> Self {
        Self(settings.into())
    }

    pub fn shields_enabled(&self) -> bool {
        !self.0.starts_with('0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HostSettings {
    fn default() -> Self {
        Self(DEFAULT_SETTINGS.to_string())
    }
}

impl fmt::Display for HostSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait ShieldsSettings: Send + Sync {
    fn host_settings(&self, host: &str) -> HostSettings;

    fn regional_enabled(&self) -> bool;

    fn is_top_shields_enabled(&self, host: &str) -> bool {
        self.host_settings(host).shields_enabled()
    }
}

/// Strip one leading `www.`.
pub fn normalize_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

// =============================================================================
// Host Settings Table
// =============================================================================

#[derive(Debug, Default)]
pub struct HostSettingsTable {
    hosts: RwLock<HashMap<String, String>>,
    regional: bool,
}

impl HostSettingsTable {
    pub fn new(regional_enabled: bool) -> Self {
        Self {
            hosts: RwLock::new(HashMap::new()),
            regional: regional_enabled,
        }
    }

    pub fn with_regional_enabled(mut self, enabled: bool) -> Self {
        self.regional = enabled;
        self
    }

    /// Parse the persisted format. Malformed records are skipped.
    pub fn parse(text: &str) -> Self {
        let mut hosts = HashMap::new();

        for record in text.split(RECORD_SEPARATOR) {
            let Some((host, settings)) = record.trim().split_once(FIELD_SEPARATOR) else {
                if !record.trim().is_empty() {
                    debug!("Skipping settings record without a separator: '{}'", record);
                }
                continue;
            };
            let host = normalize_host(host.trim());
            let settings = settings.trim();
            if host.is_empty() || settings.is_empty() {
                debug!("Skipping incomplete settings record: '{}'", record);
                continue;
            }
            hosts.insert(host.to_string(), settings.to_string());
        }

        Self {
            hosts: RwLock::new(hosts),
            regional: false,
        }
    }

    /// Back to the persisted format, sorted by host.
    pub fn serialize(&self) -> String {
        let hosts = self.hosts.read();
        let mut entries: Vec<_> = hosts.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut out = String::new();
        for (host, settings) in entries {
            out.push_str(host);
            out.push(FIELD_SEPARATOR);
            out.push_str(settings);
            out.push(RECORD_SEPARATOR);
        }
        out
    }

    /// Turning shields off stores `"0"`; turning them on drops the entry.
    pub fn set_top_host(&self, host: &str, enabled: bool) {
        let host = normalize_host(host);
        let mut hosts = self.hosts.write();
        if enabled {
            hosts.remove(host);
        } else {
            hosts.insert(host.to_string(), "0".to_string());
        }
    }

    /// Store a raw settings string for `host`.
    pub fn set(&self, host: &str, settings: impl Into<String>) {
        self.hosts.write().insert(normalize_host(host).to_string(), settings.into());
    }

    pub fn hosts(&self) -> Vec<(String, String)> {
        let mut entries: Vec<_> = self
            .hosts
            .read()
            .iter()
            .map(|(host, settings)| (host.clone(), settings.clone()))
            .collect();
        entries.sort();
        entries
    }

    pub fn len(&self) -> usize {
        self.hosts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.read().is_empty()
    }
}

impl ShieldsSettings for HostSettingsTable {
    fn host_settings(&self, host: &str) -> HostSettings {
        self.hosts
            .read()
            .get(normalize_host(host))
            .map(|settings| HostSettings::new(settings.as_str()))
            .unwrap_or_default()
    }

    fn regional_enabled(&self) -> bool {
        self.regional
    }
}
