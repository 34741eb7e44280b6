//! Worker configuration
//!
//! Loaded from JSON; every field has a default so partial documents work.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BlockerError, Result};

/// Default bound on the third-party host cache.
pub const DEFAULT_THIRD_PARTY_CACHE_CAPACITY: usize = 20;
/// Default bound on the HTTPS upgrade result cache.
pub const DEFAULT_UPGRADE_CACHE_CAPACITY: usize = 1000;
/// Default cap on upgrades applied to a single URL.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;
/// Default number of distinct URLs the redirect guard tracks.
pub const DEFAULT_REDIRECT_TRACKED_URLS: usize = 64;

/// Pointer-file names for each dataset, relative to `data_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatasetNames {
    pub adblock: String,
    pub adblock_regional: String,
    pub tracking_protection: String,
    pub https_rules: String,
}

impl Default for DatasetNames {
    fn default() -> Self {
        Self {
            adblock: "ABPFilterParserDataDownloaded.dat".to_string(),
            adblock_regional: "ABPRegionalDataDownloaded.dat".to_string(),
            tracking_protection: "TrackingProtectionDownloaded.dat".to_string(),
            https_rules: "httpse.leveldbDownloaded.dat".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BlockersConfig {
    pub data_dir: PathBuf,
    pub datasets: DatasetNames,
    pub third_party_cache_capacity: usize,
    pub upgrade_cache_capacity: usize,
    pub max_redirects: u32,
    pub redirect_tracked_urls: usize,
    pub regional_enabled: bool,
}

impl Default for BlockersConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            datasets: DatasetNames::default(),
            third_party_cache_capacity: DEFAULT_THIRD_PARTY_CACHE_CAPACITY,
            upgrade_cache_capacity: DEFAULT_UPGRADE_CACHE_CAPACITY,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            redirect_tracked_urls: DEFAULT_REDIRECT_TRACKED_URLS,
            regional_enabled: false,
        }
    }
}

impl BlockersConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(BlockerError::Config)?;
        Ok(config.validated())
    }

    /// Read and parse a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| BlockerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Clamp bounds that would disable a cache or the redirect guard.
    pub fn validated(mut self) -> Self {
        self.third_party_cache_capacity = self.third_party_cache_capacity.max(1);
        self.upgrade_cache_capacity = self.upgrade_cache_capacity.max(1);
        self.redirect_tracked_urls = self.redirect_tracked_urls.max(1);
        self.max_redirects = self.max_redirects.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BlockersConfig::default();
        assert_eq!(config.third_party_cache_capacity, 20);
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.datasets.tracking_protection, "TrackingProtectionDownloaded.dat");
        assert!(!config.regional_enabled);
    }

    #[test]
    fn test_partial_json() {
        let config = BlockersConfig::from_json(
            r#"{
                "data_dir": "/data/shields",
                "regional_enabled": true,
                "datasets": {"adblock": "ads.dat"}
            }"#,
        )
        .expect("config should parse");

        assert_eq!(config.data_dir, PathBuf::from("/data/shields"));
        assert!(config.regional_enabled);
        assert_eq!(config.datasets.adblock, "ads.dat");
        assert_eq!(config.datasets.https_rules, "httpse.leveldbDownloaded.dat");
        assert_eq!(config.upgrade_cache_capacity, DEFAULT_UPGRADE_CACHE_CAPACITY);
    }

    #[test]
    fn test_zero_bounds_are_clamped() {
        let config = BlockersConfig::from_json(
            r#"{"upgrade_cache_capacity": 0, "max_redirects": 0, "redirect_tracked_urls": 0}"#,
        )
        .expect("config should parse");

        assert_eq!(config.upgrade_cache_capacity, 1);
        assert_eq!(config.max_redirects, 1);
        assert_eq!(config.redirect_tracked_urls, 1);
    }

    #[test]
    fn test_invalid_json() {
        let err = BlockersConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, BlockerError::Config(_)));
    }
}
