//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::dataset::{DatasetKind, DatasetResolver};
use crate::engine::{AdBlockEngine, FilterEngine, TrackerEngine};
use crate::error::{BlockerError, Result};
use crate::types::ResourceOption;

// =============================================================================
// Temp Directory
// =============================================================================

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique scratch directory, removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(label: &str) -> Self {
        let id = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "shields-core-{}-{}-{}",
            std::process::id(),
            label,
            id
        ));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write (or overwrite) a file and return its path.
    pub fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.path.join(name);
        fs::write(&path, contents).expect("write temp file");
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolver over a fixed map, counting resolutions.
#[derive(Default)]
pub struct MapResolver {
    files: HashMap<DatasetKind, Vec<PathBuf>>,
    resolves: AtomicUsize,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: DatasetKind, files: Vec<PathBuf>) -> Self {
        self.files.insert(kind, files);
        self
    }

    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

impl DatasetResolver for MapResolver {
    fn resolve(&self, kind: DatasetKind) -> Result<Vec<PathBuf>> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(&kind)
            .cloned()
            .ok_or_else(|| BlockerError::DatasetUnavailable {
                name: kind.to_string(),
            })
    }
}

// =============================================================================
// Fake Ad-Block Engine
// =============================================================================

/// Substring matcher. One pattern per line; `script:`, `image:` and
/// `stylesheet:` prefixes restrict a pattern to that resource option.
#[derive(Debug, Default)]
pub struct FakeAdEngine {
    patterns: Vec<(Option<ResourceOption>, String)>,
}

impl FakeAdEngine {
    /// Blob the fake refuses to deserialize.
    pub const INVALID_BLOB: &'static [u8] = b"\xff\xfe not utf-8";
}

impl FilterEngine for FakeAdEngine {
    fn deserialize(&mut self, buffer: &[u8]) -> bool {
        let text = match std::str::from_utf8(buffer) {
            Ok(text) => text,
            Err(_) => return false,
        };

        self.patterns = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                for (prefix, option) in [
                    ("script:", ResourceOption::Script),
                    ("image:", ResourceOption::Image),
                    ("stylesheet:", ResourceOption::Stylesheet),
                ] {
                    if let Some(rest) = line.strip_prefix(prefix) {
                        return (Some(option), rest.to_string());
                    }
                }
                (None, line.to_string())
            })
            .collect();
        true
    }
}

impl AdBlockEngine for FakeAdEngine {
    fn matches(&self, url: &str, option: ResourceOption, _base_host: &str) -> bool {
        self.patterns.iter().any(|(only, pattern)| {
            only.map_or(true, |only| only == option) && url.contains(pattern.as_str())
        })
    }
}

// =============================================================================
// Fake Tracker Engine
// =============================================================================

/// Lines are `tracker <host>` or `first-party <base_host> <comma-separated>`.
#[derive(Debug, Default)]
pub struct FakeTrackerEngine {
    trackers: Vec<String>,
    first_party: HashMap<String, String>,
    lookups: AtomicUsize,
}

impl FakeTrackerEngine {
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl FilterEngine for FakeTrackerEngine {
    fn deserialize(&mut self, buffer: &[u8]) -> bool {
        let text = match std::str::from_utf8(buffer) {
            Ok(text) => text,
            Err(_) => return false,
        };

        for line in text.lines() {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some("tracker"), Some(host), None) => self.trackers.push(host.to_string()),
                (Some("first-party"), Some(base), Some(hosts)) => {
                    self.first_party.insert(base.to_string(), hosts.to_string());
                }
                (None, _, _) => {}
                _ => return false,
            }
        }
        true
    }
}

impl TrackerEngine for FakeTrackerEngine {
    fn matches_tracker(&self, _base_host: &str, host: &str) -> bool {
        self.trackers
            .iter()
            .any(|tracker| host == tracker || host.ends_with(&format!(".{tracker}")))
    }

    fn find_first_party_hosts(&self, base_host: &str) -> Option<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.first_party.get(base_host).cloned()
    }
}

/// Build an engine straight from blob text.
pub fn engine_from<E: FilterEngine>(blob: &str) -> E {
    let mut engine = E::default();
    assert!(engine.deserialize(blob.as_bytes()), "fake engine rejected blob");
    engine
}
