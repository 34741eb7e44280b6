//! Named dataset resolution
//!
//! A dataset is addressed by its [`DatasetKind`]. On disk each kind has a
//! small pointer file naming the real data file(s); regional ad-block sets
//! list several files separated by `;`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DatasetNames;
use crate::error::{BlockerError, Result};
use crate::tokens::split_tokens;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    AdBlock,
    AdBlockRegional,
    TrackingProtection,
    HttpsRules,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdBlock => "adblock",
            Self::AdBlockRegional => "adblock-regional",
            Self::TrackingProtection => "tracking-protection",
            Self::HttpsRules => "https-rules",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a dataset to the blob files backing it, in load order.
pub trait DatasetResolver: Send + Sync {
    fn resolve(&self, kind: DatasetKind) -> Result<Vec<PathBuf>>;
}

/// Resolver over a data directory of pointer files.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
    names: DatasetNames,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>, names: DatasetNames) -> Self {
        Self {
            root: root.into(),
            names,
        }
    }

    fn pointer_name(&self, kind: DatasetKind) -> &str {
        match kind {
            DatasetKind::AdBlock => &self.names.adblock,
            DatasetKind::AdBlockRegional => &self.names.adblock_regional,
            DatasetKind::TrackingProtection => &self.names.tracking_protection,
            DatasetKind::HttpsRules => &self.names.https_rules,
        }
    }
}

impl DatasetResolver for DataDir {
    fn resolve(&self, kind: DatasetKind) -> Result<Vec<PathBuf>> {
        let pointer_path = self.root.join(self.pointer_name(kind));
        let pointer = fs::read_to_string(&pointer_path).map_err(|source| BlockerError::Io {
            path: pointer_path.clone(),
            source,
        })?;

        let files: Vec<PathBuf> = split_tokens(pointer.trim(), ';')
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(|name| self.root.join(name))
            .collect();

        if files.is_empty() {
            return Err(BlockerError::DatasetUnavailable {
                name: kind.to_string(),
            });
        }

        Ok(files)
    }
}

/// Read a dataset blob fully into memory. Zero-length files are rejected.
pub fn read_dataset(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|source| BlockerError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.is_empty() {
        return Err(BlockerError::EmptyDataset {
            path: path.to_path_buf(),
        });
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TempDir;

    #[test]
    fn test_resolves_single_pointer() {
        let dir = TempDir::new("resolve-single");
        dir.write("TrackingProtectionDownloaded.dat", b"1TrackingProtection.dat\n");

        let data_dir = DataDir::new(dir.path(), DatasetNames::default());
        let files = data_dir.resolve(DatasetKind::TrackingProtection).expect("should resolve");
        assert_eq!(files, vec![dir.path().join("1TrackingProtection.dat")]);
    }

    #[test]
    fn test_resolves_regional_list() {
        let dir = TempDir::new("resolve-regional");
        dir.write("ABPRegionalDataDownloaded.dat", b"ru.dat;de.dat;;fr.dat;");

        let data_dir = DataDir::new(dir.path(), DatasetNames::default());
        let files = data_dir.resolve(DatasetKind::AdBlockRegional).expect("should resolve");
        assert_eq!(
            files,
            vec![
                dir.path().join("ru.dat"),
                dir.path().join("de.dat"),
                dir.path().join("fr.dat"),
            ]
        );
    }

    #[test]
    fn test_missing_pointer_is_io_error() {
        let dir = TempDir::new("resolve-missing");
        let data_dir = DataDir::new(dir.path(), DatasetNames::default());
        let err = data_dir.resolve(DatasetKind::AdBlock).unwrap_err();
        assert!(matches!(err, BlockerError::Io { .. }));
    }

    #[test]
    fn test_empty_pointer_is_unavailable() {
        let dir = TempDir::new("resolve-empty");
        dir.write("ABPFilterParserDataDownloaded.dat", b"  \n");
        let data_dir = DataDir::new(dir.path(), DatasetNames::default());
        let err = data_dir.resolve(DatasetKind::AdBlock).unwrap_err();
        assert!(matches!(err, BlockerError::DatasetUnavailable { .. }));
    }

    #[test]
    fn test_read_dataset_rejects_empty_file() {
        let dir = TempDir::new("read-empty");
        let path = dir.write("empty.dat", b"");
        assert!(matches!(read_dataset(&path), Err(BlockerError::EmptyDataset { .. })));

        let path = dir.write("full.dat", b"payload");
        assert_eq!(read_dataset(&path).expect("should read"), b"payload");
    }
}
