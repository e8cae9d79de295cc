//! Path management for pvm.
//!
//! The default root directory is `~/.pvm/`, which can be overridden by
//! setting the `PVM_HOME` environment variable.
//!
//! ## Directory Structure
//!
//! ```text
//! ~/.pvm/                        # Root directory (or PVM_HOME)
//!   versions/                    # One directory per installed build
//!     php-8.2.9-Win32-vs16-x64/  # Extracted archive contents
//!     php-8.3.1-nts-Win32-vs16-x64.zip   # Staging archive (only during install)
//!   cache/
//!     catalog.json               # Cached remote version listing
//!   config.toml                  # Optional settings
//! ```

use std::path::PathBuf;

use crate::archive::archive_stem;
use crate::catalog::CatalogEntry;
use crate::error::{PvmError, Result};

/// Environment variable to override the default root directory.
pub const PVM_HOME_ENV: &str = "PVM_HOME";

/// Name of the catalog cache file inside `cache/`.
const CATALOG_CACHE_FILE: &str = "catalog.json";

/// Name of the optional configuration file at the root.
const CONFIG_FILE: &str = "config.toml";

/// Locations of everything pvm keeps on disk.
#[derive(Debug, Clone)]
pub struct PvmPaths {
    /// Root directory (`~/.pvm` or `PVM_HOME`).
    pub root: PathBuf,
    /// Directory holding installed versions and staging archives.
    pub versions: PathBuf,
    /// Directory for cached data.
    pub cache: PathBuf,
}

impl PvmPaths {
    /// Creates a `PvmPaths` from `PVM_HOME` or the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `PVM_HOME` is unset and the home directory cannot
    /// be determined.
    pub fn new() -> Result<Self> {
        let root = if let Some(home) = std::env::var_os(PVM_HOME_ENV).filter(|v| !v.is_empty()) {
            PathBuf::from(home)
        } else {
            dirs::home_dir()
                .ok_or_else(|| PvmError::Config {
                    path: PathBuf::from("~"),
                    message: format!(
                        "Cannot determine home directory. Set {PVM_HOME_ENV} environment variable."
                    ),
                })?
                .join(".pvm")
        };

        Ok(Self::with_root(root))
    }

    /// Creates a `PvmPaths` rooted at `root`.
    #[must_use = "returns new paths instance without side effects"]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            versions: root.join("versions"),
            cache: root.join("cache"),
            root,
        }
    }

    /// Path to the cached catalog.
    #[must_use]
    pub fn catalog_cache_file(&self) -> PathBuf {
        self.cache.join(CATALOG_CACHE_FILE)
    }

    /// Path to the optional configuration file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Creates the root and `versions/` directories if they are missing.
    ///
    /// # Errors
    ///
    /// Returns [`PvmError::Filesystem`] if a directory cannot be created.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.root, &self.versions] {
            std::fs::create_dir_all(dir)
                .map_err(|e| PvmError::filesystem("Failed to create directory", dir, e))?;
        }
        Ok(())
    }

    /// Derives the staging and extraction paths for `entry`.
    ///
    /// # Errors
    ///
    /// Returns [`PvmError::InvalidDownloadUrl`] if the URL has no file name or
    /// the file name has no extension to strip.
    pub fn install_target(&self, entry: &CatalogEntry) -> Result<InstallTarget> {
        let filename = entry.filename();
        let stem = archive_stem(filename);
        // The archive and its extraction directory must not share a path.
        if filename.is_empty() || filename == "." || filename == ".." || stem == filename {
            return Err(PvmError::InvalidDownloadUrl {
                url: entry.download_url.clone(),
            });
        }

        Ok(InstallTarget {
            staging: self.versions.join(filename),
            install_dir: self.versions.join(stem),
        })
    }

    /// Lists installed version directories, sorted by name.
    ///
    /// Staging archives and other plain files are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PvmError::Filesystem`] if `versions/` exists but cannot be read.
    pub fn list_installed(&self) -> Result<Vec<String>> {
        if !self.versions.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.versions).map_err(|e| {
            PvmError::filesystem("Failed to read versions directory", &self.versions, e)
        })?;

        let mut installed: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(String::from))
            .collect();
        installed.sort();
        Ok(installed)
    }

    /// Returns `true` if the extraction directory for `entry` exists.
    #[must_use]
    pub fn is_installed(&self, entry: &CatalogEntry) -> bool {
        self.install_target(entry)
            .is_ok_and(|target| target.install_dir.is_dir())
    }
}

/// Where one catalog entry is staged and extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    /// The downloaded archive, deleted after a successful extraction.
    pub staging: PathBuf,
    /// The permanent extraction directory.
    pub install_dir: PathBuf,
}

impl InstallTarget {
    /// The archive filename (final component of the staging path).
    #[must_use]
    pub fn filename(&self) -> &str {
        self.staging
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str) -> CatalogEntry {
        CatalogEntry::new(8, 2, 9, true, url)
    }

    #[test]
    fn with_root_sets_up_subdirectories() {
        let paths = PvmPaths::with_root("/tmp/pvm-root");
        assert_eq!(paths.versions, PathBuf::from("/tmp/pvm-root/versions"));
        assert_eq!(paths.cache, PathBuf::from("/tmp/pvm-root/cache"));
        assert_eq!(
            paths.catalog_cache_file(),
            PathBuf::from("/tmp/pvm-root/cache/catalog.json")
        );
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/tmp/pvm-root/config.toml")
        );
    }

    #[test]
    fn install_target_strips_archive_extension() {
        let paths = PvmPaths::with_root("/r");
        let target = paths
            .install_target(&entry("/downloads/releases/php-8.2.9-Win32-vs16-x64.zip"))
            .expect("Should derive target");

        assert_eq!(
            target.staging,
            PathBuf::from("/r/versions/php-8.2.9-Win32-vs16-x64.zip")
        );
        assert_eq!(
            target.install_dir,
            PathBuf::from("/r/versions/php-8.2.9-Win32-vs16-x64")
        );
        assert_eq!(target.filename(), "php-8.2.9-Win32-vs16-x64.zip");
    }

    #[test]
    fn install_target_rejects_url_without_filename() {
        let paths = PvmPaths::with_root("/r");
        let result = paths.install_target(&entry("https://windows.php.net/downloads/"));
        assert!(matches!(result, Err(PvmError::InvalidDownloadUrl { .. })));
    }

    #[test]
    fn install_target_rejects_filename_without_extension() {
        let paths = PvmPaths::with_root("/r");
        for url in ["/a/php", "/a/.zip"] {
            let result = paths.install_target(&entry(url));
            assert!(
                matches!(result, Err(PvmError::InvalidDownloadUrl { .. })),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn ensure_directories_is_idempotent() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let paths = PvmPaths::with_root(temp.path().join("home"));

        paths.ensure_directories().expect("First call should succeed");
        paths.ensure_directories().expect("Second call should succeed");

        assert!(paths.versions.is_dir());
    }

    #[test]
    fn list_installed_ignores_files_and_sorts() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let paths = PvmPaths::with_root(temp.path());
        paths.ensure_directories().expect("Should create dirs");

        std::fs::create_dir(paths.versions.join("php-8.2.9")).expect("Should create dir");
        std::fs::create_dir(paths.versions.join("php-8.1.0")).expect("Should create dir");
        std::fs::write(paths.versions.join("php-8.3.0.zip"), b"partial").expect("Should write");

        let installed = paths.list_installed().expect("Should list");
        assert_eq!(installed, vec!["php-8.1.0", "php-8.2.9"]);
    }

    #[test]
    fn list_installed_without_versions_dir_is_empty() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let paths = PvmPaths::with_root(temp.path().join("missing"));
        assert!(paths.list_installed().expect("Should list").is_empty());
    }
}
