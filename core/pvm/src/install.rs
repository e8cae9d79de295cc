//! The install pipeline.
//!
//! Installs one resolved [`CatalogEntry`] under `<root>/versions/`:
//!
//! 1. Derive the staging archive and extraction directory from the URL
//! 2. Refuse if either already exists
//! 3. Download the archive to the staging path
//! 4. Extract it into the extraction directory
//! 5. Delete the staging archive
//!
//! Every step completes before the next one starts. The pipeline never
//! consults the catalog; resolution happens before it is called.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::archive::{ExtractSummary, extract_archive};
use crate::catalog::CatalogEntry;
use crate::download::Transport;
use crate::error::{PvmError, Result};
use crate::paths::{InstallTarget, PvmPaths};

/// What a successful install produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// The extraction directory, now holding the build.
    pub install_dir: PathBuf,
    /// Size of the downloaded archive.
    pub bytes_downloaded: u64,
    /// Entry counts from extraction.
    pub extracted: ExtractSummary,
    /// `false` if the staging archive could not be deleted.
    pub staging_removed: bool,
}

/// Downloads and extracts `entry` below `root`.
///
/// # Errors
///
/// - [`PvmError::InvalidDownloadUrl`] if the URL has no file name
/// - [`PvmError::AlreadyInstalled`] if the staging archive or extraction
///   directory exists; the transport is not called
/// - [`PvmError::Transport`] if the download fails; any partial staging file
///   is left in place
/// - [`PvmError::IllegalPath`], [`PvmError::InvalidArchive`] or
///   [`PvmError::Filesystem`] if extraction fails; the extraction directory
///   and staging archive are removed first
pub async fn install(
    entry: &CatalogEntry,
    root: &Path,
    transport: &impl Transport,
) -> Result<InstallOutcome> {
    let paths = PvmPaths::with_root(root);
    let target = paths.install_target(entry)?;

    for existing in [&target.staging, &target.install_dir] {
        if existing.exists() {
            return Err(PvmError::already_installed(entry.to_string(), existing));
        }
    }

    paths.ensure_directories()?;

    info!("Downloading {} from {}", entry, entry.download_url);
    let bytes_downloaded = transport
        .download(&entry.download_url, &target.staging)
        .await?;
    debug!(
        "Wrote {bytes_downloaded} bytes to {}",
        target.staging.display()
    );

    info!("Extracting {} to {}", target.filename(), target.install_dir.display());
    let extracted = match extract_archive(&target.staging, &target.install_dir) {
        Ok(summary) => summary,
        Err(e) => {
            discard_failed_extraction(&target);
            return Err(e);
        }
    };
    debug!(
        "Extracted {} files, {} directories, {} links",
        extracted.files, extracted.directories, extracted.links
    );

    let staging_removed = match std::fs::remove_file(&target.staging) {
        Ok(()) => true,
        Err(e) => {
            warn!(
                "Could not delete staging archive {}: {e}",
                target.staging.display()
            );
            false
        }
    };

    Ok(InstallOutcome {
        install_dir: target.install_dir,
        bytes_downloaded,
        extracted,
        staging_removed,
    })
}

/// Removes whatever a failed extraction left behind.
fn discard_failed_extraction(target: &InstallTarget) {
    if target.install_dir.exists()
        && let Err(e) = std::fs::remove_dir_all(&target.install_dir)
    {
        warn!(
            "Could not remove partial install {}: {e}",
            target.install_dir.display()
        );
    }
    if let Err(e) = std::fs::remove_file(&target.staging) {
        warn!(
            "Could not delete staging archive {}: {e}",
            target.staging.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and always fails.
    struct CountingTransport {
        calls: AtomicUsize,
    }

    impl Transport for CountingTransport {
        async fn download(&self, url: &str, _dest: &Path) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(PvmError::transport(url, "offline"))
        }
    }

    fn entry() -> CatalogEntry {
        CatalogEntry::new(8, 2, 9, true, "/a/php-8.2.9.zip")
    }

    #[tokio::test]
    async fn existing_staging_file_is_already_installed() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let versions = temp.path().join("versions");
        std::fs::create_dir_all(&versions).expect("Should create dir");
        std::fs::write(versions.join("php-8.2.9.zip"), b"partial").expect("Should write");

        let transport = CountingTransport {
            calls: AtomicUsize::new(0),
        };
        let err = install(&entry(), temp.path(), &transport)
            .await
            .expect_err("Should refuse");

        assert!(matches!(err, PvmError::AlreadyInstalled { .. }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn existing_install_dir_is_already_installed() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        std::fs::create_dir_all(temp.path().join("versions/php-8.2.9")).expect("Should create");

        let transport = CountingTransport {
            calls: AtomicUsize::new(0),
        };
        let err = install(&entry(), temp.path(), &transport)
            .await
            .expect_err("Should refuse");

        assert!(matches!(
            err,
            PvmError::AlreadyInstalled { ref path, .. } if path.ends_with("php-8.2.9")
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transport_failure_creates_directories_and_propagates() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let root = temp.path().join("pvm");

        let transport = CountingTransport {
            calls: AtomicUsize::new(0),
        };
        let err = install(&entry(), &root, &transport)
            .await
            .expect_err("Should fail");

        assert!(matches!(err, PvmError::Transport { .. }));
        assert!(root.join("versions").is_dir());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn url_without_filename_is_rejected() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let transport = CountingTransport {
            calls: AtomicUsize::new(0),
        };
        let bad = CatalogEntry::new(8, 2, 9, true, "/a/");

        let err = install(&bad, temp.path(), &transport)
            .await
            .expect_err("Should fail");
        assert!(matches!(err, PvmError::InvalidDownloadUrl { .. }));
    }
}
