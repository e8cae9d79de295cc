//! Error types for the pvm core.
//!
//! Every failure the resolver, catalog, or install pipeline can produce is a
//! variant of [`PvmError`]. Nothing in the core swallows an error; the binary
//! decides how to present it and which exit status to use.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, PvmError>;

/// Consolidated error type for version resolution and installation.
#[derive(Debug, Error)]
pub enum PvmError {
    /// The specifier matched nothing in the catalog.
    #[error("could not find the desired version: {specifier}")]
    NotFound {
        /// Human-readable specifier including the variant.
        specifier: String,
    },

    /// The version's archive or install directory is already present.
    #[error("PHP {version} already exists at {}", path.display())]
    AlreadyInstalled {
        /// Display form of the resolved entry.
        version: String,
        /// The existing file or directory that triggered the guard.
        path: PathBuf,
    },

    /// Network or read failure while fetching an archive.
    #[error("download of {url} failed: {message}")]
    Transport {
        /// The URL being fetched.
        url: String,
        /// Description of what went wrong.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An archive entry would be written outside the destination directory.
    #[error("illegal file path in archive: {entry} escapes {}", dest.display())]
    IllegalPath {
        /// The entry name as recorded in the archive.
        entry: String,
        /// The extraction destination.
        dest: PathBuf,
    },

    /// A directory or file operation failed.
    #[error("{message}: {}", path.display())]
    Filesystem {
        /// Description of the operation that failed.
        message: String,
        /// The path the operation was acting on.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The user-supplied version string could not be parsed.
    #[error("invalid version specified: {input}")]
    InvalidSpecifier {
        /// The rejected input.
        input: String,
    },

    /// The download URL has no usable final path segment.
    #[error("download URL has no file name: {url}")]
    InvalidDownloadUrl {
        /// The offending URL.
        url: String,
    },

    /// The archive could not be read as ZIP or tar.
    #[error("invalid archive {}: {message}", path.display())]
    InvalidArchive {
        /// The archive being read.
        path: PathBuf,
        /// Description of the format error.
        message: String,
    },

    /// Fetching or parsing the remote version listing failed.
    #[error("catalog error: {message}")]
    Catalog {
        /// Description of the catalog error.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The configuration file could not be read or parsed.
    #[error("configuration error in {}: {message}", path.display())]
    Config {
        /// The configuration file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },
}

impl PvmError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(specifier: impl Into<String>) -> Self {
        Self::NotFound {
            specifier: specifier.into(),
        }
    }

    /// Creates a new `AlreadyInstalled` error.
    #[must_use]
    pub fn already_installed(version: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::AlreadyInstalled {
            version: version.into(),
            path: path.into(),
        }
    }

    /// Creates a new `Transport` error without a source.
    #[must_use]
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `Transport` error wrapping an underlying error.
    #[must_use]
    pub fn transport_with_source(
        url: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a new `IllegalPath` error.
    #[must_use]
    pub fn illegal_path(entry: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self::IllegalPath {
            entry: entry.into(),
            dest: dest.into(),
        }
    }

    /// Creates a new `Filesystem` error.
    #[must_use]
    pub fn filesystem(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Filesystem {
            message: message.into(),
            path: path.into(),
            source,
        }
    }

    /// Creates a new `InvalidArchive` error.
    #[must_use]
    pub fn invalid_archive(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidArchive {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Catalog` error without a source.
    #[must_use]
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `Catalog` error wrapping an underlying error.
    #[must_use]
    pub fn catalog_with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Catalog {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_displays_specifier() {
        let err = PvmError::not_found("8.4 non-thread safe");
        assert_eq!(
            err.to_string(),
            "could not find the desired version: 8.4 non-thread safe"
        );
    }

    #[test]
    fn already_installed_displays_path() {
        let err = PvmError::already_installed("8.2.9", "/home/u/.pvm/versions/php-8.2.9.zip");
        assert_eq!(
            err.to_string(),
            "PHP 8.2.9 already exists at /home/u/.pvm/versions/php-8.2.9.zip"
        );
    }

    #[test]
    fn illegal_path_names_entry() {
        let err = PvmError::illegal_path("../../evil", "/tmp/out");
        assert_eq!(
            err.to_string(),
            "illegal file path in archive: ../../evil escapes /tmp/out"
        );
    }

    #[test]
    fn transport_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = PvmError::transport_with_source("https://x/php.zip", "stream interrupted", io);
        assert_eq!(
            err.to_string(),
            "download of https://x/php.zip failed: stream interrupted"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn invalid_specifier_displays_input() {
        let err = PvmError::InvalidSpecifier {
            input: "eight".to_string(),
        };
        assert_eq!(err.to_string(), "invalid version specified: eight");
    }
}
