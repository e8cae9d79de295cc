#![warn(clippy::pedantic)]
//! Core library for the pvm PHP version manager.
//!
//! Turns a possibly partial version request into one concrete build and
//! installs it on disk.
//!
//! ## Overview
//!
//! ```text
//! "8.2" + nts → VersionSpecifier → resolve(catalog) → CatalogEntry → install()
//!                                                                    ├─ download to versions/<file>.zip
//!                                                                    ├─ extract to versions/<file>/
//!                                                                    └─ delete versions/<file>.zip
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pvm_core::{Config, HttpTransport, PvmPaths, VersionSpecifier, fetch_catalog, install};
//!
//! # async fn run() -> pvm_core::Result<()> {
//! let paths = PvmPaths::new()?;
//! let config = Config::load(&paths)?;
//! let catalog = fetch_catalog(&config, &paths).await?;
//!
//! let spec = VersionSpecifier::parse("8.2", true)?;
//! let entry = catalog
//!     .resolve(&spec)
//!     .ok_or_else(|| pvm_core::PvmError::not_found(spec.to_string()))?;
//!
//! let transport = HttpTransport::new(&config)?;
//! let outcome = install(entry, &paths.root, &transport).await?;
//! println!("installed to {}", outcome.install_dir.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`specifier`] parses user input into a [`VersionSpecifier`]
//! - [`catalog`] holds the available builds and fetches them from the server
//! - [`resolver`] picks the best entry for a specifier
//! - [`install`] runs the download/extract pipeline
//! - [`archive`] extracts ZIP and tar.gz archives with path-safety checks
//! - [`download`] defines the [`Transport`] seam and its HTTP implementation

pub mod archive;
pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod install;
pub mod paths;
pub mod resolver;
pub mod specifier;

pub use archive::{ExtractSummary, extract_archive};
pub use catalog::{Catalog, CatalogEntry, fetch_catalog};
pub use config::Config;
pub use download::{HttpTransport, ProgressCallback, ProgressEvent, Transport};
pub use error::{PvmError, Result};
pub use install::{InstallOutcome, install};
pub use paths::{InstallTarget, PvmPaths};
pub use resolver::resolve;
pub use specifier::VersionSpecifier;
