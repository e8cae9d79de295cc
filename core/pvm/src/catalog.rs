//! The catalog of installable builds.
//!
//! This module provides the [`CatalogEntry`] and [`Catalog`] types consumed
//! by the resolver, plus retrieval of the catalog from the distribution
//! server's directory listing.
//!
//! ## Listing Format
//!
//! The distribution server publishes plain HTML directory indexes at
//! `/downloads/releases/` (current releases) and
//! `/downloads/releases/archives/` (superseded releases). Every anchor that
//! links to a 64-bit build archive becomes one entry:
//!
//! ```text
//! <A HREF="/downloads/releases/archives/php-8.2.9-Win32-vs16-x64.zip">...</A>
//! <A HREF="/downloads/releases/archives/php-8.2.9-nts-Win32-vs16-x64.zip">...</A>
//! ```
//!
//! The `-nts` marker selects the non-thread-safe variant. Debug, devel and
//! test packs and 32-bit builds are ignored.
//!
//! ## Caching
//!
//! The parsed catalog is cached at `<root>/cache/catalog.json` and reused
//! while younger than the configured TTL.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{PvmError, Result};
use crate::paths::PvmPaths;
use crate::resolver;
use crate::specifier::{VersionSpecifier, variant_label};

/// Listing pages, current releases first so they win over archived copies.
const LISTING_PATHS: [&str; 2] = ["/downloads/releases/", "/downloads/releases/archives/"];

/// User-Agent header for HTTP requests.
pub(crate) const USER_AGENT: &str = concat!("pvm/", env!("CARGO_PKG_VERSION"));

/// Matches build archive links in a directory listing.
static ARCHIVE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)href\s*=\s*"([^"]*?php-(\d+)\.(\d+)\.(\d+)(-nts)?-Win32-[a-z0-9]+-x64\.zip)""#,
    )
    .expect("archive link pattern is valid")
});

/// A single installable build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub thread_safe: bool,
    /// Where the archive lives. Absolute, or relative to the distribution server.
    pub download_url: String,
}

impl CatalogEntry {
    #[must_use]
    pub fn new(
        major: u32,
        minor: u32,
        patch: u32,
        thread_safe: bool,
        download_url: impl Into<String>,
    ) -> Self {
        Self {
            major,
            minor,
            patch,
            thread_safe,
            download_url: download_url.into(),
        }
    }

    /// Extracts the archive filename from the URL (last path segment).
    ///
    /// Example: `"/downloads/releases/php-8.2.9-Win32-vs16-x64.zip"` ->
    /// `"php-8.2.9-Win32-vs16-x64.zip"`
    #[must_use]
    pub fn filename(&self) -> &str {
        self.download_url
            .rsplit('/')
            .next()
            .unwrap_or(&self.download_url)
    }

    /// `major.minor.patch` without the variant.
    #[must_use]
    pub fn version(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    #[must_use]
    pub const fn variant_label(&self) -> &'static str {
        variant_label(self.thread_safe)
    }

    fn key(&self) -> (u32, u32, u32, bool) {
        (self.major, self.minor, self.patch, self.thread_safe)
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{} {}",
            self.major,
            self.minor,
            self.patch,
            self.variant_label()
        )
    }
}

/// A set of entries, unique by version and variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Builds a catalog, keeping the first entry for each
    /// (major, minor, patch, variant) and dropping later duplicates.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut seen = HashSet::new();
        let entries = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.key()))
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves `spec` against this catalog. See [`resolver::resolve`].
    #[must_use]
    pub fn resolve(&self, spec: &VersionSpecifier) -> Option<&CatalogEntry> {
        resolver::resolve(self, spec)
    }

    /// Entries of one variant, newest first.
    #[must_use]
    pub fn sorted_newest_first(&self, thread_safe: bool) -> Vec<&CatalogEntry> {
        let mut entries: Vec<&CatalogEntry> = self
            .entries
            .iter()
            .filter(|e| e.thread_safe == thread_safe)
            .collect();
        entries.sort_by(|a, b| (b.major, b.minor, b.patch).cmp(&(a.major, a.minor, a.patch)));
        entries
    }
}

impl FromIterator<CatalogEntry> for Catalog {
    fn from_iter<I: IntoIterator<Item = CatalogEntry>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

/// Extracts catalog entries from one HTML directory listing.
///
/// Links are kept exactly as written in the page; relative links are
/// resolved against the distribution server at download time.
#[must_use]
pub fn parse_listing(html: &str) -> Vec<CatalogEntry> {
    ARCHIVE_LINK
        .captures_iter(html)
        .filter_map(|caps| {
            let number = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
            Some(CatalogEntry {
                major: number(2)?,
                minor: number(3)?,
                patch: number(4)?,
                thread_safe: caps.get(5).is_none(),
                download_url: caps.get(1)?.as_str().to_string(),
            })
        })
        .collect()
}

/// Cached catalog with the time it was fetched.
#[derive(Debug, Serialize, Deserialize)]
struct CachedCatalog {
    fetched_at: u64,
    dist_server: String,
    catalog: Catalog,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Loads the cached catalog if it is fresh and was fetched from `dist_server`.
///
/// A cache file that cannot be parsed is deleted.
fn load_from_cache(paths: &PvmPaths, dist_server: &str, ttl: Duration) -> Option<Catalog> {
    let cache_file = paths.catalog_cache_file();
    let content = std::fs::read_to_string(&cache_file).ok()?;

    let Ok(cached) = serde_json::from_str::<CachedCatalog>(&content) else {
        debug!("Discarding unreadable catalog cache {}", cache_file.display());
        let _ = std::fs::remove_file(&cache_file);
        return None;
    };

    let age = current_timestamp().saturating_sub(cached.fetched_at);
    if cached.dist_server != dist_server || age >= ttl.as_secs() {
        debug!("Catalog cache is stale ({age}s old)");
        return None;
    }

    debug!("Using cached catalog ({} entries, {age}s old)", cached.catalog.len());
    Some(cached.catalog)
}

/// Writes the catalog cache. Failures are logged and otherwise ignored.
fn save_to_cache(paths: &PvmPaths, dist_server: &str, catalog: &Catalog) {
    let cache_file = paths.catalog_cache_file();

    if let Some(parent) = cache_file.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!("Cannot create cache directory {}: {e}", parent.display());
        return;
    }

    let cached = CachedCatalog {
        fetched_at: current_timestamp(),
        dist_server: dist_server.to_string(),
        catalog: catalog.clone(),
    };

    match serde_json::to_string_pretty(&cached) {
        Ok(content) => {
            if let Err(e) = std::fs::write(&cache_file, content) {
                warn!("Cannot write catalog cache {}: {e}", cache_file.display());
            }
        }
        Err(e) => warn!("Cannot serialize catalog cache: {e}"),
    }
}

/// Fetches the catalog, using the local cache while it is fresh.
///
/// # Errors
///
/// Returns [`PvmError::Catalog`] if a listing page cannot be fetched or the
/// server answers with a non-success status.
pub async fn fetch_catalog(config: &Config, paths: &PvmPaths) -> Result<Catalog> {
    let server = config.dist_server();

    if let Some(catalog) = load_from_cache(paths, server, config.catalog_ttl()) {
        return Ok(catalog);
    }

    let catalog = fetch_catalog_from_network(config).await?;
    save_to_cache(paths, server, &catalog);
    Ok(catalog)
}

/// Maps a non-success status to a user-facing catalog error.
fn handle_http_error(status: reqwest::StatusCode, url: &str) -> PvmError {
    match status.as_u16() {
        404 => PvmError::catalog(format!("Version listing not found at {url}")),
        code if code >= 500 => PvmError::catalog(format!("Server error ({code}): {url}")),
        code => PvmError::catalog(format!("HTTP error {code}: {url}")),
    }
}

/// Fetches and parses every listing page, bypassing the cache.
async fn fetch_catalog_from_network(config: &Config) -> Result<Catalog> {
    let client = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout())
        .read_timeout(config.read_timeout())
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| PvmError::catalog_with_source("Failed to create HTTP client", e))?;

    let mut entries = Vec::new();
    for path in LISTING_PATHS {
        let url = format!("{}{path}", config.dist_server());
        debug!("Fetching version listing {url}");

        let response = client.get(&url).send().await.map_err(|e| {
            PvmError::catalog_with_source(format!("Failed to fetch version listing from {url}"), e)
        })?;

        if !response.status().is_success() {
            return Err(handle_http_error(response.status(), &url));
        }

        let html = response.text().await.map_err(|e| {
            PvmError::catalog_with_source(format!("Failed to read response from {url}"), e)
        })?;

        let page = parse_listing(&html);
        debug!("Found {} builds at {url}", page.len());
        entries.extend(page);
    }

    Ok(Catalog::from_entries(entries))
}
