//! Archive extraction.
//!
//! Extracts ZIP and tar.gz archives into a destination directory while
//! refusing any entry that would land outside of it. Entry names are taken
//! verbatim from the archive, with `\` treated as a separator, then joined
//! onto the destination and normalized lexically. The result must be strictly
//! inside the destination or extraction stops with
//! [`PvmError::IllegalPath`]. Entries are also refused when an existing
//! component of their path is a symlink created by an earlier entry, so a
//! chain of in-archive links cannot redirect a write outside.
//!
//! Entries before the offending one may already have been written; callers
//! that need all-or-nothing behavior remove the destination on error.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::debug;

use crate::error::{PvmError, Result};

/// Counts of what an extraction produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub links: usize,
}

/// Removes the archive extension from `filename`.
///
/// Handles `.tar.gz` and `.tgz` as a unit; anything else loses its last
/// extension (`php-8.2.9-Win32-vs16-x64.zip` -> `php-8.2.9-Win32-vs16-x64`).
#[must_use]
pub fn archive_stem(filename: &str) -> &str {
    for suffix in [".tar.gz", ".tgz", ".zip"] {
        if let Some(stem) = filename.strip_suffix(suffix)
            && !stem.is_empty()
        {
            return stem;
        }
    }
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

/// Extracts an archive (ZIP or tar.gz) to the destination directory.
///
/// `.tar.gz` and `.tgz` files are read as gzip-compressed tar; everything
/// else is read as ZIP. The destination is created if missing.
///
/// # Errors
///
/// - [`PvmError::IllegalPath`] if an entry or link target escapes `dest_dir`
/// - [`PvmError::InvalidArchive`] if the archive cannot be parsed
/// - [`PvmError::Filesystem`] if a file or directory cannot be written
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<ExtractSummary> {
    let name = archive_path.to_string_lossy();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        extract_tar_gz(archive_path, dest_dir)
    } else {
        extract_zip(archive_path, dest_dir)
    }
}

/// Extracts a ZIP archive to the destination directory.
///
/// # Errors
///
/// See [`extract_archive`].
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<ExtractSummary> {
    let file = File::open(archive_path)
        .map_err(|e| PvmError::filesystem("Failed to open archive", archive_path, e))?;

    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| PvmError::invalid_archive(archive_path, e.to_string()))?;

    let mut writer = Extraction::begin(dest_dir)?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| PvmError::invalid_archive(archive_path, format!("entry {i}: {e}")))?;

        let name = entry.name().replace('\\', "/");
        let mode = entry.unix_mode();

        if entry.is_dir() || name.ends_with('/') {
            writer.directory(&name, mode)?;
        } else if entry.is_symlink() {
            let mut target = String::new();
            entry.read_to_string(&mut target).map_err(|e| {
                PvmError::invalid_archive(archive_path, format!("symlink {name}: {e}"))
            })?;
            writer.symlink(&name, &target)?;
        } else {
            writer.file(&name, &mut entry, mode)?;
        }
    }

    writer.finish()
}

/// Extracts a gzip-compressed tar archive to the destination directory.
///
/// # Errors
///
/// See [`extract_archive`].
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<ExtractSummary> {
    let file = File::open(archive_path)
        .map_err(|e| PvmError::filesystem("Failed to open archive", archive_path, e))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut writer = Extraction::begin(dest_dir)?;

    let entries = archive
        .entries()
        .map_err(|e| PvmError::invalid_archive(archive_path, e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| PvmError::invalid_archive(archive_path, e.to_string()))?;

        let name = String::from_utf8_lossy(&entry.path_bytes()).replace('\\', "/");
        let mode = entry.header().mode().ok();
        let kind = entry.header().entry_type();

        if kind.is_dir() {
            writer.directory(&name, mode)?;
        } else if kind.is_symlink() || kind.is_hard_link() {
            let target = entry
                .link_name_bytes()
                .map(|t| String::from_utf8_lossy(&t).replace('\\', "/"))
                .ok_or_else(|| {
                    PvmError::invalid_archive(archive_path, format!("link {name} has no target"))
                })?;
            if kind.is_symlink() {
                writer.symlink(&name, &target)?;
            } else {
                writer.hard_link(&name, &target)?;
            }
        } else if kind.is_file() || kind == tar::EntryType::Continuous {
            writer.file(&name, &mut entry, mode)?;
        } else {
            debug!("Skipping unsupported tar entry {name} ({kind:?})");
        }
    }

    writer.finish()
}

/// Shared state while writing entries below one destination.
struct Extraction {
    dest: PathBuf,
    summary: ExtractSummary,
    /// Directory modes, applied once every entry is written so read-only
    /// directories do not block their own contents.
    dir_modes: Vec<(PathBuf, u32)>,
}

impl Extraction {
    fn begin(dest_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dest_dir)
            .map_err(|e| PvmError::filesystem("Failed to create directory", dest_dir, e))?;

        let absolute = std::path::absolute(dest_dir)
            .map_err(|e| PvmError::filesystem("Failed to resolve directory", dest_dir, e))?;

        Ok(Self {
            dest: normalize(&absolute),
            summary: ExtractSummary::default(),
            dir_modes: Vec::new(),
        })
    }

    /// Resolves `name` below the destination, rejecting escapes.
    ///
    /// Returns `None` for an entry that names the destination itself.
    fn target(&self, name: &str) -> Result<Option<PathBuf>> {
        let candidate = normalize(&self.dest.join(name));
        if candidate == self.dest {
            return Ok(None);
        }
        if !candidate.starts_with(&self.dest) {
            return Err(PvmError::illegal_path(name, &self.dest));
        }
        self.reject_symlinks_on_path(&candidate, name)?;
        Ok(Some(candidate))
    }

    /// Fails if any existing component between the destination and `path`
    /// (inclusive) is a symlink, since the OS would follow it on write.
    fn reject_symlinks_on_path(&self, path: &Path, name: &str) -> Result<()> {
        let Ok(relative) = path.strip_prefix(&self.dest) else {
            return Err(PvmError::illegal_path(name, &self.dest));
        };

        let mut current = self.dest.clone();
        for component in relative.components() {
            current.push(component);
            match std::fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    return Err(PvmError::illegal_path(name, &self.dest));
                }
                Ok(_) => {}
                // Nothing below a missing component can exist yet.
                Err(_) => break,
            }
        }
        Ok(())
    }

    fn target_strict(&self, name: &str) -> Result<PathBuf> {
        self.target(name)?
            .ok_or_else(|| PvmError::illegal_path(name, &self.dest))
    }

    fn create_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PvmError::filesystem("Failed to create directory", parent, e))?;
        }
        Ok(())
    }

    fn directory(&mut self, name: &str, mode: Option<u32>) -> Result<()> {
        let Some(path) = self.target(name)? else {
            return Ok(());
        };

        std::fs::create_dir_all(&path)
            .map_err(|e| PvmError::filesystem("Failed to create directory", &path, e))?;

        if let Some(mode) = mode {
            self.dir_modes.push((path, mode));
        }
        self.summary.directories += 1;
        Ok(())
    }

    fn file(&mut self, name: &str, contents: &mut impl Read, mode: Option<u32>) -> Result<()> {
        let path = self.target_strict(name)?;
        Self::create_parent(&path)?;

        let mut out = File::create(&path)
            .map_err(|e| PvmError::filesystem("Failed to create file", &path, e))?;
        std::io::copy(contents, &mut out)
            .map_err(|e| PvmError::filesystem("Failed to extract", &path, e))?;

        if let Some(mode) = mode {
            set_mode(&path, mode)?;
        }
        self.summary.files += 1;
        Ok(())
    }

    /// Creates a symlink whose target, resolved from the link's directory,
    /// stays inside the destination.
    fn symlink(&mut self, name: &str, target: &str) -> Result<()> {
        let path = self.target_strict(name)?;
        let base = path.parent().unwrap_or(&self.dest);
        if !self.link_target_is_contained(base, Path::new(target)) {
            return Err(PvmError::illegal_path(format!("{name} -> {target}"), &self.dest));
        }

        Self::create_parent(&path)?;
        create_symlink(Path::new(target), &path)?;
        self.summary.links += 1;
        Ok(())
    }

    /// Walks `target` from `base` the way the OS will, one component at a
    /// time. Absolute targets, steps above the destination and steps through
    /// existing symlinks are refused.
    fn link_target_is_contained(&self, base: &Path, target: &Path) -> bool {
        let mut current = base.to_path_buf();
        for component in target.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !current.pop() || !current.starts_with(&self.dest) {
                        return false;
                    }
                }
                Component::Normal(part) => {
                    current.push(part);
                    if std::fs::symlink_metadata(&current)
                        .is_ok_and(|meta| meta.file_type().is_symlink())
                    {
                        return false;
                    }
                }
                Component::RootDir | Component::Prefix(_) => return false,
            }
        }
        current.starts_with(&self.dest)
    }

    /// Creates a hard link to an already extracted entry.
    fn hard_link(&mut self, name: &str, target: &str) -> Result<()> {
        let path = self.target_strict(name)?;
        let source = self
            .target_strict(target)
            .map_err(|_| PvmError::illegal_path(format!("{name} -> {target}"), &self.dest))?;

        Self::create_parent(&path)?;
        std::fs::hard_link(&source, &path)
            .map_err(|e| PvmError::filesystem("Failed to create hard link", &path, e))?;
        self.summary.links += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<ExtractSummary> {
        // Deepest first.
        self.dir_modes.sort_by(|a, b| b.0.cmp(&a.0));
        for (path, mode) in &self.dir_modes {
            set_mode(path, *mode)?;
        }
        Ok(self.summary)
    }
}

/// Lexically normalizes `path`: drops `.`, folds `..` into its parent.
///
/// `..` at the root is dropped; leading `..` on a relative path is kept.
fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o777))
        .map_err(|e| PvmError::filesystem("Failed to set permissions", path, e))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)
        .map_err(|e| PvmError::filesystem("Failed to create symlink", link, e))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    tracing::warn!(
        "Skipping symlink {} -> {}: not supported on this platform",
        link.display(),
        target.display()
    );
    Ok(())
}
