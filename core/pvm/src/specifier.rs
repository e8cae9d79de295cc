//! User-supplied version specifiers.
//!
//! A specifier is a left-anchored, possibly partial version (`8`, `8.2`,
//! `8.2.9`) together with the requested build variant. A major version is
//! always present; asking for "minor 4 of any major" cannot be expressed.

use std::fmt;
use std::str::FromStr;

use crate::error::PvmError;

/// A partial or exact version request plus the thread-safety variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionSpecifier {
    pub major: u32,
    pub minor: Option<u32>,
    pub patch: Option<u32>,
    pub thread_safe: bool,
}

impl VersionSpecifier {
    /// Creates a specifier for the latest minor release of `major`.
    #[must_use]
    pub const fn major(major: u32, thread_safe: bool) -> Self {
        Self {
            major,
            minor: None,
            patch: None,
            thread_safe,
        }
    }

    /// Creates a specifier for the latest patch release of `major.minor`.
    #[must_use]
    pub const fn minor(major: u32, minor: u32, thread_safe: bool) -> Self {
        Self {
            major,
            minor: Some(minor),
            patch: None,
            thread_safe,
        }
    }

    /// Creates a specifier for exactly `major.minor.patch`.
    #[must_use]
    pub const fn exact(major: u32, minor: u32, patch: u32, thread_safe: bool) -> Self {
        Self {
            major,
            minor: Some(minor),
            patch: Some(patch),
            thread_safe,
        }
    }

    /// Parses `input` and attaches the requested variant.
    ///
    /// # Errors
    ///
    /// Returns [`PvmError::InvalidSpecifier`] for empty input, more than three
    /// components, or any component that is not a non-negative integer.
    pub fn parse(input: &str, thread_safe: bool) -> Result<Self, PvmError> {
        let mut spec: Self = input.parse()?;
        spec.thread_safe = thread_safe;
        Ok(spec)
    }

    /// Returns `"thread safe"` or `"non-thread safe"`.
    #[must_use]
    pub const fn variant_label(&self) -> &'static str {
        variant_label(self.thread_safe)
    }
}

/// Human-readable label for a thread-safety variant.
#[must_use]
pub const fn variant_label(thread_safe: bool) -> &'static str {
    if thread_safe {
        "thread safe"
    } else {
        "non-thread safe"
    }
}

impl FromStr for VersionSpecifier {
    type Err = PvmError;

    /// Parses a bare version string; the variant defaults to thread safe.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PvmError::InvalidSpecifier {
            input: s.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() > 3 {
            return Err(invalid());
        }

        let mut numbers = Vec::with_capacity(parts.len());
        for part in &parts {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            numbers.push(part.parse::<u32>().map_err(|_| invalid())?);
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers.get(1).copied(),
            patch: numbers.get(2).copied(),
            thread_safe: true,
        })
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{minor}")?;
            if let Some(patch) = self.patch {
                write!(f, ".{patch}")?;
            }
        }
        write!(f, " {}", self.variant_label())
    }
}
