//! Version resolution.
//!
//! Maps a [`VersionSpecifier`] to at most one [`CatalogEntry`]:
//!
//! | Specifier | Strategy                                         |
//! |-----------|--------------------------------------------------|
//! | `8.2.9`   | exact match                                      |
//! | `8.2`     | highest patch within 8.2                         |
//! | `8`       | highest minor within 8, then highest patch in it |
//!
//! The thread-safety variant is a hard filter in every case. Resolution never
//! falls back to the other variant, and numeric components compare as
//! integers (`8.10` is newer than `8.9`).

use crate::catalog::{Catalog, CatalogEntry};
use crate::specifier::VersionSpecifier;

/// Selects the single best entry for `spec`, or `None` if nothing matches.
///
/// Pure: the same catalog and specifier always produce the same answer.
#[must_use]
pub fn resolve<'a>(catalog: &'a Catalog, spec: &VersionSpecifier) -> Option<&'a CatalogEntry> {
    match (spec.minor, spec.patch) {
        (Some(minor), Some(patch)) => {
            find_exact(catalog, spec.major, minor, patch, spec.thread_safe)
        }
        (Some(minor), None) => find_latest_patch(catalog, spec.major, minor, spec.thread_safe),
        (None, _) => find_latest_minor(catalog, spec.major, spec.thread_safe),
    }
}

fn variant(catalog: &Catalog, thread_safe: bool) -> impl Iterator<Item = &CatalogEntry> {
    catalog.iter().filter(move |e| e.thread_safe == thread_safe)
}

/// The entry equal to `major.minor.patch` in the requested variant.
#[must_use]
pub fn find_exact(
    catalog: &Catalog,
    major: u32,
    minor: u32,
    patch: u32,
    thread_safe: bool,
) -> Option<&CatalogEntry> {
    variant(catalog, thread_safe).find(|e| e.major == major && e.minor == minor && e.patch == patch)
}

/// The highest-patch entry within `major.minor`.
#[must_use]
pub fn find_latest_patch(
    catalog: &Catalog,
    major: u32,
    minor: u32,
    thread_safe: bool,
) -> Option<&CatalogEntry> {
    variant(catalog, thread_safe)
        .filter(|e| e.major == major && e.minor == minor)
        .max_by_key(|e| e.patch)
}

/// The highest-patch entry of the highest minor within `major`.
#[must_use]
pub fn find_latest_minor(
    catalog: &Catalog,
    major: u32,
    thread_safe: bool,
) -> Option<&CatalogEntry> {
    variant(catalog, thread_safe)
        .filter(|e| e.major == major)
        .max_by_key(|e| (e.minor, e.patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(builds: &[(u32, u32, u32, bool)]) -> Catalog {
        builds
            .iter()
            .map(|&(major, minor, patch, ts)| {
                let nts = if ts { "" } else { "-nts" };
                CatalogEntry::new(
                    major,
                    minor,
                    patch,
                    ts,
                    format!("/downloads/releases/php-{major}.{minor}.{patch}{nts}-Win32-vs16-x64.zip"),
                )
            })
            .collect()
    }

    fn version(entry: Option<&CatalogEntry>) -> Option<(u32, u32, u32, bool)> {
        entry.map(|e| (e.major, e.minor, e.patch, e.thread_safe))
    }

    #[test]
    fn latest_minor_picks_highest_patch_of_highest_minor() {
        let catalog = catalog(&[
            (8, 1, 0, true),
            (8, 1, 5, true),
            (8, 2, 3, true),
            (8, 2, 9, true),
            (8, 2, 9, false),
        ]);

        assert_eq!(
            version(resolve(&catalog, &VersionSpecifier::major(8, true))),
            Some((8, 2, 9, true))
        );
    }

    #[test]
    fn latest_patch_stays_within_minor() {
        let catalog = catalog(&[(8, 1, 0, true), (8, 1, 5, true), (8, 2, 9, true)]);

        assert_eq!(
            version(resolve(&catalog, &VersionSpecifier::minor(8, 1, true))),
            Some((8, 1, 5, true))
        );
    }

    #[test]
    fn exact_match_respects_variant() {
        let catalog = catalog(&[(8, 1, 0, true), (8, 1, 0, false)]);

        assert_eq!(
            version(resolve(&catalog, &VersionSpecifier::exact(8, 1, 0, false))),
            Some((8, 1, 0, false))
        );
        assert_eq!(
            version(resolve(&catalog, &VersionSpecifier::exact(8, 1, 0, true))),
            Some((8, 1, 0, true))
        );
    }

    #[test]
    fn never_falls_back_to_other_variant() {
        let catalog = catalog(&[(8, 2, 9, true)]);

        assert!(resolve(&catalog, &VersionSpecifier::minor(8, 2, false)).is_none());
        assert!(resolve(&catalog, &VersionSpecifier::major(8, false)).is_none());
        assert!(resolve(&catalog, &VersionSpecifier::exact(8, 2, 9, false)).is_none());
    }

    #[test]
    fn exact_requires_full_match() {
        let catalog = catalog(&[(8, 1, 0, true), (8, 1, 5, true)]);
        assert!(resolve(&catalog, &VersionSpecifier::exact(8, 1, 3, true)).is_none());
    }

    #[test]
    fn components_compare_numerically() {
        let catalog = catalog(&[(8, 9, 30, true), (8, 10, 1, true), (8, 10, 0, true)]);

        assert_eq!(
            version(resolve(&catalog, &VersionSpecifier::major(8, true))),
            Some((8, 10, 1, true))
        );
    }

    #[test]
    fn empty_catalog_resolves_nothing() {
        let catalog = Catalog::default();
        assert!(resolve(&catalog, &VersionSpecifier::major(8, true)).is_none());
    }

    #[test]
    fn result_matches_every_stated_component() {
        let catalog = catalog(&[
            (7, 4, 33, true),
            (8, 0, 30, true),
            (8, 1, 27, false),
            (8, 1, 27, true),
            (8, 3, 2, false),
        ]);

        let specs = [
            VersionSpecifier::major(7, true),
            VersionSpecifier::major(8, false),
            VersionSpecifier::minor(8, 1, true),
            VersionSpecifier::minor(8, 3, false),
            VersionSpecifier::exact(8, 0, 30, true),
        ];

        for spec in specs {
            let entry = resolve(&catalog, &spec).expect("Should resolve");
            assert_eq!(entry.major, spec.major);
            assert_eq!(entry.thread_safe, spec.thread_safe);
            if let Some(minor) = spec.minor {
                assert_eq!(entry.minor, minor);
            }
            if let Some(patch) = spec.patch {
                assert_eq!(entry.patch, patch);
            }
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let catalog = catalog(&[(8, 2, 9, true), (8, 2, 8, true)]);
        let spec = VersionSpecifier::minor(8, 2, true);

        let first = resolve(&catalog, &spec);
        let second = resolve(&catalog, &spec);
        assert_eq!(first, second);
    }
}
