//! PEP 440 version helpers
//!
//! Versions are `pep440_rs::Version`, which already gives the total order
//! the compactor and renderer rely on. The helpers here cover the pieces
//! the Spack side needs: numeric release segments, Spack-safe rendering and
//! the set of CPython releases markers are evaluated against.

use pep440_rs::Version;
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::LazyLock;

/// Latest patch release of every CPython minor version markers are checked against
const KNOWN_PYTHON_VERSIONS: &[&str] = &[
    "3.6.15", "3.7.17", "3.8.20", "3.9.21", "3.10.16", "3.11.11", "3.12.8", "3.13.1",
];

static PYTHON_VERSIONS: LazyLock<Vec<Version>> = LazyLock::new(|| {
    KNOWN_PYTHON_VERSIONS
        .iter()
        .filter_map(|v| Version::from_str(v).ok())
        .collect()
});

/// Returns the known CPython releases, oldest first
pub fn known_python_versions() -> &'static [Version] {
    &PYTHON_VERSIONS
}

/// Parses a PEP 440 version, returning None for anything non-compliant
pub fn parse_version(value: &str) -> Option<Version> {
    Version::from_str(value.trim()).ok()
}

/// Returns the numeric release segments (`1.2.3` gives `[1, 2, 3]`)
pub fn release_parts(version: &Version) -> Vec<u64> {
    version.release().iter().copied().collect()
}

/// Joins release segments with dots
pub fn join_parts(parts: &[u64]) -> String {
    parts
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Renders a version the way Spack accepts it
///
/// `+` introduces a variant in a Spack spec and `!` is not a version
/// character, so local segments and epochs are folded into dotted parts.
pub fn spack_version(version: &Version) -> String {
    version.to_string().replace('+', "-").replace('!', ".")
}

/// Release segments with trailing zeros removed, so `1.0` and `1` compare equal
pub fn trimmed_parts(parts: &[u64]) -> &[u64] {
    let end = parts
        .iter()
        .rposition(|p| *p != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    &parts[..end]
}

/// Largest release prefix strictly below `parts`
///
/// `2.1` gives `2.0`, `2` gives `1`, `1.0.0` gives `0`. Returns None when
/// nothing sorts below (all zeros).
pub fn predecessor(parts: &[u64]) -> Option<Vec<u64>> {
    let mut trimmed = trimmed_parts(parts).to_vec();
    let last = trimmed.last_mut()?;
    *last -= 1;
    Some(trimmed)
}

/// Compares `version` against a release prefix, treating the prefix as the
/// whole family it names (`1.2` stands for every `1.2.*`)
pub fn compare_to_prefix(version: &Version, prefix: &[u64]) -> Ordering {
    let parts = release_parts(version);
    for (i, p) in prefix.iter().enumerate() {
        let v = parts.get(i).copied().unwrap_or(0);
        match v.cmp(p) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Orders two upper-bound prefixes by how much they admit
///
/// A shorter prefix that agrees on the common segments admits more
/// (`:1` covers `1.9`, `:1.2` does not), so it sorts greater.
pub fn compare_upper_prefixes(a: &[u64], b: &[u64]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    b.len().cmp(&a.len())
}
