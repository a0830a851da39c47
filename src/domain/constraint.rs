//! Version constraints
//!
//! A `Constraint` is a conjunction of PEP 440 specifiers. It is kept in a
//! canonical (sorted, deduplicated) form so equal constraints compare equal,
//! which the compactor depends on when it looks for changes between releases.
//!
//! Membership and satisfiability follow PEP 440 exactly. Only `to_spack`
//! widens, because Spack ranges are inclusive release prefixes.

use super::version::{
    compare_to_prefix, compare_upper_prefixes, join_parts, predecessor, release_parts,
    spack_version,
};
use pep440_rs::{Operator, Version, VersionSpecifier, MIN_VERSION};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use version_ranges::Ranges;

/// Region a constraint admits once widened to what Spack can express
///
/// Upper bounds are release prefixes (`:1.2` admits all of `1.2.*`).
/// `!=` clauses cannot be expressed and are widened away.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SpackRange {
    Exact(Version),
    Range {
        lower: Option<Version>,
        upper: Option<Vec<u64>>,
    },
}

/// Release prefix that `~=` keeps fixed (`~=1.4.2` gives `1.4`)
fn compatible_prefix(version: &Version) -> Vec<u64> {
    let mut parts = release_parts(version);
    if parts.len() > 1 {
        parts.pop();
    }
    parts
}

fn canonical(mut specifiers: Vec<VersionSpecifier>) -> Vec<VersionSpecifier> {
    specifiers.sort_by(|a, b| {
        a.version()
            .cmp(b.version())
            .then_with(|| a.operator().cmp(b.operator()))
    });
    specifiers.dedup();
    specifiers
}

/// Conjunction of specifiers in canonical order
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Constraint {
    specifiers: Vec<VersionSpecifier>,
    /// `===` pins on strings that are not PEP 440 versions
    pins: Vec<String>,
}

impl Constraint {
    /// The unconstrained constraint
    pub fn any() -> Self {
        Self::default()
    }

    /// Builds a canonical constraint from any collection of specifiers
    pub fn from_specifiers(specifiers: impl IntoIterator<Item = VersionSpecifier>) -> Self {
        Self {
            specifiers: canonical(specifiers.into_iter().collect()),
            pins: Vec::new(),
        }
    }

    /// Adds arbitrary-equality pins (builder pattern)
    pub fn with_pins(mut self, pins: impl IntoIterator<Item = String>) -> Self {
        self.pins.extend(pins);
        self.pins.sort();
        self.pins.dedup();
        self
    }

    /// Parses a comma separated specifier list, optionally parenthesized
    ///
    /// An empty string is the unconstrained constraint. `===` accepts any
    /// string, PEP 440 or not.
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut text = input.trim();
        if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            text = inner.trim();
        }
        if text.is_empty() {
            return Ok(Self::any());
        }

        let mut specifiers = Vec::new();
        let mut pins = Vec::new();
        for clause in text.split(',').map(str::trim) {
            if let Some(pin) = arbitrary_pin(clause) {
                pins.push(pin.to_string());
                continue;
            }
            let specifier = VersionSpecifier::from_str(clause)
                .map_err(|e| format!("malformed version specifier '{}': {}", clause, e))?;
            specifiers.push(specifier);
        }
        Ok(Self::from_specifiers(specifiers).with_pins(pins))
    }

    pub fn specifiers(&self) -> &[VersionSpecifier] {
        &self.specifiers
    }

    pub fn pins(&self) -> &[String] {
        &self.pins
    }

    pub fn is_any(&self) -> bool {
        self.specifiers.is_empty() && self.pins.is_empty()
    }

    /// Returns true if `version` satisfies every clause
    ///
    /// A PEP 440 version never equals a non-PEP 440 pin.
    pub fn contains(&self, version: &Version) -> bool {
        self.pins.is_empty() && self.specifiers.iter().all(|s| s.contains(version))
    }

    /// Conjunction of two constraints
    pub fn intersect(&self, other: &Constraint) -> Constraint {
        Self::from_specifiers(
            self.specifiers
                .iter()
                .chain(other.specifiers.iter())
                .cloned(),
        )
        .with_pins(self.pins.iter().chain(other.pins.iter()).cloned())
    }

    /// Exact set of versions the specifiers admit
    pub fn ranges(&self) -> Ranges<Version> {
        self.specifiers.iter().cloned().fold(
            Ranges::higher_than((*MIN_VERSION).clone()),
            |acc, specifier| acc.intersection(&Ranges::from(specifier)),
        )
    }

    /// Returns true if some version can satisfy the constraint
    pub fn is_satisfiable(&self) -> bool {
        match self.pins.as_slice() {
            [] => !self.ranges().is_empty(),
            [_] => self.specifiers.is_empty(),
            _ => false,
        }
    }

    /// Returns true if no version satisfies both constraints
    pub fn is_disjoint(&self, other: &Constraint) -> bool {
        !self.intersect(other).is_satisfiable()
    }

    fn spack_range(&self) -> Option<SpackRange> {
        let mut exact: Option<&Version> = None;
        let mut lower: Option<&Version> = None;
        let mut upper: Option<Vec<u64>> = None;

        let mut tighten_upper = |candidate: Vec<u64>| {
            upper = Some(match upper.take() {
                Some(current)
                    if compare_upper_prefixes(&current, &candidate) != Ordering::Greater =>
                {
                    current
                }
                _ => candidate,
            });
        };

        for spec in &self.specifiers {
            let version = spec.version();
            match spec.operator() {
                Operator::Equal | Operator::ExactEqual => exact = Some(version),
                Operator::EqualStar => {
                    lower = lower.max(Some(version));
                    tighten_upper(release_parts(version));
                }
                Operator::TildeEqual => {
                    lower = lower.max(Some(version));
                    tighten_upper(compatible_prefix(version));
                }
                Operator::GreaterThan | Operator::GreaterThanEqual => {
                    lower = lower.max(Some(version));
                }
                Operator::LessThanEqual => tighten_upper(release_parts(version)),
                Operator::LessThan => tighten_upper(predecessor(&release_parts(version))?),
                Operator::NotEqual | Operator::NotEqualStar => {}
            }
        }

        if let Some(version) = exact {
            return Some(SpackRange::Exact(version.clone()));
        }
        if let (Some(low), Some(high)) = (lower, upper.as_ref()) {
            if compare_to_prefix(low, high) == Ordering::Greater {
                return None;
            }
        }
        Some(SpackRange::Range {
            lower: lower.cloned(),
            upper,
        })
    }

    /// Renders the constraint as a Spack version range, without the `@`
    ///
    /// Returns None for an unconstrained (or fully widened) constraint and
    /// for one no version satisfies.
    pub fn to_spack(&self) -> Option<String> {
        if !self.is_satisfiable() {
            return None;
        }
        if let [pin] = self.pins.as_slice() {
            return Some(format!("={}", pin));
        }
        match self.spack_range()? {
            SpackRange::Exact(version) => Some(format!("={}", spack_version(&version))),
            SpackRange::Range { lower, upper } => {
                let low = lower.as_ref().map(spack_version);
                let high = upper.as_deref().map(join_parts);
                match (low, high) {
                    (None, None) => None,
                    (Some(low), None) => Some(format!("{}:", low)),
                    (None, Some(high)) => Some(format!(":{}", high)),
                    (Some(low), Some(high)) if low == high => Some(low),
                    (Some(low), Some(high)) => Some(format!("{}:{}", low, high)),
                }
            }
        }
    }
}

/// The pinned string of a `===` clause that is not a PEP 440 version
fn arbitrary_pin(clause: &str) -> Option<&str> {
    let value = clause.strip_prefix("===")?.trim();
    let plain = !value.is_empty() && !value.contains(char::is_whitespace);
    (plain && Version::from_str(value).is_err()).then_some(value)
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .specifiers
            .iter()
            .map(|s| s.to_string())
            .chain(self.pins.iter().map(|p| format!("==={}", p)))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_version;

    fn c(s: &str) -> Constraint {
        Constraint::parse(s).unwrap()
    }

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    #[test]
    fn test_parse_empty_is_any() {
        assert!(c("").is_any());
        assert!(c("  ").is_any());
        assert_eq!(c("").to_spack(), None);
    }

    #[test]
    fn test_parse_parenthesized() {
        assert_eq!(c("(>=1.0,<2)"), c(">=1.0, <2"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Constraint::parse(">>1.0").is_err());
        assert!(Constraint::parse(">=1.*").is_err());
        assert!(Constraint::parse("==foo bar").is_err());
        assert!(Constraint::parse("===foo bar").is_err());
    }

    #[test]
    fn test_canonical_order_makes_equal() {
        assert_eq!(c("<2,>=1"), c(">=1,<2"));
        assert_eq!(c(">=1,>=1"), c(">=1"));
    }

    #[test]
    fn test_contains() {
        assert!(c(">=1,<2").contains(&v("1.5")));
        assert!(!c(">=1,<2").contains(&v("2.0")));
        assert!(c("==1.2.*").contains(&v("1.2.9")));
        assert!(c("~=1.4.2").contains(&v("1.4.9")));
        assert!(!c("~=1.4.2").contains(&v("1.5.0")));
        assert!(!c("!=1.3").contains(&v("1.3")));
        assert!(!c("<=1").contains(&v("1.0.1")));
        assert!(!c(">1.0").contains(&v("1.0")));
    }

    #[test]
    fn test_to_spack_rendering() {
        assert_eq!(c(">=1.2").to_spack().as_deref(), Some("1.2:"));
        assert_eq!(c("<=3").to_spack().as_deref(), Some(":3"));
        assert_eq!(c("<2").to_spack().as_deref(), Some(":1"));
        assert_eq!(c("<2.1").to_spack().as_deref(), Some(":2.0"));
        assert_eq!(c("==1.4").to_spack().as_deref(), Some("=1.4"));
        assert_eq!(c("==1.4.*").to_spack().as_deref(), Some("1.4"));
        assert_eq!(c("~=1.4").to_spack().as_deref(), Some("1.4:1"));
        assert_eq!(c("~=1.4.2").to_spack().as_deref(), Some("1.4.2:1.4"));
        assert_eq!(c(">1.0").to_spack().as_deref(), Some("1.0:"));
        assert_eq!(c(">=1,<2").to_spack().as_deref(), Some("1"));
        assert_eq!(c(">=1.0,<2").to_spack().as_deref(), Some("1.0:1"));
    }

    #[test]
    fn test_not_equal_is_widened() {
        assert_eq!(c("!=1.5").to_spack(), None);
        assert_eq!(c(">=1,!=1.5").to_spack().as_deref(), Some("1:"));
    }

    #[test]
    fn test_unsatisfiable() {
        assert!(!c(">=2,<2").is_satisfiable());
        assert!(!c("==1.0,==2.0").is_satisfiable());
        assert!(!c("==1.5,<1.2").is_satisfiable());
        assert!(!c("<0").is_satisfiable());
        assert!(c(">=1.5,<2").is_satisfiable());
        assert_eq!(c(">=2,<2").to_spack(), None);
    }

    #[test]
    fn test_inclusive_and_exclusive_ends_are_exact() {
        // `<=1` stops at 1.0 itself, not at the end of the 1.* family
        assert!(!c(">=1.5,<=1").is_satisfiable());
        assert!(!c(">1.0,<=1.0").is_satisfiable());
        assert!(c(">=1.0,<=1.0").is_satisfiable());
        assert!(c(">1.0,<=1.0.1").is_satisfiable());
        assert!(c(">=1.5").is_disjoint(&c("<=1")));
        assert!(!c(">=1").is_disjoint(&c("<=1")));
    }

    #[test]
    fn test_intersect() {
        let merged = c(">=1").intersect(&c("<2"));
        assert_eq!(merged, c(">=1,<2"));
        assert!(!c(">=2").intersect(&c("<1")).is_satisfiable());
    }

    #[test]
    fn test_arbitrary_equality_on_non_pep440_string() {
        let pinned = c("===1.0-custom");
        assert_eq!(pinned.pins(), ["1.0-custom".to_string()]);
        assert!(pinned.is_satisfiable());
        assert!(!pinned.contains(&v("1.0")));
        assert_eq!(pinned.to_spack().as_deref(), Some("=1.0-custom"));
        assert_eq!(pinned.to_string(), "===1.0-custom");
        assert!(!pinned.intersect(&c("===other")).is_satisfiable());
        assert!(pinned.intersect(&c("===1.0-custom")).is_satisfiable());
    }

    #[test]
    fn test_arbitrary_equality_on_pep440_version() {
        let pinned = c("===1.0");
        assert!(pinned.pins().is_empty());
        assert!(pinned.contains(&v("1.0")));
        assert_eq!(pinned.to_spack().as_deref(), Some("=1.0"));
    }

    #[test]
    fn test_display() {
        assert_eq!(c("<2, >=1").to_string(), ">=1,<2");
        assert_eq!(c("!=2.0.*").to_string(), "!=2.0.*");
    }
}
