//! Metadata normalization
//!
//! Turns raw index metadata into `Release`s ordered oldest to newest:
//! versions parsed, requirement strings parsed and their markers evaluated,
//! the build system identified. Anything that cannot be represented is
//! dropped with a `ConversionWarning`; normalization itself never fails.

mod markers;
mod pyproject;

pub use markers::{evaluate, MarkerEvaluation, Term};
pub use pyproject::BuildSystem;

use crate::domain::{
    any_known_python, known_python_versions, normalize_name, parse_version, Constraint,
    ConversionWarning, DependencyKind, Release, Requirement,
};
use crate::parser::parse_requirement;
use crate::registry::{ProjectListing, RawRelease};
use pep440_rs::Version;
use std::collections::BTreeSet;

/// Versions chosen for conversion out of a project listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Every valid listed version, yanked ones included, oldest first
    pub known: Vec<Version>,
    /// Raw version strings to fetch, newest first
    pub selected: Vec<String>,
}

/// Descriptive metadata taken from the newest release
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub summary: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
}

/// All normalized data for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPackage {
    /// PEP 503 normalized PyPI name
    pub name: String,
    /// Releases in the working set, oldest first
    pub releases: Vec<Release>,
    /// Every known version, oldest first
    pub known_versions: Vec<Version>,
    pub metadata: PackageMetadata,
}

impl NormalizedPackage {
    /// Declared extras plus every extra a requirement is gated on
    pub fn extras(&self) -> BTreeSet<String> {
        self.releases
            .iter()
            .flat_map(|r| {
                r.extras
                    .iter()
                    .cloned()
                    .chain(r.requirements.iter().filter_map(|q| q.extra.clone()))
            })
            .collect()
    }

    pub fn newest(&self) -> Option<&Release> {
        self.releases.last()
    }

    /// Drops releases that cannot run on any python at or above `floor`
    pub fn retain_compatible(&mut self, floor: &Version, warnings: &mut Vec<ConversionWarning>) {
        let candidates: Vec<&Version> = known_python_versions()
            .iter()
            .filter(|v| *v >= floor)
            .collect();
        let name = self.name.clone();
        self.releases.retain(|release| {
            let Some(requires) = &release.requires_python else {
                return true;
            };
            let compatible = candidates.iter().any(|v| requires.contains(v));
            if !compatible {
                warnings.push(ConversionWarning::IncompatibleRelease {
                    package: name.clone(),
                    version: release.version.to_string(),
                    requires_python: requires.to_string(),
                });
            }
            compatible
        });
    }
}

/// Picks the newest `limit` installable releases
pub fn select_releases(
    listing: &ProjectListing,
    limit: usize,
    warnings: &mut Vec<ConversionWarning>,
) -> Selection {
    let mut parsed: Vec<(Version, &str, bool)> = Vec::new();
    for listed in &listing.versions {
        match parse_version(&listed.version) {
            Some(version) => parsed.push((version, &listed.version, listed.is_installable())),
            None => warnings.push(ConversionWarning::InvalidVersion {
                package: listing.name.clone(),
                version: listed.version.clone(),
            }),
        }
    }
    parsed.sort_by(|a, b| a.0.cmp(&b.0));

    let known = parsed.iter().map(|(v, _, _)| v.clone()).collect();
    let selected = parsed
        .iter()
        .rev()
        .filter(|(_, _, installable)| *installable)
        .take(limit)
        .map(|(_, raw, _)| raw.to_string())
        .collect();

    Selection { known, selected }
}

/// Normalizes the releases of one package, collecting warnings
pub struct Normalizer {
    package: String,
    warnings: Vec<ConversionWarning>,
}

impl Normalizer {
    pub fn new(package: &str) -> Self {
        Self {
            package: normalize_name(package),
            warnings: Vec::new(),
        }
    }

    /// Consumes the normalizer, returning the package and every warning raised
    pub fn normalize(
        mut self,
        known_versions: Vec<Version>,
        raw: Vec<RawRelease>,
    ) -> (NormalizedPackage, Vec<ConversionWarning>) {
        let metadata = raw
            .iter()
            .filter_map(|r| parse_version(&r.version).map(|v| (v, r)))
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, r)| PackageMetadata {
                summary: r.summary.clone(),
                homepage: r.home_page.clone(),
                license: r.license.clone(),
            })
            .unwrap_or_default();

        let mut releases: Vec<Release> = raw.into_iter().filter_map(|r| self.release(r)).collect();
        releases.sort_by(|a, b| a.version.cmp(&b.version));
        releases.dedup_by(|a, b| a.version == b.version);

        let package = NormalizedPackage {
            name: self.package,
            releases,
            known_versions,
            metadata,
        };
        (package, self.warnings)
    }

    fn release(&mut self, raw: RawRelease) -> Option<Release> {
        let Some(version) = parse_version(&raw.version) else {
            self.warnings.push(ConversionWarning::InvalidVersion {
                package: self.package.clone(),
                version: raw.version.clone(),
            });
            return None;
        };
        let version_text = raw.version.clone();
        let mut release = Release::new(version);

        for line in &raw.requires_dist {
            let requirements = self.parse_requirements(&version_text, line, DependencyKind::BuildRun);
            release.requirements.extend(requirements);
        }

        if let Some(text) = &raw.requires_python {
            match Constraint::parse(text) {
                Ok(constraint) => {
                    if !any_known_python(&constraint) {
                        tracing::debug!(
                            package = %self.package,
                            version = %version_text,
                            requires_python = %constraint,
                            "requires_python admits no known CPython"
                        );
                    }
                    if !constraint.is_any() {
                        release.requirements.push(
                            Requirement::new("python", DependencyKind::BuildRun)
                                .with_constraint(constraint.clone()),
                        );
                    }
                    release.requires_python = Some(constraint);
                }
                Err(message) => self.warnings.push(ConversionWarning::InvalidRequirement {
                    package: self.package.clone(),
                    version: version_text.clone(),
                    requirement: format!("python{}", text),
                    message,
                }),
            }
        }

        release.extras = raw.provides_extra.iter().map(|e| normalize_name(e)).collect();

        if let Some(files) = &raw.build_files {
            let system = match files.pyproject.as_deref() {
                Some(text) => match BuildSystem::from_pyproject(text) {
                    Ok(system) => Some(system),
                    Err(message) => {
                        self.warnings.push(ConversionWarning::BuildFilesUnavailable {
                            package: self.package.clone(),
                            version: version_text.clone(),
                            message: format!("invalid pyproject.toml: {}", message),
                        });
                        None
                    }
                },
                None => Some(BuildSystem::legacy()),
            };
            if let Some(system) = system {
                for line in &system.requires {
                    let requirements =
                        self.parse_requirements(&version_text, line, DependencyKind::Build);
                    release.requirements.extend(requirements);
                }
                release.backend = Some(system.backend);
            }
            release.cmakelists = files.cmakelists.clone();
        }

        release.sdist = raw.sdist;
        Some(release)
    }

    /// Parses one requirement string into one Requirement per marker disjunct
    pub fn parse_requirements(
        &mut self,
        version: &str,
        line: &str,
        kind: DependencyKind,
    ) -> Vec<Requirement> {
        let parsed = match parse_requirement(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.warnings.push(ConversionWarning::InvalidRequirement {
                    package: self.package.clone(),
                    version: version.to_string(),
                    requirement: line.to_string(),
                    message: e.message,
                });
                return Vec::new();
            }
        };

        let name = normalize_name(&parsed.name);
        if name == self.package {
            tracing::debug!(package = %self.package, requirement = line, "ignoring self-dependency");
            return Vec::new();
        }

        let evaluation = evaluate(&parsed.marker);
        for detail in evaluation.notes {
            self.warnings.push(ConversionWarning::UnsupportedMarker {
                package: self.package.clone(),
                version: version.to_string(),
                requirement: line.to_string(),
                detail,
            });
        }
        let terms = evaluation.terms;

        let features: BTreeSet<String> = parsed.extras.iter().map(|e| normalize_name(e)).collect();
        terms
            .into_iter()
            .map(|term| Requirement {
                name: name.clone(),
                constraint: parsed.constraint.clone(),
                features: features.clone(),
                condition: term.condition,
                extra: term.extra,
                kind,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BuildBackend, Condition, Platform};
    use crate::registry::{BuildFiles, ListedVersion};

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    fn listing(versions: Vec<ListedVersion>) -> ProjectListing {
        ProjectListing {
            name: "demo".to_string(),
            versions,
        }
    }

    #[test]
    fn test_select_newest_installable() {
        let mut warnings = Vec::new();
        let selection = select_releases(
            &listing(vec![
                ListedVersion::new("1.0"),
                ListedVersion::new("1.1"),
                ListedVersion::new("1.2"),
                ListedVersion::new("1.3").yanked(),
                ListedVersion::new("1.10"),
            ]),
            2,
            &mut warnings,
        );
        assert_eq!(selection.selected, vec!["1.10", "1.2"]);
        assert_eq!(
            selection.known,
            vec![v("1.0"), v("1.1"), v("1.2"), v("1.3"), v("1.10")]
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_select_drops_invalid_versions() {
        let mut warnings = Vec::new();
        let selection = select_releases(
            &listing(vec![ListedVersion::new("1.0"), ListedVersion::new("latest!!")]),
            10,
            &mut warnings,
        );
        assert_eq!(selection.selected, vec!["1.0"]);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], ConversionWarning::InvalidVersion { .. }));
    }

    #[test]
    fn test_normalize_orders_oldest_first() {
        let raw = vec![RawRelease::new("2.0"), RawRelease::new("1.0")];
        let (package, warnings) = Normalizer::new("demo").normalize(vec![v("1.0"), v("2.0")], raw);
        let versions: Vec<String> = package.releases.iter().map(|r| r.version.to_string()).collect();
        assert_eq!(versions, vec!["1.0", "2.0"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_requirements_and_markers() {
        let raw = vec![RawRelease::new("1.0")
            .with_requirement("Charset_Normalizer<4,>=2")
            .with_requirement("PySocks>=1.5.6; extra == 'socks'")
            .with_requirement("colorama; sys_platform == 'win32'")
            .with_requirement("foo @ https://example.com/foo.tgz")];
        let (package, warnings) = Normalizer::new("demo").normalize(vec![v("1.0")], raw);
        let reqs = &package.releases[0].requirements;

        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0].name, "charset-normalizer");
        assert_eq!(reqs[0].constraint, Constraint::parse(">=2,<4").unwrap());
        assert_eq!(reqs[1].extra.as_deref(), Some("socks"));
        assert_eq!(reqs[2].condition, Condition::platform(Platform::Windows));
        assert!(reqs.iter().all(|r| r.kind == DependencyKind::BuildRun));

        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], ConversionWarning::InvalidRequirement { .. }));
        assert_eq!(
            package.extras().into_iter().collect::<Vec<_>>(),
            vec!["socks".to_string()]
        );
    }

    #[test]
    fn test_marker_disjunction_splits_requirement() {
        let raw = vec![RawRelease::new("1.0")
            .with_requirement("pywin32; sys_platform == 'win32' or sys_platform == 'cygwin'")
            .with_requirement("typing-extensions; python_version < '3'")];
        let (package, _) = Normalizer::new("demo").normalize(vec![v("1.0")], raw);
        let reqs = &package.releases[0].requirements;
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].condition.platform, Some(Platform::Windows));
    }

    #[test]
    fn test_unsupported_marker_warns() {
        let raw = vec![RawRelease::new("1.0").with_requirement("foo; platform_machine == 'arm64'")];
        let (package, warnings) = Normalizer::new("demo").normalize(vec![v("1.0")], raw);
        assert_eq!(package.releases[0].requirements.len(), 1);
        assert!(package.releases[0].requirements[0].condition.is_always());
        assert!(matches!(warnings[0], ConversionWarning::UnsupportedMarker { .. }));
    }

    #[test]
    fn test_requires_python_becomes_dependency() {
        let raw = vec![RawRelease::new("1.0").with_requires_python(">=3.8")];
        let (package, _) = Normalizer::new("demo").normalize(vec![v("1.0")], raw);
        let release = &package.releases[0];
        assert_eq!(release.requirements[0].name, "python");
        assert_eq!(release.requirements[0].kind, DependencyKind::BuildRun);
        assert_eq!(release.requires_python, Some(Constraint::parse(">=3.8").unwrap()));
    }

    #[test]
    fn test_self_dependency_dropped() {
        let raw = vec![RawRelease::new("1.0").with_requirement("Demo[d]; extra == 'all'")];
        let (package, _) = Normalizer::new("demo").normalize(vec![v("1.0")], raw);
        assert!(package.releases[0].requirements.is_empty());
    }

    #[test]
    fn test_build_files_backend_and_requires() {
        let mut raw = RawRelease::new("1.0");
        raw.build_files = Some(BuildFiles {
            pyproject: Some(
                "[build-system]\nrequires = [\"hatchling\"]\nbuild-backend = \"hatchling.build\"\n"
                    .to_string(),
            ),
            cmakelists: None,
        });
        let (package, _) = Normalizer::new("demo").normalize(vec![v("1.0")], vec![raw]);
        let release = &package.releases[0];
        assert_eq!(release.backend, Some(BuildBackend::Hatchling));
        assert_eq!(release.requirements[0].name, "hatchling");
        assert_eq!(release.requirements[0].kind, DependencyKind::Build);
    }

    #[test]
    fn test_sdist_without_pyproject_is_legacy_setuptools() {
        let mut raw = RawRelease::new("1.0");
        raw.build_files = Some(BuildFiles::default());
        let (package, _) = Normalizer::new("demo").normalize(vec![v("1.0")], vec![raw]);
        assert_eq!(package.releases[0].backend, Some(BuildBackend::Setuptools));
    }

    #[test]
    fn test_no_build_files_means_unknown_backend() {
        let (package, _) =
            Normalizer::new("demo").normalize(vec![v("1.0")], vec![RawRelease::new("1.0")]);
        assert_eq!(package.releases[0].backend, None);
    }

    #[test]
    fn test_retain_compatible() {
        let raw = vec![
            RawRelease::new("1.0").with_requires_python("<3.8"),
            RawRelease::new("2.0").with_requires_python(">=3.8"),
            RawRelease::new("3.0"),
        ];
        let (mut package, _) =
            Normalizer::new("demo").normalize(vec![v("1.0"), v("2.0"), v("3.0")], raw);
        let mut warnings = Vec::new();
        package.retain_compatible(&v("3.9"), &mut warnings);
        let versions: Vec<String> = package.releases.iter().map(|r| r.version.to_string()).collect();
        assert_eq!(versions, vec!["2.0", "3.0"]);
        assert!(matches!(warnings[0], ConversionWarning::IncompatibleRelease { .. }));
    }
}
