//! Recipe synthesis
//!
//! Turns a normalized package and its compacted clauses into a `Recipe`,
//! the fully resolved content of a Spack `package.py`. Rendering lives in
//! `render`; everything here is pure and ordered, so the same input always
//! gives byte-identical output.

mod backend;
mod bounds;
mod render;

pub use backend::{backend_block, implied_tools};
pub use bounds::{best_lower_bound, best_upper_bound, release_range};

use crate::compact::cross_conflicts;
use crate::domain::{
    class_name, spack_name, spack_version, BuildBackend, ConditionedClause, ConversionWarning,
    DependencyKind,
};
use crate::normalize::{NormalizedPackage, PackageMetadata};
use pep440_rs::Version;
use std::collections::{BTreeMap, BTreeSet};

/// One `version(...)` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    /// Spack-safe version string
    pub version: String,
    pub sha256: Option<String>,
}

/// One dependency as it appears in a `depends_on(...)` group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEntry {
    pub kind: DependencyKind,
    /// Spack package name
    pub name: String,
    /// PyPI name, set only for dependencies the crawler can convert
    pub pypi_name: Option<String>,
    /// Variants requested on the dependency
    pub features: BTreeSet<String>,
    /// Spack version range per constraint; several only when they conflict
    pub versions: Vec<Option<String>>,
    /// True when the constraints can never be met together
    pub conflicting: bool,
    /// True when another entry on the same dependency excludes this one
    pub clashes: bool,
    /// Rendered `when=` spec, None when unconditional
    pub when: Option<String>,
    low: Version,
}

impl DependencyEntry {
    fn from_clause(clause: &ConditionedClause, known: &[Version]) -> Self {
        let key = &clause.key;
        let (name, pypi_name) = if key.kind.is_native() {
            (key.name.clone(), None)
        } else if key.is_python() {
            (spack_name(&key.name), None)
        } else {
            (spack_name(&key.name), Some(key.name.clone()))
        };

        let mut when: Vec<String> = Vec::new();
        if let Some(range) = release_range(&clause.range, known) {
            when.push(format!("@{}", range));
        }
        if let Some(extra) = &key.extra {
            when.push(format!("+{}", extra));
        }
        when.extend(key.condition.spack_parts());

        let constraints = clause.content.constraints();
        Self {
            kind: key.kind,
            name,
            pypi_name,
            features: key.features.clone(),
            versions: constraints.iter().map(|c| c.to_spack()).collect(),
            conflicting: clause.content.is_conflicting()
                || constraints.iter().any(|c| !c.is_satisfiable()),
            clashes: false,
            when: (!when.is_empty()).then(|| when.join(" ")),
            low: clause.range.low.clone(),
        }
    }

    pub fn is_python(&self) -> bool {
        self.name == "python"
    }

    /// Rank of the `type=` group this entry is rendered in
    fn group(&self) -> u8 {
        match self.kind {
            DependencyKind::Build | DependencyKind::NativeBuild => 0,
            DependencyKind::BuildRun => 1,
            DependencyKind::NativeLink => 2,
        }
    }

    /// The dependency spec for one constraint (`py-q@1: +socks`)
    pub fn spec(&self, version: Option<&str>) -> String {
        let mut spec = self.name.clone();
        if let Some(version) = version {
            spec.push('@');
            spec.push_str(version);
        }
        for feature in &self.features {
            spec.push_str(" +");
            spec.push_str(feature);
        }
        spec
    }
}

/// Versions whose metadata could not be fully converted, for FIXME notes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionNotes {
    /// Requirement strings that did not parse, per version
    pub unparsed: Vec<(String, Vec<String>)>,
    /// Requirements parsed but not faithfully expressible, per version
    pub unconverted: Vec<(String, Vec<String>)>,
    /// Versions whose sdist could not be inspected
    pub uninspected: Vec<(String, String)>,
}

impl ConversionNotes {
    fn from_warnings(warnings: &[ConversionWarning]) -> Self {
        fn push(groups: &mut Vec<(String, Vec<String>)>, version: &str, line: String) {
            match groups.iter_mut().find(|(v, _)| v == version) {
                Some((_, lines)) => lines.push(line),
                None => groups.push((version.to_string(), vec![line])),
            }
        }

        let mut notes = Self::default();
        for warning in warnings {
            match warning {
                ConversionWarning::InvalidRequirement {
                    version,
                    requirement,
                    message,
                    ..
                } => push(
                    &mut notes.unparsed,
                    version,
                    format!("{}: {}", requirement, message),
                ),
                ConversionWarning::UnsupportedMarker {
                    version,
                    requirement,
                    detail,
                    ..
                } => push(
                    &mut notes.unconverted,
                    version,
                    format!("{}: {}", requirement, detail),
                ),
                ConversionWarning::UnknownNativeLibrary {
                    version, library, ..
                } => push(
                    &mut notes.unconverted,
                    version,
                    format!("find_package({}): no Spack package known", library),
                ),
                ConversionWarning::BuildFilesUnavailable {
                    version, message, ..
                } => notes.uninspected.push((version.clone(), message.clone())),
                _ => {}
            }
        }
        notes
    }

    pub fn is_empty(&self) -> bool {
        self.unparsed.is_empty() && self.unconverted.is_empty() && self.uninspected.is_empty()
    }
}

/// Everything a `package.py` says, fully resolved and ordered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub pypi_name: String,
    pub spack_name: String,
    pub class_name: String,
    pub metadata: PackageMetadata,
    /// `<name>/<sdist filename>` for the `pypi =` attribute
    pub pypi_path: Option<String>,
    /// Newest first
    pub versions: Vec<VersionEntry>,
    /// Extras, sorted
    pub variants: Vec<String>,
    pub backend: Option<BuildBackend>,
    pub notes: ConversionNotes,
    /// Sorted by group, python first, then name, range and condition
    pub dependencies: Vec<DependencyEntry>,
}

impl Recipe {
    /// Convertible PyPI dependencies with the extras requested on them
    pub fn requested_packages(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut requested: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for entry in &self.dependencies {
            if let Some(name) = &entry.pypi_name {
                requested
                    .entry(name.clone())
                    .or_default()
                    .extend(entry.features.iter().cloned());
            }
        }
        requested
    }

    /// Native build tools the dependency sections declare
    fn native_tools(&self) -> BTreeSet<String> {
        self.dependencies
            .iter()
            .filter(|d| d.kind == DependencyKind::NativeBuild)
            .map(|d| d.name.clone())
            .collect()
    }

    /// Renders the `package.py` text
    pub fn render(&self) -> String {
        self.to_string()
    }
}

/// Builds the recipe for a package from its compacted clauses
///
/// `warnings` holds what normalization and compaction reported; they become
/// FIXME notes. An unknown or missing backend adds a warning.
pub fn synthesize(
    package: &NormalizedPackage,
    clauses: &[ConditionedClause],
    warnings: &mut Vec<ConversionWarning>,
) -> Recipe {
    let spack = spack_name(&package.name);
    let newest = package.newest();
    let backend = newest.and_then(|r| r.backend.clone());

    match &backend {
        Some(BuildBackend::Other(name)) => warnings.push(ConversionWarning::UnknownBackend {
            package: package.name.clone(),
            backend: name.clone(),
        }),
        None => warnings.push(ConversionWarning::UnknownBackend {
            package: package.name.clone(),
            backend: "unknown".to_string(),
        }),
        Some(_) => {}
    }

    let pypi_path = package
        .releases
        .iter()
        .rev()
        .find_map(|r| r.sdist.as_ref())
        .map(|dist| format!("{}/{}", package.name, dist.filename));

    let versions = package
        .releases
        .iter()
        .rev()
        .map(|r| VersionEntry {
            version: spack_version(&r.version),
            sha256: r.sha256().map(str::to_string),
        })
        .collect();

    let mut dependencies: Vec<DependencyEntry> = clauses
        .iter()
        .map(|c| DependencyEntry::from_clause(c, &package.known_versions))
        .collect();
    for (i, j) in cross_conflicts(clauses) {
        dependencies[i].clashes = true;
        dependencies[j].clashes = true;
    }
    dependencies.sort_by(|a, b| {
        (a.group(), !a.is_python(), &a.name, &a.low, &a.when, &a.features, &a.versions).cmp(&(
            b.group(),
            !b.is_python(),
            &b.name,
            &b.low,
            &b.when,
            &b.features,
            &b.versions,
        ))
    });

    Recipe {
        pypi_name: package.name.clone(),
        class_name: class_name(&spack),
        spack_name: spack,
        metadata: package.metadata.clone(),
        pypi_path,
        versions,
        variants: package.extras().into_iter().collect(),
        backend,
        notes: ConversionNotes::from_warnings(warnings),
        dependencies,
    }
}
