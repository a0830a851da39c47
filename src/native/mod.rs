//! Native build introspection
//!
//! For CMake-driven builds, reads `CMakeLists.txt` and turns
//! `cmake_minimum_required` and `find_package` calls into native
//! requirements. Build requirements that name native tools (`cmake`,
//! `ninja`) are reclassified so they render as Spack tool dependencies
//! instead of `py-` packages.

mod table;

pub use table::{NativeLookup, NativeNameTable};

use crate::domain::{
    parse_version, BuildBackend, Constraint, ConversionWarning, DependencyKind, Release,
    Requirement,
};
use pep440_rs::{Operator, VersionSpecifier};
use regex::Regex;
use std::sync::LazyLock;

static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(cmake_minimum_required|find_package)\s*\(([^)]*)\)").expect("Invalid regex")
});

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)*$").expect("Invalid regex"));

/// A relevant call found in a `CMakeLists.txt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CMakeDirective {
    MinimumRequired {
        min: String,
        max: Option<String>,
    },
    FindPackage {
        name: String,
        min: Option<String>,
        max: Option<String>,
        exact: bool,
    },
}

fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits `a.b` or `a.b...c.d` into bounds, None if not a version
fn version_range(token: &str) -> Option<(String, Option<String>)> {
    let (min, max) = match token.split_once("...") {
        Some((min, max)) => (min, Some(max)),
        None => (token, None),
    };
    if !VERSION_RE.is_match(min) || max.is_some_and(|m| !VERSION_RE.is_match(m)) {
        return None;
    }
    Some((min.to_string(), max.map(str::to_string)))
}

/// Extracts the directives of a `CMakeLists.txt`, in order
pub fn scan_cmake(text: &str) -> Vec<CMakeDirective> {
    let text = strip_comments(text);
    let mut directives = Vec::new();

    for caps in COMMAND_RE.captures_iter(&text) {
        let command = caps[1].to_ascii_lowercase();
        let args: Vec<&str> = caps[2]
            .split_whitespace()
            .map(|a| a.trim_matches('"'))
            .collect();

        if command == "cmake_minimum_required" {
            let version = args
                .iter()
                .position(|a| a.eq_ignore_ascii_case("VERSION"))
                .and_then(|i| args.get(i + 1))
                .and_then(|v| version_range(v));
            if let Some((min, max)) = version {
                directives.push(CMakeDirective::MinimumRequired { min, max });
            }
        } else {
            let Some(name) = args.first() else { continue };
            if name.contains('$') {
                continue;
            }
            let (min, max) = match args.get(1).and_then(|v| version_range(v)) {
                Some((min, max)) => (Some(min), max),
                None => (None, None),
            };
            directives.push(CMakeDirective::FindPackage {
                name: name.to_string(),
                min,
                max,
                exact: args.iter().any(|a| *a == "EXACT"),
            });
        }
    }

    directives
}

fn bound(operator: Operator, version: &str) -> Option<VersionSpecifier> {
    parse_version(version).and_then(|v| VersionSpecifier::from_version(operator, v).ok())
}

fn range_constraint(min: Option<&str>, max: Option<&str>, exact: bool) -> Constraint {
    let lower = if exact {
        Operator::Equal
    } else {
        Operator::GreaterThanEqual
    };
    let specifiers = min
        .and_then(|m| bound(lower, m))
        .into_iter()
        .chain(max.and_then(|m| bound(Operator::LessThanEqual, m)));
    Constraint::from_specifiers(specifiers)
}

/// Adds native requirements to releases, driven by the name table
pub struct NativeIntrospector<'a> {
    table: &'a NativeNameTable,
}

impl<'a> NativeIntrospector<'a> {
    pub fn new(table: &'a NativeNameTable) -> Self {
        Self { table }
    }

    /// Rewrites tool build requirements and appends CMake-derived requirements
    pub fn augment(
        &self,
        package: &str,
        release: &mut Release,
        warnings: &mut Vec<ConversionWarning>,
    ) {
        for requirement in &mut release.requirements {
            if requirement.kind != DependencyKind::Build {
                continue;
            }
            if let Some(tool) = self.table.tool(&requirement.name) {
                requirement.name = tool.to_string();
                requirement.kind = DependencyKind::NativeBuild;
            }
        }

        if !self.should_scan(release) {
            return;
        }
        let Some(text) = release.cmakelists.as_deref() else {
            return;
        };

        let mut added = Vec::new();
        for directive in scan_cmake(text) {
            match directive {
                CMakeDirective::MinimumRequired { min, max } => {
                    added.push(
                        Requirement::new("cmake", DependencyKind::NativeBuild).with_constraint(
                            range_constraint(Some(&min), max.as_deref(), false),
                        ),
                    );
                }
                CMakeDirective::FindPackage {
                    name,
                    min,
                    max,
                    exact,
                } => match self.table.lookup(&name) {
                    NativeLookup::Package(spack_name) => added.push(
                        Requirement::new(spack_name, DependencyKind::NativeLink).with_constraint(
                            range_constraint(min.as_deref(), max.as_deref(), exact),
                        ),
                    ),
                    NativeLookup::Ignored => {}
                    NativeLookup::Unknown => warnings.push(ConversionWarning::UnknownNativeLibrary {
                        package: package.to_string(),
                        version: release.version.to_string(),
                        library: name,
                    }),
                },
            }
        }

        tracing::debug!(
            package,
            version = %release.version,
            count = added.len(),
            "native requirements from CMakeLists.txt"
        );
        release.requirements.extend(added);
    }

    fn should_scan(&self, release: &Release) -> bool {
        match &release.backend {
            Some(backend) if backend.is_cmake_based() => true,
            Some(BuildBackend::Setuptools) => release
                .requirements
                .iter()
                .any(|r| r.kind == DependencyKind::NativeBuild && r.name == "cmake"),
            _ => false,
        }
    }
}
