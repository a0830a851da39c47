//! `package.py` rendering

use super::{backend_block, DependencyEntry, Recipe};
use std::fmt;

const HEADER: &str = "\
# Copyright 2013-2024 Lawrence Livermore National Security, LLC and other
# Spack Project Developers. See the top-level COPYRIGHT file for details.
#
# SPDX-License-Identifier: (Apache-2.0 OR MIT)
";

const INDENT: &str = "    ";

/// Escapes text for a double-quoted python string
fn quoted(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn depends_on(entry: &DependencyEntry, version: Option<&str>) -> String {
    match &entry.when {
        Some(when) => format!(
            "depends_on(\"{}\", when=\"{}\")",
            entry.spec(version),
            when
        ),
        None => format!("depends_on(\"{}\")", entry.spec(version)),
    }
}

impl Recipe {
    fn metadata_section(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match &self.metadata.homepage {
            Some(homepage) => lines.push(format!("homepage = \"{}\"", quoted(homepage))),
            None => {
                lines.push("# FIXME: add homepage".to_string());
                lines.push("# homepage = \"\"".to_string());
            }
        }
        match &self.pypi_path {
            Some(path) => lines.push(format!("pypi = \"{}\"", quoted(path))),
            None => {
                lines.push("# FIXME: no source distribution found, add a url".to_string());
                lines.push(format!(
                    "# pypi = \"{}/{}-<version>.tar.gz\"",
                    self.pypi_name, self.pypi_name
                ));
            }
        }
        lines
    }

    fn license_section(&self) -> Vec<String> {
        match &self.metadata.license {
            Some(license) => vec![format!("license(\"{}\")", quoted(license))],
            None => vec!["# FIXME: add license".to_string()],
        }
    }

    fn version_sections(&self) -> Vec<Vec<String>> {
        let checked: Vec<String> = self
            .versions
            .iter()
            .filter_map(|v| {
                v.sha256
                    .as_ref()
                    .map(|sha| format!("version(\"{}\", sha256=\"{}\")", v.version, sha))
            })
            .collect();

        let missing: Vec<String> = self
            .versions
            .iter()
            .filter(|v| v.sha256.is_none())
            .map(|v| format!("version(\"{}\")", v.version))
            .collect();

        let mut sections = vec![checked];
        if !missing.is_empty() {
            let mut block = vec!["# FIXME: add hashes/checksums for the following versions".to_string()];
            block.extend(missing);
            sections.push(block);
        }
        sections
    }

    fn note_sections(&self) -> Vec<Vec<String>> {
        let grouped = |title: &str, groups: &[(String, Vec<String>)]| -> Vec<String> {
            if groups.is_empty() {
                return Vec::new();
            }
            let mut lines = vec![format!("# FIXME: {}", title)];
            for (version, entries) in groups {
                lines.push(format!("# version {}:", version));
                lines.extend(entries.iter().map(|e| format!("#    {}", e)));
            }
            lines
        };

        let mut uninspected = Vec::new();
        if !self.notes.uninspected.is_empty() {
            uninspected.push(
                "# FIXME: the build files of the following versions could not be inspected"
                    .to_string(),
            );
            uninspected.extend(
                self.notes
                    .uninspected
                    .iter()
                    .map(|(version, message)| format!("# version {}: {}", version, message)),
            );
        }

        vec![
            uninspected,
            grouped(
                "the following dependencies could not be parsed",
                &self.notes.unparsed,
            ),
            grouped(
                "the following dependencies could be parsed but not converted to spack",
                &self.notes.unconverted,
            ),
        ]
    }

    fn variant_section(&self) -> Vec<String> {
        self.variants
            .iter()
            .map(|extra| {
                format!(
                    "variant(\"{}\", default=False, description=\"Enable the '{}' extra\")",
                    extra, extra
                )
            })
            .collect()
    }

    fn dependency_sections(&self) -> Vec<Vec<String>> {
        let mut sections = Vec::new();
        let mut current: Option<&'static str> = None;

        for entry in &self.dependencies {
            let types = entry.kind.spack_types();
            if current != Some(types) {
                sections.push(vec![format!("with default_args(type={}):", types)]);
                current = Some(types);
            }
            let Some(section) = sections.last_mut() else {
                continue;
            };

            if entry.conflicting {
                let ranges: Vec<&str> = entry
                    .versions
                    .iter()
                    .map(|v| v.as_deref().unwrap_or("unsatisfiable"))
                    .collect();
                section.push(format!(
                    "{}# FIXME: conflicting requirements on {}: {}",
                    INDENT,
                    entry.name,
                    ranges.join(" and ")
                ));
            }
            if entry.clashes {
                section.push(format!(
                    "{}# FIXME: requirement on {} clashes with another one for the same releases",
                    INDENT, entry.name
                ));
            }
            for version in &entry.versions {
                section.push(format!("{}{}", INDENT, depends_on(entry, version.as_deref())));
            }
        }
        sections
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", HEADER)?;
        writeln!(f, "from spack.package import *")?;
        writeln!(f)?;
        writeln!(f)?;
        writeln!(f, "class {}(PythonPackage):", self.class_name)?;

        let docstring = match self.metadata.summary.as_deref().map(str::trim) {
            Some(summary) if !summary.is_empty() => quoted(summary),
            _ => "FIXME: Put a proper description of your package here.".to_string(),
        };
        writeln!(f, "{}\"\"\"{}\"\"\"", INDENT, docstring)?;

        let mut sections = vec![self.metadata_section(), self.license_section()];
        sections.extend(self.version_sections());
        sections.extend(self.note_sections());
        sections.push(self.variant_section());
        sections.push(backend_block(self.backend.as_ref(), &self.native_tools()));
        sections.extend(self.dependency_sections());

        for section in sections.iter().filter(|s| !s.is_empty()) {
            writeln!(f)?;
            for line in section {
                writeln!(f, "{}{}", INDENT, line)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::compact;
    use crate::domain::{
        parse_version, BuildBackend, Condition, Constraint, DependencyKind, Distribution,
        Release, Requirement,
    };
    use crate::normalize::{NormalizedPackage, PackageMetadata};
    use crate::recipe::synthesize;

    fn release(version: &str, sha: Option<&str>, requirements: Vec<Requirement>) -> Release {
        let mut release = Release::new(parse_version(version).unwrap());
        release.requirements = requirements;
        release.backend = Some(BuildBackend::Hatchling);
        release.sdist = Some(Distribution {
            filename: format!("demo-{}.tar.gz", version),
            url: format!("https://files.example/demo-{}.tar.gz", version),
            sha256: sha.map(str::to_string),
        });
        release
    }

    fn req(name: &str, constraint: &str, kind: DependencyKind) -> Requirement {
        Requirement::new(name, kind).with_constraint(Constraint::parse(constraint).unwrap())
    }

    fn render(releases: Vec<Release>, metadata: PackageMetadata) -> String {
        let package = NormalizedPackage {
            name: "demo".to_string(),
            known_versions: releases.iter().map(|r| r.version.clone()).collect(),
            releases,
            metadata,
        };
        let mut warnings = Vec::new();
        let clauses = compact(&package.name, &package.releases, &mut warnings);
        synthesize(&package, &clauses, &mut warnings).render()
    }

    #[test]
    fn test_full_recipe() {
        let run = DependencyKind::BuildRun;
        let releases = vec![
            release(
                "1.0",
                None,
                vec![
                    req("hatchling", "", DependencyKind::Build),
                    req("python", ">=3.8", run),
                    req("q", ">=1,<2", run),
                ],
            ),
            release(
                "1.1",
                Some("bbb"),
                vec![
                    req("hatchling", "", DependencyKind::Build),
                    req("python", ">=3.8", run),
                    req("q", ">=1,<2", run),
                ],
            ),
            release(
                "1.2",
                Some("ccc"),
                vec![
                    req("hatchling", "", DependencyKind::Build),
                    req("python", ">=3.8", run),
                    req("q", ">=2", run),
                ],
            ),
        ];
        let metadata = PackageMetadata {
            summary: Some("A demo package.".to_string()),
            homepage: Some("https://example.org".to_string()),
            license: Some("MIT".to_string()),
        };

        let expected = r#"# Copyright 2013-2024 Lawrence Livermore National Security, LLC and other
# Spack Project Developers. See the top-level COPYRIGHT file for details.
#
# SPDX-License-Identifier: (Apache-2.0 OR MIT)

from spack.package import *


class PyDemo(PythonPackage):
    """A demo package."""

    homepage = "https://example.org"
    pypi = "demo/demo-1.2.tar.gz"

    license("MIT")

    version("1.2", sha256="ccc")
    version("1.1", sha256="bbb")

    # FIXME: add hashes/checksums for the following versions
    version("1.0")

    # Build backend: hatchling

    with default_args(type="build"):
        depends_on("py-hatchling")

    with default_args(type=("build", "run")):
        depends_on("python@3.8:")
        depends_on("py-q@1", when="@:1.1")
        depends_on("py-q@2:", when="@1.2:")
"#;
        assert_eq!(render(releases, metadata), expected);
    }

    #[test]
    fn test_missing_metadata_gets_fixmes() {
        let text = render(vec![release("1.0", None, vec![])], PackageMetadata::default());
        assert!(text.contains("\"\"\"FIXME: Put a proper description of your package here.\"\"\""));
        assert!(text.contains("    # FIXME: add homepage\n    # homepage = \"\"\n"));
        assert!(text.contains("    # FIXME: add license\n"));
    }

    #[test]
    fn test_quotes_are_escaped() {
        let metadata = PackageMetadata {
            summary: Some("Say \"hi\"".to_string()),
            ..PackageMetadata::default()
        };
        let text = render(vec![release("1.0", Some("a"), vec![])], metadata);
        assert!(text.contains(r#""""Say \"hi\"""""#));
    }

    #[test]
    fn test_conflicting_requirements_rendered_with_fixme() {
        let run = DependencyKind::BuildRun;
        let releases = vec![release(
            "1.0",
            Some("a"),
            vec![req("q", ">=2", run), req("q", "<1", run)],
        )];
        let text = render(releases, PackageMetadata::default());
        assert!(text.contains("        # FIXME: conflicting requirements on py-q"));
        assert!(text.contains("        depends_on(\"py-q@2:\")\n"));
        assert!(text.contains("        depends_on(\"py-q@:0\")\n"));
    }

    #[test]
    fn test_clash_across_conditions_rendered_with_fixme() {
        let run = DependencyKind::BuildRun;
        let old_python = Condition::python(Constraint::parse("<3.8").unwrap());
        let releases = vec![release(
            "1.0",
            Some("a"),
            vec![
                req("q", ">=2", run),
                req("q", "<1", run).with_condition(old_python),
            ],
        )];
        let text = render(releases, PackageMetadata::default());
        assert_eq!(
            text.matches("# FIXME: requirement on py-q clashes with another one")
                .count(),
            2
        );
        assert!(!text.contains("conflicting requirements on py-q"));
        assert!(text.contains("        depends_on(\"py-q@:0\", when=\"^python@:3.7\")\n"));
    }

    #[test]
    fn test_native_link_group() {
        let releases = vec![release(
            "1.0",
            Some("a"),
            vec![req("boost", ">=1.70", DependencyKind::NativeLink)],
        )];
        let text = render(releases, PackageMetadata::default());
        assert!(text.contains(
            "    with default_args(type=(\"build\", \"link\")):\n        depends_on(\"boost@1.70:\")\n"
        ));
    }
}
