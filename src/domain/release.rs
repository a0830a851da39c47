//! Normalized releases and build backends

use super::constraint::Constraint;
use super::requirement::Requirement;
use pep440_rs::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A source distribution file published for a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub filename: String,
    pub url: String,
    pub sha256: Option<String>,
}

/// PEP 517 build backend of a release
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuildBackend {
    Setuptools,
    FlitCore,
    Hatchling,
    PoetryCore,
    PdmBackend,
    Maturin,
    ScikitBuildCore,
    ScikitBuild,
    PyBuildCmake,
    Cmeel,
    MesonPython,
    /// Anything else, holding the declared `build-backend` string
    Other(String),
}

impl BuildBackend {
    /// Identifies a backend from its `build-system.build-backend` value
    pub fn from_declaration(value: &str) -> Self {
        let value = value.trim();
        let module = value
            .split([':', '.'])
            .next()
            .unwrap_or(value)
            .to_ascii_lowercase();
        match module.as_str() {
            "setuptools" => BuildBackend::Setuptools,
            "flit_core" | "flit" => BuildBackend::FlitCore,
            "hatchling" => BuildBackend::Hatchling,
            "poetry" => BuildBackend::PoetryCore,
            "pdm" => BuildBackend::PdmBackend,
            "maturin" => BuildBackend::Maturin,
            "scikit_build_core" => BuildBackend::ScikitBuildCore,
            "skbuild" => BuildBackend::ScikitBuild,
            "py_build_cmake" => BuildBackend::PyBuildCmake,
            "cmeel" => BuildBackend::Cmeel,
            "mesonpy" => BuildBackend::MesonPython,
            _ => BuildBackend::Other(value.to_string()),
        }
    }

    /// Backends whose build is driven by a top-level `CMakeLists.txt`
    pub fn is_cmake_based(&self) -> bool {
        matches!(
            self,
            BuildBackend::ScikitBuildCore
                | BuildBackend::ScikitBuild
                | BuildBackend::PyBuildCmake
                | BuildBackend::Cmeel
        )
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, BuildBackend::Other(_))
    }

    pub fn display_name(&self) -> &str {
        match self {
            BuildBackend::Setuptools => "setuptools",
            BuildBackend::FlitCore => "flit-core",
            BuildBackend::Hatchling => "hatchling",
            BuildBackend::PoetryCore => "poetry-core",
            BuildBackend::PdmBackend => "pdm-backend",
            BuildBackend::Maturin => "maturin",
            BuildBackend::ScikitBuildCore => "scikit-build-core",
            BuildBackend::ScikitBuild => "scikit-build",
            BuildBackend::PyBuildCmake => "py-build-cmake",
            BuildBackend::Cmeel => "cmeel",
            BuildBackend::MesonPython => "meson-python",
            BuildBackend::Other(name) => name,
        }
    }
}

impl fmt::Display for BuildBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One published version of a package with its normalized requirements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: Version,
    pub requirements: Vec<Requirement>,
    pub requires_python: Option<Constraint>,
    /// Extras the release declares, normalized
    pub extras: BTreeSet<String>,
    pub sdist: Option<Distribution>,
    /// None when no build files could be inspected
    pub backend: Option<BuildBackend>,
    /// Top-level `CMakeLists.txt` of the sdist, if retrieved
    pub cmakelists: Option<String>,
}

impl Release {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            requirements: Vec::new(),
            requires_python: None,
            extras: BTreeSet::new(),
            sdist: None,
            backend: None,
            cmakelists: None,
        }
    }

    /// Checksum of the source distribution, when published
    pub fn sha256(&self) -> Option<&str> {
        self.sdist.as_ref().and_then(|d| d.sha256.as_deref())
    }
}
