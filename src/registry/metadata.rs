//! Raw package metadata as delivered by an index
//!
//! These are the untrusted inputs of normalization: version strings are not
//! yet parsed and requirement strings are kept verbatim.

use crate::domain::Distribution;

/// A version as listed on the project page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedVersion {
    pub version: String,
    /// All published files are yanked
    pub yanked: bool,
    /// At least one file was published
    pub has_files: bool,
}

impl ListedVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            yanked: false,
            has_files: true,
        }
    }

    pub fn yanked(mut self) -> Self {
        self.yanked = true;
        self
    }

    /// Yanked releases and releases without files cannot be installed
    pub fn is_installable(&self) -> bool {
        !self.yanked && self.has_files
    }
}

/// Every version an index knows for a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectListing {
    pub name: String,
    pub versions: Vec<ListedVersion>,
}

/// Build description files found at the top of a source distribution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFiles {
    pub pyproject: Option<String>,
    pub cmakelists: Option<String>,
}

/// Metadata of one release, verbatim from the index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRelease {
    pub version: String,
    pub requires_dist: Vec<String>,
    pub requires_python: Option<String>,
    pub provides_extra: Vec<String>,
    pub summary: Option<String>,
    pub home_page: Option<String>,
    pub license: Option<String>,
    pub sdist: Option<Distribution>,
    /// None when the sdist was not inspected or could not be retrieved
    pub build_files: Option<BuildFiles>,
}

impl RawRelease {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    /// Adds a `Requires-Dist` entry (builder pattern)
    pub fn with_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requires_dist.push(requirement.into());
        self
    }

    /// Sets `Requires-Python` (builder pattern)
    pub fn with_requires_python(mut self, requires_python: impl Into<String>) -> Self {
        self.requires_python = Some(requires_python.into());
        self
    }
}
