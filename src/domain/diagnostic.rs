//! Per-package conversion warnings
//!
//! Warnings never stop a conversion. They are collected per package,
//! logged as they happen and reported in the run summary.

use thiserror::Error;

/// Something that could not be converted faithfully
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionWarning {
    /// A listed version is not PEP 440
    #[error("{package}: ignoring invalid version '{version}'")]
    InvalidVersion { package: String, version: String },

    /// A requirement string could not be parsed
    #[error("{package} {version}: dropping requirement '{requirement}': {message}")]
    InvalidRequirement {
        package: String,
        version: String,
        requirement: String,
        message: String,
    },

    /// Part of an environment marker has no Spack equivalent
    #[error("{package} {version}: marker in '{requirement}' not representable: {detail}")]
    UnsupportedMarker {
        package: String,
        version: String,
        requirement: String,
        detail: String,
    },

    /// Constraints on one dependency that cannot all hold for the same release
    #[error("{package} {version}: conflicting constraints on '{dependency}': {constraints}")]
    UnsatisfiableConstraint {
        package: String,
        version: String,
        dependency: String,
        constraints: String,
    },

    /// The build backend is not one a recipe template exists for
    #[error("{package}: unknown build backend '{backend}'")]
    UnknownBackend { package: String, backend: String },

    /// `find_package` named a library missing from the native name table
    #[error("{package} {version}: no Spack package known for CMake package '{library}'")]
    UnknownNativeLibrary {
        package: String,
        version: String,
        library: String,
    },

    /// A release requires a python older than the configured floor
    #[error("{package} {version}: skipped, requires python {requires_python}")]
    IncompatibleRelease {
        package: String,
        version: String,
        requires_python: String,
    },

    /// A dependent asked for an extra the package does not declare
    #[error("{package}: extra '{extra}' requested by {requested_by} is not declared")]
    UndeclaredExtra {
        package: String,
        extra: String,
        requested_by: String,
    },

    /// The sdist could not be downloaded or unpacked
    #[error("{package} {version}: build files unavailable: {message}")]
    BuildFilesUnavailable {
        package: String,
        version: String,
        message: String,
    },
}
