//! Application error types using thiserror
//!
//! Error hierarchy:
//! - RegistryError: Issues with PyPI or sdist downloads
//! - RepositoryError: Issues reading or writing the Spack repository
//! - ConfigError: Issues with CLI configuration and the native name table
//! - ConversionFailure: Why a single package could not be converted
//!
//! Per-package problems that do not stop a conversion are
//! `domain::ConversionWarning`s, not errors.

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Package index related errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Recipe repository related errors
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A conversion task died without reporting a result
    #[error("conversion task aborted: {message}")]
    TaskAborted { message: String },
}

/// Errors related to package index communication
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Package not found in registry
    #[error("package '{package}' not found in {registry}")]
    PackageNotFound { package: String, registry: String },

    /// Release not found in registry
    #[error("release {package} {version} not found in {registry}")]
    VersionNotFound {
        package: String,
        version: String,
        registry: String,
    },

    /// Network request failed
    #[error("failed to fetch '{package}' from {registry}: {message}")]
    NetworkError {
        package: String,
        registry: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {registry}")]
    RateLimitExceeded { registry: String },

    /// Invalid response from registry
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching '{package}' from {registry}")]
    Timeout { package: String, registry: String },

    /// A source archive could not be unpacked
    #[error("cannot unpack {filename}: {message}")]
    ArchiveError { filename: String, message: String },
}

/// Errors related to the Spack recipe repository
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The directory is not a Spack package repository
    #[error("not a Spack repository: {path} ({message})")]
    NotARepository { path: PathBuf, message: String },

    /// Failed to write a recipe
    #[error("failed to write recipe {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid path
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: PathBuf, message: String },

    /// Conflicting options
    #[error("conflicting options: {message}")]
    ConflictingOptions { message: String },

    /// No repository given and none could be located
    #[error("no Spack repository: pass --repo or set SPACK_ROOT")]
    RepositoryNotConfigured,

    /// Failed to read the native name table
    #[error("failed to read native name table {path}: {source}")]
    NativeMapRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The native name table is not valid TOML of the expected shape
    #[error("failed to parse native name table {path}: {message}")]
    NativeMapParse { path: PathBuf, message: String },
}

/// Why one package could not be converted
///
/// Recorded in the run summary; only fatal to the run when it is the root.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionFailure {
    /// Metadata could not be fetched
    #[error(transparent)]
    Fetch(#[from] RegistryError),

    /// The package has no usable (non-yanked, valid) releases
    #[error("no installable releases of '{package}'")]
    NoReleases { package: String },

    /// Every selected release requires an older python than the floor
    #[error("no release of '{package}' supports python {floor} or newer")]
    NoCompatibleRelease { package: String, floor: String },

    /// A fetch task inside the conversion panicked or was cancelled
    #[error("conversion of '{package}' aborted: {message}")]
    Aborted { package: String, message: String },
}

impl RegistryError {
    /// Creates a new PackageNotFound error
    pub fn package_not_found(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::PackageNotFound {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NetworkError
    pub fn network_error(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::NetworkError {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidResponse error
    pub fn invalid_response(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::InvalidResponse {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new RateLimitExceeded error
    pub fn rate_limit_exceeded(registry: impl Into<String>) -> Self {
        RegistryError::RateLimitExceeded {
            registry: registry.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::Timeout {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new ArchiveError
    pub fn archive(filename: impl Into<String>, message: impl Into<String>) -> Self {
        RegistryError::ArchiveError {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Returns true if retrying the request could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegistryError::NetworkError { .. }
                | RegistryError::RateLimitExceeded { .. }
                | RegistryError::Timeout { .. }
        )
    }

    /// Returns true for missing packages or releases
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::PackageNotFound { .. } | RegistryError::VersionNotFound { .. }
        )
    }
}

impl RepositoryError {
    /// Creates a new NotARepository error
    pub fn not_a_repository(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        RepositoryError::NotARepository {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RepositoryError::WriteError {
            path: path.into(),
            source,
        }
    }
}
