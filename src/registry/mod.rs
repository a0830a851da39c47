//! Package index and source retrieval adapters
//!
//! This module provides:
//! - HTTP client shared foundation with retry logic
//! - `MetadataIndex` trait with the PyPI JSON API implementation
//! - `SourceRetriever` trait with the sdist download implementation

mod client;
mod metadata;
mod pypi;
mod sdist;

pub use client::HttpClient;
pub use metadata::{BuildFiles, ListedVersion, ProjectListing, RawRelease};
pub use pypi::PyPIIndex;
pub use sdist::{extract_build_files, SdistRetriever};

use crate::domain::Distribution;
use crate::error::RegistryError;
use async_trait::async_trait;

/// Source of per-package and per-release metadata
#[async_trait]
pub trait MetadataIndex: Send + Sync {
    /// Get the index name used in error messages
    fn index_name(&self) -> &'static str;

    /// Fetch every version the index lists for a package
    async fn fetch_project(&self, package: &str) -> Result<ProjectListing, RegistryError>;

    /// Fetch the metadata of a single release
    async fn fetch_release(&self, package: &str, version: &str)
        -> Result<RawRelease, RegistryError>;
}

/// Access to the build description files of a source distribution
#[async_trait]
pub trait SourceRetriever: Send + Sync {
    async fn fetch_build_files(
        &self,
        package: &str,
        dist: &Distribution,
    ) -> Result<BuildFiles, RegistryError>;
}
