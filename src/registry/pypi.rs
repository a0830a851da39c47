//! PyPI JSON API adapter
//!
//! Fetches project listings and release metadata from PyPI.
//! API endpoints:
//! - https://pypi.org/pypi/{package}/json
//! - https://pypi.org/pypi/{package}/{version}/json

use crate::domain::{normalize_name, Distribution};
use crate::error::RegistryError;
use crate::registry::{HttpClient, ListedVersion, MetadataIndex, ProjectListing, RawRelease};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// PyPI API base URL
const PYPI_API_URL: &str = "https://pypi.org/pypi";

/// PyPI metadata index
pub struct PyPIIndex {
    client: HttpClient,
    base_url: String,
}

/// PyPI project or release response
#[derive(Debug, Deserialize)]
struct PyPIResponse {
    info: PyPIInfo,
    /// Files keyed by version (project endpoint only)
    #[serde(default)]
    releases: HashMap<String, Vec<PyPIFile>>,
    /// Files of the requested release
    #[serde(default)]
    urls: Vec<PyPIFile>,
}

/// The `info` block
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PyPIInfo {
    name: String,
    version: String,
    summary: Option<String>,
    home_page: Option<String>,
    project_urls: Option<HashMap<String, String>>,
    license: Option<String>,
    license_expression: Option<String>,
    requires_dist: Option<Vec<String>>,
    requires_python: Option<String>,
    provides_extra: Option<Vec<String>>,
}

/// One uploaded file
#[derive(Debug, Deserialize)]
struct PyPIFile {
    filename: String,
    url: String,
    packagetype: String,
    #[serde(default)]
    digests: HashMap<String, String>,
    #[serde(default)]
    yanked: bool,
}

impl PyPIIndex {
    /// Create a new PyPI index adapter
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, PYPI_API_URL)
    }

    /// Create an adapter against a PyPI-compatible mirror
    pub fn with_base_url(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the URL for a project
    fn project_url(&self, package: &str) -> String {
        format!("{}/{}/json", self.base_url, normalize_name(package))
    }

    /// Build the URL for a release
    fn release_url(&self, package: &str, version: &str) -> String {
        format!("{}/{}/{}/json", self.base_url, normalize_name(package), version)
    }
}

fn listing_from_response(package: &str, response: PyPIResponse) -> ProjectListing {
    let mut versions: Vec<ListedVersion> = response
        .releases
        .into_iter()
        .map(|(version, files)| ListedVersion {
            version,
            yanked: !files.is_empty() && files.iter().all(|f| f.yanked),
            has_files: !files.is_empty(),
        })
        .collect();
    versions.sort_by(|a, b| a.version.cmp(&b.version));

    let name = if response.info.name.is_empty() {
        package.to_string()
    } else {
        response.info.name
    };
    ProjectListing { name, versions }
}

fn release_from_response(response: PyPIResponse) -> RawRelease {
    let info = response.info;

    let sdist = response
        .urls
        .into_iter()
        .find(|f| f.packagetype == "sdist")
        .map(|f| Distribution {
            sha256: f.digests.get("sha256").cloned(),
            filename: f.filename,
            url: f.url,
        });

    let home_page = info.home_page.filter(|h| !h.trim().is_empty()).or_else(|| {
        info.project_urls.as_ref().and_then(|urls| {
            urls.iter()
                .find(|(key, _)| matches!(key.to_ascii_lowercase().as_str(), "homepage" | "home"))
                .map(|(_, url)| url.clone())
        })
    });

    let license = info
        .license_expression
        .or(info.license)
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty() && !l.contains('\n') && l.len() <= 80);

    RawRelease {
        version: info.version,
        requires_dist: info.requires_dist.unwrap_or_default(),
        requires_python: info.requires_python.filter(|r| !r.trim().is_empty()),
        provides_extra: info.provides_extra.unwrap_or_default(),
        summary: info.summary.filter(|s| !s.trim().is_empty()),
        home_page,
        license,
        sdist,
        build_files: None,
    }
}

#[async_trait]
impl MetadataIndex for PyPIIndex {
    fn index_name(&self) -> &'static str {
        "PyPI"
    }

    async fn fetch_project(&self, package: &str) -> Result<ProjectListing, RegistryError> {
        let url = self.project_url(package);
        tracing::debug!(package, url = %url, "fetching project listing");
        let response: PyPIResponse = self
            .client
            .get_json(&url, package, self.index_name())
            .await?;
        Ok(listing_from_response(package, response))
    }

    async fn fetch_release(
        &self,
        package: &str,
        version: &str,
    ) -> Result<RawRelease, RegistryError> {
        let url = self.release_url(package, version);
        tracing::debug!(package, version, url = %url, "fetching release metadata");
        let response: PyPIResponse = self
            .client
            .get_json(&url, package, self.index_name())
            .await
            .map_err(|e| match e {
                RegistryError::PackageNotFound { registry, .. } => RegistryError::VersionNotFound {
                    package: package.to_string(),
                    version: version.to_string(),
                    registry,
                },
                other => other,
            })?;
        let mut release = release_from_response(response);
        if release.version.is_empty() {
            release.version = version.to_string();
        }
        Ok(release)
    }
}
