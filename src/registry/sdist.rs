//! Source distribution retrieval
//!
//! Downloads an sdist and pulls the top-level `pyproject.toml` and
//! `CMakeLists.txt` out of it. Only gzip-compressed tarballs are inspected.

use crate::domain::Distribution;
use crate::error::RegistryError;
use crate::registry::{BuildFiles, HttpClient, SourceRetriever};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Component;
use tar::Archive;

/// Registry name used in error messages
const REGISTRY_NAME: &str = "PyPI files";

/// Fetches build files from sdists over HTTP
pub struct SdistRetriever {
    client: HttpClient,
}

impl SdistRetriever {
    /// Create a new retriever
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

/// Returns true if the file name is an archive we can unpack
fn is_supported_archive(filename: &str) -> bool {
    filename.ends_with(".tar.gz") || filename.ends_with(".tgz")
}

/// Reads the top-level build files out of a `.tar.gz` sdist
///
/// An sdist holds a single `<name>-<version>/` directory; only files directly
/// inside it are considered.
pub fn extract_build_files(filename: &str, bytes: &[u8]) -> Result<BuildFiles, RegistryError> {
    let decoder = GzDecoder::new(bytes);
    let mut archive = Archive::new(decoder);
    let mut files = BuildFiles::default();

    let entries = archive
        .entries()
        .map_err(|e| RegistryError::archive(filename, e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| RegistryError::archive(filename, e.to_string()))?;
        let path = entry
            .path()
            .map_err(|e| RegistryError::archive(filename, e.to_string()))?
            .into_owned();

        let parts: Vec<String> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if parts.len() != 2 {
            continue;
        }

        let slot = match parts[1].as_str() {
            "pyproject.toml" => &mut files.pyproject,
            "CMakeLists.txt" => &mut files.cmakelists,
            _ => continue,
        };
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|e| RegistryError::archive(filename, e.to_string()))?;
        *slot = Some(content);

        if files.pyproject.is_some() && files.cmakelists.is_some() {
            break;
        }
    }

    Ok(files)
}

#[async_trait]
impl SourceRetriever for SdistRetriever {
    async fn fetch_build_files(
        &self,
        package: &str,
        dist: &Distribution,
    ) -> Result<BuildFiles, RegistryError> {
        if !is_supported_archive(&dist.filename) {
            return Err(RegistryError::archive(
                &dist.filename,
                "unsupported archive format",
            ));
        }

        tracing::debug!(package, file = %dist.filename, "downloading sdist");
        let bytes = self
            .client
            .get_bytes(&dist.url, package, REGISTRY_NAME)
            .await?;

        let filename = dist.filename.clone();
        tokio::task::spawn_blocking(move || extract_build_files(&filename, &bytes))
            .await
            .map_err(|e| RegistryError::archive(&dist.filename, e.to_string()))?
    }
}
