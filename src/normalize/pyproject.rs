//! `pyproject.toml` build-system table

use crate::domain::BuildBackend;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct PyProject {
    #[serde(rename = "build-system")]
    build_system: Option<BuildSystemTable>,
}

#[derive(Debug, Default, Deserialize)]
struct BuildSystemTable {
    #[serde(default)]
    requires: Vec<String>,
    #[serde(rename = "build-backend")]
    build_backend: Option<String>,
}

/// The build system a source tree declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSystem {
    pub backend: BuildBackend,
    /// Raw `requires` entries
    pub requires: Vec<String>,
}

impl BuildSystem {
    /// What pip assumes for a tree without a usable `[build-system]` table
    pub fn legacy() -> Self {
        Self {
            backend: BuildBackend::Setuptools,
            requires: vec!["setuptools".to_string()],
        }
    }

    /// Reads the build system from `pyproject.toml` text
    pub fn from_pyproject(text: &str) -> Result<Self, String> {
        let pyproject: PyProject = toml::from_str(text).map_err(|e| e.to_string())?;
        let Some(table) = pyproject.build_system else {
            return Ok(Self::legacy());
        };
        let backend = table
            .build_backend
            .as_deref()
            .map(BuildBackend::from_declaration)
            .unwrap_or(BuildBackend::Setuptools);
        Ok(Self {
            backend,
            requires: table.requires,
        })
    }
}
