//! Spack package repositories
//!
//! This module provides:
//! - RecipeRepository trait for checking and storing recipes
//! - SpackRepository writing `packages/<name>/package.py` files
//! - DryRunRepository keeping recipes in memory instead

use crate::error::{ConfigError, RepositoryError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Location of the builtin repository inside a Spack checkout
const BUILTIN_REPO: &str = "var/spack/repos/builtin";

/// Where converted recipes go
pub trait RecipeRepository: Send + Sync {
    /// Returns true if a recipe with this Spack name already exists
    fn exists(&self, spack_name: &str) -> bool;

    /// Stores the rendered recipe of a package
    fn write(&self, spack_name: &str, text: &str) -> Result<(), RepositoryError>;
}

/// A Spack package repository on disk (`repo.yaml` plus `packages/`)
#[derive(Debug, Clone)]
pub struct SpackRepository {
    root: PathBuf,
}

impl SpackRepository {
    /// Opens an existing repository, checking its layout
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(RepositoryError::not_a_repository(&root, "not a directory"));
        }
        if !root.join("repo.yaml").is_file() {
            return Err(RepositoryError::not_a_repository(&root, "missing repo.yaml"));
        }
        if !root.join("packages").is_dir() {
            return Err(RepositoryError::not_a_repository(
                &root,
                "missing packages/ directory",
            ));
        }
        Ok(Self { root })
    }

    /// Resolves the repository path from `--repo` or `$SPACK_ROOT`
    pub fn locate(repo: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        Self::locate_with(repo, std::env::var_os("SPACK_ROOT").map(PathBuf::from))
    }

    fn locate_with(
        repo: Option<PathBuf>,
        spack_root: Option<PathBuf>,
    ) -> Result<PathBuf, ConfigError> {
        repo.or_else(|| spack_root.map(|root| root.join(BUILTIN_REPO)))
            .ok_or(ConfigError::RepositoryNotConfigured)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the recipe file for a package
    pub fn recipe_path(&self, spack_name: &str) -> PathBuf {
        self.root
            .join("packages")
            .join(spack_name)
            .join("package.py")
    }
}

impl RecipeRepository for SpackRepository {
    fn exists(&self, spack_name: &str) -> bool {
        self.recipe_path(spack_name).is_file()
    }

    fn write(&self, spack_name: &str, text: &str) -> Result<(), RepositoryError> {
        let path = self.recipe_path(spack_name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| RepositoryError::write_error(dir, e))?;
        }
        fs::write(&path, text).map_err(|e| RepositoryError::write_error(&path, e))?;
        tracing::info!(path = %path.display(), "wrote recipe");
        Ok(())
    }
}

/// Collects recipes in memory; lookups go to an optional real repository
#[derive(Default)]
pub struct DryRunRepository {
    inner: Option<Arc<dyn RecipeRepository>>,
    recipes: Mutex<BTreeMap<String, String>>,
}

impl DryRunRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `exists` from `inner`, never writing to it
    pub fn backed_by(inner: Arc<dyn RecipeRepository>) -> Self {
        Self {
            inner: Some(inner),
            recipes: Mutex::new(BTreeMap::new()),
        }
    }

    /// Recipes written so far, keyed by Spack name
    pub fn recipes(&self) -> BTreeMap<String, String> {
        self.recipes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl RecipeRepository for DryRunRepository {
    fn exists(&self, spack_name: &str) -> bool {
        self.inner.as_ref().is_some_and(|r| r.exists(spack_name))
    }

    fn write(&self, spack_name: &str, text: &str) -> Result<(), RepositoryError> {
        self.recipes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(spack_name.to_string(), text.to_string());
        Ok(())
    }
}
