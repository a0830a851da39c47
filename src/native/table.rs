//! Native name lookup table
//!
//! Maps CMake package names and native build tools to Spack package names.
//! A built-in table ships with the binary and can be extended (or
//! overridden entry by entry) by a user TOML file of the same shape.

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Built-in table
const BUILTIN_TABLE: &str = include_str!("native_names.toml");

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    #[serde(default)]
    libraries: BTreeMap<String, String>,
    #[serde(default)]
    tools: BTreeMap<String, String>,
    #[serde(default)]
    ignore: IgnoreSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct IgnoreSection {
    #[serde(default)]
    names: Vec<String>,
}

/// Result of looking up a `find_package` name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeLookup {
    /// Provided by this Spack package
    Package(String),
    /// Needs no dependency
    Ignored,
    /// Not in the table
    Unknown,
}

/// Immutable lookup table, shared across conversions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeNameTable {
    libraries: BTreeMap<String, String>,
    tools: BTreeMap<String, String>,
    ignored: BTreeSet<String>,
}

impl NativeNameTable {
    /// Loads the built-in table
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml(BUILTIN_TABLE, Path::new("<builtin>"))
    }

    /// Parses a table from TOML text; `origin` is used in error messages
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let file: TableFile = toml::from_str(text).map_err(|e| ConfigError::NativeMapParse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self {
            libraries: file.libraries,
            tools: file.tools.into_iter().map(|(k, v)| (k.to_ascii_lowercase(), v)).collect(),
            ignored: file.ignore.names.into_iter().collect(),
        })
    }

    /// Loads the built-in table, extended by a user file when given
    pub fn load(extra: Option<&Path>) -> Result<Self, ConfigError> {
        let mut table = Self::builtin()?;
        if let Some(path) = extra {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::NativeMapRead {
                path: path.to_path_buf(),
                source,
            })?;
            table.extend(Self::from_toml(&text, path)?);
            tracing::info!(path = %path.display(), "loaded native name table");
        }
        Ok(table)
    }

    /// Adds every entry of `other`, replacing entries with the same key
    pub fn extend(&mut self, other: NativeNameTable) {
        for name in other.libraries.keys() {
            self.ignored.remove(name);
        }
        self.libraries.extend(other.libraries);
        self.tools.extend(other.tools);
        self.ignored.extend(other.ignored);
    }

    /// Looks up a `find_package` name
    pub fn lookup(&self, cmake_name: &str) -> NativeLookup {
        if self.ignored.contains(cmake_name) {
            return NativeLookup::Ignored;
        }
        if let Some(package) = self.libraries.get(cmake_name) {
            return NativeLookup::Package(package.clone());
        }
        if self.ignored.iter().any(|n| n.eq_ignore_ascii_case(cmake_name)) {
            return NativeLookup::Ignored;
        }
        self.libraries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(cmake_name))
            .map(|(_, v)| NativeLookup::Package(v.clone()))
            .unwrap_or(NativeLookup::Unknown)
    }

    /// Spack package for a build requirement that is really a native tool
    pub fn tool(&self, pypi_name: &str) -> Option<&str> {
        self.tools.get(pypi_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_loads() {
        let table = NativeNameTable::builtin().unwrap();
        assert!(!table.is_empty());
        assert_eq!(table.lookup("Boost"), NativeLookup::Package("boost".to_string()));
        assert_eq!(table.lookup("ZLIB"), NativeLookup::Package("zlib-api".to_string()));
        assert_eq!(table.lookup("Threads"), NativeLookup::Ignored);
        assert_eq!(table.lookup("NoSuchThing"), NativeLookup::Unknown);
    }

    #[test]
    fn test_case_insensitive_fallback() {
        let table = NativeNameTable::builtin().unwrap();
        assert_eq!(table.lookup("zlib"), NativeLookup::Package("zlib-api".to_string()));
        assert_eq!(table.lookup("python3"), NativeLookup::Ignored);
    }

    #[test]
    fn test_tools() {
        let table = NativeNameTable::builtin().unwrap();
        assert_eq!(table.tool("cmake"), Some("cmake"));
        assert_eq!(table.tool("numpy"), None);
    }

    #[test]
    fn test_user_file_extends_and_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[libraries]\nBoost = \"boost-custom\"\nMyLib = \"mylib\"\n\n[ignore]\nnames = [\"Foo\"]"
        )
        .unwrap();

        let table = NativeNameTable::load(Some(file.path())).unwrap();
        assert_eq!(
            table.lookup("Boost"),
            NativeLookup::Package("boost-custom".to_string())
        );
        assert_eq!(table.lookup("MyLib"), NativeLookup::Package("mylib".to_string()));
        assert_eq!(table.lookup("Foo"), NativeLookup::Ignored);
        assert_eq!(table.lookup("HDF5"), NativeLookup::Package("hdf5".to_string()));
    }

    #[test]
    fn test_missing_user_file() {
        let err = NativeNameTable::load(Some(Path::new("/nonexistent/map.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NativeMapRead { .. }));
    }

    #[test]
    fn test_malformed_user_file() {
        let err = NativeNameTable::from_toml("[libraries]\nBoost = 3\n", Path::new("x.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NativeMapParse { .. }));
    }
}
