//! Environment conditions attached to requirements

use super::constraint::Constraint;
use super::version::known_python_versions;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platforms Spack can express in a `platform=` condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
    Windows,
    Freebsd,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Linux,
        Platform::Darwin,
        Platform::Windows,
        Platform::Freebsd,
    ];

    /// Maps a `sys_platform`, `platform_system` or `os_name` value
    pub fn from_marker_value(value: &str) -> Option<Self> {
        let value = value.to_ascii_lowercase();
        match value.as_str() {
            "linux" | "linux2" => Some(Platform::Linux),
            "darwin" => Some(Platform::Darwin),
            "win32" | "windows" | "cygwin" | "nt" => Some(Platform::Windows),
            v if v.starts_with("freebsd") => Some(Platform::Freebsd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
            Platform::Windows => "windows",
            Platform::Freebsd => "freebsd",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Conjunction of a python-version constraint and an optional platform
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Condition {
    pub python: Constraint,
    pub platform: Option<Platform>,
}

impl Condition {
    /// The condition that always holds
    pub fn always() -> Self {
        Self::default()
    }

    pub fn python(python: Constraint) -> Self {
        Self {
            python,
            platform: None,
        }
    }

    pub fn platform(platform: Platform) -> Self {
        Self {
            python: Constraint::any(),
            platform: Some(platform),
        }
    }

    pub fn is_always(&self) -> bool {
        self.python.is_any() && self.platform.is_none()
    }

    /// Conjunction of two conditions, None when it can never hold
    pub fn and(&self, other: &Condition) -> Option<Condition> {
        let platform = match (self.platform, other.platform) {
            (Some(a), Some(b)) if a != b => return None,
            (a, b) => a.or(b),
        };
        let python = self.python.intersect(&other.python);
        if !python.is_satisfiable() || !any_known_python(&python) {
            return None;
        }
        Some(Condition { python, platform })
    }

    /// Spec fragments for a `when=` string (`platform=linux`, `^python@:3.9`)
    pub fn spack_parts(&self) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(platform) = self.platform {
            parts.push(format!("platform={}", platform));
        }
        if let Some(range) = self.python.to_spack() {
            parts.push(format!("^python@{}", range));
        }
        parts
    }
}

/// Returns true if at least one known CPython release satisfies `python`
pub fn any_known_python(python: &Constraint) -> bool {
    known_python_versions().iter().any(|v| python.contains(v))
}

/// Returns true if every known CPython release satisfies `python`
pub fn all_known_python(python: &Constraint) -> bool {
    known_python_versions().iter().all(|v| python.contains(v))
}
