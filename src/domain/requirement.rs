//! Normalized dependency requirements

use super::condition::Condition;
use super::constraint::Constraint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How a dependency is needed, which also decides its Spack `type=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// PyPI package needed only to build (`build-system.requires`)
    Build,
    /// PyPI package needed to build and run (`Requires-Dist`)
    BuildRun,
    /// Native tool needed at build time (cmake, ninja)
    NativeBuild,
    /// Native library linked against (boost, zlib)
    NativeLink,
}

impl DependencyKind {
    /// The `type=` argument Spack expects
    pub fn spack_types(&self) -> &'static str {
        match self {
            DependencyKind::Build | DependencyKind::NativeBuild => "\"build\"",
            DependencyKind::BuildRun => "(\"build\", \"run\")",
            DependencyKind::NativeLink => "(\"build\", \"link\")",
        }
    }

    /// Native dependencies already carry Spack names and are never crawled
    pub fn is_native(&self) -> bool {
        matches!(self, DependencyKind::NativeBuild | DependencyKind::NativeLink)
    }
}

/// One dependency of one release, after marker evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// PEP 503 normalized name, or the Spack name for native dependencies
    pub name: String,
    pub constraint: Constraint,
    /// Extras requested on the dependency (`requests[socks]`)
    pub features: BTreeSet<String>,
    pub condition: Condition,
    /// Extra of the dependent that gates this requirement
    pub extra: Option<String>,
    pub kind: DependencyKind,
}

impl Requirement {
    /// Creates an unconditional, unconstrained requirement
    pub fn new(name: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            name: name.into(),
            constraint: Constraint::any(),
            features: BTreeSet::new(),
            condition: Condition::always(),
            extra: None,
            kind,
        }
    }

    /// Sets the version constraint (builder pattern)
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = constraint;
        self
    }

    /// Sets the environment condition (builder pattern)
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// Sets the gating extra (builder pattern)
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// Sets the requested extras (builder pattern)
    pub fn with_features(mut self, features: impl IntoIterator<Item = String>) -> Self {
        self.features = features.into_iter().collect();
        self
    }

    /// Returns true if the requirement only applies when an extra is selected
    pub fn is_optional(&self) -> bool {
        self.extra.is_some()
    }

    /// Returns the compaction key everything but the constraint contributes to
    pub fn key(&self) -> DependencyKey {
        DependencyKey {
            kind: self.kind,
            name: self.name.clone(),
            features: self.features.clone(),
            extra: self.extra.clone(),
            condition: self.condition.clone(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.features.is_empty() {
            let features: Vec<&str> = self.features.iter().map(String::as_str).collect();
            write!(f, "[{}]", features.join(","))?;
        }
        write!(f, "{}", self.constraint)?;
        if let Some(extra) = &self.extra {
            write!(f, " (extra {})", extra)?;
        }
        Ok(())
    }
}

/// Identity of a requirement track
///
/// Two requirements from different releases belong to the same track iff
/// their keys are equal; only the constraint may then differ.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyKey {
    pub kind: DependencyKind,
    pub name: String,
    pub features: BTreeSet<String>,
    pub extra: Option<String>,
    pub condition: Condition,
}

impl DependencyKey {
    pub fn is_python(&self) -> bool {
        self.name == "python"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spack_types() {
        assert_eq!(DependencyKind::Build.spack_types(), "\"build\"");
        assert_eq!(DependencyKind::NativeBuild.spack_types(), "\"build\"");
        assert_eq!(DependencyKind::BuildRun.spack_types(), "(\"build\", \"run\")");
        assert_eq!(DependencyKind::NativeLink.spack_types(), "(\"build\", \"link\")");
    }

    #[test]
    fn test_is_optional() {
        let req = Requirement::new("pysocks", DependencyKind::BuildRun);
        assert!(!req.is_optional());
        assert!(req.with_extra("socks").is_optional());
    }

    #[test]
    fn test_key_ignores_constraint() {
        let a = Requirement::new("q", DependencyKind::BuildRun)
            .with_constraint(Constraint::parse(">=1").unwrap());
        let b = Requirement::new("q", DependencyKind::BuildRun)
            .with_constraint(Constraint::parse(">=2").unwrap());
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_key_separates_extras() {
        let a = Requirement::new("q", DependencyKind::BuildRun);
        let b = Requirement::new("q", DependencyKind::BuildRun).with_extra("test");
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_display() {
        let req = Requirement::new("requests", DependencyKind::BuildRun)
            .with_features(["socks".to_string()])
            .with_constraint(Constraint::parse(">=2").unwrap());
        assert_eq!(req.to_string(), "requests[socks]>=2");
    }
}
