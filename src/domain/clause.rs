//! Conditioned clauses produced by compaction

use super::constraint::Constraint;
use super::requirement::DependencyKey;
use pep440_rs::Version;

/// What one key requires in one release
///
/// Normally a single constraint. Several are kept only when a release
/// declared constraints for the same key that cannot all hold.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Content {
    constraints: Vec<Constraint>,
}

impl Content {
    pub fn single(constraint: Constraint) -> Self {
        Self {
            constraints: vec![constraint],
        }
    }

    pub fn conflicting(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        let mut constraints: Vec<Constraint> = constraints.into_iter().collect();
        constraints.sort();
        constraints.dedup();
        Self { constraints }
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_conflicting(&self) -> bool {
        self.constraints.len() > 1
    }
}

/// Inclusive range of the dependent's own releases
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseRange {
    pub low: Version,
    /// None means "this release and all later ones"
    pub high: Option<Version>,
}

impl ReleaseRange {
    pub fn contains(&self, version: &Version) -> bool {
        version >= &self.low && self.high.as_ref().map_or(true, |high| version <= high)
    }

    pub fn is_open(&self) -> bool {
        self.high.is_none()
    }
}

/// A requirement that holds for a contiguous range of releases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionedClause {
    pub key: DependencyKey,
    pub range: ReleaseRange,
    pub content: Content,
}
