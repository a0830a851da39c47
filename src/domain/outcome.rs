//! Per-package conversion outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one conversion task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Fetching,
    Normalizing,
    Compacting,
    Synthesizing,
    Done,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }

    /// The stage a successful task moves to next
    pub fn next(&self) -> TaskState {
        match self {
            TaskState::Queued => TaskState::Fetching,
            TaskState::Fetching => TaskState::Normalizing,
            TaskState::Normalizing => TaskState::Compacting,
            TaskState::Compacting => TaskState::Synthesizing,
            TaskState::Synthesizing => TaskState::Done,
            TaskState::Done => TaskState::Done,
            TaskState::Failed => TaskState::Failed,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Queued => "queued",
            TaskState::Fetching => "fetching",
            TaskState::Normalizing => "normalizing",
            TaskState::Compacting => "compacting",
            TaskState::Synthesizing => "synthesizing",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Why a discovered dependency was not converted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Conversion budget used up; the recipe is assumed to exist already
    BudgetExhausted,
    /// The repository already has a recipe with this name
    AlreadyInRepository,
    /// Excluded via --ignore
    Ignored,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BudgetExhausted => {
                write!(f, "not converted, dependency recipe assumed pre-existing")
            }
            SkipReason::AlreadyInRepository => write!(f, "already in repository"),
            SkipReason::Ignored => write!(f, "ignored by --ignore"),
        }
    }
}

/// Result of handling a single package during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PackageOutcome {
    /// A recipe was produced and written
    Converted {
        name: String,
        spack_name: String,
        versions: usize,
        clauses: usize,
        depth: usize,
        warnings: Vec<String>,
    },
    /// The package could not be converted
    Failed {
        name: String,
        stage: TaskState,
        reason: String,
        warnings: Vec<String>,
    },
    /// The package was discovered but deliberately not converted
    Skipped {
        name: String,
        reason: SkipReason,
        requested_by: String,
    },
}

impl PackageOutcome {
    pub fn name(&self) -> &str {
        match self {
            PackageOutcome::Converted { name, .. }
            | PackageOutcome::Failed { name, .. }
            | PackageOutcome::Skipped { name, .. } => name,
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, PackageOutcome::Converted { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PackageOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PackageOutcome::Skipped { .. })
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            PackageOutcome::Converted { warnings, .. } | PackageOutcome::Failed { warnings, .. } => {
                warnings
            }
            PackageOutcome::Skipped { .. } => &[],
        }
    }
}

impl fmt::Display for PackageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageOutcome::Converted {
                name,
                spack_name,
                versions,
                ..
            } => write!(f, "{} -> {} ({} versions)", name, spack_name, versions),
            PackageOutcome::Failed {
                name,
                stage,
                reason,
                ..
            } => write!(f, "{} failed while {}: {}", name, stage, reason),
            PackageOutcome::Skipped { name, reason, .. } => write!(f, "{} ({})", name, reason),
        }
    }
}
