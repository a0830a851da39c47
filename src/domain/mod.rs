//! Core domain models for pyspack
//!
//! This module contains the fundamental types used throughout the application:
//! - PEP 440 versions, constraints and environment conditions
//! - Normalized requirements and releases
//! - Conditioned clauses produced by compaction
//! - Conversion warnings, outcomes and the run summary

mod clause;
mod condition;
mod constraint;
mod diagnostic;
mod naming;
mod outcome;
mod release;
mod requirement;
mod summary;
mod version;

pub use clause::{ConditionedClause, Content, ReleaseRange};
pub use condition::{all_known_python, any_known_python, Condition, Platform};
pub use constraint::Constraint;
pub use diagnostic::ConversionWarning;
pub use naming::{class_name, normalize_name, spack_name};
pub use outcome::{PackageOutcome, SkipReason, TaskState};
pub use release::{BuildBackend, Distribution, Release};
pub use requirement::{DependencyKey, DependencyKind, Requirement};
pub use summary::RunSummary;
pub use version::{
    compare_to_prefix, join_parts, known_python_versions, parse_version, release_parts,
    spack_version, trimmed_parts,
};
