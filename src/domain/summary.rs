//! Run summary types
//!
//! Tracks the outcome of every package touched by one crawl.

use super::PackageOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall result of one conversion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// The package the run was started for
    pub root: String,
    /// Outcomes in the order they were decided
    pub outcomes: Vec<PackageOutcome>,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Rendered recipes keyed by Spack name (dry runs only)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub recipes: BTreeMap<String, String>,
}

impl RunSummary {
    /// Creates a new RunSummary
    pub fn new(root: impl Into<String>, dry_run: bool) -> Self {
        Self {
            root: root.into(),
            outcomes: Vec::new(),
            dry_run,
            recipes: BTreeMap::new(),
        }
    }

    /// Adds an outcome
    pub fn record(&mut self, outcome: PackageOutcome) {
        self.outcomes.push(outcome);
    }

    /// Attaches recipes rendered during a dry run
    pub fn attach_recipes(&mut self, recipes: impl IntoIterator<Item = (String, String)>) {
        self.recipes.extend(recipes);
    }

    /// Returns the outcome for the root package, if one was recorded
    pub fn root_outcome(&self) -> Option<&PackageOutcome> {
        self.outcomes.iter().find(|o| o.name() == self.root)
    }

    /// Returns true if the root package converted; this decides the exit status
    pub fn root_converted(&self) -> bool {
        self.root_outcome().is_some_and(|o| o.is_converted())
    }

    pub fn converted(&self) -> impl Iterator<Item = &PackageOutcome> {
        self.outcomes.iter().filter(|o| o.is_converted())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PackageOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &PackageOutcome> {
        self.outcomes.iter().filter(|o| o.is_skipped())
    }

    pub fn converted_count(&self) -> usize {
        self.converted().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped().count()
    }

    /// Returns the total number of warnings across all packages
    pub fn warning_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.warnings().len()).sum()
    }
}
