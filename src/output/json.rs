//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of the run summary
//! - Per-package outcomes tagged by type

use crate::domain::{PackageOutcome, RunSummary};
use crate::output::{OutputFormatter, Verbosity};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// JSON representation of the full result
#[derive(Serialize)]
struct JsonOutput<'a> {
    root: &'a str,
    /// Whether the requested package was converted
    success: bool,
    /// Whether this was a dry-run
    dry_run: bool,
    /// Summary statistics
    summary: JsonCounts,
    /// Per-package outcomes in decision order
    packages: Vec<PackageOutcome>,
    /// Rendered recipes (dry runs only)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    recipes: BTreeMap<String, String>,
}

/// JSON representation of summary statistics
#[derive(Serialize)]
struct JsonCounts {
    converted: usize,
    failed: usize,
    skipped: usize,
    warnings: usize,
}

impl JsonFormatter {
    /// Drops per-package warnings unless verbose
    fn outcome_to_json(&self, outcome: &PackageOutcome) -> PackageOutcome {
        let mut outcome = outcome.clone();
        if self.verbosity != Verbosity::Verbose {
            match &mut outcome {
                PackageOutcome::Converted { warnings, .. }
                | PackageOutcome::Failed { warnings, .. } => warnings.clear(),
                PackageOutcome::Skipped { .. } => {}
            }
        }
        outcome
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonOutput {
            root: &summary.root,
            success: summary.root_converted(),
            dry_run: summary.dry_run,
            summary: JsonCounts {
                converted: summary.converted_count(),
                failed: summary.failed_count(),
                skipped: summary.skipped_count(),
                warnings: summary.warning_count(),
            },
            packages: summary
                .outcomes
                .iter()
                .map(|o| self.outcome_to_json(o))
                .collect(),
            recipes: summary.recipes.clone(),
        };

        let json = serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?;

        writeln!(writer, "{}", json)?;

        Ok(())
    }

    fn format_outcome(
        &self,
        outcome: &PackageOutcome,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.outcome_to_json(outcome))
            .map_err(std::io::Error::other)?;

        writeln!(writer, "{}", json)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SkipReason, TaskState};

    fn create_test_summary() -> RunSummary {
        let mut summary = RunSummary::new("requests", true);
        summary.record(PackageOutcome::Converted {
            name: "requests".to_string(),
            spack_name: "py-requests".to_string(),
            versions: 2,
            clauses: 5,
            depth: 0,
            warnings: vec!["requests: extra 'x' requested by y is not declared".to_string()],
        });
        summary.record(PackageOutcome::Skipped {
            name: "idna".to_string(),
            reason: SkipReason::AlreadyInRepository,
            requested_by: "requests".to_string(),
        });
        summary.record(PackageOutcome::Failed {
            name: "urllib3".to_string(),
            stage: TaskState::Fetching,
            reason: "timeout".to_string(),
            warnings: vec![],
        });
        summary.attach_recipes([("py-requests".to_string(), "class PyRequests".to_string())]);
        summary
    }

    fn render(verbosity: Verbosity) -> serde_json::Value {
        let formatter = JsonFormatter::new(verbosity);
        let mut output = Vec::new();
        formatter.format(&create_test_summary(), &mut output).unwrap();
        serde_json::from_str(&String::from_utf8(output).unwrap()).unwrap()
    }

    #[test]
    fn test_format_json() {
        let parsed = render(Verbosity::Normal);

        assert_eq!(parsed["root"], "requests");
        assert_eq!(parsed["success"], true);
        assert_eq!(parsed["dry_run"], true);
        assert_eq!(parsed["summary"]["converted"], 1);
        assert_eq!(parsed["summary"]["failed"], 1);
        assert_eq!(parsed["summary"]["skipped"], 1);
        assert_eq!(parsed["summary"]["warnings"], 1);
        assert_eq!(parsed["packages"][0]["type"], "converted");
        assert_eq!(parsed["packages"][0]["spack_name"], "py-requests");
        assert_eq!(parsed["packages"][1]["reason"], "already_in_repository");
        assert_eq!(parsed["packages"][2]["stage"], "fetching");
        assert_eq!(parsed["recipes"]["py-requests"], "class PyRequests");
        assert_eq!(parsed["packages"][0]["warnings"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_format_json_verbose_keeps_warnings() {
        let parsed = render(Verbosity::Verbose);
        assert_eq!(parsed["packages"][0]["warnings"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_format_outcome() {
        let formatter = JsonFormatter::new(Verbosity::Normal);
        let summary = create_test_summary();
        let mut output = Vec::new();
        formatter.format_outcome(&summary.outcomes[1], &mut output).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed["type"], "skipped");
        assert_eq!(parsed["requested_by"], "requests");
    }
}
