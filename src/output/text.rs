//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Converted, failed and skipped packages with colors
//! - Per-package warnings in verbose mode
//! - Rendered recipes on dry runs
//! - Summary with counts

use crate::domain::{PackageOutcome, RunSummary};
use crate::output::{OutputFormatter, Verbosity};
use colored::Colorize;
use std::io::Write;

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether this is a dry-run
    dry_run: bool,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity, dry_run: bool) -> Self {
        Self {
            verbosity,
            dry_run,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, dry_run: bool, color: bool) -> Self {
        Self {
            verbosity,
            dry_run,
            color,
        }
    }

    /// Get the dry-run prefix if applicable
    fn dry_run_prefix(&self) -> String {
        if self.dry_run {
            if self.color {
                format!("{} ", "(dry-run)".cyan())
            } else {
                "(dry-run) ".to_string()
            }
        } else {
            String::new()
        }
    }

    fn heading(&self, title: &str, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.color {
            writeln!(writer, "{}:", title.bold())
        } else {
            writeln!(writer, "{}:", title)
        }
    }

    fn format_warnings(&self, warnings: &[String], writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Verbose {
            return Ok(());
        }
        for warning in warnings {
            if self.color {
                writeln!(writer, "      {} {}", "!".yellow(), warning.dimmed())?;
            } else {
                writeln!(writer, "      ! {}", warning)?;
            }
        }
        Ok(())
    }

    fn format_section(
        &self,
        title: &str,
        outcomes: &[&PackageOutcome],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if outcomes.is_empty() {
            return Ok(());
        }
        self.heading(title, writer)?;
        for outcome in outcomes {
            self.format_outcome(outcome, writer)?;
        }
        writeln!(writer)
    }

    /// Print every recipe rendered during a dry run
    fn format_recipes(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        for (spack_name, text) in &summary.recipes {
            let header = format!("==> packages/{}/package.py", spack_name);
            if self.color {
                writeln!(writer, "{}", header.cyan().bold())?;
            } else {
                writeln!(writer, "{}", header)?;
            }
            write!(writer, "{}", text)?;
            writeln!(writer)?;
        }
        Ok(())
    }

    fn format_summary(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let prefix = self.dry_run_prefix();
        let converted = summary.converted_count();
        let failed = summary.failed_count();
        let skipped = summary.skipped_count();
        let warnings = summary.warning_count();

        if self.verbosity == Verbosity::Quiet {
            if !summary.root_converted() {
                if self.color {
                    writeln!(writer, "{}{} {}", prefix, "Failed to convert".red(), summary.root)?;
                } else {
                    writeln!(writer, "{}Failed to convert {}", prefix, summary.root)?;
                }
            } else if self.color {
                writeln!(writer, "{}{} converted", prefix, converted.to_string().green())?;
            } else {
                writeln!(writer, "{}{} converted", prefix, converted)?;
            }
            return Ok(());
        }

        if self.color {
            writeln!(writer, "{}{}:", prefix, "Summary".bold())?;
            writeln!(
                writer,
                "  {} package(s) converted",
                converted.to_string().green()
            )?;
            if failed > 0 {
                writeln!(writer, "  {} package(s) failed", failed.to_string().red())?;
            }
            if skipped > 0 {
                writeln!(
                    writer,
                    "  {} package(s) skipped",
                    skipped.to_string().dimmed()
                )?;
            }
            if warnings > 0 {
                writeln!(writer, "  {} warning(s)", warnings.to_string().yellow())?;
            }
        } else {
            writeln!(writer, "{}Summary:", prefix)?;
            writeln!(writer, "  {} package(s) converted", converted)?;
            if failed > 0 {
                writeln!(writer, "  {} package(s) failed", failed)?;
            }
            if skipped > 0 {
                writeln!(writer, "  {} package(s) skipped", skipped)?;
            }
            if warnings > 0 {
                writeln!(writer, "  {} warning(s)", warnings)?;
            }
        }
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, summary: &RunSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        // In quiet mode, only show summary
        if self.verbosity == Verbosity::Quiet {
            return self.format_summary(summary, writer);
        }

        if self.dry_run {
            self.format_recipes(summary, writer)?;
        }

        let converted: Vec<_> = summary.converted().collect();
        let failed: Vec<_> = summary.failed().collect();
        let skipped: Vec<_> = summary.skipped().collect();

        self.format_section("Converted", &converted, writer)?;
        self.format_section("Failed", &failed, writer)?;
        self.format_section("Skipped", &skipped, writer)?;

        self.format_summary(summary, writer)
    }

    fn format_outcome(
        &self,
        outcome: &PackageOutcome,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        match outcome {
            PackageOutcome::Converted {
                name,
                spack_name,
                versions,
                clauses,
                depth,
                warnings,
            } => {
                let detail = if self.verbosity == Verbosity::Verbose {
                    format!(
                        "({} versions, {} clauses, depth {})",
                        versions, clauses, depth
                    )
                } else {
                    format!("({} versions)", versions)
                };
                if self.color {
                    writeln!(
                        writer,
                        "  {} {} {} {} {}",
                        "✓".green(),
                        name,
                        "→".dimmed(),
                        spack_name.bright_white().bold(),
                        detail.dimmed()
                    )?;
                } else {
                    writeln!(writer, "  + {} -> {} {}", name, spack_name, detail)?;
                }
                self.format_warnings(warnings, writer)
            }
            PackageOutcome::Failed {
                name,
                stage,
                reason,
                warnings,
            } => {
                if self.color {
                    writeln!(
                        writer,
                        "  {} {} {}",
                        "✗".red(),
                        name.bold(),
                        format!("(while {}: {})", stage, reason).red()
                    )?;
                } else {
                    writeln!(writer, "  - {} (while {}: {})", name, stage, reason)?;
                }
                self.format_warnings(warnings, writer)
            }
            PackageOutcome::Skipped {
                name,
                reason,
                requested_by,
            } => {
                let detail = if self.verbosity == Verbosity::Verbose {
                    format!("({}, required by {})", reason, requested_by)
                } else {
                    format!("({})", reason)
                };
                if self.color {
                    writeln!(writer, "  {} {}", name.dimmed(), detail.dimmed())
                } else {
                    writeln!(writer, "  {} {}", name, detail)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SkipReason, TaskState};

    fn sample_summary(dry_run: bool) -> RunSummary {
        let mut summary = RunSummary::new("black", dry_run);
        summary.record(PackageOutcome::Converted {
            name: "black".to_string(),
            spack_name: "py-black".to_string(),
            versions: 3,
            clauses: 7,
            depth: 0,
            warnings: vec!["black 24.1: dropping requirement 'x @ https://y'".to_string()],
        });
        summary.record(PackageOutcome::Failed {
            name: "bogus".to_string(),
            stage: TaskState::Fetching,
            reason: "package 'bogus' not found in PyPI".to_string(),
            warnings: vec![],
        });
        summary.record(PackageOutcome::Skipped {
            name: "click".to_string(),
            reason: SkipReason::BudgetExhausted,
            requested_by: "black".to_string(),
        });
        summary
    }

    fn render(formatter: &TextFormatter, summary: &RunSummary) -> String {
        let mut output = Vec::new();
        formatter.format(summary, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_format_normal() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, false, false);
        let output = render(&formatter, &sample_summary(false));

        assert!(output.contains("Converted:\n  + black -> py-black (3 versions)\n"));
        assert!(output.contains("  - bogus (while fetching: package 'bogus' not found in PyPI)"));
        assert!(output.contains(
            "  click (not converted, dependency recipe assumed pre-existing)\n"
        ));
        assert!(output.contains("  1 package(s) converted"));
        assert!(output.contains("  1 package(s) failed"));
        assert!(output.contains("  1 warning(s)"));
        assert!(!output.contains("dropping requirement"));
        assert!(!output.contains("(dry-run)"));
    }

    #[test]
    fn test_format_verbose_shows_warnings() {
        let formatter = TextFormatter::with_color(Verbosity::Verbose, false, false);
        let output = render(&formatter, &sample_summary(false));

        assert!(output.contains("(3 versions, 7 clauses, depth 0)"));
        assert!(output.contains("      ! black 24.1: dropping requirement"));
        assert!(output.contains("required by black"));
    }

    #[test]
    fn test_format_quiet() {
        let formatter = TextFormatter::with_color(Verbosity::Quiet, false, false);
        let output = render(&formatter, &sample_summary(false));
        assert_eq!(output, "1 converted\n");

        let failed = RunSummary::new("nope", false);
        assert_eq!(render(&formatter, &failed), "Failed to convert nope\n");
    }

    #[test]
    fn test_dry_run_prints_recipes() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, true, false);
        let mut summary = sample_summary(true);
        summary.attach_recipes([(
            "py-black".to_string(),
            "class PyBlack(PythonPackage):\n".to_string(),
        )]);
        let output = render(&formatter, &summary);

        assert!(output.starts_with(
            "==> packages/py-black/package.py\nclass PyBlack(PythonPackage):\n"
        ));
        assert!(output.contains("(dry-run) Summary:"));
    }

    #[test]
    fn test_format_with_color() {
        let formatter = TextFormatter::new(Verbosity::Normal, false);
        let output = render(&formatter, &sample_summary(false));
        assert!(output.contains("black"));
        assert!(output.contains("py-black"));
    }
}
