//! CLI argument parsing module for pyspack

use crate::domain::parse_version;
use crate::error::ConfigError;
use clap::{ArgAction, Parser};
use pep440_rs::Version;
use std::path::PathBuf;

/// Parse a count that must be at least one
fn parse_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid number: {}", s))?;
    if value == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(value)
}

/// Parse a python version floor such as `3.9`
fn parse_python_floor(s: &str) -> Result<Version, String> {
    let version = parse_version(s).ok_or_else(|| format!("invalid python version: {}", s))?;
    if version.release().first() != Some(&3) {
        return Err(format!("only python 3 is supported: {}", s));
    }
    Ok(version)
}

/// Convert PyPI packages into Spack package recipes
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pyspack",
    version,
    about = "Convert a PyPI package and its dependencies into Spack recipes"
)]
pub struct CliArgs {
    /// PyPI package to convert
    pub package: String,

    // Conversion options
    /// Number of newest non-yanked releases converted per package
    #[arg(long, default_value = "10", value_parser = parse_positive)]
    pub versions_per_package: usize,

    /// Maximum number of dependencies converted besides the requested package
    #[arg(long, default_value_t = 10)]
    pub max_conversions: usize,

    /// Spack package repository to write to (default: $SPACK_ROOT/var/spack/repos/builtin)
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Never convert this dependency (can be specified multiple times)
    #[arg(long, action = ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Drop releases that do not support this python version or newer (e.g., 3.9)
    #[arg(long, value_parser = parse_python_floor)]
    pub min_python: Option<Version>,

    /// Maximum number of concurrent requests and conversions
    #[arg(long, default_value = "10", value_parser = parse_positive)]
    pub concurrency: usize,

    /// Additional TOML table mapping CMake package names to Spack packages
    #[arg(long)]
    pub native_map: Option<PathBuf>,

    /// Do not download sdists (build backend and build requirements stay unknown)
    #[arg(long)]
    pub no_sdist: bool,

    // General options
    /// Dry run mode - print recipes instead of writing them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Check option combinations clap cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quiet && self.verbose {
            return Err(ConfigError::ConflictingOptions {
                message: "--quiet and --verbose cannot be used together".to_string(),
            });
        }
        if self.package.trim().is_empty() {
            return Err(ConfigError::ConflictingOptions {
                message: "package name must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Whether the progress spinner should be drawn
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}
