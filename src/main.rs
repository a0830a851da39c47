//! pyspack - Convert PyPI packages into Spack package recipes
//!
//! Converts one package and, within a budget, its dependencies into
//! `package.py` recipes of a Spack package repository.

use clap::Parser;
use pyspack::cli::CliArgs;
use pyspack::crawler::{Crawler, CrawlerConfig};
use pyspack::native::NativeNameTable;
use pyspack::output::{create_formatter, OutputConfig};
use pyspack::registry::{HttpClient, PyPIIndex, SdistRetriever};
use pyspack::repository::{DryRunRepository, RecipeRepository, SpackRepository};
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(&args);

    // Run the main logic and handle errors
    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the level picked by the flags
fn init_logging(args: &CliArgs) {
    let default_level = if args.verbose {
        "pyspack=info"
    } else if args.quiet {
        "pyspack=error"
    } else {
        "pyspack=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Opens the target repository; a dry run only reads from it and tolerates its absence
fn open_repository(
    args: &CliArgs,
) -> anyhow::Result<(Arc<dyn RecipeRepository>, Option<Arc<DryRunRepository>>)> {
    if args.dry_run {
        let backing = SpackRepository::locate(args.repo.clone())
            .map_err(anyhow::Error::from)
            .and_then(|path| Ok(SpackRepository::open(path)?));
        let dry = match backing {
            Ok(repo) => DryRunRepository::backed_by(Arc::new(repo)),
            Err(e) => {
                tracing::warn!("dry run without repository: {}", e);
                DryRunRepository::new()
            }
        };
        let dry = Arc::new(dry);
        let repository: Arc<dyn RecipeRepository> = dry.clone();
        return Ok((repository, Some(dry)));
    }

    let path = SpackRepository::locate(args.repo.clone())?;
    let repository: Arc<dyn RecipeRepository> = Arc::new(SpackRepository::open(path)?);
    Ok((repository, None))
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    args.validate()?;

    if args.verbose {
        eprintln!("pyspack v{}", env!("CARGO_PKG_VERSION"));
        if args.dry_run {
            eprintln!("Mode: dry-run");
        }
    }

    let natives = Arc::new(NativeNameTable::load(args.native_map.as_deref())?);
    let (repository, dry_run) = open_repository(&args)?;

    let client = HttpClient::new()?;
    let index = Arc::new(PyPIIndex::new(client.clone()));
    let mut crawler = Crawler::new(
        index,
        repository,
        natives,
        CrawlerConfig::from_cli(&args),
    );
    if !args.no_sdist {
        crawler = crawler.with_sources(Arc::new(SdistRetriever::new(client)));
    }

    let mut summary = crawler.run(&args.package).await?;
    if let Some(dry) = &dry_run {
        summary.attach_recipes(dry.recipes());
    }

    // Output results
    let formatter = create_formatter(OutputConfig::from_cli(&args));
    let mut stdout = io::stdout().lock();
    formatter.format(&summary, &mut stdout)?;
    stdout.flush()?;

    if summary.root_converted() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
