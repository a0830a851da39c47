//! Conversion crawler coordinating the whole run
//!
//! This module provides:
//! - Workflow per package: fetch -> normalize -> compact -> synthesize
//! - Breadth-first discovery of dependencies with a conversion budget
//! - Concurrent package pipelines and registry requests under one semaphore
//! - Per-package failures that never abort the run
//!
//! Claiming names, counting the budget and growing the frontier only happen
//! in the driver loop; pipelines run on their own and report back.

use crate::cli::CliArgs;
use crate::compact::compact;
use crate::domain::{
    normalize_name, spack_name, ConversionWarning, PackageOutcome, RunSummary, SkipReason,
    TaskState,
};
use crate::error::{AppError, ConversionFailure};
use crate::native::{NativeIntrospector, NativeNameTable};
use crate::normalize::{select_releases, Normalizer};
use crate::progress::CrawlProgress;
use crate::recipe::{synthesize, Recipe};
use crate::registry::{MetadataIndex, RawRelease, SourceRetriever};
use crate::repository::RecipeRepository;
use pep440_rs::Version;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default number of releases converted per package
pub const DEFAULT_VERSIONS_PER_PACKAGE: usize = 10;

/// Default number of dependencies converted besides the root
pub const DEFAULT_MAX_CONVERSIONS: usize = 10;

/// Default concurrency limit for registry requests and pipelines
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Newest non-yanked releases fetched per package
    pub versions_per_package: usize,
    /// Dependency conversions allowed besides the root
    pub max_conversions: usize,
    /// Maximum concurrent requests, and concurrent package pipelines
    pub concurrency: usize,
    /// Releases requiring an older python than this are dropped
    pub python_floor: Option<Version>,
    /// Whether sdists are downloaded for build files
    pub fetch_sources: bool,
    /// Normalized names never converted
    pub ignore: BTreeSet<String>,
    pub dry_run: bool,
    pub show_progress: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            versions_per_package: DEFAULT_VERSIONS_PER_PACKAGE,
            max_conversions: DEFAULT_MAX_CONVERSIONS,
            concurrency: DEFAULT_CONCURRENCY,
            python_floor: None,
            fetch_sources: true,
            ignore: BTreeSet::new(),
            dry_run: false,
            show_progress: false,
        }
    }
}

impl CrawlerConfig {
    /// Build the configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Self {
        Self {
            versions_per_package: args.versions_per_package,
            max_conversions: args.max_conversions,
            concurrency: args.concurrency.max(1),
            python_floor: args.min_python.clone(),
            fetch_sources: !args.no_sdist,
            ignore: args.ignore.iter().map(|n| normalize_name(n)).collect(),
            dry_run: args.dry_run,
            show_progress: args.show_progress(),
        }
    }
}

/// One package waiting to be converted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionTask {
    /// Normalized PyPI name
    pub name: String,
    /// Extras dependents asked for
    pub extras: BTreeSet<String>,
    /// Distance from the root
    pub depth: usize,
    /// The first dependent that asked for this package
    pub requested_by: Option<String>,
}

impl ConversionTask {
    pub fn root(name: &str) -> Self {
        Self {
            name: normalize_name(name),
            extras: BTreeSet::new(),
            depth: 0,
            requested_by: None,
        }
    }
}

/// A package whose recipe was produced
#[derive(Debug)]
pub struct ConvertedPackage {
    pub task: ConversionTask,
    pub recipe: Recipe,
    /// Rendered `package.py`
    pub text: String,
    pub clause_count: usize,
    pub warnings: Vec<ConversionWarning>,
}

/// A package whose conversion failed
#[derive(Debug)]
pub struct PackageFailure {
    pub task: ConversionTask,
    /// Stage the task was in when it failed
    pub stage: TaskState,
    pub failure: ConversionFailure,
    pub warnings: Vec<ConversionWarning>,
}

/// Everything a package pipeline needs, cheap to clone into a task
#[derive(Clone)]
struct Pipeline {
    index: Arc<dyn MetadataIndex>,
    sources: Option<Arc<dyn SourceRetriever>>,
    natives: Arc<NativeNameTable>,
    semaphore: Arc<Semaphore>,
    config: Arc<CrawlerConfig>,
}

/// Tracks one task through its states
struct StateTracker<'a> {
    package: &'a str,
    state: TaskState,
}

impl<'a> StateTracker<'a> {
    fn new(package: &'a str) -> Self {
        tracing::debug!(package, state = %TaskState::Queued, "task state");
        Self {
            package,
            state: TaskState::Queued,
        }
    }

    fn advance(&mut self) {
        self.state = self.state.next();
        tracing::debug!(package = self.package, state = %self.state, "task state");
    }
}

impl Pipeline {
    /// Converts one package from listing to rendered recipe
    async fn convert(self, task: ConversionTask) -> Result<ConvertedPackage, PackageFailure> {
        let mut warnings = Vec::new();
        let name = task.name.clone();
        let mut tracker = StateTracker::new(&name);

        macro_rules! fail {
            ($failure:expr) => {{
                let failure = $failure;
                tracing::debug!(
                    package = %name,
                    state = %TaskState::Failed,
                    error = %failure,
                    "task state"
                );
                return Err(PackageFailure {
                    stage: tracker.state,
                    failure,
                    warnings,
                    task,
                });
            }};
        }

        tracker.advance();
        let listing = {
            let _permit = self.semaphore.acquire().await.ok();
            match self.index.fetch_project(&name).await {
                Ok(listing) => listing,
                Err(e) => fail!(ConversionFailure::Fetch(e)),
            }
        };

        let selection =
            select_releases(&listing, self.config.versions_per_package, &mut warnings);
        if selection.selected.is_empty() {
            fail!(ConversionFailure::NoReleases {
                package: name.clone()
            });
        }

        let mut raw = match self.fetch_releases(&name, &selection.selected).await {
            Ok(raw) => raw,
            Err(failure) => fail!(failure),
        };
        if raw.is_empty() {
            fail!(ConversionFailure::NoReleases {
                package: name.clone()
            });
        }
        if self.config.fetch_sources {
            self.attach_build_files(&name, &mut raw, &mut warnings).await;
        }

        tracker.advance();
        let (mut package, normalize_warnings) =
            Normalizer::new(&name).normalize(selection.known, raw);
        warnings.extend(normalize_warnings);
        if package.releases.is_empty() {
            fail!(ConversionFailure::NoReleases {
                package: name.clone()
            });
        }
        if let Some(floor) = &self.config.python_floor {
            package.retain_compatible(floor, &mut warnings);
            if package.releases.is_empty() {
                fail!(ConversionFailure::NoCompatibleRelease {
                    package: name.clone(),
                    floor: floor.to_string(),
                });
            }
        }

        let introspector = NativeIntrospector::new(&self.natives);
        for release in &mut package.releases {
            introspector.augment(&name, release, &mut warnings);
        }

        let declared = package.extras();
        for extra in task.extras.iter().filter(|e| !declared.contains(*e)) {
            warnings.push(ConversionWarning::UndeclaredExtra {
                package: name.clone(),
                extra: extra.clone(),
                requested_by: task
                    .requested_by
                    .clone()
                    .unwrap_or_else(|| "command line".to_string()),
            });
        }

        tracker.advance();
        let clauses = compact(&name, &package.releases, &mut warnings);

        tracker.advance();
        let recipe = synthesize(&package, &clauses, &mut warnings);
        let text = recipe.render();

        tracker.advance();
        Ok(ConvertedPackage {
            task,
            recipe,
            text,
            clause_count: clauses.len(),
            warnings,
        })
    }

    /// Fetches release metadata concurrently, returned in `versions` order
    ///
    /// Releases the index no longer has are dropped; any other error fails
    /// the package.
    async fn fetch_releases(
        &self,
        package: &str,
        versions: &[String],
    ) -> Result<Vec<RawRelease>, ConversionFailure> {
        let mut fetches = JoinSet::new();
        for (position, version) in versions.iter().enumerate() {
            let index = Arc::clone(&self.index);
            let semaphore = Arc::clone(&self.semaphore);
            let package = package.to_string();
            let version = version.clone();
            fetches.spawn(async move {
                let _permit = semaphore.acquire().await.ok();
                (position, index.fetch_release(&package, &version).await)
            });
        }

        let mut fetched: Vec<(usize, RawRelease)> = Vec::new();
        while let Some(joined) = fetches.join_next().await {
            let (position, result) = joined.map_err(|e| ConversionFailure::Aborted {
                package: package.to_string(),
                message: e.to_string(),
            })?;
            match result {
                Ok(release) => fetched.push((position, release)),
                Err(e) if e.is_not_found() => {
                    tracing::warn!("{}", e);
                }
                Err(e) => return Err(ConversionFailure::Fetch(e)),
            }
        }

        fetched.sort_by_key(|(position, _)| *position);
        Ok(fetched.into_iter().map(|(_, release)| release).collect())
    }

    /// Downloads sdists concurrently and attaches their build files
    ///
    /// Failures only produce warnings; the release keeps no build files.
    async fn attach_build_files(
        &self,
        package: &str,
        releases: &mut [RawRelease],
        warnings: &mut Vec<ConversionWarning>,
    ) {
        let Some(sources) = &self.sources else {
            return;
        };

        let mut fetches = JoinSet::new();
        for (position, release) in releases.iter().enumerate() {
            let Some(dist) = release.sdist.clone() else {
                warnings.push(ConversionWarning::BuildFilesUnavailable {
                    package: package.to_string(),
                    version: release.version.clone(),
                    message: "no source distribution published".to_string(),
                });
                continue;
            };
            let sources = Arc::clone(sources);
            let semaphore = Arc::clone(&self.semaphore);
            let package = package.to_string();
            fetches.spawn(async move {
                let _permit = semaphore.acquire().await.ok();
                (position, sources.fetch_build_files(&package, &dist).await)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => tracing::warn!(package, error = %e, "sdist task aborted"),
            }
        }
        results.sort_by_key(|(position, _)| *position);

        for (position, result) in results {
            let release = &mut releases[position];
            match result {
                Ok(files) => release.build_files = Some(files),
                Err(e) => warnings.push(ConversionWarning::BuildFilesUnavailable {
                    package: package.to_string(),
                    version: release.version.clone(),
                    message: e.to_string(),
                }),
            }
        }
    }
}

/// Bookkeeping of the driver loop
struct Frontier {
    queue: VecDeque<ConversionTask>,
    /// Names claimed for conversion
    visited: HashSet<String>,
    /// Names already queued or running
    enqueued: HashSet<String>,
    /// Names already reported as skipped
    reported: HashSet<String>,
    /// Dependency tasks scheduled so far
    scheduled: usize,
}

impl Frontier {
    fn new(root: ConversionTask) -> Self {
        let mut enqueued = HashSet::new();
        enqueued.insert(root.name.clone());
        Self {
            queue: VecDeque::from([root]),
            visited: HashSet::new(),
            enqueued,
            reported: HashSet::new(),
            scheduled: 0,
        }
    }

    /// Next task not yet claimed, claiming it
    fn claim(&mut self) -> Option<ConversionTask> {
        while let Some(task) = self.queue.pop_front() {
            if self.visited.insert(task.name.clone()) {
                return Some(task);
            }
        }
        None
    }
}

/// Crawler converting a package and, within budget, its dependencies
pub struct Crawler {
    pipeline: Pipeline,
    repository: Arc<dyn RecipeRepository>,
    config: Arc<CrawlerConfig>,
}

impl Crawler {
    /// Create a crawler that does not inspect sdists
    pub fn new(
        index: Arc<dyn MetadataIndex>,
        repository: Arc<dyn RecipeRepository>,
        natives: Arc<NativeNameTable>,
        config: CrawlerConfig,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            pipeline: Pipeline {
                index,
                sources: None,
                natives,
                semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
                config: Arc::clone(&config),
            },
            repository,
            config,
        }
    }

    /// Use a source retriever for build files (builder pattern)
    pub fn with_sources(mut self, sources: Arc<dyn SourceRetriever>) -> Self {
        self.pipeline.sources = Some(sources);
        self
    }

    /// Run the crawl starting at `root`
    ///
    /// Only a repository write error or an aborted task fails the run; per
    /// package failures are recorded in the summary.
    pub async fn run(&self, root: &str) -> Result<RunSummary, AppError> {
        let root = ConversionTask::root(root);
        let mut summary = RunSummary::new(&root.name, self.config.dry_run);
        let mut progress = CrawlProgress::new(self.config.show_progress, &root.name);

        let mut frontier = Frontier::new(root);
        let mut running = JoinSet::new();

        loop {
            while running.len() < self.config.concurrency.max(1) {
                let Some(task) = frontier.claim() else { break };
                tracing::info!(package = %task.name, depth = task.depth, "converting");
                progress.converting(&task.name);
                let pipeline = self.pipeline.clone();
                running.spawn(pipeline.convert(task));
            }

            let Some(joined) = running.join_next().await else {
                break;
            };
            let result = joined.map_err(|e| AppError::TaskAborted {
                message: e.to_string(),
            })?;

            match result {
                Ok(converted) => {
                    self.repository
                        .write(&converted.recipe.spack_name, &converted.text)?;
                    self.discover(&converted, &mut frontier, &mut summary);
                    log_warnings(&converted.warnings);
                    summary.record(PackageOutcome::Converted {
                        name: converted.task.name.clone(),
                        spack_name: converted.recipe.spack_name.clone(),
                        versions: converted.recipe.versions.len(),
                        clauses: converted.clause_count,
                        depth: converted.task.depth,
                        warnings: converted.warnings.iter().map(|w| w.to_string()).collect(),
                    });
                }
                Err(failed) => {
                    tracing::warn!(
                        package = %failed.task.name,
                        stage = %failed.stage,
                        "conversion failed: {}",
                        failed.failure
                    );
                    log_warnings(&failed.warnings);
                    summary.record(PackageOutcome::Failed {
                        name: failed.task.name.clone(),
                        stage: failed.stage,
                        reason: failed.failure.to_string(),
                        warnings: failed.warnings.iter().map(|w| w.to_string()).collect(),
                    });
                }
            }

            progress.update(&summary, frontier.queue.len(), running.len());
        }

        progress.finish();
        Ok(summary)
    }

    /// Queues or skips the dependencies a converted recipe names
    fn discover(
        &self,
        converted: &ConvertedPackage,
        frontier: &mut Frontier,
        summary: &mut RunSummary,
    ) {
        let dependent = &converted.task.name;
        for (name, extras) in converted.recipe.requested_packages() {
            if frontier.enqueued.contains(&name) {
                // still waiting: later requests may add extras
                if let Some(queued) = frontier.queue.iter_mut().find(|t| t.name == name) {
                    queued.extras.extend(extras);
                }
                continue;
            }
            if frontier.visited.contains(&name) || frontier.reported.contains(&name) {
                continue;
            }

            let reason = if self.config.ignore.contains(&name) {
                Some(SkipReason::Ignored)
            } else if self.repository.exists(&spack_name(&name)) {
                Some(SkipReason::AlreadyInRepository)
            } else if frontier.scheduled >= self.config.max_conversions {
                Some(SkipReason::BudgetExhausted)
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    tracing::info!(package = %name, requested_by = %dependent, "skipped: {}", reason);
                    frontier.reported.insert(name.clone());
                    summary.record(PackageOutcome::Skipped {
                        name,
                        reason,
                        requested_by: dependent.clone(),
                    });
                }
                None => {
                    frontier.scheduled += 1;
                    frontier.enqueued.insert(name.clone());
                    frontier.queue.push_back(ConversionTask {
                        name,
                        extras,
                        depth: converted.task.depth + 1,
                        requested_by: Some(dependent.clone()),
                    });
                }
            }
        }
    }
}

fn log_warnings(warnings: &[ConversionWarning]) {
    for warning in warnings {
        tracing::warn!("{}", warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_config_default() {
        let config = CrawlerConfig::default();
        assert_eq!(config.versions_per_package, 10);
        assert_eq!(config.max_conversions, 10);
        assert_eq!(config.concurrency, 10);
        assert!(config.fetch_sources);
        assert!(config.python_floor.is_none());
    }

    #[test]
    fn test_config_from_cli() {
        let args = CliArgs::parse_from([
            "pyspack",
            "requests",
            "--ignore",
            "Charset_Normalizer",
            "--no-sdist",
            "--max-conversions",
            "3",
            "--min-python",
            "3.9",
            "--json",
        ]);
        let config = CrawlerConfig::from_cli(&args);
        assert_eq!(config.max_conversions, 3);
        assert!(!config.fetch_sources);
        assert!(config.ignore.contains("charset-normalizer"));
        assert_eq!(config.python_floor.map(|v| v.to_string()), Some("3.9".to_string()));
        assert!(!config.show_progress);
    }

    #[test]
    fn test_root_task_is_normalized() {
        let task = ConversionTask::root("Flask_SQLAlchemy");
        assert_eq!(task.name, "flask-sqlalchemy");
        assert_eq!(task.depth, 0);
        assert!(task.requested_by.is_none());
    }

    #[test]
    fn test_frontier_claims_once() {
        let mut frontier = Frontier::new(ConversionTask::root("a"));
        frontier.queue.push_back(ConversionTask::root("a"));
        assert!(frontier.claim().is_some());
        assert!(frontier.claim().is_none());
    }
}
