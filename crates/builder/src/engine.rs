//! Lifecycle engine
//!
//! Drives one recipe through the ten phases in order. Every phase gets an
//! immutable [`RecipeContext`]; the engine derives the next context from what
//! the phase returned. Evaluation (phases 1 to 5) only reads the package
//! cache. A full pass works in its own build folder, stages the package next
//! to its cache entry and publishes it with one rename after package-info.

use crate::build_systems::{configure_failed, for_tool, BuildSystem, BuildSystemContext};
use crate::cache::{CacheEntry, CommitOutcome, PackageCache, PackageMetadata, PACKAGE_DIR};
use crate::extract::extract_archive;
use crate::fetch::Fetcher;
use crate::generators;
use crate::packager::{self, Installer, PackageRoots};
use crate::patch::{apply_edit, apply_patches};
use crate::paths::safe_join;
use crate::runner::{CommandRunner, CommandSpec, SystemRunner};
use cpkg_config::Config;
use cpkg_errors::{BuildError, Error, RecipeError};
use cpkg_events::{
    AppEvent, BuildEvent, EventEmitter, EventSender, FailureContext, LifecycleEvent, PackageEvent,
    SourceEvent,
};
use cpkg_recipe::{
    resolve_configuration, Advisories, BuildStrategy, CompiledBuild, Dependencies,
    DependencyInfo, PackageIdInfo, Phase, PhaseTracker, Recipe, RecipeContext, Requirement,
    RequirementKind, ToolConfig,
};
use cpkg_types::{OptionKey, Options, Reference, Settings};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Result of phases 1 to 5
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Final context: settings, options, layout and resolved dependencies
    pub context: RecipeContext,
    /// Options dropped by config-options or configure
    pub removed_options: Vec<OptionKey>,
    /// Host and tool requirements as declared
    pub requirements: Vec<Requirement>,
    pub advisories: Advisories,
    /// What the package id was computed from
    pub id_info: PackageIdInfo,
    pub package_id: String,
}

/// Result of a full pass
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub reference: Reference,
    pub package_id: String,
    /// The cache entry folder
    pub path: PathBuf,
    /// The package was already cached and nothing was built
    pub reused: bool,
    pub advisories: Advisories,
}

/// Phase bookkeeping for one pass
struct Pass<'a> {
    reference: &'a Reference,
    tracker: PhaseTracker,
    started: Instant,
    events: &'a Option<EventSender>,
}

impl<'a> Pass<'a> {
    fn new(reference: &'a Reference, events: &'a Option<EventSender>) -> Self {
        Self {
            reference,
            tracker: PhaseTracker::new(),
            started: Instant::now(),
            events,
        }
    }

    fn begin(&mut self, phase: Phase) -> Result<(), Error> {
        self.tracker.enter(phase)?;
        self.started = Instant::now();
        self.events.emit_phase_started(self.reference, phase.as_str());
        Ok(())
    }

    fn end(&self) {
        if let Some(phase) = self.tracker.current() {
            self.events
                .emit_phase_completed(self.reference, phase.as_str(), self.started.elapsed());
        }
    }

    fn skip(&mut self, phase: Phase, reason: &str) -> Result<(), Error> {
        self.tracker.enter(phase)?;
        self.events
            .emit_phase_skipped(self.reference, phase.as_str(), reason);
        Ok(())
    }

    fn advisory(&self, message: &str) {
        let phase = self.tracker.current().map_or("", Phase::as_str);
        self.events.emit_advisory(self.reference, phase, message);
    }

    fn complete(&mut self) -> Result<(), Error> {
        self.tracker.complete()?;
        Ok(())
    }

    fn abort(&mut self, error: &Error) {
        if let Some(phase) = self.tracker.current() {
            self.tracker.abort(error.to_string());
            self.events.emit(AppEvent::Lifecycle(LifecycleEvent::Aborted {
                reference: self.reference.clone(),
                phase: phase.as_str().to_string(),
                failure: FailureContext::from_error(error),
            }));
        }
    }
}

/// A compiled strategy with its driver
struct Compiled<'a> {
    build: &'a CompiledBuild,
    driver: Box<dyn BuildSystem>,
    ctx: BuildSystemContext,
}

/// Runs recipes against a package cache
pub struct Engine {
    cache: PackageCache,
    build_root: PathBuf,
    fetcher: Fetcher,
    jobs: usize,
    keep_build: bool,
    profile: Settings,
    runner: Arc<dyn CommandRunner>,
    events: Option<EventSender>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("cache", &self.cache)
            .field("build_root", &self.build_root)
            .field("jobs", &self.jobs)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Engine with paths, network policy and profile from `config`
    ///
    /// # Errors
    /// Returns an error if the profile is invalid or the HTTP client cannot be
    /// created.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            cache: PackageCache::new(config.cache_path().join("packages")),
            build_root: config.build_path(),
            fetcher: Fetcher::new(config.downloads_path(), config.network.clone())?,
            jobs: config.jobs(),
            keep_build: config.build.keep_build,
            profile: config.profile.to_settings()?,
            runner: Arc::new(SystemRunner::new()),
            events: None,
        })
    }

    /// Report progress on `events`; does not touch the command runner
    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.fetcher = self.fetcher.with_events(Some(events.clone()));
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: Settings) -> Self {
        self.profile = profile;
        self
    }

    #[must_use]
    pub fn profile(&self) -> &Settings {
        &self.profile
    }

    #[must_use]
    pub fn cache(&self) -> &PackageCache {
        &self.cache
    }

    /// Run phases 1 to 5 for `reference`
    ///
    /// # Errors
    /// Returns configuration errors, `MissingDependency` for requirements the
    /// cache cannot satisfy, or the validation error.
    pub async fn evaluate(
        &self,
        recipe: &dyn Recipe,
        reference: &Reference,
        overrides: &[(String, String)],
    ) -> Result<Evaluation, Error> {
        let mut pass = Pass::new(reference, &self.events);
        match self.run_evaluation(recipe, reference, overrides, &mut pass).await {
            Ok(evaluation) => Ok(evaluation),
            Err(error) => {
                pass.abort(&error);
                Err(error)
            }
        }
    }

    /// Run the whole lifecycle and publish the package
    ///
    /// A package whose id is already cached is reused without fetching or
    /// building anything.
    ///
    /// # Errors
    /// Returns the error of the phase that failed; nothing is published.
    pub async fn create(
        &self,
        recipe: &dyn Recipe,
        reference: &Reference,
        overrides: &[(String, String)],
    ) -> Result<CreateOutcome, Error> {
        let mut pass = Pass::new(reference, &self.events);
        match self.run_create(recipe, reference, overrides, &mut pass).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                pass.abort(&error);
                Err(error)
            }
        }
    }

    async fn run_evaluation(
        &self,
        recipe: &dyn Recipe,
        reference: &Reference,
        overrides: &[(String, String)],
        pass: &mut Pass<'_>,
    ) -> Result<Evaluation, Error> {
        // Resolution runs config-options and configure back to back
        pass.begin(Phase::ConfigOptions)?;
        let resolved = match resolve_configuration(recipe, reference, &self.profile, overrides) {
            Ok(resolved) => resolved,
            Err(error @ RecipeError::InvalidConfiguration { .. }) => {
                pass.end();
                pass.begin(Phase::Configure)?;
                return Err(error.into());
            }
            Err(error) => return Err(error.into()),
        };
        for message in resolved.advisories.iter() {
            pass.advisory(message);
        }
        pass.end();
        pass.begin(Phase::Configure)?;
        pass.end();

        let ctx = resolved.context;
        self.events.emit(AppEvent::Lifecycle(LifecycleEvent::Started {
            reference: reference.clone(),
            settings: ctx.settings().to_string(),
            options: ctx.options().to_string(),
        }));

        pass.begin(Phase::Layout)?;
        let ctx = ctx.with_layout(recipe.layout(&ctx));
        pass.end();

        pass.begin(Phase::Requirements)?;
        let mut requirements = recipe.requirements(&ctx)?;
        requirements.extend(recipe.build_requirements(&ctx)?);
        let ctx = ctx.with_dependencies(self.resolve_dependencies(&requirements).await?);
        pass.end();

        pass.begin(Phase::Validate)?;
        let found = recipe.validate(&ctx)?;
        for message in found.iter() {
            pass.advisory(message);
        }
        let mut advisories = resolved.advisories;
        advisories.extend(found);
        pass.end();

        let id_info = package_id_info(recipe, &ctx);
        let package_id = id_info.package_id();
        Ok(Evaluation {
            context: ctx,
            removed_options: resolved.removed_options,
            requirements,
            advisories,
            id_info,
            package_id,
        })
    }

    /// Resolve each requirement to the best cached package that fits the
    /// profile
    ///
    /// Transitive requirements published by host dependencies are resolved
    /// as well, so their headers and libraries reach the generators.
    async fn resolve_dependencies(
        &self,
        requirements: &[Requirement],
    ) -> Result<Dependencies, Error> {
        let mut dependencies = Dependencies::new();
        let mut queue: VecDeque<Requirement> = requirements.iter().cloned().collect();
        let mut seen = HashSet::new();

        while let Some(requirement) = queue.pop_front() {
            if !seen.insert((requirement.name.clone(), requirement.kind)) {
                continue;
            }
            let entry: CacheEntry = self
                .cache
                .find_best(&requirement.name, &requirement.range, &self.profile)
                .await?
                .ok_or_else(|| BuildError::MissingDependency {
                    name: requirement.name.clone(),
                    range: requirement.range.to_string(),
                })?;

            if requirement.kind == RequirementKind::Host {
                queue.extend(
                    entry
                        .metadata
                        .requires
                        .iter()
                        .filter(|r| r.kind == RequirementKind::Host && r.traits.is_transitive())
                        .cloned(),
                );
            }

            let package_folder = entry.package_folder();
            let metadata = entry.metadata;
            dependencies = dependencies.with(
                DependencyInfo::new(metadata.reference, requirement.kind)
                    .with_options(Options::from_pairs(&metadata.options))
                    .with_info(metadata.info)
                    .with_package_folder(package_folder),
            );
        }
        Ok(dependencies)
    }

    async fn run_create(
        &self,
        recipe: &dyn Recipe,
        reference: &Reference,
        overrides: &[(String, String)],
        pass: &mut Pass<'_>,
    ) -> Result<CreateOutcome, Error> {
        let evaluation = self
            .run_evaluation(recipe, reference, overrides, pass)
            .await?;
        let package_id = evaluation.package_id.clone();

        if let Some(entry) = self.cache.lookup(reference, &package_id).await? {
            for phase in &Phase::ALL[Phase::EVALUATION.len()..Phase::ALL.len() - 1] {
                pass.skip(*phase, "package already in cache")?;
            }
            // Package info may read options the package id erased
            pass.begin(Phase::PackageInfo)?;
            let metadata = package_metadata(recipe, &evaluation);
            if metadata != entry.metadata {
                self.cache.refresh_metadata(&entry, &metadata).await?;
                self.events.emit(AppEvent::Package(PackageEvent::MetadataRefreshed {
                    reference: reference.clone(),
                    package_id: package_id.clone(),
                }));
            }
            pass.end();
            pass.complete()?;
            self.emit_completed(reference, &package_id, true);
            return Ok(CreateOutcome {
                reference: reference.clone(),
                package_id,
                path: entry.path,
                reused: true,
                advisories: evaluation.advisories,
            });
        }

        let short_id = package_id.get(..12).unwrap_or(&package_id);
        let work_dir = self
            .build_root
            .join(format!("{}-{}-{short_id}", reference.name, reference.version));
        let result = self.build_package(recipe, &evaluation, &work_dir, pass).await;

        if !self.keep_build {
            if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    self.events.emit_warning(format!(
                        "could not remove build folder {}: {e}",
                        work_dir.display()
                    ));
                }
            }
        }

        let path = result?;
        self.emit_completed(reference, &package_id, false);
        Ok(CreateOutcome {
            reference: reference.clone(),
            package_id,
            path,
            reused: false,
            advisories: evaluation.advisories,
        })
    }

    /// Phases 6 to 10
    async fn build_package(
        &self,
        recipe: &dyn Recipe,
        evaluation: &Evaluation,
        work_dir: &Path,
        pass: &mut Pass<'_>,
    ) -> Result<PathBuf, Error> {
        let ctx = &evaluation.context;
        let reference = ctx.reference();

        if work_dir.exists() {
            tokio::fs::remove_dir_all(work_dir)
                .await
                .map_err(|e| Error::io_with_path(&e, work_dir))?;
        }
        tokio::fs::create_dir_all(work_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, work_dir))?;

        let layout = ctx.layout();
        let source_dir = safe_join(work_dir, &layout.source)?;
        let build_dir = safe_join(work_dir, &layout.build)?;
        let generators_dir = safe_join(work_dir, &layout.generators)?;

        pass.begin(Phase::Source)?;
        let plan = recipe.source(ctx)?;
        let archive = self.fetcher.fetch(&plan.archive).await?;
        let entries = extract_archive(&archive, &source_dir, plan.archive.strip_root).await?;
        self.events.emit(AppEvent::Source(SourceEvent::Extracted {
            archive,
            destination: source_dir.clone(),
            entries,
        }));
        apply_patches(&source_dir, &plan.patches, self.runner.as_ref(), &self.events).await?;
        pass.end();

        let staging = self.cache.staging(reference).await?;
        let package_dir = staging.path().join(PACKAGE_DIR);

        let strategy = recipe.strategy(ctx);
        let compiled = match &strategy {
            BuildStrategy::Compiled(build) => {
                let env = match build.tool {
                    ToolConfig::Autotools(_) | ToolConfig::Make(_) => {
                        generators::build_env(ctx, &generators_dir)
                    }
                    ToolConfig::CMake(_) | ToolConfig::MsBuild(_) => generators::tool_env(ctx),
                };
                Some(Compiled {
                    build,
                    driver: for_tool(&build.tool),
                    ctx: BuildSystemContext {
                        source_dir: source_dir.clone(),
                        build_dir: build_dir.clone(),
                        generators_dir: generators_dir.clone(),
                        package_dir: package_dir.clone(),
                        jobs: self.jobs,
                        settings: ctx.settings().clone(),
                        options: ctx.options().clone(),
                        env,
                        runner: Arc::clone(&self.runner),
                    },
                })
            }
            BuildStrategy::HeaderOnly | BuildStrategy::Prebuilt => None,
        };
        let nothing_to_build = format!("{} package", strategy.kind());

        match &compiled {
            Some(compiled) => {
                pass.begin(Phase::Generate)?;
                let files = generators::render(ctx, compiled.build, &generators_dir);
                generators::write_files(&generators_dir, &files, &self.events).await?;
                pass.end();

                pass.begin(Phase::Build)?;
                self.run_build(compiled).await?;
                pass.end();
            }
            None => {
                pass.skip(Phase::Generate, &nothing_to_build)?;
                pass.skip(Phase::Build, &nothing_to_build)?;
            }
        }

        pass.begin(Phase::Package)?;
        let roots = PackageRoots {
            source: source_dir,
            build: build_dir,
            package: package_dir,
        };
        let installer: Option<Installer<'_>> =
            compiled.as_ref().map(|c| (c.driver.as_ref(), &c.ctx));
        packager::run_plan(&recipe.package(ctx), &roots, installer, &self.events).await?;
        pass.end();

        pass.begin(Phase::PackageInfo)?;
        let metadata = package_metadata(recipe, evaluation);
        let outcome = self.cache.commit(staging, &metadata).await?;
        match &outcome {
            CommitOutcome::Committed(path) => {
                self.events.emit(AppEvent::Package(PackageEvent::Committed {
                    reference: reference.clone(),
                    package_id: metadata.package_id.clone(),
                    path: path.clone(),
                }));
            }
            CommitOutcome::AlreadyPresent(_) => {
                self.events.emit(AppEvent::Package(PackageEvent::AlreadyCommitted {
                    reference: reference.clone(),
                    package_id: metadata.package_id.clone(),
                }));
            }
        }
        pass.end();
        pass.complete()?;

        Ok(outcome.path().to_path_buf())
    }

    /// Source edits, preparation commands, then configure and build
    async fn run_build(&self, compiled: &Compiled<'_>) -> Result<(), Error> {
        let ctx = &compiled.ctx;
        for edit in &compiled.build.edits {
            apply_edit(&ctx.source_dir, edit).await?;
        }
        for command in &compiled.build.prepare {
            let cwd = safe_join(&ctx.source_dir, &command.workdir)?;
            let spec = CommandSpec::new(command.program.clone(), cwd)
                .args(command.args.iter().cloned())
                .envs(&ctx.env);
            ctx.run_checked(spec, configure_failed).await?;
        }

        let system = compiled.driver.kind();
        self.events.emit(AppEvent::Build(BuildEvent::StepStarted {
            system,
            step: "configure".to_string(),
        }));
        compiled.driver.configure(ctx).await?;
        self.events.emit(AppEvent::Build(BuildEvent::StepStarted {
            system,
            step: "build".to_string(),
        }));
        compiled.driver.build(ctx).await
    }

    fn emit_completed(&self, reference: &Reference, package_id: &str, reused: bool) {
        self.events.emit(AppEvent::Lifecycle(LifecycleEvent::Completed {
            reference: reference.clone(),
            package_id: package_id.to_string(),
            reused,
        }));
    }
}

/// Binary compatibility inputs: host dependency references plus the
/// settings and options the recipe keeps
fn package_id_info(recipe: &dyn Recipe, ctx: &RecipeContext) -> PackageIdInfo {
    let requires = ctx
        .dependencies()
        .host_iter()
        .map(|dep| dep.reference.to_string())
        .collect();
    let info = PackageIdInfo::new(ctx.settings(), ctx.options(), requires);
    recipe.package_id(ctx, info)
}

/// What gets published for the package `evaluation` describes
fn package_metadata(recipe: &dyn Recipe, evaluation: &Evaluation) -> PackageMetadata {
    let ctx = &evaluation.context;
    PackageMetadata {
        reference: ctx.reference().clone(),
        package_id: evaluation.package_id.clone(),
        package_type: recipe.descriptor().package_type.resolve(ctx.shared()),
        settings: ctx.settings().to_pairs(),
        binary_settings: evaluation.id_info.settings.clone(),
        options: ctx.options().to_pairs(),
        info: recipe.package_info(ctx),
        requires: evaluation
            .requirements
            .iter()
            .filter(|r| r.kind == RequirementKind::Host && r.traits.is_transitive())
            .cloned()
            .collect(),
    }
}
