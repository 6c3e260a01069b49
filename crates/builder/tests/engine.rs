//! End-to-end lifecycle runs against local archives and a recording runner

use cpkg_builder::{CommandOutput, Engine, RecordingRunner};
use cpkg_config::Config;
use cpkg_errors::{BuildError, Error, RecipeError};
use cpkg_events::{AppEvent, BuildEvent, EventReceiver, LifecycleEvent};
use cpkg_hash::{hash_bytes, Checksum, ChecksumAlgorithm};
use cpkg_recipe::validate::invalid;
use cpkg_recipe::{
    Advisories, BuildStrategy, CMakeBuild, CompiledBuild, ConfigDelta, CopySpec, Origin,
    PackageIdInfo, PackageInfo, PackagePlan, Recipe, RecipeContext, RecipeDescriptor,
    Requirement, SourceRef, SourceSpec, SourceTable, ToolConfig,
};
use cpkg_types::{
    Arch, BuildType, Compiler, CompilerKind, LibCxx, OptionKey, OptionSchema, OptionValue, Os,
    PackageType, Reference, Settings, Version,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn linux_gcc() -> Settings {
    Settings::new()
        .with_os(Os::Linux)
        .with_arch(Arch::X86_64)
        .with_compiler(
            Compiler::new(CompilerKind::Gcc, Version::parse("13").unwrap())
                .with_libcxx(LibCxx::Libstdcxx11),
        )
        .with_build_type(BuildType::Release)
}

/// Write an uncompressed tarball with a single `<top>/` root folder
fn tarball(dir: &Path, top: &str, files: &[(&str, &str)]) -> SourceRef {
    let path = dir.join(format!("{top}.tar"));
    let mut builder = tar::Builder::new(std::fs::File::create(&path).unwrap());
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, format!("{top}/{name}"), contents.as_bytes())
            .unwrap();
    }
    builder.finish().unwrap();
    drop(builder);

    let bytes = std::fs::read(&path).unwrap();
    SourceRef::new(
        format!("file://{}", path.display()),
        Checksum::sha256(&hash_bytes(ChecksumAlgorithm::Sha256, &bytes)),
    )
}

fn one_version(version: &str, source: SourceRef) -> SourceTable {
    SourceTable::new().with_source(Version::parse(version).unwrap(), SourceSpec::Archive(source))
}

fn engine(root: &Path, runner: &RecordingRunner, keep_build: bool) -> Engine {
    let mut config = Config::default();
    config.paths.cache_path = Some(root.join("cache"));
    config.build.build_jobs = 2;
    config.build.keep_build = keep_build;
    Engine::from_config(&config)
        .unwrap()
        .with_runner(Arc::new(runner.clone()))
        .with_profile(linux_gcc())
}

fn drain(rx: &mut EventReceiver) -> Vec<LifecycleEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let AppEvent::Lifecycle(event) = event {
            events.push(event);
        }
    }
    events
}

fn started_phases(events: &[LifecycleEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            LifecycleEvent::PhaseStarted { phase, .. } => Some(phase.clone()),
            _ => None,
        })
        .collect()
}

/// A header-only library, optionally rejecting Windows
struct Headers {
    descriptor: RecipeDescriptor,
    sources: SourceTable,
    reject_windows: bool,
}

impl Headers {
    fn new(source: SourceRef) -> Self {
        Self {
            descriptor: RecipeDescriptor::new("hdr", PackageType::HeaderLibrary)
                .licenses(&["MIT"]),
            sources: one_version("1.0", source),
            reject_windows: false,
        }
    }
}

impl Recipe for Headers {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn sources(&self) -> &SourceTable {
        &self.sources
    }

    fn validate(&self, ctx: &RecipeContext) -> Result<Advisories, RecipeError> {
        if self.reject_windows && ctx.settings().os == Some(Os::Windows) {
            return Err(invalid(ctx, "hdr does not support Windows"));
        }
        Ok(Advisories::new())
    }

    fn strategy(&self, _ctx: &RecipeContext) -> BuildStrategy {
        BuildStrategy::HeaderOnly
    }

    fn package(&self, _ctx: &RecipeContext) -> PackagePlan {
        PackagePlan::new().license("LICENSE").copy(
            CopySpec::new("*.h")
                .from(Origin::Source, "include")
                .to("include"),
        )
    }

    fn package_info(&self, _ctx: &RecipeContext) -> PackageInfo {
        PackageInfo::header_only()
    }

    fn package_id(&self, _ctx: &RecipeContext, id: PackageIdInfo) -> PackageIdInfo {
        id.clear()
    }
}

/// A CMake library depending on `hdr`
struct Library {
    descriptor: RecipeDescriptor,
    sources: SourceTable,
}

impl Library {
    fn new(source: SourceRef) -> Self {
        Self {
            descriptor: RecipeDescriptor::new("zfoo", PackageType::Library)
                .options(OptionSchema::new(OptionSchema::library_defs()).unwrap()),
            sources: one_version("2.1", source),
        }
    }
}

impl Recipe for Library {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn sources(&self) -> &SourceTable {
        &self.sources
    }

    fn config_options(&self, ctx: &RecipeContext) -> ConfigDelta {
        ConfigDelta::none().fpic_unless_windows(ctx)
    }

    fn configure(&self, ctx: &RecipeContext) -> Result<ConfigDelta, RecipeError> {
        Ok(ConfigDelta::none().fpic_unless_static(ctx).c_only())
    }

    fn requirements(&self, _ctx: &RecipeContext) -> Result<Vec<Requirement>, RecipeError> {
        Ok(vec![Requirement::host("hdr", "[>=1.0 <2]")?])
    }

    fn strategy(&self, _ctx: &RecipeContext) -> BuildStrategy {
        BuildStrategy::Compiled(CompiledBuild::new(ToolConfig::CMake(
            CMakeBuild::new().cache_variable("ZFOO_TESTS", false),
        )))
    }

    fn package(&self, _ctx: &RecipeContext) -> PackagePlan {
        PackagePlan::new()
            .license("COPYING")
            .install()
            .rmdir("lib/cmake")
    }

    fn package_info(&self, _ctx: &RecipeContext) -> PackageInfo {
        let mut info = PackageInfo::new();
        info.cpp.libs.push("zfoo".to_string());
        info
    }
}

/// Stand in for `cmake --install` by creating the installed tree
fn fake_cmake() -> RecordingRunner {
    RecordingRunner::new().with_hook(|command| {
        if let Some(index) = command.args.iter().position(|a| a == "--prefix") {
            let prefix = PathBuf::from(&command.args[index + 1]);
            std::fs::create_dir_all(prefix.join("lib/cmake/zfoo")).unwrap();
            std::fs::write(prefix.join("lib/cmake/zfoo/zfoo-config.cmake"), "").unwrap();
            std::fs::write(prefix.join("lib/libzfoo.so"), "ELF").unwrap();
        }
        CommandOutput {
            status: Some(0),
            ..CommandOutput::default()
        }
    })
}

fn header_source(dir: &Path) -> SourceRef {
    tarball(
        dir,
        "hdr-1.0",
        &[
            ("include/hdr.h", "#pragma once\n"),
            ("include/detail/impl.h", "#pragma once\n"),
            ("LICENSE", "MIT License\n"),
            ("README.md", "hdr\n"),
        ],
    )
}

fn library_source(dir: &Path) -> SourceRef {
    tarball(
        dir,
        "zfoo-2.1",
        &[
            ("CMakeLists.txt", "project(zfoo C)\n"),
            ("zfoo.c", "int zfoo(void) { return 0; }\n"),
            ("COPYING", "zlib license\n"),
        ],
    )
}

#[tokio::test]
async fn header_only_package_is_published_without_running_tools() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new();
    let (tx, mut rx) = cpkg_events::channel();
    let engine = engine(dir.path(), &runner, false).with_events(tx);
    let recipe = Headers::new(header_source(dir.path()));
    let reference = Reference::parse("hdr/1.0").unwrap();

    let outcome = engine.create(&recipe, &reference, &[]).await.unwrap();
    assert!(!outcome.reused);

    let package = outcome.path.join("package");
    assert!(package.join("include/hdr.h").is_file());
    assert!(package.join("include/detail/impl.h").is_file());
    assert!(package.join("licenses/LICENSE").is_file());
    assert!(!package.join("README.md").exists());
    assert!(outcome.path.join("cpkginfo.json").is_file());
    assert!(runner.commands().is_empty());

    let events = drain(&mut rx);
    assert_eq!(
        started_phases(&events),
        [
            "config-options",
            "configure",
            "layout",
            "requirements",
            "validate",
            "source",
            "package",
            "package-info"
        ]
    );
    let skipped: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            LifecycleEvent::PhaseSkipped { phase, reason, .. } => {
                Some((phase.as_str(), reason.as_str()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        skipped,
        [
            ("generate", "header-only package"),
            ("build", "header-only package")
        ]
    );

    // The build folder is gone once the package is committed
    let builds = dir.path().join("cache/builds");
    let leftovers = std::fs::read_dir(&builds).map_or(0, Iterator::count);
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn cached_packages_are_reused() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new();
    let (tx, mut rx) = cpkg_events::channel();
    let engine = engine(dir.path(), &runner, false).with_events(tx);
    let recipe = Headers::new(header_source(dir.path()));
    let reference = Reference::parse("hdr/1.0").unwrap();

    let first = engine.create(&recipe, &reference, &[]).await.unwrap();
    drain(&mut rx);

    let second = engine.create(&recipe, &reference, &[]).await.unwrap();
    assert!(second.reused);
    assert_eq!(first.package_id, second.package_id);
    assert_eq!(first.path, second.path);

    let events = drain(&mut rx);
    assert!(!started_phases(&events).contains(&"source".to_string()));
    assert!(events.iter().any(|e| matches!(
        e,
        LifecycleEvent::Completed { reused: true, .. }
    )));
}

#[tokio::test]
async fn header_only_ids_ignore_the_profile() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new();
    let recipe = Headers::new(header_source(dir.path()));
    let reference = Reference::parse("hdr/1.0").unwrap();

    let linux = engine(dir.path(), &runner, false);
    let windows = engine(dir.path(), &runner, false)
        .with_profile(linux_gcc().with_os(Os::Windows).with_build_type(BuildType::Debug));

    let a = linux.evaluate(&recipe, &reference, &[]).await.unwrap();
    let b = windows.evaluate(&recipe, &reference, &[]).await.unwrap();
    assert_eq!(a.package_id, b.package_id);
}

#[tokio::test]
async fn shared_library_build_drops_fpic_and_uses_its_dependency() {
    let dir = tempfile::tempdir().unwrap();
    let runner = fake_cmake();
    let engine = engine(dir.path(), &runner, true);

    let headers = Headers::new(header_source(dir.path()));
    engine
        .create(&headers, &Reference::parse("hdr/1.0").unwrap(), &[])
        .await
        .unwrap();

    let recipe = Library::new(library_source(dir.path()));
    let reference = Reference::parse("zfoo/2.1").unwrap();
    let overrides = [("shared".to_string(), "True".to_string())];

    let evaluation = engine.evaluate(&recipe, &reference, &overrides).await.unwrap();
    assert_eq!(evaluation.removed_options, [OptionKey::FPIC]);
    assert_eq!(
        evaluation.context.options().get(&OptionKey::SHARED),
        Some(&OptionValue::Bool(true))
    );
    assert!(evaluation.context.settings().cppstd().is_none());
    assert!(evaluation.context.dependencies().host("hdr").is_some());

    let outcome = engine.create(&recipe, &reference, &overrides).await.unwrap();
    assert_eq!(outcome.package_id, evaluation.package_id);

    let lines = runner.command_lines();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("cmake -S"));
    assert!(lines[0].contains("-DZFOO_TESTS=OFF"));
    assert!(lines[1].contains("--build"));
    assert!(lines[2].contains("--install"));

    let package = outcome.path.join("package");
    assert!(package.join("lib/libzfoo.so").is_file());
    assert!(package.join("licenses/COPYING").is_file());
    assert!(!package.join("lib/cmake").exists());

    let entry = engine
        .cache()
        .lookup(&reference, &outcome.package_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.metadata.package_type, PackageType::SharedLibrary);
    assert_eq!(entry.metadata.options["shared"], "True");
    assert!(!entry.metadata.options.contains_key("fPIC"));

    // keep_build leaves the generated files for inspection
    let work = dir
        .path()
        .join("cache/builds")
        .join(format!("zfoo-2.1-{}", &outcome.package_id[..12]));
    let generators = work.join("build-release/cpkg");
    let toolchain = std::fs::read_to_string(generators.join("cpkg_toolchain.cmake")).unwrap();
    assert!(toolchain.contains("set(BUILD_SHARED_LIBS ON CACHE BOOL \"\" FORCE)"));
    assert!(!toolchain.contains("CMAKE_POSITION_INDEPENDENT_CODE"));
    assert!(generators.join("hdr-config.cmake").is_file());
}

#[tokio::test]
async fn missing_dependencies_stop_the_requirements_phase() {
    let dir = tempfile::tempdir().unwrap();
    let runner = fake_cmake();
    let (tx, mut rx) = cpkg_events::channel();
    let engine = engine(dir.path(), &runner, false).with_events(tx);
    let recipe = Library::new(library_source(dir.path()));
    let reference = Reference::parse("zfoo/2.1").unwrap();

    let err = engine.create(&recipe, &reference, &[]).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Build(BuildError::MissingDependency { ref name, .. }) if name == "hdr"
    ));
    assert!(runner.commands().is_empty());

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        LifecycleEvent::Aborted { phase, .. } if phase == "requirements"
    )));
}

#[tokio::test]
async fn rejected_configurations_never_fetch_sources() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new();
    let (tx, mut rx) = cpkg_events::channel();
    let engine = engine(dir.path(), &runner, false)
        .with_events(tx)
        .with_profile(linux_gcc().with_os(Os::Windows));

    let mut recipe = Headers::new(SourceRef::new(
        "file:///nonexistent/hdr-1.0.tar",
        Checksum::sha256(&"0".repeat(64)),
    ));
    recipe.reject_windows = true;
    let reference = Reference::parse("hdr/1.0").unwrap();

    let err = engine.create(&recipe, &reference, &[]).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Recipe(RecipeError::InvalidConfiguration { .. })
    ));

    let events = drain(&mut rx);
    let phases = started_phases(&events);
    assert_eq!(phases.last().map(String::as_str), Some("validate"));
    assert!(!dir.path().join("cache/downloads").exists());
    assert!(!dir.path().join("cache/packages/hdr").exists());
}

#[tokio::test]
async fn failed_builds_publish_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new().with_hook(|command| {
        if command.args.iter().any(|a| a == "--build") {
            CommandOutput {
                status: Some(2),
                stdout: String::new(),
                stderr: "zfoo.c:1: error: expected ';'\n".to_string(),
            }
        } else {
            CommandOutput {
                status: Some(0),
                ..CommandOutput::default()
            }
        }
    });
    let engine = engine(dir.path(), &runner, false);

    engine
        .create(
            &Headers::new(header_source(dir.path())),
            &Reference::parse("hdr/1.0").unwrap(),
            &[],
        )
        .await
        .unwrap();

    let recipe = Library::new(library_source(dir.path()));
    let reference = Reference::parse("zfoo/2.1").unwrap();
    let err = engine.create(&recipe, &reference, &[]).await.unwrap_err();
    match err {
        Error::Build(BuildError::CompileFailed { message }) => {
            assert!(message.contains("expected ';'"));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(engine.cache().entries(&reference).await.unwrap().is_empty());
    let version_dir = dir.path().join("cache/packages/zfoo/2.1");
    let leftovers = std::fs::read_dir(&version_dir).map_or(0, Iterator::count);
    assert_eq!(leftovers, 0);
}

fn build_steps(rx: &mut EventReceiver) -> Vec<String> {
    let mut steps = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let AppEvent::Build(BuildEvent::StepStarted { step, .. }) = event {
            steps.push(step);
        }
    }
    steps
}

#[tokio::test]
async fn build_steps_are_announced_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let runner = fake_cmake();
    let (tx, mut rx) = cpkg_events::channel();
    let engine = engine(dir.path(), &runner, false).with_events(tx);

    engine
        .create(
            &Headers::new(header_source(dir.path())),
            &Reference::parse("hdr/1.0").unwrap(),
            &[],
        )
        .await
        .unwrap();
    assert!(build_steps(&mut rx).is_empty());

    let recipe = Library::new(library_source(dir.path()));
    engine
        .create(&recipe, &Reference::parse("zfoo/2.1").unwrap(), &[])
        .await
        .unwrap();
    assert_eq!(build_steps(&mut rx), ["configure", "build"]);
}

#[tokio::test]
async fn failed_configure_never_starts_the_build_step() {
    let dir = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::new().with_hook(|command| CommandOutput {
        status: Some(i32::from(command.args.iter().any(|a| a == "-S"))),
        ..CommandOutput::default()
    });
    let (tx, mut rx) = cpkg_events::channel();
    let engine = engine(dir.path(), &runner, false).with_events(tx);

    engine
        .create(
            &Headers::new(header_source(dir.path())),
            &Reference::parse("hdr/1.0").unwrap(),
            &[],
        )
        .await
        .unwrap();

    let recipe = Library::new(library_source(dir.path()));
    let err = engine
        .create(&recipe, &Reference::parse("zfoo/2.1").unwrap(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Build(BuildError::ConfigureFailed { .. })), "{err}");
    assert_eq!(build_steps(&mut rx), ["configure"]);
    assert_eq!(runner.commands().len(), 1);
}
