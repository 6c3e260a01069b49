//! Build strategies
//!
//! Generate and build are no-ops for header-only and prebuilt packages. A
//! compiled package carries the tool configuration the engine translates into
//! toolchain files and tool invocations.

use crate::source::FileEdit;
use cpkg_types::Arch;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// How the sources become a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStrategy {
    /// Nothing to generate or build; package copies headers
    HeaderOnly,
    /// The source archive already contains the binaries
    Prebuilt,
    Compiled(CompiledBuild),
}

impl BuildStrategy {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HeaderOnly => "header-only",
            Self::Prebuilt => "prebuilt",
            Self::Compiled(build) => build.tool.name(),
        }
    }
}

/// Dependency metadata generators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DepsGenerator {
    /// `<name>-config.cmake` files for `find_package`
    CMakeDeps,
    /// `<name>.pc` files for pkg-config
    PkgConfigDeps,
    /// `cpkg_deps.props` for MSBuild
    MsBuildDeps,
}

/// A compiled build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBuild {
    pub tool: ToolConfig,
    /// Edits applied to the source tree before the tool runs
    pub edits: Vec<FileEdit>,
    /// Commands run before the tool, e.g. project generators
    pub prepare: Vec<ToolCommand>,
    pub generators: Vec<DepsGenerator>,
}

impl CompiledBuild {
    #[must_use]
    pub fn new(tool: ToolConfig) -> Self {
        let generators = match &tool {
            ToolConfig::CMake(_) => vec![DepsGenerator::CMakeDeps],
            ToolConfig::Autotools(_) | ToolConfig::Make(_) => vec![DepsGenerator::PkgConfigDeps],
            ToolConfig::MsBuild(_) => vec![DepsGenerator::MsBuildDeps],
        };
        Self {
            tool,
            edits: Vec::new(),
            prepare: Vec::new(),
            generators,
        }
    }

    #[must_use]
    pub fn edit(mut self, edit: FileEdit) -> Self {
        self.edits.push(edit);
        self
    }

    #[must_use]
    pub fn prepare(mut self, command: ToolCommand) -> Self {
        self.prepare.push(command);
        self
    }

    #[must_use]
    pub fn generators(mut self, generators: Vec<DepsGenerator>) -> Self {
        self.generators = generators;
        self
    }
}

impl From<CompiledBuild> for BuildStrategy {
    fn from(build: CompiledBuild) -> Self {
        Self::Compiled(build)
    }
}

/// An external command run inside the source tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Relative to the source folder
    pub workdir: PathBuf,
}

impl ToolCommand {
    #[must_use]
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            workdir: PathBuf::from("."),
        }
    }

    #[must_use]
    pub fn in_dir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }
}

/// Which tool drives the build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolConfig {
    CMake(CMakeBuild),
    Autotools(AutotoolsBuild),
    MsBuild(MsBuildProject),
    Make(MakeBuild),
}

impl ToolConfig {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CMake(_) => "cmake",
            Self::Autotools(_) => "autotools",
            Self::MsBuild(_) => "msbuild",
            Self::Make(_) => "make",
        }
    }
}

/// A CMake variable value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CMakeValue {
    Bool(bool),
    Str(String),
}

impl fmt::Display for CMakeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("ON"),
            Self::Bool(false) => f.write_str("OFF"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for CMakeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for CMakeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// CMake project configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CMakeBuild {
    /// Written into the toolchain file
    pub variables: BTreeMap<String, CMakeValue>,
    /// Passed as `-D` on the configure command line
    pub cache_variables: BTreeMap<String, CMakeValue>,
    pub targets: Vec<String>,
}

impl CMakeBuild {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn variable(mut self, name: &str, value: impl Into<CMakeValue>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn cache_variable(mut self, name: &str, value: impl Into<CMakeValue>) -> Self {
        self.cache_variables.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn target(mut self, target: &str) -> Self {
        self.targets.push(target.to_string());
        self
    }
}

/// `./configure && make && make install`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutotoolsBuild {
    pub configure_args: Vec<String>,
    /// Run `autoreconf -fiv` in the source tree first
    pub autoreconf: bool,
    /// Configure inside the source tree instead of the build folder
    pub in_source: bool,
    pub make_args: Vec<String>,
}

impl AutotoolsBuild {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn args(mut self, args: &[&str]) -> Self {
        self.configure_args
            .extend(args.iter().map(ToString::to_string));
        self
    }

    #[must_use]
    pub fn autoreconf(mut self) -> Self {
        self.autoreconf = true;
        self
    }

    #[must_use]
    pub fn in_source(mut self) -> Self {
        self.in_source = true;
        self
    }
}

/// A Visual Studio solution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsBuildProject {
    /// Relative to the source folder
    pub solution: PathBuf,
    /// Solution platform name per architecture
    pub platforms: BTreeMap<Arch, String>,
    pub properties: BTreeMap<String, String>,
    /// Set `WholeProgramOptimization` from `/GL` in the build's `CFLAGS`
    pub whole_program_optimization_from_cflags: bool,
}

impl MsBuildProject {
    #[must_use]
    pub fn new(solution: impl Into<PathBuf>) -> Self {
        let platforms = [(Arch::X86, "Win32"), (Arch::X86_64, "x64"), (Arch::Armv8, "ARM64")]
            .into_iter()
            .map(|(arch, name)| (arch, name.to_string()))
            .collect();
        Self {
            solution: solution.into(),
            platforms,
            properties: BTreeMap::new(),
            whole_program_optimization_from_cflags: false,
        }
    }

    #[must_use]
    pub fn platform(mut self, arch: Arch, name: &str) -> Self {
        self.platforms.insert(arch, name.to_string());
        self
    }

    #[must_use]
    pub fn property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn whole_program_optimization_from_cflags(mut self) -> Self {
        self.whole_program_optimization_from_cflags = true;
        self
    }
}

/// A plain makefile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeBuild {
    /// Relative to the source folder
    pub directory: PathBuf,
    pub makefile: Option<String>,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Whether `make install` populates the package
    pub install: bool,
}

impl MakeBuild {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            makefile: None,
            args: Vec::new(),
            env: BTreeMap::new(),
            install: false,
        }
    }

    #[must_use]
    pub fn makefile(mut self, makefile: &str) -> Self {
        self.makefile = Some(makefile.to_string());
        self
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn env(mut self, name: &str, value: impl Into<String>) -> Self {
        self.env.insert(name.to_string(), value.into());
        self
    }
}
