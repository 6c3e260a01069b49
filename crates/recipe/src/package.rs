//! Package plans: ordered steps that populate the package root
//!
//! All paths are relative. `Copy` sources are relative to their origin
//! folder; destinations and removals are relative to the package root.

use std::path::PathBuf;

/// Folder a copy reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Source,
    Build,
    Package,
}

/// A glob copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySpec {
    pub pattern: String,
    pub origin: Origin,
    pub src: PathBuf,
    pub dst: PathBuf,
    /// Keep the path below `src`; otherwise files are flattened into `dst`
    pub keep_path: bool,
}

impl CopySpec {
    /// Copy files matching `pattern` from the source folder root to the package root
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            origin: Origin::Source,
            src: PathBuf::new(),
            dst: PathBuf::new(),
            keep_path: true,
        }
    }

    #[must_use]
    pub fn from(mut self, origin: Origin, src: impl Into<PathBuf>) -> Self {
        self.origin = origin;
        self.src = src.into();
        self
    }

    #[must_use]
    pub fn to(mut self, dst: impl Into<PathBuf>) -> Self {
        self.dst = dst.into();
        self
    }

    #[must_use]
    pub fn flatten(mut self) -> Self {
        self.keep_path = false;
        self
    }
}

/// One packaging step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageStep {
    Copy(CopySpec),
    /// Run the build tool's install target into the package root
    Install,
    RemoveDir {
        path: PathBuf,
    },
    /// Remove files matching `pattern` below `path`
    Remove {
        pattern: String,
        path: PathBuf,
        recursive: bool,
    },
    Save {
        path: PathBuf,
        contents: String,
    },
    /// Move a file or directory inside the package root
    Rename {
        from: PathBuf,
        to: PathBuf,
    },
    /// Save the text that follows the first line mentioning `marker`,
    /// with surrounding `*` and whitespace trimmed
    ExtractSection {
        origin: Origin,
        src: PathBuf,
        marker: String,
        dst: PathBuf,
    },
}

/// Ordered packaging steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagePlan {
    pub steps: Vec<PackageStep>,
}

impl PackagePlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn copy(mut self, spec: CopySpec) -> Self {
        self.steps.push(PackageStep::Copy(spec));
        self
    }

    /// Copy a license file from the source root into `licenses/`
    #[must_use]
    pub fn license(self, pattern: &str) -> Self {
        self.copy(CopySpec::new(pattern).to("licenses"))
    }

    #[must_use]
    pub fn install(mut self) -> Self {
        self.steps.push(PackageStep::Install);
        self
    }

    #[must_use]
    pub fn rmdir(mut self, path: impl Into<PathBuf>) -> Self {
        self.steps.push(PackageStep::RemoveDir { path: path.into() });
        self
    }

    /// Remove matching files anywhere below `path`
    #[must_use]
    pub fn rm_recursive(mut self, pattern: &str, path: impl Into<PathBuf>) -> Self {
        self.steps.push(PackageStep::Remove {
            pattern: pattern.to_string(),
            path: path.into(),
            recursive: true,
        });
        self
    }

    /// Remove matching files directly inside `path`
    #[must_use]
    pub fn rm(mut self, pattern: &str, path: impl Into<PathBuf>) -> Self {
        self.steps.push(PackageStep::Remove {
            pattern: pattern.to_string(),
            path: path.into(),
            recursive: false,
        });
        self
    }

    #[must_use]
    pub fn save(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.steps.push(PackageStep::Save {
            path: path.into(),
            contents: contents.into(),
        });
        self
    }

    #[must_use]
    pub fn rename(mut self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        self.steps.push(PackageStep::Rename {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    #[must_use]
    pub fn extract_section(
        mut self,
        src: impl Into<PathBuf>,
        marker: &str,
        dst: impl Into<PathBuf>,
    ) -> Self {
        self.steps.push(PackageStep::ExtractSection {
            origin: Origin::Source,
            src: src.into(),
            marker: marker.to_string(),
            dst: dst.into(),
        });
        self
    }

    /// Whether the plan runs the build tool's install target
    #[must_use]
    pub fn uses_install(&self) -> bool {
        self.steps.iter().any(|s| matches!(s, PackageStep::Install))
    }
}
