//! Source archives, patches and per-version source tables
//!
//! A source table is written as TOML next to the recipe:
//!
//! ```toml
//! [sources."2.4.3"]
//! url = "https://github.com/libharu/libharu/archive/refs/tags/v2.4.3.tar.gz"
//! sha256 = "..."
//!
//! [sources."3.27.7".Linux.x86_64]
//! url = ["https://mirror-a/...", "https://mirror-b/..."]
//! sha256 = "..."
//!
//! [[patches."2.4.3"]]
//! description = "use the system zlib"
//! file = "CMakeLists.txt"
//! from = "add_subdirectory(zlib)"
//! to = ""
//! ```

use crate::context::RecipeContext;
use cpkg_errors::RecipeError;
use cpkg_hash::{Checksum, ChecksumAlgorithm};
use cpkg_types::Version;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One downloadable archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    /// Mirrors, tried in order
    pub urls: Vec<String>,
    pub checksum: Checksum,
    /// Drop the single top-level directory of the archive
    pub strip_root: bool,
}

impl SourceRef {
    #[must_use]
    pub fn new(url: impl Into<String>, checksum: Checksum) -> Self {
        Self {
            urls: vec![url.into()],
            checksum,
            strip_root: true,
        }
    }

    #[must_use]
    pub fn with_strip_root(mut self, strip_root: bool) -> Self {
        self.strip_root = strip_root;
        self
    }

    /// File name of the first mirror, used for the download cache
    #[must_use]
    pub fn file_name(&self) -> String {
        self.urls
            .first()
            .and_then(|url| url.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .map_or_else(|| "source.tar.gz".to_string(), ToString::to_string)
    }
}

/// Sources for one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Archive(SourceRef),
    /// Prebuilt binaries keyed by OS then architecture
    Platform(BTreeMap<String, BTreeMap<String, SourceRef>>),
}

/// Textual edits applied to the source tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEdit {
    /// Replace every occurrence; the search text must be present
    Replace {
        file: PathBuf,
        from: String,
        to: String,
    },
    Save {
        file: PathBuf,
        contents: String,
    },
    Rename {
        from: PathBuf,
        to: PathBuf,
    },
    MakeDir {
        path: PathBuf,
    },
}

impl FileEdit {
    #[must_use]
    pub fn replace(file: impl Into<PathBuf>, from: &str, to: &str) -> Self {
        Self::Replace {
            file: file.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[must_use]
    pub fn save(file: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self::Save {
            file: file.into(),
            contents: contents.into(),
        }
    }

    #[must_use]
    pub fn rename(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self::Rename {
            from: from.into(),
            to: to.into(),
        }
    }

    #[must_use]
    pub fn make_dir(path: impl Into<PathBuf>) -> Self {
        Self::MakeDir { path: path.into() }
    }
}

/// A patch applied after extraction, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    /// Unified diff applied with `patch -p1`
    Diff {
        description: String,
        contents: String,
    },
    Edit {
        description: String,
        edit: FileEdit,
    },
}

impl Patch {
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Diff { description, .. } | Self::Edit { description, .. } => description,
        }
    }
}

/// What the source phase fetches and applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePlan {
    pub archive: SourceRef,
    pub patches: Vec<Patch>,
}

/// Sources and patches for every known version of a recipe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTable {
    sources: BTreeMap<Version, SourceSpec>,
    patches: BTreeMap<Version, Vec<Patch>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSource {
    url: OneOrMany,
    sha256: Option<String>,
    md5: Option<String>,
    blake3: Option<String>,
    strip_root: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSpec {
    Archive(RawSource),
    Platform(BTreeMap<String, BTreeMap<String, RawSource>>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPatch {
    description: String,
    file: String,
    from: String,
    to: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTable {
    sources: BTreeMap<String, RawSpec>,
    #[serde(default)]
    patches: BTreeMap<String, Vec<RawPatch>>,
}

fn definition(message: impl Into<String>) -> RecipeError {
    RecipeError::Definition {
        message: message.into(),
    }
}

fn parse_version(input: &str) -> Result<Version, RecipeError> {
    Version::parse(input).map_err(|e| definition(e.to_string()))
}

impl RawSource {
    fn into_source(self, version: &str) -> Result<SourceRef, RecipeError> {
        let urls = match self.url {
            OneOrMany::One(url) => vec![url],
            OneOrMany::Many(urls) => urls,
        };
        if urls.is_empty() {
            return Err(definition(format!("{version}: no source url")));
        }

        let checksum = match (self.sha256, self.md5, self.blake3) {
            (Some(v), None, None) => Checksum::new(ChecksumAlgorithm::Sha256, &v),
            (None, Some(v), None) => Checksum::new(ChecksumAlgorithm::Md5, &v),
            (None, None, Some(v)) => Checksum::new(ChecksumAlgorithm::Blake3, &v),
            _ => {
                return Err(definition(format!(
                    "{version}: exactly one of sha256, md5 or blake3 is required"
                )))
            }
        };
        if !checksum.is_well_formed() {
            return Err(definition(format!("{version}: malformed checksum {checksum}")));
        }

        Ok(SourceRef {
            urls,
            checksum,
            strip_root: self.strip_root.unwrap_or(true),
        })
    }
}

impl SourceTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML source table
    ///
    /// # Errors
    /// Returns `RecipeError::Definition` on syntax errors, unparsable versions,
    /// missing or malformed checksums, or patches for unknown versions.
    pub fn from_toml(input: &str) -> Result<Self, RecipeError> {
        let raw: RawTable = toml::from_str(input).map_err(|e| definition(e.to_string()))?;
        let mut table = Self::new();

        for (version, spec) in raw.sources {
            let parsed = parse_version(&version)?;
            let spec = match spec {
                RawSpec::Archive(source) => SourceSpec::Archive(source.into_source(&version)?),
                RawSpec::Platform(by_os) => {
                    let mut platforms = BTreeMap::new();
                    for (os, by_arch) in by_os {
                        let mut arches = BTreeMap::new();
                        for (arch, source) in by_arch {
                            arches.insert(arch, source.into_source(&version)?);
                        }
                        platforms.insert(os, arches);
                    }
                    SourceSpec::Platform(platforms)
                }
            };
            table.sources.insert(parsed, spec);
        }

        for (version, patches) in raw.patches {
            let parsed = parse_version(&version)?;
            if !table.sources.contains_key(&parsed) {
                return Err(definition(format!("patches for unknown version {version}")));
            }
            let patches = patches
                .into_iter()
                .map(|p| Patch::Edit {
                    description: p.description,
                    edit: FileEdit::replace(p.file, &p.from, &p.to),
                })
                .collect();
            table.patches.insert(parsed, patches);
        }

        Ok(table)
    }

    #[must_use]
    pub fn with_source(mut self, version: Version, spec: SourceSpec) -> Self {
        self.sources.insert(version, spec);
        self
    }

    #[must_use]
    pub fn with_patch(mut self, version: Version, patch: Patch) -> Self {
        self.patches.entry(version).or_default().push(patch);
        self
    }

    /// Known versions, oldest first
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        self.sources.keys()
    }

    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        self.sources.contains_key(version)
    }

    #[must_use]
    pub fn get(&self, version: &Version) -> Option<&SourceSpec> {
        self.sources.get(version)
    }

    #[must_use]
    pub fn patches(&self, version: &Version) -> &[Patch] {
        self.patches.get(version).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Archive for a version and platform key; single archives ignore the key
    #[must_use]
    pub fn lookup(&self, version: &Version, os: &str, arch: &str) -> Option<&SourceRef> {
        match self.sources.get(version)? {
            SourceSpec::Archive(source) => Some(source),
            SourceSpec::Platform(by_os) => by_os.get(os)?.get(arch),
        }
    }

    /// Default source plan for a context
    ///
    /// # Errors
    /// Returns `UnknownVersion` or `MissingSource` when no archive applies.
    pub fn plan(&self, ctx: &RecipeContext) -> Result<SourcePlan, RecipeError> {
        let arch = ctx.settings().arch.map_or("", |a| a.as_str());
        self.plan_for(ctx, arch)
    }

    /// Source plan using an explicit architecture key, e.g. `universal`
    ///
    /// # Errors
    /// Returns `UnknownVersion` or `MissingSource` when no archive applies.
    pub fn plan_for(&self, ctx: &RecipeContext, arch: &str) -> Result<SourcePlan, RecipeError> {
        let version = ctx.version();
        if !self.contains(version) {
            return Err(RecipeError::UnknownVersion {
                name: ctx.name().to_string(),
                version: version.to_string(),
            });
        }
        let os = ctx.settings().os.map_or("", |o| o.as_str());
        let archive = self
            .lookup(version, os, arch)
            .cloned()
            .ok_or_else(|| RecipeError::MissingSource {
                reference: ctx.reference().to_string(),
                os: os.to_string(),
                arch: arch.to_string(),
            })?;
        Ok(SourcePlan {
            archive,
            patches: self.patches(version).to_vec(),
        })
    }
}
