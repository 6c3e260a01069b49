//! Local package cache
//!
//! Layout: `<root>/<name>/<version>/<package_id>/{package/, cpkginfo.json}`.
//! Entries are built in a staging folder next to their final location and
//! published with a single rename, so readers never observe a partial
//! package. An entry without `cpkginfo.json` does not exist.

use cpkg_errors::{Error, PackageError};
use cpkg_recipe::{PackageInfo, Requirement};
use cpkg_types::{PackageType, Reference, Settings, Version, VersionRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Metadata file stored beside the package root
pub const METADATA_FILE: &str = "cpkginfo.json";

/// Name of the package root inside an entry
pub const PACKAGE_DIR: &str = "package";

/// Setting dimensions a consumer must share with a binary it links
const BINARY_DIMENSIONS: [&str; 3] = ["os", "arch", "build_type"];

/// Everything published about one binary package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub reference: Reference,
    pub package_id: String,
    pub package_type: PackageType,
    pub settings: BTreeMap<String, String>,
    /// Settings kept in the package id; an erased dimension fits any consumer
    #[serde(default)]
    pub binary_settings: BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
    pub info: PackageInfo,
    /// Requirements consumers must be able to resolve
    #[serde(default)]
    pub requires: Vec<Requirement>,
}

impl PackageMetadata {
    /// Whether a consumer built with `settings` can use this binary
    #[must_use]
    pub fn fits(&self, settings: &BTreeMap<String, String>) -> bool {
        BINARY_DIMENSIONS
            .iter()
            .all(|key| match self.binary_settings.get(*key) {
                Some(value) => settings.get(*key) == Some(value),
                None => true,
            })
    }
}

/// A committed cache entry
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub metadata: PackageMetadata,
    /// The `<package_id>` folder
    pub path: PathBuf,
}

impl CacheEntry {
    /// Absolute package root
    #[must_use]
    pub fn package_folder(&self) -> PathBuf {
        self.path.join(PACKAGE_DIR)
    }
}

/// Result of publishing a staged package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed(PathBuf),
    /// Another pass published the same package id first; the staged copy was
    /// discarded
    AlreadyPresent(PathBuf),
}

impl CommitOutcome {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Committed(path) | Self::AlreadyPresent(path) => path,
        }
    }
}

/// The on-disk package cache
#[derive(Debug, Clone)]
pub struct PackageCache {
    root: PathBuf,
}

impl PackageCache {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, reference: &Reference) -> PathBuf {
        self.root
            .join(&reference.name)
            .join(reference.version.as_str())
    }

    /// Folder of the entry for `reference` and `package_id`
    #[must_use]
    pub fn entry_path(&self, reference: &Reference, package_id: &str) -> PathBuf {
        self.version_dir(reference).join(package_id)
    }

    /// Read an entry, if it was committed
    ///
    /// # Errors
    /// Returns `Corrupted` if the metadata exists but cannot be parsed.
    pub async fn lookup(
        &self,
        reference: &Reference,
        package_id: &str,
    ) -> Result<Option<CacheEntry>, Error> {
        read_entry(&self.entry_path(reference, package_id)).await
    }

    /// A fresh staging folder beside the final entry location
    ///
    /// The folder is removed when the returned guard drops, unless it was
    /// committed.
    ///
    /// # Errors
    /// Returns an I/O error if the version folder cannot be created.
    pub async fn staging(&self, reference: &Reference) -> Result<TempDir, Error> {
        let parent = self.version_dir(reference);
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| Error::io_with_path(&e, &parent))?;
        tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&parent)
            .map_err(|e| Error::io_with_path(&e, &parent))
    }

    /// Write the metadata into `staging` and publish it atomically
    ///
    /// `staging` must come from [`PackageCache::staging`] for the same
    /// reference and hold the package root under `package/`.
    ///
    /// # Errors
    /// Returns `CommitFailed` if the metadata cannot be written or the rename
    /// fails for a reason other than a concurrent commit.
    pub async fn commit(
        &self,
        staging: TempDir,
        metadata: &PackageMetadata,
    ) -> Result<CommitOutcome, Error> {
        let reference = metadata.reference.to_string();
        let commit_failed = |message: String| -> Error {
            PackageError::CommitFailed {
                reference: reference.clone(),
                message,
            }
            .into()
        };

        let target = self.entry_path(&metadata.reference, &metadata.package_id);
        if target.join(METADATA_FILE).is_file() {
            return Ok(CommitOutcome::AlreadyPresent(target));
        }

        let json = serde_json::to_vec_pretty(metadata).map_err(|e| commit_failed(e.to_string()))?;
        let staged_metadata = staging.path().join(METADATA_FILE);
        tokio::fs::write(&staged_metadata, json)
            .await
            .map_err(|e| commit_failed(format!("{}: {e}", staged_metadata.display())))?;

        match tokio::fs::rename(staging.path(), &target).await {
            Ok(()) => Ok(CommitOutcome::Committed(target)),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::AlreadyExists | std::io::ErrorKind::DirectoryNotEmpty
                ) =>
            {
                Ok(CommitOutcome::AlreadyPresent(target))
            }
            Err(e) => Err(commit_failed(format!("{}: {e}", target.display()))),
        }
    }

    /// Rewrite the metadata of a committed entry
    ///
    /// The package root is left alone. The new file replaces the old one with
    /// a rename, so readers see one or the other.
    ///
    /// # Errors
    /// Returns `CommitFailed` if the file cannot be written.
    pub async fn refresh_metadata(
        &self,
        entry: &CacheEntry,
        metadata: &PackageMetadata,
    ) -> Result<(), Error> {
        let commit_failed = |message: String| -> Error {
            PackageError::CommitFailed {
                reference: metadata.reference.to_string(),
                message,
            }
            .into()
        };

        let json = serde_json::to_vec_pretty(metadata).map_err(|e| commit_failed(e.to_string()))?;
        let target = entry.path.join(METADATA_FILE);
        let staged = tempfile::Builder::new()
            .prefix(".cpkginfo-")
            .tempfile_in(&entry.path)
            .map_err(|e| commit_failed(format!("{}: {e}", entry.path.display())))?;
        tokio::fs::write(staged.path(), json)
            .await
            .map_err(|e| commit_failed(format!("{}: {e}", staged.path().display())))?;
        staged
            .persist(&target)
            .map_err(|e| commit_failed(format!("{}: {}", target.display(), e.error)))?;
        Ok(())
    }

    /// Cached versions of `name`, ascending
    ///
    /// # Errors
    /// Returns an I/O error if the name folder exists but cannot be read.
    pub async fn versions(&self, name: &str) -> Result<Vec<Version>, Error> {
        let mut versions: Vec<Version> = list_dirs(&self.root.join(name))
            .await?
            .iter()
            .filter_map(|dir| Version::parse(dir).ok())
            .collect();
        versions.sort();
        Ok(versions)
    }

    /// Committed entries of one reference, ordered by package id
    ///
    /// # Errors
    /// Returns `Corrupted` for unreadable metadata.
    pub async fn entries(&self, reference: &Reference) -> Result<Vec<CacheEntry>, Error> {
        let dir = self.version_dir(reference);
        let mut entries = Vec::new();
        for id in list_dirs(&dir).await? {
            if id.starts_with('.') {
                continue;
            }
            if let Some(entry) = read_entry(&dir.join(id)).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// The highest cached version of `name` within `range` with a binary
    /// that fits `settings`
    ///
    /// A binary fits when its os, arch and build type match the consumer's,
    /// or were erased from its package id. Among several fitting binaries of
    /// one version the first package id wins.
    ///
    /// # Errors
    /// Returns `Corrupted` for unreadable metadata.
    pub async fn find_best(
        &self,
        name: &str,
        range: &VersionRange,
        settings: &Settings,
    ) -> Result<Option<CacheEntry>, Error> {
        let wanted = settings.to_pairs();
        let versions = self.versions(name).await?;
        let mut candidates: Vec<&Version> =
            versions.iter().filter(|v| range.matches(v)).collect();
        candidates.reverse();
        for version in candidates {
            let reference = Reference::new(name, version.clone());
            let fitting = self
                .entries(&reference)
                .await?
                .into_iter()
                .find(|entry| entry.metadata.fits(&wanted));
            if let Some(entry) = fitting {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Every committed entry, ordered by name, version and package id
    ///
    /// # Errors
    /// Returns `Corrupted` for unreadable metadata.
    pub async fn list(&self) -> Result<Vec<CacheEntry>, Error> {
        let mut all = Vec::new();
        for name in list_dirs(&self.root).await? {
            for version in self.versions(&name).await? {
                all.extend(self.entries(&Reference::new(name.clone(), version)).await?);
            }
        }
        Ok(all)
    }
}

async fn read_entry(path: &Path) -> Result<Option<CacheEntry>, Error> {
    let metadata_path = path.join(METADATA_FILE);
    let bytes = match tokio::fs::read(&metadata_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io_with_path(&e, &metadata_path)),
    };
    let metadata: PackageMetadata =
        serde_json::from_slice(&bytes).map_err(|e| PackageError::Corrupted {
            path: metadata_path.display().to_string(),
            message: e.to_string(),
        })?;
    Ok(Some(CacheEntry {
        metadata,
        path: path.to_path_buf(),
    }))
}

/// Sorted names of the sub-folders of `dir`; empty if `dir` is missing
async fn list_dirs(dir: &Path) -> Result<Vec<String>, Error> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io_with_path(&e, dir)),
    };
    let mut names = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(&e, dir))?
    {
        let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
        if is_dir {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpkg_types::{Arch, BuildType, Os};

    fn metadata(reference: &str, package_id: &str) -> PackageMetadata {
        PackageMetadata {
            reference: Reference::parse(reference).unwrap(),
            package_id: package_id.to_string(),
            package_type: PackageType::StaticLibrary,
            settings: BTreeMap::new(),
            binary_settings: BTreeMap::new(),
            options: BTreeMap::new(),
            info: PackageInfo::default(),
            requires: Vec::new(),
        }
    }

    async fn publish(cache: &PackageCache, reference: &str, package_id: &str) -> CommitOutcome {
        publish_metadata(cache, metadata(reference, package_id)).await
    }

    async fn publish_metadata(cache: &PackageCache, metadata: PackageMetadata) -> CommitOutcome {
        let staging = cache.staging(&metadata.reference).await.unwrap();
        std::fs::create_dir_all(staging.path().join("package/include")).unwrap();
        std::fs::write(staging.path().join("package/include/zlib.h"), "").unwrap();
        cache.commit(staging, &metadata).await.unwrap()
    }

    #[tokio::test]
    async fn commit_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path());

        let outcome = publish(&cache, "zlib/1.3.1", "abc").await;
        assert!(matches!(outcome, CommitOutcome::Committed(_)));

        let reference = Reference::parse("zlib/1.3.1").unwrap();
        let entry = cache.lookup(&reference, "abc").await.unwrap().unwrap();
        assert_eq!(entry.metadata.package_id, "abc");
        assert!(entry.package_folder().join("include/zlib.h").is_file());
        assert!(cache.lookup(&reference, "def").await.unwrap().is_none());

        // No staging leftovers
        let names = list_dirs(&dir.path().join("zlib/1.3.1")).await.unwrap();
        assert_eq!(names, ["abc"]);
    }

    #[tokio::test]
    async fn second_commit_keeps_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path());

        publish(&cache, "zlib/1.3.1", "abc").await;
        let outcome = publish(&cache, "zlib/1.3.1", "abc").await;
        assert!(matches!(outcome, CommitOutcome::AlreadyPresent(_)));
        let names = list_dirs(&dir.path().join("zlib/1.3.1")).await.unwrap();
        assert_eq!(names, ["abc"]);
    }

    #[tokio::test]
    async fn best_version_within_range() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path());
        publish(&cache, "zlib/1.2.11", "a").await;
        publish(&cache, "zlib/1.3.1", "b").await;
        publish(&cache, "zlib/2.0.0", "c").await;

        let range: VersionRange = "[>=1.2.11 <2]".parse().unwrap();
        let any = Settings::new();
        let best = cache.find_best("zlib", &range, &any).await.unwrap().unwrap();
        assert_eq!(best.metadata.reference.to_string(), "zlib/1.3.1");

        let pinned: VersionRange = "1.6.40".parse().unwrap();
        assert!(cache.find_best("libpng", &pinned, &any).await.unwrap().is_none());
        assert_eq!(cache.list().await.unwrap().len(), 3);
    }

    fn binary(package_id: &str, os: Os, build_type: BuildType) -> PackageMetadata {
        let settings = Settings::new()
            .with_os(os)
            .with_arch(Arch::X86_64)
            .with_build_type(build_type)
            .to_pairs();
        PackageMetadata {
            settings: settings.clone(),
            binary_settings: settings,
            ..metadata("zlib/1.3.1", package_id)
        }
    }

    #[tokio::test]
    async fn best_binary_fits_the_consumer() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path());
        publish_metadata(&cache, binary("a-windows", Os::Windows, BuildType::Release)).await;
        publish_metadata(&cache, binary("b-linux", Os::Linux, BuildType::Release)).await;

        let range: VersionRange = "1.3.1".parse().unwrap();
        let linux = Settings::new()
            .with_os(Os::Linux)
            .with_arch(Arch::X86_64)
            .with_build_type(BuildType::Release);
        let best = cache.find_best("zlib", &range, &linux).await.unwrap().unwrap();
        assert_eq!(best.metadata.package_id, "b-linux");

        let debug = linux.with_build_type(BuildType::Debug);
        assert!(cache.find_best("zlib", &range, &debug).await.unwrap().is_none());

        // An erased dimension fits every consumer
        let mut any_build_type = binary("c-any", Os::Linux, BuildType::Release);
        any_build_type.binary_settings.remove("build_type");
        publish_metadata(&cache, any_build_type).await;
        let best = cache.find_best("zlib", &range, &debug).await.unwrap().unwrap();
        assert_eq!(best.metadata.package_id, "c-any");
    }

    #[tokio::test]
    async fn refreshed_metadata_replaces_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path());
        publish(&cache, "zlib/1.3.1", "abc").await;
        let reference = Reference::parse("zlib/1.3.1").unwrap();
        let entry = cache.lookup(&reference, "abc").await.unwrap().unwrap();

        let mut updated = entry.metadata.clone();
        updated.info.cpp.defines.push("ZLIB_CONST".to_string());
        cache.refresh_metadata(&entry, &updated).await.unwrap();

        let reread = cache.lookup(&reference, "abc").await.unwrap().unwrap();
        assert_eq!(reread.metadata, updated);
        assert!(reread.package_folder().join("include/zlib.h").is_file());
        let names: Vec<_> = std::fs::read_dir(&entry.path)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "{names:?}");
    }

    #[tokio::test]
    async fn unreadable_metadata_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PackageCache::new(dir.path());
        let entry = dir.path().join("zlib/1.3.1/abc");
        std::fs::create_dir_all(&entry).unwrap();
        std::fs::write(entry.join(METADATA_FILE), "{ not json").unwrap();

        let err = cache
            .lookup(&Reference::parse("zlib/1.3.1").unwrap(), "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Package(PackageError::Corrupted { .. })));
    }
}
