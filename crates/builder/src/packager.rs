//! Runs a recipe's package plan against the staging package root

use crate::build_systems::{BuildSystem, BuildSystemContext};
use crate::paths::safe_join;
use cpkg_errors::{BuildError, Error, PackageError};
use cpkg_events::{AppEvent, EventEmitter, PackageEvent};
use cpkg_recipe::{CopySpec, Origin, PackagePlan, PackageStep};
use globset::{Glob, GlobMatcher};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Folders a package plan reads from and writes to
#[derive(Debug, Clone)]
pub struct PackageRoots {
    pub source: PathBuf,
    pub build: PathBuf,
    pub package: PathBuf,
}

impl PackageRoots {
    fn origin(&self, origin: Origin) -> &Path {
        match origin {
            Origin::Source => &self.source,
            Origin::Build => &self.build,
            Origin::Package => &self.package,
        }
    }
}

/// The build tool used by `Install` steps
pub type Installer<'a> = (&'a dyn BuildSystem, &'a BuildSystemContext);

/// Execute every step of `plan` in order
///
/// # Errors
/// Fails on the first step that fails; the package root is left as it is for
/// the caller to discard.
pub async fn run_plan<E: EventEmitter + ?Sized>(
    plan: &PackagePlan,
    roots: &PackageRoots,
    installer: Option<Installer<'_>>,
    events: &E,
) -> Result<(), Error> {
    tokio::fs::create_dir_all(&roots.package)
        .await
        .map_err(|e| Error::io_with_path(&e, &roots.package))?;

    for step in &plan.steps {
        match step {
            PackageStep::Copy(spec) => {
                let count = copy(spec, roots).await?;
                events.emit(AppEvent::Package(PackageEvent::FilesCopied {
                    pattern: spec.pattern.clone(),
                    count,
                }));
            }
            PackageStep::Install => match installer {
                Some((system, ctx)) => system.install(ctx).await?,
                None => {
                    return Err(BuildError::InstallFailed {
                        message: "this build has no install target".to_string(),
                    }
                    .into())
                }
            },
            PackageStep::RemoveDir { path } => {
                let target = safe_join(&roots.package, path)?;
                if target.is_dir() {
                    tokio::fs::remove_dir_all(&target)
                        .await
                        .map_err(|e| Error::io_with_path(&e, &target))?;
                    events.emit(AppEvent::Package(PackageEvent::Removed { path: target }));
                }
            }
            PackageStep::Remove {
                pattern,
                path,
                recursive,
            } => {
                let dir = safe_join(&roots.package, path)?;
                for removed in remove_matching(&dir, pattern, *recursive)? {
                    events.emit(AppEvent::Package(PackageEvent::Removed { path: removed }));
                }
            }
            PackageStep::Save { path, contents } => {
                let target = safe_join(&roots.package, path)?;
                write_file(&target, contents).await?;
            }
            PackageStep::Rename { from, to } => {
                let from = safe_join(&roots.package, from)?;
                let to = safe_join(&roots.package, to)?;
                if !from.exists() {
                    return Err(PackageError::CopyFailed {
                        path: from.display().to_string(),
                        message: "nothing to rename".to_string(),
                    }
                    .into());
                }
                create_parent(&to).await?;
                tokio::fs::rename(&from, &to)
                    .await
                    .map_err(|e| Error::io_with_path(&e, &from))?;
            }
            PackageStep::ExtractSection {
                origin,
                src,
                marker,
                dst,
            } => {
                let source = safe_join(roots.origin(*origin), src)?;
                let text = tokio::fs::read_to_string(&source)
                    .await
                    .map_err(|e| Error::io_with_path(&e, &source))?;
                let section = extract_section(&text, marker).ok_or_else(|| {
                    PackageError::CopyFailed {
                        path: source.display().to_string(),
                        message: format!("no line mentions `{marker}`"),
                    }
                })?;
                write_file(&safe_join(&roots.package, dst)?, section).await?;
            }
        }
    }
    Ok(())
}

fn matcher(pattern: &str) -> Result<GlobMatcher, Error> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| {
            PackageError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            }
            .into()
        })
}

fn walker(root: &Path, max_depth: Option<usize>) -> ignore::Walk {
    WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .max_depth(max_depth)
        .build()
}

/// Copy files matching a glob; `*` also matches `/`, so `*.h` finds headers at
/// any depth
async fn copy(spec: &CopySpec, roots: &PackageRoots) -> Result<usize, Error> {
    let from = safe_join(roots.origin(spec.origin), &spec.src)?;
    let to = safe_join(&roots.package, &spec.dst)?;
    let matcher = matcher(&spec.pattern)?;
    let keep_path = spec.keep_path;

    tokio::task::spawn_blocking(move || copy_matching(&from, &matcher, &to, keep_path))
        .await
        .map_err(|e| Error::internal(format!("copy task failed: {e}")))?
}

fn copy_matching(
    from: &Path,
    matcher: &GlobMatcher,
    to: &Path,
    keep_path: bool,
) -> Result<usize, Error> {
    if !from.is_dir() {
        return Ok(0);
    }

    let copy_failed = |path: &Path, e: &dyn std::fmt::Display| -> Error {
        PackageError::CopyFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        }
        .into()
    };

    // Collect first so copies into a folder below `from` are not revisited
    let mut matches = Vec::new();
    for entry in walker(from, None) {
        let entry = entry.map_err(|e| copy_failed(from, &e))?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        if matcher.is_match(relative) {
            matches.push(relative.to_path_buf());
        }
    }

    for relative in &matches {
        let target = if keep_path {
            to.join(relative)
        } else {
            match relative.file_name() {
                Some(name) => to.join(name),
                None => continue,
            }
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| copy_failed(parent, &e))?;
        }
        let source = from.join(relative);
        std::fs::copy(&source, &target).map_err(|e| copy_failed(&source, &e))?;
    }
    Ok(matches.len())
}

/// Delete files whose name matches `pattern`
fn remove_matching(dir: &Path, pattern: &str, recursive: bool) -> Result<Vec<PathBuf>, Error> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let matcher = matcher(pattern)?;
    let depth = if recursive { None } else { Some(1) };

    let mut removed = Vec::new();
    for entry in walker(dir, depth) {
        let entry = entry.map_err(|e| Error::internal(e.to_string()))?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if entry
            .path()
            .file_name()
            .is_some_and(|name| matcher.is_match(name))
        {
            std::fs::remove_file(entry.path())
                .map_err(|e| Error::io_with_path(&e, entry.path()))?;
            removed.push(entry.into_path());
        }
    }
    Ok(removed)
}

/// Text after the first line containing `marker`, ignoring case, with
/// surrounding `*` and whitespace trimmed
///
/// The marker line must follow a newline, so the opening line never matches.
#[must_use]
pub fn extract_section(text: &str, marker: &str) -> Option<String> {
    let marker = marker.to_lowercase();
    let mut lines = text.split_inclusive('\n');
    let mut offset = lines.next()?.len();
    for line in lines {
        offset += line.len();
        if line.to_lowercase().contains(&marker) {
            return Some(text[offset..].trim().trim_matches('*').trim().to_string());
        }
    }
    None
}

async fn create_parent(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io_with_path(&e, parent))?;
    }
    Ok(())
}

async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), Error> {
    create_parent(path).await?;
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| Error::io_with_path(&e, path))
}
