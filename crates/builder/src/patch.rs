//! Patches and source edits
//!
//! Patches run in declaration order right after extraction. Unified diffs go
//! through `patch -p1`; textual edits are applied in-process. A replacement
//! whose search text is missing fails instead of silently doing nothing, so a
//! stale patch is noticed when a version is bumped.

use crate::paths::safe_join;
use crate::runner::{CommandRunner, CommandSpec};
use cpkg_errors::{BuildError, Error};
use cpkg_events::{AppEvent, EventEmitter, SourceEvent};
use cpkg_recipe::{FileEdit, Patch};
use std::io::Write;
use std::path::Path;
use tokio::fs;

fn patch_failed(patch: impl Into<String>, message: impl Into<String>) -> Error {
    BuildError::PatchFailed {
        patch: patch.into(),
        message: message.into(),
    }
    .into()
}

/// Apply one textual edit below `root`
///
/// # Errors
/// Returns `PatchFailed` if a replacement's search text is absent or a file
/// to edit or rename does not exist, and `PathEscape` for paths leaving
/// `root`.
pub async fn apply_edit(root: &Path, edit: &FileEdit) -> Result<(), Error> {
    match edit {
        FileEdit::Replace { file, from, to } => {
            let path = safe_join(root, file)?;
            let contents = fs::read_to_string(&path)
                .await
                .map_err(|e| patch_failed(file.display().to_string(), e.to_string()))?;
            if !contents.contains(from.as_str()) {
                return Err(patch_failed(
                    file.display().to_string(),
                    format!("text not found: {from:?}"),
                ));
            }
            fs::write(&path, contents.replace(from.as_str(), to))
                .await
                .map_err(|e| Error::io_with_path(&e, &path))
        }
        FileEdit::Save { file, contents } => {
            let path = safe_join(root, file)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::io_with_path(&e, parent))?;
            }
            fs::write(&path, contents)
                .await
                .map_err(|e| Error::io_with_path(&e, &path))
        }
        FileEdit::Rename { from, to } => {
            let source = safe_join(root, from)?;
            let target = safe_join(root, to)?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::io_with_path(&e, parent))?;
            }
            fs::rename(&source, &target)
                .await
                .map_err(|e| patch_failed(from.display().to_string(), e.to_string()))
        }
        FileEdit::MakeDir { path } => {
            let dir = safe_join(root, path)?;
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| Error::io_with_path(&e, &dir))
        }
    }
}

/// Apply a unified diff with `patch -p1`
async fn apply_diff(
    root: &Path,
    description: &str,
    contents: &str,
    runner: &dyn CommandRunner,
) -> Result<(), Error> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;

    let command = CommandSpec::new("patch", root)
        .args(["-p1", "--forward", "--batch", "-i"])
        .path_arg(file.path());
    let output = runner.run(&command).await?;
    if output.success() {
        Ok(())
    } else {
        let mut message = output.stderr_tail(10);
        if message.is_empty() {
            message = output.stdout.lines().last().unwrap_or_default().to_string();
        }
        Err(patch_failed(description, message))
    }
}

/// Apply patches in order, stopping at the first failure
///
/// # Errors
/// Returns the first patch failure.
pub async fn apply_patches<E: EventEmitter + ?Sized>(
    root: &Path,
    patches: &[Patch],
    runner: &dyn CommandRunner,
    events: &E,
) -> Result<(), Error> {
    for patch in patches {
        match patch {
            Patch::Diff {
                description,
                contents,
            } => apply_diff(root, description, contents, runner).await?,
            Patch::Edit { description, edit } => {
                apply_edit(root, edit).await.map_err(|e| match e {
                    Error::Build(BuildError::PatchFailed { message, .. }) => {
                        patch_failed(description.as_str(), message)
                    }
                    other => other,
                })?;
            }
        }
        events.emit(AppEvent::Source(SourceEvent::PatchApplied {
            description: patch.description().to_string(),
        }));
    }
    Ok(())
}
