//! Path helpers shared by the patch and package steps

use cpkg_errors::{Error, PackageError};
use std::path::{Component, Path, PathBuf};

/// Join a recipe-supplied relative path onto `root`
///
/// # Errors
/// Returns `PathEscape` for absolute paths and paths containing `..`.
pub fn safe_join(root: &Path, relative: &Path) -> Result<PathBuf, Error> {
    let mut joined = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PackageError::PathEscape {
                    path: relative.display().to_string(),
                }
                .into())
            }
        }
    }
    Ok(joined)
}

/// Forward-slash rendering used in generated files, on every platform
#[must_use]
pub fn slashed(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_relative_paths() {
        let root = Path::new("/pkg");
        assert_eq!(
            safe_join(root, Path::new("./include/dlpack")).unwrap(),
            Path::new("/pkg/include/dlpack")
        );
        assert_eq!(safe_join(root, Path::new("")).unwrap(), root);
    }

    #[test]
    fn rejects_escapes() {
        let root = Path::new("/pkg");
        assert!(safe_join(root, Path::new("../etc")).is_err());
        assert!(safe_join(root, Path::new("lib/../../x")).is_err());
        assert!(safe_join(root, Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn backslashes_become_slashes() {
        assert_eq!(slashed(Path::new(r"C:\pkg\include")), "C:/pkg/include");
    }
}
