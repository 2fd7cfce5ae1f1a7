//! Expansion of glob fragments against the file system.

use std::path::{Path, PathBuf};

use crate::domain::errors::FileSystemError;
use crate::domain::fragment::GlobFragment;
use crate::domain::path::{normalize_path_for_comparison, relative_to};
use crate::infra::fs::{FileSystem, SearchOption};

/// Files matched by `glob`, as includes relative to `project_directory`.
///
/// Files outside the project directory keep their normalized absolute form.
/// A missing base directory yields nothing.
pub fn expand_glob(
    file_system: &dyn FileSystem,
    glob: &GlobFragment,
    project_directory: &Path,
) -> Result<Vec<String>, FileSystemError> {
    let (base, remainder) = glob.split_fixed_directory();
    let base = if base.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(base)
    };
    if !file_system.directory_exists(&base) {
        tracing::debug!(glob = glob.text(), base = %base.display(), "glob base directory missing");
        return Ok(Vec::new());
    }

    let option = if remainder.contains('/') || remainder.contains("**") {
        SearchOption::AllDirectories
    } else {
        SearchOption::TopDirectoryOnly
    };

    let project_key = normalize_path_for_comparison("", project_directory);
    let mut includes: Vec<String> = file_system
        .enumerate_files(&base, "*", option)?
        .into_iter()
        .map(|path| normalize_path_for_comparison(&path.to_string_lossy(), Path::new("")))
        .filter(|key| glob.is_match(key))
        .map(|key| match relative_to(&key, &project_key) {
            Some(relative) => relative.to_owned(),
            None => key,
        })
        .collect();
    includes.sort();

    tracing::trace!(glob = glob.text(), matched = includes.len(), "expanded glob");
    Ok(includes)
}
