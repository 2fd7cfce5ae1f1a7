//! File system access used to expand globs.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use globset::{Glob, GlobMatcher};
use ignore::WalkBuilder;
use time::OffsetDateTime;

use crate::domain::errors::FileSystemError;

/// How deep an enumeration descends below the starting directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchOption {
    TopDirectoryOnly,
    AllDirectories,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EntryKind {
    Files,
    Directories,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileAttributes {
    pub directory: bool,
    pub read_only: bool,
    pub symlink: bool,
    pub hidden: bool,
}

/// Read-only view of the file system consulted during evaluation.
///
/// Enumeration patterns apply to entry file names (`*`, `?`, `*.rs`); the
/// order of returned paths carries no meaning.
pub trait FileSystem: Send + Sync + fmt::Debug {
    fn read_to_string(&self, path: &Path) -> Result<String, FileSystemError>;

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FileSystemError>;

    fn enumerate_files(
        &self,
        path: &Path,
        pattern: &str,
        option: SearchOption,
    ) -> Result<Vec<PathBuf>, FileSystemError>;

    fn enumerate_directories(
        &self,
        path: &Path,
        pattern: &str,
        option: SearchOption,
    ) -> Result<Vec<PathBuf>, FileSystemError>;

    fn enumerate_file_system_entries(
        &self,
        path: &Path,
        pattern: &str,
        option: SearchOption,
    ) -> Result<Vec<PathBuf>, FileSystemError>;

    fn attributes(&self, path: &Path) -> Result<FileAttributes, FileSystemError>;

    fn last_write_time_utc(&self, path: &Path) -> Result<OffsetDateTime, FileSystemError>;

    fn directory_exists(&self, path: &Path) -> bool;

    fn file_exists(&self, path: &Path) -> bool;

    fn file_or_directory_exists(&self, path: &Path) -> bool {
        self.file_exists(path) || self.directory_exists(path)
    }
}

/// [`FileSystem`] backed directly by `std::fs` and the `ignore` walker.
#[derive(Debug, Clone, Default)]
pub struct ManagedFileSystem {
    follow_links: bool,
}

impl ManagedFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    fn enumerate(
        &self,
        path: &Path,
        pattern: &str,
        option: SearchOption,
        kind: EntryKind,
    ) -> Result<Vec<PathBuf>, FileSystemError> {
        let matcher = compile_name_pattern(pattern)?;
        let mut builder = WalkBuilder::new(path);
        builder
            .standard_filters(false)
            .follow_links(self.follow_links)
            .max_depth(match option {
                SearchOption::TopDirectoryOnly => Some(1),
                SearchOption::AllDirectories => None,
            });

        let mut entries = Vec::new();
        for result in builder.build() {
            let entry = result.map_err(|source| FileSystemError::Walk {
                path: path.to_path_buf(),
                source,
            })?;
            if entry.depth() == 0 {
                continue;
            }
            let Some(file_type) = entry.file_type() else {
                continue;
            };
            // Unfollowed links are classified by their target; the walker
            // still does not descend into linked directories.
            let (is_file, is_dir) = if file_type.is_symlink() {
                (entry.path().is_file(), entry.path().is_dir())
            } else {
                (file_type.is_file(), file_type.is_dir())
            };
            let wanted = match kind {
                EntryKind::Files => is_file,
                EntryKind::Directories => is_dir,
                EntryKind::Any => true,
            };
            if wanted && matcher.is_match(entry.file_name()) {
                entries.push(entry.into_path());
            }
        }
        Ok(entries)
    }
}

fn compile_name_pattern(pattern: &str) -> Result<GlobMatcher, FileSystemError> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|source| FileSystemError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })
}

impl FileSystem for ManagedFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, FileSystemError> {
        fs::read_to_string(path).map_err(|err| FileSystemError::io(path, err))
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FileSystemError> {
        fs::read(path).map_err(|err| FileSystemError::io(path, err))
    }

    fn enumerate_files(
        &self,
        path: &Path,
        pattern: &str,
        option: SearchOption,
    ) -> Result<Vec<PathBuf>, FileSystemError> {
        self.enumerate(path, pattern, option, EntryKind::Files)
    }

    fn enumerate_directories(
        &self,
        path: &Path,
        pattern: &str,
        option: SearchOption,
    ) -> Result<Vec<PathBuf>, FileSystemError> {
        self.enumerate(path, pattern, option, EntryKind::Directories)
    }

    fn enumerate_file_system_entries(
        &self,
        path: &Path,
        pattern: &str,
        option: SearchOption,
    ) -> Result<Vec<PathBuf>, FileSystemError> {
        self.enumerate(path, pattern, option, EntryKind::Any)
    }

    fn attributes(&self, path: &Path) -> Result<FileAttributes, FileSystemError> {
        let link = fs::symlink_metadata(path).map_err(|err| FileSystemError::io(path, err))?;
        let metadata = if link.file_type().is_symlink() {
            fs::metadata(path).map_err(|err| FileSystemError::io(path, err))?
        } else {
            link.clone()
        };
        let hidden = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        Ok(FileAttributes {
            directory: metadata.is_dir(),
            read_only: metadata.permissions().readonly(),
            symlink: link.file_type().is_symlink(),
            hidden,
        })
    }

    fn last_write_time_utc(&self, path: &Path) -> Result<OffsetDateTime, FileSystemError> {
        let modified = fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .map_err(|err| FileSystemError::io(path, err))?;
        Ok(OffsetDateTime::from(modified))
    }

    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EnumerationKey {
    path: PathBuf,
    pattern: String,
    option: SearchOption,
    kind: EntryKind,
}

/// Memoizes enumerations for the lifetime of one evaluation.
///
/// Failed enumerations are not cached.
#[derive(Debug)]
pub struct CachingFileSystem {
    inner: Arc<dyn FileSystem>,
    enumerations: DashMap<EnumerationKey, Vec<PathBuf>>,
}

impl CachingFileSystem {
    pub fn new(inner: Arc<dyn FileSystem>) -> Self {
        Self {
            inner,
            enumerations: DashMap::new(),
        }
    }

    fn cached(
        &self,
        path: &Path,
        pattern: &str,
        option: SearchOption,
        kind: EntryKind,
    ) -> Result<Vec<PathBuf>, FileSystemError> {
        let key = EnumerationKey {
            path: path.to_path_buf(),
            pattern: pattern.to_owned(),
            option,
            kind,
        };
        if let Some(hit) = self.enumerations.get(&key) {
            return Ok(hit.clone());
        }
        let entries = match kind {
            EntryKind::Files => self.inner.enumerate_files(path, pattern, option),
            EntryKind::Directories => self.inner.enumerate_directories(path, pattern, option),
            EntryKind::Any => self.inner.enumerate_file_system_entries(path, pattern, option),
        }?;
        self.enumerations.insert(key, entries.clone());
        Ok(entries)
    }
}

impl FileSystem for CachingFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, FileSystemError> {
        self.inner.read_to_string(path)
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FileSystemError> {
        self.inner.read_bytes(path)
    }

    fn enumerate_files(
        &self,
        path: &Path,
        pattern: &str,
        option: SearchOption,
    ) -> Result<Vec<PathBuf>, FileSystemError> {
        self.cached(path, pattern, option, EntryKind::Files)
    }

    fn enumerate_directories(
        &self,
        path: &Path,
        pattern: &str,
        option: SearchOption,
    ) -> Result<Vec<PathBuf>, FileSystemError> {
        self.cached(path, pattern, option, EntryKind::Directories)
    }

    fn enumerate_file_system_entries(
        &self,
        path: &Path,
        pattern: &str,
        option: SearchOption,
    ) -> Result<Vec<PathBuf>, FileSystemError> {
        self.cached(path, pattern, option, EntryKind::Any)
    }

    fn attributes(&self, path: &Path) -> Result<FileAttributes, FileSystemError> {
        self.inner.attributes(path)
    }

    fn last_write_time_utc(&self, path: &Path) -> Result<OffsetDateTime, FileSystemError> {
        self.inner.last_write_time_utc(path)
    }

    fn directory_exists(&self, path: &Path) -> bool {
        self.inner.directory_exists(path)
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.inner.file_exists(path)
    }
}
