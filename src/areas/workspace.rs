//! Working-tree access.
//!
//! The workspace is the checked-out file tree the index reconciles against:
//! it enumerates candidate files, relativizes paths against the root and
//! carries the executable-bit primitives used when modes are tracked.

use crate::errors::IndexError;
use anyhow::Context;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IGNORED_PATHS: [&str; 3] = [".git", ".", ".."];

#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List the files below `root_file_path` (the whole workspace when
    /// `None`), as paths relative to the workspace root. The repository
    /// directory is never listed.
    pub fn list_files(&self, root_file_path: Option<PathBuf>) -> anyhow::Result<Vec<PathBuf>> {
        let root_file_path = match root_file_path {
            Some(path) => std::fs::canonicalize(path)?,
            None => self.path.clone().into(),
        };

        if !root_file_path.exists() {
            anyhow::bail!("The specified path does not exist: {:?}", root_file_path);
        }

        if root_file_path.is_dir() {
            Ok(WalkDir::new(&root_file_path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| self.check_if_not_ignored_file_path(entry.path()))
                .collect::<Vec<_>>())
        } else {
            Ok(vec![strip_work_dir(&self.path, &root_file_path)?])
        }
    }

    pub fn read_bytes(&self, file_path: &Path) -> anyhow::Result<bytes::Bytes> {
        let file_path = self.path.join(file_path);

        let content = std::fs::read(&file_path)
            .context(format!("Unable to read file {}", file_path.display()))?;

        Ok(bytes::Bytes::from(content))
    }

    fn is_ignored(path: &Path) -> bool {
        path.components().any(|component| {
            if let std::path::Component::Normal(name) = component {
                let name = name.to_string_lossy();
                IGNORED_PATHS.contains(&name.as_ref())
            } else {
                false
            }
        })
    }

    fn check_if_not_ignored_file_path(&self, path: &Path) -> Option<PathBuf> {
        if path.is_file() && !Self::is_ignored(path) {
            Some(path.strip_prefix(self.path.as_ref()).ok()?.to_path_buf())
        } else {
            None
        }
    }
}

/// Relativize `file` against `workdir`, failing when it lies outside.
pub fn strip_work_dir(workdir: &Path, file: &Path) -> anyhow::Result<PathBuf> {
    let file = if file.is_absolute() {
        file.to_path_buf()
    } else {
        workdir.join(file)
    };

    file.strip_prefix(workdir)
        .map(Path::to_path_buf)
        .map_err(|_| {
            IndexError::OutsideWorkdir {
                path: file.clone(),
                workdir: workdir.to_path_buf(),
            }
            .into()
        })
}

/// Whether this platform tracks an executable bit at all.
pub fn supports_executable() -> bool {
    cfg!(unix)
}

/// Set or clear the executable bits of `file`.
#[cfg(unix)]
pub fn set_executable(file: &Path, executable: bool) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = if executable { 0o755 } else { 0o644 };
    let permissions = std::fs::Permissions::from_mode(mode);
    std::fs::set_permissions(file, permissions)
        .context(format!("Failed to set permissions for {}", file.display()))
}

#[cfg(not(unix))]
pub fn set_executable(_file: &Path, _executable: bool) -> anyhow::Result<()> {
    Ok(())
}
