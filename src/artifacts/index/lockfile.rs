//! Advisory lockfile guarding index writes.
//!
//! The lock is the exclusive creation of `<index>.lock`; its contents are
//! unused. Acquisition never blocks: a pre-existing lockfile fails the
//! operation immediately. The lock is removed on every exit path, explicitly
//! via [`Lockfile::release`] on success or by the drop guard otherwise.
//! A lockfile this process did not create is never deleted.

use crate::errors::IndexError;
use anyhow::Context;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Lockfile {
    path: PathBuf,
    held: bool,
}

impl Lockfile {
    /// Exclusively create the lockfile at `path`.
    pub fn acquire(path: &Path) -> anyhow::Result<Self> {
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(_) => Ok(Lockfile {
                path: path.to_path_buf(),
                held: true,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(IndexError::Busy.into())
            }
            Err(err) => Err(err).context(format!("unable to create lockfile {}", path.display())),
        }
    }

    /// Delete the lockfile, surfacing any failure to do so.
    pub fn release(mut self) -> anyhow::Result<()> {
        self.held = false;
        std::fs::remove_file(&self.path)
            .context(format!("unable to remove lockfile {}", self.path.display()))
    }
}

impl Drop for Lockfile {
    fn drop(&mut self) {
        if self.held {
            // best effort; an explicit release has already surfaced errors
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
