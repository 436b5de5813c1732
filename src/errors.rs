//! Domain error kinds callers discriminate on.
//!
//! Most failures propagate as plain [`anyhow::Error`] with context attached at
//! the failure site. The variants here are the ones with contractual meaning:
//! a caller may downcast to [`IndexError`] to tell a corrupt cache file from a
//! held lock or an unmerged entry.

use std::path::PathBuf;
use thiserror::Error;

/// Failure kinds surfaced by index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The cache file violates the on-disk format: bad signature, unsupported
    /// version, truncated record, length-prefix overflow or digest mismatch.
    #[error("corrupt index: {0}")]
    Corrupt(String),

    /// `<index>.lock` already exists; another writer holds the lock.
    #[error("Index file is in use")]
    Busy,

    /// A write was attempted while an entry still carries a merge stage.
    #[error("won't write corrupt index: entry '{path}' is at stage {stage}")]
    UnmergedEntry { path: String, stage: u8 },

    /// `add`/`remove` was given a file that does not live under the working
    /// directory.
    #[error("path '{shown}' lies outside the working directory '{root}'", shown = .path.display(), root = .workdir.display())]
    OutsideWorkdir { path: PathBuf, workdir: PathBuf },
}
