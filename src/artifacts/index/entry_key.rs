//! Canonical entry keys and their ordering.
//!
//! Entries are keyed by the raw bytes of their workdir-relative path,
//! `/`-separated regardless of platform. Ordering is unsigned-lexicographic
//! over those bytes, with a full prefix sorting before any extension: the
//! `memcmp`-plus-length ordering the on-disk format requires.
//!
//! Keys are normalized once, at construction; inserts and lookups therefore
//! always agree.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::path::{Component, Path};

/// Normalized, byte-ordered key of an index entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey(String);

impl EntryKey {
    /// Build a key from a workdir-relative path, converting platform
    /// separators to `/`.
    ///
    /// Rejects absolute paths, `..` components and non-UTF-8 names.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let mut name = String::new();

        for component in path.components() {
            match component {
                Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in path {path:?}"))?;
                    if !name.is_empty() {
                        name.push('/');
                    }
                    name.push_str(part);
                }
                Component::CurDir => {}
                _ => {
                    return Err(anyhow::anyhow!(
                        "Path {path:?} is not a plain workdir-relative path"
                    ));
                }
            }
        }

        if name.is_empty() {
            return Err(anyhow::anyhow!("Empty entry path"));
        }

        Ok(EntryKey(name))
    }

    /// Build a key from an already `/`-separated entry name.
    pub fn from_name(name: &str) -> Self {
        EntryKey(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Ord for EntryKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // byte-wise, not component-wise: "a.txt" sorts before "a/b"
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl PartialOrd for EntryKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Borrow<str> for EntryKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
