//! File-mode bits tracked per entry.
//!
//! Only the four mode words git actually writes are representable; anything
//! else on disk is treated as corruption by the codec.

/// Tracked file mode.
#[derive(Debug, Clone, Copy, Eq, Ord, Default, PartialEq, PartialOrd)]
pub enum EntryMode {
    #[default]
    Regular,
    Executable,
    Symlink,
    /// A subtree (inside tree objects) or gitlink (inside the index).
    Directory,
}

impl EntryMode {
    pub fn as_str(&self) -> &str {
        match self {
            EntryMode::Regular => "100644",
            EntryMode::Executable => "100755",
            EntryMode::Symlink => "120000",
            EntryMode::Directory => "40000",
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::Regular => 0o100644,
            EntryMode::Executable => 0o100755,
            EntryMode::Symlink => 0o120000,
            EntryMode::Directory => 0o40000,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    pub fn is_file(&self) -> bool {
        matches!(self, EntryMode::Regular | EntryMode::Executable)
    }
}

impl TryFrom<u32> for EntryMode {
    type Error = anyhow::Error;

    fn try_from(mode: u32) -> anyhow::Result<Self> {
        match mode {
            0o100644 => Ok(EntryMode::Regular),
            0o100755 => Ok(EntryMode::Executable),
            0o120000 => Ok(EntryMode::Symlink),
            0o40000 => Ok(EntryMode::Directory),
            _ => Err(anyhow::anyhow!("Invalid entry mode: {mode:o}")),
        }
    }
}
