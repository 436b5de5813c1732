//! Object identifier (SHA-1 hash).
//!
//! Object ids are 40-character hexadecimal strings. On disk (inside tree
//! objects and index entries) they are stored as 20 raw bytes.

use crate::artifacts::objects::{OBJECT_ID_LENGTH, OBJECT_ID_RAW_LENGTH};
use std::io;
use std::path::PathBuf;

/// A validated 40-character hexadecimal SHA-1 identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object id from a string.
    pub fn try_parse(id: String) -> anyhow::Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(anyhow::anyhow!("Invalid object id length: {}", id.len()));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow::anyhow!("Invalid object id characters: {}", id));
        }
        Ok(Self(id))
    }

    /// Write the object id in binary form (20 bytes).
    pub fn write_h40_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        let hex40 = self.as_ref();

        for i in (0..OBJECT_ID_LENGTH).step_by(2) {
            let byte = u8::from_str_radix(&hex40[i..i + 2], 16)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Invalid hex digit"))?;
            writer.write_all(&[byte])?;
        }

        Ok(())
    }

    /// Read an object id from binary form (20 bytes).
    pub fn read_h40_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let mut raw = [0u8; OBJECT_ID_RAW_LENGTH];
        reader.read_exact(&mut raw)?;

        let mut hex40 = String::with_capacity(OBJECT_ID_LENGTH);
        for byte in raw {
            hex40.push_str(&format!("{byte:02x}"));
        }

        Self::try_parse(hex40)
    }

    /// Storage path `XX/YYYY…` derived from the first two hex characters.
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
