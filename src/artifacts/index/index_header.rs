use crate::artifacts::index::{HEADER_SIZE, SIGNATURE, VERSION};
use crate::artifacts::objects::object::Packable;
use crate::errors::IndexError;
use byteorder::{ByteOrder, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::io::Write;

/// The fixed 12-byte prefix of the cache file: signature, version, entry
/// count, all big-endian.
#[derive(Debug, Clone, PartialEq, new)]
pub struct IndexHeader {
    pub(crate) marker: String,
    pub(crate) version: u32,
    pub(crate) entries_count: u32,
}

impl IndexHeader {
    pub(crate) fn empty() -> Self {
        IndexHeader {
            marker: String::from(SIGNATURE),
            version: VERSION,
            entries_count: 0,
        }
    }

    pub fn entries_count(&self) -> u32 {
        self.entries_count
    }

    /// Parse and validate the header; anything but a version-2 `DIRC` file is
    /// rejected.
    pub fn parse(bytes: &Bytes) -> anyhow::Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(IndexError::Corrupt("truncated header".to_string()).into());
        }

        let marker = String::from_utf8(bytes[0..4].to_vec())
            .map_err(|_| IndexError::Corrupt("invalid signature".to_string()))?;
        let version = byteorder::NetworkEndian::read_u32(&bytes[4..8]);
        let entries_count = byteorder::NetworkEndian::read_u32(&bytes[8..12]);

        if marker != SIGNATURE {
            return Err(IndexError::Corrupt(format!("invalid signature '{marker}'")).into());
        }

        if version != VERSION {
            return Err(IndexError::Corrupt(format!("unsupported version {version}")).into());
        }

        Ok(IndexHeader {
            marker,
            version,
            entries_count,
        })
    }
}

impl Packable for IndexHeader {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        bytes.write_all(self.marker.as_bytes())?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.version)?;
        bytes.write_u32::<byteorder::NetworkEndian>(self.entries_count)?;

        Ok(Bytes::from(bytes))
    }
}
