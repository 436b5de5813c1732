//! One row of the index: a tracked path with its blob id, mode and cached
//! stat data.
//!
//! ## Entry Format
//!
//! Each serialized entry is a 62-byte fixed prefix (timestamps, stat fields,
//! mode, blob id, flags), the path bytes, and NUL padding up to the next
//! 8-byte boundary with at least one NUL acting as terminator.
//!
//! Timestamps are kept as signed nanoseconds since the epoch in memory and
//! split into (seconds, nanoseconds) pairs of 32-bit words only on disk.
//! Stat fields that were never observed hold `-1` and are written verbatim.

use crate::areas::database::Database;
use crate::artifacts::index::entry_flags::EntryFlags;
use crate::artifacts::index::entry_key::EntryKey;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::{ENTRY_BLOCK, ENTRY_MIN_SIZE, ENTRY_PREFIX_SIZE, MAX_PATH_SIZE};
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::TreeItem;
use crate::errors::IndexError;
use byteorder::{ByteOrder, WriteBytesExt};
use bytes::Bytes;
use is_executable::IsExecutable;
use std::fs::Metadata;
use std::io::{BufRead, Write};
use std::os::unix::prelude::MetadataExt;
use std::path::Path;

pub(crate) const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A tracked file: path, content hash, mode and cached stat data.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub(crate) name: String,
    pub(crate) oid: ObjectId,
    pub(crate) ctime_ns: i64,
    pub(crate) mtime_ns: i64,
    pub(crate) dev: i32,
    pub(crate) ino: i32,
    pub(crate) uid: i32,
    pub(crate) gid: i32,
    pub(crate) size: i32,
    pub(crate) mode: EntryMode,
    pub(crate) flags: EntryFlags,
}

impl IndexEntry {
    /// A bare entry with no stat cache: every stat field is `-1`.
    pub fn new(name: String, oid: ObjectId, mode: EntryMode, stage: u8) -> Self {
        let flags = EntryFlags::new(stage, name.len());

        IndexEntry {
            name,
            oid,
            ctime_ns: -1,
            mtime_ns: -1,
            dev: -1,
            ino: -1,
            uid: -1,
            gid: -1,
            size: -1,
            mode,
            flags,
        }
    }

    /// Build an entry from a working-tree file, hashing its content into the
    /// object database.
    pub fn from_work_file(
        name: String,
        file: &Path,
        stage: u8,
        content: Option<Bytes>,
        trust_executable: bool,
        database: &Database,
    ) -> anyhow::Result<Self> {
        let meta = std::fs::metadata(file)?;
        let mtime_ns = file_mtime_ns(&meta);

        let mode = if trust_executable && file.is_executable() {
            EntryMode::Executable
        } else {
            EntryMode::Regular
        };

        let data = match content {
            Some(bytes) => bytes,
            None => Bytes::from(std::fs::read(file)?),
        };
        let size = data.len() as i32;
        let oid = database.store(&Blob::new(data))?;
        let flags = EntryFlags::new(stage, name.len());

        Ok(IndexEntry {
            name,
            oid,
            ctime_ns: mtime_ns,
            mtime_ns,
            dev: -1,
            ino: -1,
            uid: -1,
            gid: -1,
            size,
            mode,
            flags,
        })
    }

    /// Build an entry from a tree item read out of the object database.
    ///
    /// Timestamps stay at `-1`, signaling "never compared against the working
    /// tree". A failure to size the blob is recoverable and leaves `-1`.
    pub fn from_tree_item(name: String, item: &TreeItem, stage: u8, database: &Database) -> Self {
        let size = database
            .blob_size(&item.oid)
            .map(|size| size as i32)
            .unwrap_or(-1);

        let mut entry = Self::new(name, item.oid.clone(), item.mode, stage);
        entry.size = size;
        entry
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> EntryKey {
        EntryKey::from_name(&self.name)
    }

    pub fn oid(&self) -> &ObjectId {
        &self.oid
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn ctime_ns(&self) -> i64 {
        self.ctime_ns
    }

    pub fn mtime_ns(&self) -> i64 {
        self.mtime_ns
    }

    pub fn flags(&self) -> EntryFlags {
        self.flags
    }

    pub fn stage(&self) -> u8 {
        self.flags.stage()
    }

    /// Re-stat the entry against `file` and re-hash on any divergence.
    ///
    /// Returns whether the entry's content-level state changed: the freshly
    /// hashed blob id differs from the one stored before, or the tracked
    /// executable bit flipped. A refreshed timestamp with identical content
    /// reports `false`.
    pub fn update(
        &mut self,
        file: &Path,
        trust_executable: bool,
        database: &Database,
    ) -> anyhow::Result<bool> {
        let meta = std::fs::metadata(file)?;
        let file_mtime = file_mtime_ns(&meta);

        let mut modified = false;
        if self.mtime_ns != file_mtime {
            modified = true;
        }
        self.mtime_ns = file_mtime;

        if self.size != meta.len() as i32 {
            modified = true;
        }

        let mut mode_changed = false;
        if trust_executable {
            let executable_on_disk = file.is_executable();
            if (self.mode == EntryMode::Executable) != executable_on_disk {
                self.mode = if executable_on_disk {
                    EntryMode::Executable
                } else {
                    EntryMode::Regular
                };
                mode_changed = true;
                modified = true;
            }
        }

        if !modified {
            return Ok(false);
        }

        let data = std::fs::read(file)?;
        self.size = data.len() as i32;
        let new_oid = database.store(&Blob::new(Bytes::from(data)))?;

        let oid_changed = new_oid != self.oid;
        self.oid = new_oid;

        Ok(oid_changed || mode_changed)
    }

    /// Does the working-tree file diverge from this entry?
    ///
    /// Cheap stat comparisons come first; content is only hashed when the
    /// timestamps disagree and `force_content_check` is set. With it unset a
    /// timestamp mismatch alone counts as modified.
    pub fn is_modified(
        &self,
        workdir: &Path,
        force_content_check: bool,
        trust_executable: bool,
    ) -> anyhow::Result<bool> {
        if self.flags.assume_valid() {
            return Ok(false);
        }
        if self.flags.update_needed() {
            return Ok(true);
        }

        let file = workdir.join(&self.name);
        let Ok(meta) = std::fs::metadata(&file) else {
            return Ok(true);
        };

        match self.mode {
            EntryMode::Regular | EntryMode::Executable => {
                if trust_executable && (self.mode == EntryMode::Executable) != file.is_executable()
                {
                    return Ok(true);
                }
            }
            EntryMode::Symlink => return Ok(true),
            EntryMode::Directory => return Ok(!meta.is_dir()),
        }

        if self.size != meta.len() as i32 {
            return Ok(true);
        }

        let mut file_mtime = file_mtime_ns(&meta);
        if self.mtime_ns % NANOS_PER_SEC == 0 {
            // entry recorded with second granularity: compare likewise
            file_mtime -= file_mtime.rem_euclid(NANOS_PER_SEC);
        }
        if self.mtime_ns == file_mtime {
            return Ok(false);
        }
        if !force_content_check {
            return Ok(true);
        }

        let data = std::fs::read(&file)?;
        let oid = Blob::new(Bytes::from(data)).object_id()?;
        Ok(oid != self.oid)
    }

    /// Reset both cached timestamps to the given value, typically the mtime
    /// of a file just written by checkout.
    pub(crate) fn refresh_times(&mut self, mtime_ns: i64) {
        self.ctime_ns = mtime_ns;
        self.mtime_ns = mtime_ns;
    }
}

impl Packable for IndexEntry {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let (ctime, ctime_nsec) = split_ns(self.ctime_ns);
        let (mtime, mtime_nsec) = split_ns(self.mtime_ns);

        let mut entry_bytes = Vec::new();
        entry_bytes.write_i32::<byteorder::NetworkEndian>(ctime)?;
        entry_bytes.write_i32::<byteorder::NetworkEndian>(ctime_nsec)?;
        entry_bytes.write_i32::<byteorder::NetworkEndian>(mtime)?;
        entry_bytes.write_i32::<byteorder::NetworkEndian>(mtime_nsec)?;
        entry_bytes.write_i32::<byteorder::NetworkEndian>(self.dev)?;
        entry_bytes.write_i32::<byteorder::NetworkEndian>(self.ino)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.mode.as_u32())?;
        entry_bytes.write_i32::<byteorder::NetworkEndian>(self.uid)?;
        entry_bytes.write_i32::<byteorder::NetworkEndian>(self.gid)?;
        entry_bytes.write_i32::<byteorder::NetworkEndian>(self.size)?;
        self.oid.write_h40_to(&mut entry_bytes)?;
        entry_bytes.write_u16::<byteorder::NetworkEndian>(self.flags.as_u16())?;
        entry_bytes.write_all(self.name.as_bytes())?;

        // at least one NUL terminator, then out to the 8-byte boundary
        entry_bytes.push(0);
        while entry_bytes.len() % ENTRY_BLOCK != 0 {
            entry_bytes.push(0);
        }

        Ok(Bytes::from(entry_bytes))
    }
}

impl Unpackable for IndexEntry {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let bytes = reader
            .bytes()
            .collect::<Result<Vec<u8>, std::io::Error>>()?;

        if bytes.len() < ENTRY_MIN_SIZE {
            return Err(IndexError::Corrupt("truncated index entry".to_string()).into());
        }

        let ctime = byteorder::NetworkEndian::read_i32(&bytes[0..4]);
        let ctime_nsec = byteorder::NetworkEndian::read_i32(&bytes[4..8]);
        let mtime = byteorder::NetworkEndian::read_i32(&bytes[8..12]);
        let mtime_nsec = byteorder::NetworkEndian::read_i32(&bytes[12..16]);
        let dev = byteorder::NetworkEndian::read_i32(&bytes[16..20]);
        let ino = byteorder::NetworkEndian::read_i32(&bytes[20..24]);
        let mode_bits = byteorder::NetworkEndian::read_u32(&bytes[24..28]);
        let mode = EntryMode::try_from(mode_bits)
            .map_err(|_| IndexError::Corrupt(format!("invalid entry mode {mode_bits:o}")))?;
        let uid = byteorder::NetworkEndian::read_i32(&bytes[28..32]);
        let gid = byteorder::NetworkEndian::read_i32(&bytes[32..36]);
        let size = byteorder::NetworkEndian::read_i32(&bytes[36..40]);
        let mut oid_bytes = std::io::Cursor::new(&bytes[40..60]);
        let oid = ObjectId::read_h40_from(&mut oid_bytes)?;
        let flags = EntryFlags::from_raw(byteorder::NetworkEndian::read_u16(&bytes[60..62]));

        let name_length = flags.name_length();
        let name_bytes = if name_length < MAX_PATH_SIZE {
            if ENTRY_PREFIX_SIZE + name_length >= bytes.len() {
                return Err(IndexError::Corrupt(
                    "entry path length overflows its record".to_string(),
                )
                .into());
            }
            if bytes[ENTRY_PREFIX_SIZE + name_length] != 0 {
                return Err(
                    IndexError::Corrupt("entry path is not NUL-terminated".to_string()).into(),
                );
            }
            &bytes[ENTRY_PREFIX_SIZE..ENTRY_PREFIX_SIZE + name_length]
        } else {
            // path of 4095 bytes or more: the flags field saturates, measure
            // up to the NUL terminator instead
            let end = bytes[ENTRY_PREFIX_SIZE..]
                .iter()
                .position(|&byte| byte == 0)
                .ok_or_else(|| {
                    IndexError::Corrupt("entry path is not NUL-terminated".to_string())
                })?;
            &bytes[ENTRY_PREFIX_SIZE..ENTRY_PREFIX_SIZE + end]
        };

        let name = std::str::from_utf8(name_bytes)
            .map_err(|_| IndexError::Corrupt("invalid UTF-8 in entry path".to_string()))?
            .to_string();
        if name.is_empty() {
            return Err(IndexError::Corrupt("empty entry path".to_string()).into());
        }

        Ok(IndexEntry {
            name,
            oid,
            ctime_ns: join_ns(ctime, ctime_nsec),
            mtime_ns: join_ns(mtime, mtime_nsec),
            dev,
            ino,
            uid,
            gid,
            size,
            mode,
            flags,
        })
    }
}

fn split_ns(ns: i64) -> (i32, i32) {
    ((ns / NANOS_PER_SEC) as i32, (ns % NANOS_PER_SEC) as i32)
}

fn join_ns(seconds: i32, nanos: i32) -> i64 {
    i64::from(seconds) * NANOS_PER_SEC + i64::from(nanos)
}

/// Modification time of a stat result, in nanoseconds since the epoch.
pub(crate) fn file_mtime_ns(meta: &Metadata) -> i64 {
    meta.mtime() * NANOS_PER_SEC + meta.mtime_nsec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::proptest;
    use rstest::{fixture, rstest};
    use sha1::Digest;

    #[fixture]
    fn oid() -> ObjectId {
        let mut hasher = sha1::Sha1::new();
        hasher.update("test data");
        ObjectId::try_parse(format!("{:x}", hasher.finalize())).unwrap()
    }

    fn stage0_entry(name: &str, oid: ObjectId) -> IndexEntry {
        IndexEntry::new(name.to_string(), oid, EntryMode::Regular, 0)
    }

    fn reparse(bytes: Bytes) -> anyhow::Result<IndexEntry> {
        IndexEntry::deserialize(std::io::Cursor::new(bytes))
    }

    #[rstest]
    #[case("a", 64)]
    #[case("ab", 72)]
    #[case("a/very/nested/path.txt", 88)]
    fn serialized_entries_are_block_aligned(
        oid: ObjectId,
        #[case] name: &str,
        #[case] expected_len: usize,
    ) {
        let bytes = stage0_entry(name, oid).serialize().unwrap();

        assert_eq!(bytes.len(), expected_len);
        assert_eq!(bytes.len() % ENTRY_BLOCK, 0);
        assert_eq!(bytes[bytes.len() - 1], 0, "last byte must be NUL padding");
    }

    #[rstest]
    fn round_trip_preserves_every_field(oid: ObjectId) {
        let mut entry = stage0_entry("src/lib.rs", oid);
        entry.ctime_ns = 1_700_000_000_123_456_789;
        entry.mtime_ns = 1_700_000_001_000_000_001;
        entry.dev = 64769;
        entry.ino = 8_391_475;
        entry.uid = 1000;
        entry.gid = 1000;
        entry.size = 1234;
        entry.mode = EntryMode::Executable;

        let reread = reparse(entry.serialize().unwrap()).unwrap();
        assert_eq!(reread, entry);
    }

    #[rstest]
    fn unknown_stat_sentinels_round_trip(oid: ObjectId) {
        let entry = stage0_entry("a.txt", oid);
        assert_eq!(entry.ctime_ns, -1);
        assert_eq!(entry.size, -1);

        let reread = reparse(entry.serialize().unwrap()).unwrap();
        assert_eq!(reread, entry);
    }

    #[rstest]
    fn unmerged_stage_round_trips(oid: ObjectId) {
        let entry = IndexEntry::new("conflicted".to_string(), oid, EntryMode::Regular, 2);

        let reread = reparse(entry.serialize().unwrap()).unwrap();
        assert_eq!(reread.stage(), 2);
    }

    #[rstest]
    fn very_long_paths_saturate_the_flags_field(oid: ObjectId) {
        let name = "d/".repeat(2500) + "leaf";
        let entry = IndexEntry::new(name.clone(), oid, EntryMode::Regular, 0);
        assert_eq!(entry.flags().name_length(), MAX_PATH_SIZE);

        let reread = reparse(entry.serialize().unwrap()).unwrap();
        assert_eq!(reread.name(), name);
    }

    #[rstest]
    fn truncated_record_is_corrupt(oid: ObjectId) {
        let bytes = stage0_entry("a.txt", oid).serialize().unwrap();
        let err = reparse(bytes.slice(0..40)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::Corrupt(_))
        ));
    }

    #[rstest]
    fn overflowing_path_length_is_corrupt(oid: ObjectId) {
        let mut bytes = stage0_entry("a.txt", oid).serialize().unwrap().to_vec();
        // claim a path far longer than the record
        bytes[60] = 0x0F;
        bytes[61] = 0xFE;

        let err = reparse(Bytes::from(bytes)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::Corrupt(_))
        ));
    }

    #[rstest]
    fn unknown_mode_bits_are_corrupt(oid: ObjectId) {
        let mut bytes = stage0_entry("a.txt", oid).serialize().unwrap().to_vec();
        bytes[24..28].copy_from_slice(&0o170000u32.to_be_bytes());

        let err = reparse(Bytes::from(bytes)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IndexError>(),
            Some(IndexError::Corrupt(_))
        ));
    }

    #[test]
    fn nanosecond_split_handles_sentinels() {
        assert_eq!(split_ns(-1), (0, -1));
        assert_eq!(join_ns(0, -1), -1);
        assert_eq!(split_ns(1_500_000_000_250_000_000), (1_500_000_000, 250_000_000));
        assert_eq!(
            join_ns(1_500_000_000, 250_000_000),
            1_500_000_000_250_000_000
        );
    }

    proptest! {
        #[test]
        fn alignment_and_length_flag_hold_for_any_path(name in "[a-z][a-z0-9/._-]{0,80}") {
            let mut hasher = sha1::Sha1::new();
            hasher.update(name.as_bytes());
            let oid = ObjectId::try_parse(format!("{:x}", hasher.finalize())).unwrap();

            let entry = IndexEntry::new(name.clone(), oid, EntryMode::Regular, 0);
            let bytes = entry.serialize().unwrap();

            assert_eq!(bytes.len() % ENTRY_BLOCK, 0);
            assert_eq!(bytes[bytes.len() - 1], 0);
            assert_eq!(entry.flags().name_length(), name.len().min(MAX_PATH_SIZE));

            let reread = reparse(bytes).unwrap();
            assert_eq!(reread, entry);
        }
    }
}
