//! The staging index.
//!
//! An ordered map from path key to entry, persisted in the version-2 cache
//! file format. The index mediates between the working tree (`add`, `remove`,
//! `checkout`) and the object database (`read_tree`, `write_tree`).
//!
//! ## Dirty tracking
//!
//! Two flags record divergence from the on-disk cache: `content_changed`
//! (membership or content differs) and `stat_dirty` (stat caches were
//! refreshed but content is unchanged). A successful `write` clears both and
//! remembers the new file mtime, which `reread_if_necessary` later compares
//! against.
//!
//! ## Writing
//!
//! Writes are guarded by the `<index>.lock` advisory lockfile and staged in
//! `<index>.tmp`; the rename over the index file is the commit point. Both
//! auxiliary files are removed on every exit path. An index holding entries
//! at a merge stage other than zero refuses to write.

use crate::areas::database::Database;
use crate::areas::workspace::{self, strip_work_dir};
use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::entry_key::EntryKey;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::{IndexEntry, file_mtime_ns};
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::lockfile::Lockfile;
use crate::artifacts::index::{
    CHECKSUM_SIZE, ENTRY_BLOCK, ENTRY_MIN_SIZE, HEADER_SIZE, SIGNATURE, VERSION,
};
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use crate::errors::IndexError;
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::ops::DerefMut;
use std::path::{Path, PathBuf};

/// The staging index: tracked paths with their cached state.
#[derive(Debug)]
pub struct Index {
    /// Path to the cache file (typically `.git/index`)
    path: Box<Path>,
    /// Header of the cache file as last read; `None` before the first read
    header: Option<IndexHeader>,
    /// Tracked entries, ordered by path bytes
    entries: BTreeMap<EntryKey, IndexEntry>,
    /// Membership or content differs from the on-disk cache
    content_changed: bool,
    /// Stat caches were refreshed but content is unchanged
    stat_dirty: bool,
    /// Modification time of the cache file as last read or written,
    /// nanoseconds since the epoch; 0 when the file was absent
    last_cache_time: i64,
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            header: None,
            entries: BTreeMap::new(),
            content_changed: false,
            stat_dirty: false,
            last_cache_time: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    pub fn header(&self) -> Option<&IndexHeader> {
        self.header.as_ref()
    }

    /// Entries in path-byte order.
    pub fn members(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Does the in-memory state differ from the on-disk cache?
    pub fn is_changed(&self) -> bool {
        self.content_changed || self.stat_dirty
    }

    pub fn content_changed(&self) -> bool {
        self.content_changed
    }

    pub fn stat_dirty(&self) -> bool {
        self.stat_dirty
    }

    /// Look up an entry by its workdir-relative path.
    pub fn get_entry(&self, path: &Path) -> Option<&IndexEntry> {
        let key = EntryKey::from_path(path).ok()?;
        self.entries.get(&key)
    }

    /// Insert an entry under its own key, replacing any previous entry with
    /// the same path.
    pub fn add_entry(&mut self, entry: IndexEntry) {
        self.entries.insert(entry.key(), entry);
        self.content_changed = true;
    }

    fn clear(&mut self) {
        self.header = None;
        self.entries.clear();
        self.content_changed = false;
        self.stat_dirty = false;
        self.last_cache_time = 0;
    }

    /// Stage `file` (which must live under `workdir`): refresh the existing
    /// entry or hash a new one into the object database.
    pub fn add(
        &mut self,
        workdir: &Path,
        file: &Path,
        content: Option<Bytes>,
        database: &Database,
        trust_executable: bool,
    ) -> anyhow::Result<()> {
        let relative = strip_work_dir(workdir, file)?;
        let key = EntryKey::from_path(&relative)?;
        let absolute = workdir.join(&relative);

        match self.entries.get_mut(&key) {
            Some(entry) => {
                if entry.update(&absolute, trust_executable, database)? {
                    self.content_changed = true;
                } else {
                    self.stat_dirty = true;
                }
            }
            None => {
                let entry = IndexEntry::from_work_file(
                    key.as_str().to_string(),
                    &absolute,
                    0,
                    content,
                    trust_executable,
                    database,
                )?;
                self.entries.insert(key, entry);
                self.content_changed = true;
            }
        }

        Ok(())
    }

    /// Drop `file` from the index; returns whether it was tracked.
    pub fn remove(&mut self, workdir: &Path, file: &Path) -> anyhow::Result<bool> {
        let relative = strip_work_dir(workdir, file)?;
        let key = EntryKey::from_path(&relative)?;

        let removed = self.entries.remove(&key).is_some();
        if removed {
            self.content_changed = true;
        }

        Ok(removed)
    }

    /// Load the cache file from disk, replacing the in-memory state.
    ///
    /// A missing file leaves an empty index. Entries are parsed into a
    /// scratch map and only swapped in after the trailing digest verifies, so
    /// a corrupt file never leaves the index partially populated.
    pub fn read(&mut self) -> anyhow::Result<()> {
        if !self.path.exists() {
            self.clear();
            return Ok(());
        }

        let mut file = std::fs::OpenOptions::new().read(true).open(&self.path)?;
        let mut lock = file_guard::lock(&mut file, file_guard::Lock::Shared, 0, 1)?;

        let meta = lock.deref_mut().metadata()?;
        if meta.len() == 0 {
            // freshly created, never written
            self.clear();
            self.last_cache_time = file_mtime_ns(&meta);
            return Ok(());
        }

        let mut reader = Checksum::new(lock.deref_mut());
        let header = Self::parse_header(&mut reader)?;

        let mut staged = BTreeMap::new();
        for _ in 0..header.entries_count() {
            let entry = Self::parse_entry(&mut reader)?;
            staged.insert(entry.key(), entry);
        }

        // extension sections (e.g. the tree cache) sit between the entries
        // and the digest; they are digested but otherwise dropped
        let consumed = reader.bytes_processed();
        if meta.len() > consumed + CHECKSUM_SIZE as u64 {
            let extensions = meta.len() - consumed - CHECKSUM_SIZE as u64;
            reader.read(extensions as usize)?;
        }

        reader.verify()?;
        drop(lock);
        drop(file);

        let meta = std::fs::metadata(&self.path)?;
        self.header = Some(header);
        self.entries = staged;
        self.content_changed = false;
        self.stat_dirty = false;
        self.last_cache_time = file_mtime_ns(&meta);

        Ok(())
    }

    /// Reload the cache file when its mtime differs from the one remembered
    /// at the last read or write. Returns whether a reload happened.
    pub fn reread_if_necessary(&mut self) -> anyhow::Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        let mtime = file_mtime_ns(&std::fs::metadata(&self.path)?);
        if mtime != self.last_cache_time {
            self.read()?;
            return Ok(true);
        }

        Ok(false)
    }

    fn parse_header<T: Read>(reader: &mut Checksum<T>) -> anyhow::Result<IndexHeader> {
        let header_bytes = reader.read(HEADER_SIZE)?;
        IndexHeader::parse(&header_bytes)
    }

    /// Parse one entry: the minimum record first, then 8-byte blocks until
    /// the trailing NUL padding appears.
    fn parse_entry<T: Read>(reader: &mut Checksum<T>) -> anyhow::Result<IndexEntry> {
        let mut record = reader.read(ENTRY_MIN_SIZE)?.to_vec();

        while record[record.len() - 1] != 0 {
            record.extend_from_slice(&reader.read(ENTRY_BLOCK)?);
        }

        IndexEntry::deserialize(std::io::Cursor::new(record))
    }

    /// Persist the index atomically.
    ///
    /// Serializes into `<index>.tmp` under the `<index>.lock` lockfile, then
    /// renames over the cache file. Refuses to run while any entry carries a
    /// merge stage.
    pub fn write(&mut self) -> anyhow::Result<()> {
        self.check_write_ok()?;

        let lockfile = Lockfile::acquire(&self.lock_path())?;
        let tmp_path = self.tmp_path();

        let result = self.write_cache_file(&tmp_path);

        if result.is_err() && tmp_path.exists() {
            let _ = std::fs::remove_file(&tmp_path);
        }

        match result {
            Ok(()) => lockfile.release(),
            // the drop guard removes the lockfile
            Err(err) => Err(err),
        }
    }

    fn write_cache_file(&mut self, tmp_path: &Path) -> anyhow::Result<()> {
        let header = IndexHeader::new(
            SIGNATURE.to_string(),
            VERSION,
            u32::try_from(self.entries.len()).context("too many index entries")?,
        );

        let mut tmp = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(tmp_path)
            .context(format!(
                "unable to create scratch file {}",
                tmp_path.display()
            ))?;

        let mut writer = Checksum::new(&mut tmp);
        writer.write(&header.serialize()?)?;
        for entry in self.entries.values() {
            writer.write(&entry.serialize()?)?;
        }
        writer.write_checksum()?;
        drop(writer);

        tmp.sync_all()?;
        drop(tmp);

        // the rename is the commit point; on platforms where it cannot
        // replace an existing file the old index is removed first, and the
        // lockfile covers the window where no index exists
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        std::fs::rename(tmp_path, &self.path).context("unable to publish the new index file")?;

        let meta = std::fs::metadata(&self.path)?;
        self.header = Some(header);
        self.content_changed = false;
        self.stat_dirty = false;
        self.last_cache_time = file_mtime_ns(&meta);

        Ok(())
    }

    fn check_write_ok(&self) -> anyhow::Result<()> {
        match self.entries.values().find(|entry| entry.stage() != 0) {
            Some(entry) => Err(IndexError::UnmergedEntry {
                path: entry.name().to_string(),
                stage: entry.stage(),
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Replace the index with the flattened contents of a tree, all entries
    /// at stage 0 with no stat caches.
    pub fn read_tree(&mut self, root: &ObjectId, database: &Database) -> anyhow::Result<()> {
        let mut staged = BTreeMap::new();
        Self::load_tree_into(&mut staged, root, "", database)?;

        self.entries = staged;
        self.content_changed = true;

        Ok(())
    }

    fn load_tree_into(
        entries: &mut BTreeMap<EntryKey, IndexEntry>,
        oid: &ObjectId,
        prefix: &str,
        database: &Database,
    ) -> anyhow::Result<()> {
        let tree = database.load_tree(oid)?;

        for (name, item) in tree.entries() {
            let full_path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };

            if item.is_tree() {
                Self::load_tree_into(entries, &item.oid, &full_path, database)?;
            } else {
                let entry = IndexEntry::from_tree_item(full_path, item, 0, database);
                entries.insert(entry.key(), entry);
            }
        }

        Ok(())
    }

    /// Build nested tree objects from the stage-0 entries, store them all and
    /// return the root id.
    pub fn write_tree(&self, database: &Database) -> anyhow::Result<ObjectId> {
        let tree = Tree::build(self.entries.values().filter(|entry| entry.stage() == 0))?;
        tree.traverse(&|subtree| database.store(subtree).map(|_| ()))?;

        tree.object_id()
    }

    /// Materialize every stage-0 entry into the working tree.
    pub fn checkout(
        &mut self,
        workdir: &Path,
        database: &Database,
        trust_executable: bool,
    ) -> anyhow::Result<()> {
        for entry in self.entries.values_mut() {
            if entry.stage() != 0 {
                continue;
            }
            checkout_entry_file(workdir, entry, database, trust_executable)?;
        }

        self.stat_dirty = true;
        Ok(())
    }

    /// Materialize a single tracked path; returns whether it was present.
    pub fn checkout_entry(
        &mut self,
        workdir: &Path,
        path: &Path,
        database: &Database,
        trust_executable: bool,
    ) -> anyhow::Result<bool> {
        let Ok(key) = EntryKey::from_path(path) else {
            return Ok(false);
        };

        match self.entries.get_mut(&key) {
            Some(entry) => {
                checkout_entry_file(workdir, entry, database, trust_executable)?;
                self.stat_dirty = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Write one entry's blob into the working tree and refresh its timestamps
/// so later modification checks compare against the just-written file.
fn checkout_entry_file(
    workdir: &Path,
    entry: &mut IndexEntry,
    database: &Database,
    trust_executable: bool,
) -> anyhow::Result<()> {
    if entry.mode().is_tree() {
        // gitlinks carry no blob to materialize
        return Ok(());
    }

    let blob = database.load_blob(entry.oid())?;
    let target = workdir.join(entry.name());

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .context(format!("unable to create directory {}", parent.display()))?;
    }

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&target)
        .context(format!("unable to open file {}", target.display()))?;
    file.write_all(blob.content())?;
    drop(file);

    if trust_executable && entry.mode().is_file() {
        workspace::set_executable(&target, entry.mode() == EntryMode::Executable)?;
    }

    let meta = std::fs::metadata(&target)?;
    entry.refresh_times(file_mtime_ns(&meta));

    Ok(())
}
