//! Tree object: a directory snapshot.
//!
//! On disk: `tree <size>\0<entries>`, each entry `<mode> <name>\0<20-byte id>`.
//!
//! A tree is used in two directions:
//! - read mode: parsed from the object database into `readable_entries`
//! - write mode: built from the flat, sorted index into `writeable_entries`,
//!   then stored bottom-up so child ids exist before their parents
//!
//! Directory keys in write mode carry a trailing `/` so that files and
//! subtrees interleave in canonical byte order; the slash is trimmed again
//! when serializing.

use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use derive_new::new;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// Reference to an object inside a parsed tree: id plus mode.
#[derive(Debug, Clone, PartialEq, new)]
pub struct TreeItem {
    pub oid: ObjectId,
    pub mode: EntryMode,
}

impl TreeItem {
    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }
}

/// Node of a tree being built from index entries.
#[derive(Debug, Clone)]
enum TreeNode {
    File { oid: ObjectId, mode: EntryMode },
    Directory(Tree),
}

impl TreeNode {
    fn mode(&self) -> EntryMode {
        match self {
            TreeNode::File { mode, .. } => *mode,
            TreeNode::Directory(_) => EntryMode::Directory,
        }
    }

    fn oid(&self) -> anyhow::Result<ObjectId> {
        match self {
            TreeNode::File { oid, .. } => Ok(oid.clone()),
            TreeNode::Directory(tree) => tree.object_id(),
        }
    }
}

/// A directory snapshot, either parsed from the database or built from the
/// index.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    /// Entries loaded from the database (read mode)
    readable_entries: BTreeMap<String, TreeItem>,
    /// Entries being built from the index (write mode)
    writeable_entries: BTreeMap<String, TreeNode>,
}

impl Tree {
    /// Build a nested tree from flat index entries.
    ///
    /// The entries arrive sorted by full path; each is split on `/` and slotted
    /// into the subtree for its directory, creating intermediate trees on the
    /// way down.
    pub fn build<'e>(entries: impl Iterator<Item = &'e IndexEntry>) -> anyhow::Result<Self> {
        let mut root = Self::default();

        for entry in entries {
            let components = entry.name().split('/').collect::<Vec<_>>();
            root.add_entry(&components, entry)?;
        }

        Ok(root)
    }

    fn add_entry(&mut self, components: &[&str], entry: &IndexEntry) -> anyhow::Result<()> {
        match components {
            [] => Err(anyhow::anyhow!("Empty path in tree construction")),
            [file_name] => {
                if self.writeable_entries.contains_key(&format!("{file_name}/")) {
                    return Err(anyhow::anyhow!(
                        "Path conflict: '{file_name}' is tracked both as a file and as a directory"
                    ));
                }

                self.writeable_entries.insert(
                    (*file_name).to_string(),
                    TreeNode::File {
                        oid: entry.oid().clone(),
                        mode: entry.mode(),
                    },
                );
                Ok(())
            }
            [dir_name, rest @ ..] => {
                if self.writeable_entries.contains_key(*dir_name) {
                    return Err(anyhow::anyhow!(
                        "Path conflict: '{dir_name}' is tracked both as a file and as a directory"
                    ));
                }

                let node = self
                    .writeable_entries
                    .entry(format!("{dir_name}/"))
                    .or_insert_with(|| TreeNode::Directory(Tree::default()));

                match node {
                    TreeNode::Directory(subtree) => subtree.add_entry(rest, entry),
                    TreeNode::File { .. } => unreachable!("file nodes never carry a '/' key"),
                }
            }
        }
    }

    /// Visit every subtree bottom-up, parents after children.
    ///
    /// Storing in this order guarantees a child's id is computable (and its
    /// object present) before the parent that references it is written.
    pub fn traverse<F>(&self, func: &F) -> anyhow::Result<()>
    where
        F: Fn(&Tree) -> anyhow::Result<()>,
    {
        for node in self.writeable_entries.values() {
            if let TreeNode::Directory(subtree) = node {
                subtree.traverse(func)?;
            }
        }
        func(self)
    }

    /// Entries of a tree parsed from the database.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &TreeItem)> {
        self.readable_entries.iter()
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content_bytes = Vec::new();
        for (name, node) in &self.writeable_entries {
            let name = name.trim_end_matches('/');

            let header = format!("{} {}", node.mode().as_str(), name);
            content_bytes.write_all(header.as_bytes())?;
            content_bytes.push(0);
            node.oid()?.write_h40_to(&mut content_bytes)?;
        }

        let mut tree_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), content_bytes.len());
        tree_bytes.write_all(header.as_bytes())?;
        tree_bytes.write_all(&content_bytes)?;

        Ok(Bytes::from(tree_bytes))
    }
}

impl Unpackable for Tree {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();
        let mut reader = reader;

        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if mode_bytes.last() != Some(&b' ') {
                return Err(anyhow::anyhow!("Unexpected EOF in tree entry mode"));
            }
            mode_bytes.pop();

            let mode_str = std::str::from_utf8(&mode_bytes)?;
            let mode = u32::from_str_radix(mode_str, 8)
                .map_err(|_| anyhow::anyhow!("Invalid mode in tree entry: {mode_str}"))?;
            let mode = EntryMode::try_from(mode)?;

            name_bytes.clear();
            let n = reader.read_until(b'\0', &mut name_bytes)?;
            if n == 0 || name_bytes.last() != Some(&b'\0') {
                return Err(anyhow::anyhow!("Unexpected EOF in tree entry name"));
            }
            name_bytes.pop();
            let name = std::str::from_utf8(&name_bytes)?.to_owned();

            let oid = ObjectId::read_h40_from(&mut reader)
                .context("Unexpected EOF in tree entry object id")?;

            entries.insert(name, TreeItem::new(oid, mode));
        }

        Ok(Tree {
            readable_entries: entries,
            writeable_entries: Default::default(),
        })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.writeable_entries
            .iter()
            .map(|(name, node)| {
                let name = name.trim_end_matches('/');
                let object_type = match node {
                    TreeNode::File { .. } => ObjectType::Blob,
                    TreeNode::Directory(_) => ObjectType::Tree,
                };

                format!(
                    "{} {} {}\t{}",
                    node.mode().as_str(),
                    object_type.as_str(),
                    node.oid().unwrap_or_default(),
                    name
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}
