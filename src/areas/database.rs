//! Object database: content-addressable storage for blobs and trees.
//!
//! Objects live at `<objects>/<first-2-hex>/<remaining-38>`, zlib-compressed.
//! Writes go through a scratch file renamed into place, so a reader never
//! observes a torn object; storing an object that already exists is a no-op.

use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::{Object, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use anyhow::Context;
use bytes::Bytes;
use std::io::{BufRead, Cursor, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Database {
    /// Path to the objects directory
    path: Box<Path>,
}

impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Store an object and return its id.
    ///
    /// Existing objects are left untouched; identical content always hashes
    /// to the identical path.
    pub fn store(&self, object: &impl Object) -> anyhow::Result<ObjectId> {
        let oid = object.object_id()?;
        let object_path = self.path.join(oid.to_path());

        if !object_path.exists() {
            std::fs::create_dir_all(
                object_path
                    .parent()
                    .context(format!("Invalid object path {}", object_path.display()))?,
            )
            .context(format!(
                "Unable to create object directory {}",
                object_path.display()
            ))?;

            self.write_object(object_path, object.serialize()?)?;
        }

        Ok(oid)
    }

    /// Load a blob, failing when the object is missing or of another type.
    pub fn load_blob(&self, object_id: &ObjectId) -> anyhow::Result<Blob> {
        let (object_type, reader) = self.open_object(object_id)?;
        if object_type != ObjectType::Blob {
            anyhow::bail!("Object {object_id} is a {object_type}, not a blob");
        }

        Blob::deserialize(reader)
    }

    /// Load a tree, failing when the object is missing or of another type.
    pub fn load_tree(&self, object_id: &ObjectId) -> anyhow::Result<Tree> {
        let (object_type, reader) = self.open_object(object_id)?;
        if object_type != ObjectType::Tree {
            anyhow::bail!("Object {object_id} is a {object_type}, not a tree");
        }

        Tree::deserialize(reader)
    }

    /// Content size a blob declares in its header, without materializing it.
    pub fn blob_size(&self, object_id: &ObjectId) -> anyhow::Result<i64> {
        let (object_type, size, _) = self.open_object_header(object_id)?;
        if object_type != ObjectType::Blob {
            anyhow::bail!("Object {object_id} is a {object_type}, not a blob");
        }

        Ok(size as i64)
    }

    fn open_object(&self, object_id: &ObjectId) -> anyhow::Result<(ObjectType, impl BufRead)> {
        let (object_type, _, reader) = self.open_object_header(object_id)?;
        Ok((object_type, reader))
    }

    fn open_object_header(
        &self,
        object_id: &ObjectId,
    ) -> anyhow::Result<(ObjectType, usize, impl BufRead)> {
        let object_path = self.path.join(object_id.to_path());
        let object_content = self.read_object(object_path)?;
        let mut object_reader = Cursor::new(object_content);

        let (object_type, size) = ObjectType::parse_header(&mut object_reader)?;

        Ok((object_type, size, object_reader))
    }

    fn read_object(&self, object_path: PathBuf) -> anyhow::Result<Bytes> {
        let object_content = std::fs::read(&object_path).context(format!(
            "Unable to read object file {}",
            object_path.display()
        ))?;

        Self::decompress(object_content.into())
    }

    fn write_object(&self, object_path: PathBuf, object_content: Bytes) -> anyhow::Result<()> {
        let object_dir = object_path
            .parent()
            .context(format!("Invalid object path {}", object_path.display()))?;
        let temp_object_path = object_dir.join(Self::scratch_name());

        let object_content = Self::compress(object_content)?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_object_path)
            .context(format!(
                "Unable to open object file {}",
                temp_object_path.display()
            ))?;

        file.write_all(&object_content).context(format!(
            "Unable to write object file {}",
            temp_object_path.display()
        ))?;

        // the rename publishes the object atomically
        std::fs::rename(&temp_object_path, &object_path).context(format!(
            "Unable to rename object file to {}",
            object_path.display()
        ))?;

        Ok(())
    }

    fn compress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(&data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .map(|compressed_content| compressed_content.into())
            .context("Unable to finish compressing object content")
    }

    fn decompress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content.into())
    }

    fn scratch_name() -> String {
        format!("tmp_obj_{}", std::process::id())
    }
}
