//! Core object traits.
//!
//! - `Packable`: serialization to the on-disk byte format
//! - `Unpackable`: deserialization from the on-disk byte format
//! - `Object`: common operations over content-addressed objects (id
//!   computation, storage path, display)

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Result;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::BufRead;
use std::path::PathBuf;

/// Serialization to the object byte format, header included.
pub trait Packable {
    fn serialize(&self) -> Result<Bytes>;
}

/// Deserialization from the object byte format; the `<type> <size>\0` header
/// has already been consumed by the caller.
pub trait Unpackable {
    fn deserialize(reader: impl BufRead) -> Result<Self>
    where
        Self: Sized;
}

/// A content-addressed object (blob or tree).
pub trait Object: Packable {
    fn object_type(&self) -> ObjectType;

    /// Human-readable representation, as printed by inspection commands.
    fn display(&self) -> String;

    /// The object id is the SHA-1 of the full serialization.
    fn object_id(&self) -> Result<ObjectId> {
        let content = self.serialize()?;
        let mut hasher = Sha1::new();
        hasher.update(&content);

        let oid = hasher.finalize();
        ObjectId::try_parse(format!("{oid:x}"))
    }

    /// Path of this object relative to the objects directory.
    fn object_path(&self) -> Result<PathBuf> {
        Ok(self.object_id()?.to_path())
    }
}
