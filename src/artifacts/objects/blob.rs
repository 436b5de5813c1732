//! Blob object: raw file content.
//!
//! On disk: `blob <size>\0<content>`. The content is an arbitrary byte
//! sequence; filename and mode live in trees and index entries, not here.

use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_type::ObjectType;
use bytes::Bytes;
use derive_new::new;
use std::io::{BufRead, Write};

/// File content addressed by the SHA-1 of its serialization.
#[derive(Debug, Clone, PartialEq, new)]
pub struct Blob {
    content: Bytes,
}

impl Blob {
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl Packable for Blob {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut blob_bytes = Vec::new();
        let header = format!("{} {}\0", self.object_type().as_str(), self.content.len());
        blob_bytes.write_all(header.as_bytes())?;
        blob_bytes.write_all(&self.content)?;

        Ok(Bytes::from(blob_bytes))
    }
}

impl Unpackable for Blob {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        // the header has already been consumed
        let content = reader
            .bytes()
            .collect::<Result<Vec<u8>, std::io::Error>>()?;

        Ok(Self::new(Bytes::from(content)))
    }
}

impl Object for Blob {
    fn object_type(&self) -> ObjectType {
        ObjectType::Blob
    }

    fn display(&self) -> String {
        String::from_utf8_lossy(&self.content).to_string()
    }
}
