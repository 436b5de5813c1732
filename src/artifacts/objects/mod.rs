//! Content-addressed objects: blobs and trees.
//!
//! Objects are stored as `<type> <size>\0<content>`, compressed with zlib,
//! and identified by the SHA-1 of their uncompressed serialization.

pub mod blob;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of an object id in hexadecimal characters
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of an object id in raw bytes
pub const OBJECT_ID_RAW_LENGTH: usize = 20;
