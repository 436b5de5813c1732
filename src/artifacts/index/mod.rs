//! The index file format (version 2).
//!
//! The index stores the set of tracked paths together with the blob id, file
//! mode and cached stat data of each, sorted by path bytes.
//!
//! ## File Format
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "DIRC" (4 bytes)
//!   - Version: 2 (4 bytes)
//!   - Entry count (4 bytes)
//!
//! Entries (variable length):
//!   - 62-byte fixed prefix, then the path, then NUL padding
//!   - each entry padded to 8-byte alignment with at least one NUL
//!
//! Checksum (20 bytes):
//!   - SHA-1 over all preceding bytes
//! ```
//!
//! All multi-byte integers are big-endian.

pub mod checksum;
pub mod entry_flags;
pub mod entry_key;
pub mod entry_mode;
pub mod index_entry;
pub mod index_header;
pub mod lockfile;

/// Size of the trailing SHA-1 checksum in bytes
pub const CHECKSUM_SIZE: usize = 20;

/// Size of the index header in bytes
pub const HEADER_SIZE: usize = 12;

/// Magic signature identifying index files
pub const SIGNATURE: &str = "DIRC";

/// Index file format version
pub const VERSION: u32 = 2;

/// Block size for entry alignment
pub const ENTRY_BLOCK: usize = 8;

/// Size of the fixed per-entry prefix preceding the path bytes
pub const ENTRY_PREFIX_SIZE: usize = 62;

/// Smallest possible serialized entry: prefix + 1-byte path, padded
pub const ENTRY_MIN_SIZE: usize = 64;

/// Largest path length representable in the flags word
pub const MAX_PATH_SIZE: usize = 0xFFF;
