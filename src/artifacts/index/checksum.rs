//! Running SHA-1 digest over index file I/O.
//!
//! Every byte read from or written to the cache file passes through this
//! wrapper, so the trailing digest can be verified (reads) or emitted
//! (writes) without buffering the whole file.

use crate::artifacts::index::CHECKSUM_SIZE;
use crate::errors::IndexError;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::{Read, Write};

#[derive(Debug)]
pub struct Checksum<T> {
    inner: T,
    digest: Sha1,
    bytes_processed: u64,
}

impl<T> Checksum<T> {
    pub fn new(inner: T) -> Self {
        Checksum {
            inner,
            digest: Sha1::new(),
            bytes_processed: 0,
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Bytes that have passed through the digest so far.
    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }
}

impl<T: Read> Checksum<T> {
    /// Read exactly `size` bytes, folding them into the running digest.
    pub fn read(&mut self, size: usize) -> anyhow::Result<Bytes> {
        let mut buffer = vec![0; size];
        self.inner
            .read_exact(&mut buffer)
            .map_err(|_| IndexError::Corrupt("unexpected end-of-file".to_string()))?;

        self.digest.update(&buffer);
        self.bytes_processed += size as u64;
        Ok(Bytes::from(buffer))
    }

    /// Read the trailing digest and compare it against the running one.
    pub fn verify(&mut self) -> anyhow::Result<()> {
        let mut expected = [0u8; CHECKSUM_SIZE];
        self.inner
            .read_exact(&mut expected)
            .map_err(|_| IndexError::Corrupt("missing trailing checksum".to_string()))?;

        let actual = self.digest.clone().finalize();

        if expected != actual.as_slice() {
            return Err(IndexError::Corrupt(
                "checksum does not match value stored on disk".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

impl<T: Write> Checksum<T> {
    /// Write `data`, folding it into the running digest.
    pub fn write(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.inner.write_all(data)?;
        self.digest.update(data);
        self.bytes_processed += data.len() as u64;
        Ok(())
    }

    /// Append the 20-byte digest of everything written so far.
    pub fn write_checksum(&mut self) -> anyhow::Result<()> {
        let checksum = self.digest.clone().finalize();
        self.inner.write_all(checksum.as_slice())?;

        Ok(())
    }
}
