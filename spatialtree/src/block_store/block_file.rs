//! Fixed-size block I/O over a single file.
//!
//! Every block is laid out as `[u32 LE payload length][bincode payload][zero padding]`
//! and lives at offset `block_id * block_size`. Each read or write is exactly one
//! seek plus one full-block transfer; nothing is cached.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::constants::LENGTH_PREFIX_SIZE;
use super::types::{BlockId, SpatialError, SpatialResult};

/// Encodes a value with the configuration used for every block payload.
pub(crate) fn encode_payload<T: Serialize + ?Sized>(value: &T) -> SpatialResult<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(
        value,
        bincode::config::legacy(),
    )?)
}

/// Decodes a payload written by [`encode_payload`].
pub(crate) fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> SpatialResult<T> {
    bincode::serde::decode_from_slice(bytes, bincode::config::legacy())
        .map(|(value, _)| value)
        .map_err(SpatialError::from)
}

/// A file addressed in fixed-size blocks.
pub struct BlockFile {
    file: RwLock<File>,
    path: PathBuf,
    block_size: usize,
}

impl BlockFile {
    /// Opens the file at `path`, creating an empty one when missing.
    pub fn open_or_create(path: &Path, block_size: usize) -> SpatialResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            file: RwLock::new(file),
            path: path.to_path_buf(),
            block_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Largest payload a block can carry after its length prefix.
    pub fn payload_capacity(&self) -> usize {
        self.block_size - LENGTH_PREFIX_SIZE
    }

    /// Current file length in bytes.
    pub fn len_bytes(&self) -> SpatialResult<u64> {
        Ok(self.file.read().metadata()?.len())
    }

    /// Drops every block of the file.
    pub fn truncate(&self) -> SpatialResult<()> {
        let file = self.file.write();
        file.set_len(0)?;
        Ok(())
    }

    /// Reads block `block_id` and decodes its payload.
    pub fn read_block<T: DeserializeOwned>(&self, block_id: BlockId) -> SpatialResult<T> {
        let buffer = self.read_raw(block_id)?;

        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        prefix.copy_from_slice(&buffer[..LENGTH_PREFIX_SIZE]);
        let length = u32::from_le_bytes(prefix) as usize;
        if length == 0 || length > self.payload_capacity() {
            return Err(SpatialError::CorruptMetadata(format!(
                "block {} of {} declares a payload of {} bytes",
                block_id,
                self.path.display(),
                length
            )));
        }

        decode_payload(&buffer[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + length])
    }

    /// Encodes `value` and writes it to block `block_id`, padded to the block size.
    pub fn write_block<T: Serialize + ?Sized>(
        &self,
        block_id: BlockId,
        value: &T,
    ) -> SpatialResult<()> {
        let payload = encode_payload(value)?;
        if payload.len() > self.payload_capacity() {
            return Err(SpatialError::InvalidState(format!(
                "payload of {} bytes does not fit block {} (max {})",
                payload.len(),
                block_id,
                self.payload_capacity()
            )));
        }

        let mut buffer = Vec::with_capacity(self.block_size);
        buffer.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buffer.extend_from_slice(&payload);
        buffer.resize(self.block_size, 0);

        let mut file = self.file.write();
        file.seek(SeekFrom::Start(self.offset(block_id)))?;
        file.write_all(&buffer)?;
        Ok(())
    }

    /// Flushes written blocks to disk.
    pub fn sync(&self) -> SpatialResult<()> {
        self.file.write().sync_all()?;
        Ok(())
    }

    fn read_raw(&self, block_id: BlockId) -> SpatialResult<Vec<u8>> {
        let mut buffer = vec![0u8; self.block_size];
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(self.offset(block_id)))?;
        file.read_exact(&mut buffer).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                SpatialError::ShortRead {
                    block_id,
                    expected: self.block_size,
                }
            } else {
                SpatialError::Io(e)
            }
        })?;
        Ok(buffer)
    }

    fn offset(&self, block_id: BlockId) -> u64 {
        block_id * self.block_size as u64
    }
}
