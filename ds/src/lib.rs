// Copyright 2024 Kevin Ludwig
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Block-addressed data storage interface.
//!
//! An ODS-2 volume is read through a [`BlockSource`]: a seekable, read-only
//! source of fixed-size 512-byte blocks addressed by LBN (logical block
//! number, 0-based). Concrete backends (a local file, a network block
//! device, ...) implement [`BlockSource::read`] and [`BlockSource::write`];
//! [`BlockSource::read_block`] is a default method built on top of `read`.

pub use odsfs_err::{DecodeError, DecodeErrorKind, Error, IoError, Result};

/// Size in bytes of a disk block. Fixed for all ODS-2 volumes.
pub const BLOCK_SIZE: usize = 512;

/// A single 512-byte disk block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block(pub [u8; BLOCK_SIZE]);

impl Block {
    pub fn zeroed() -> Self {
        Block([0u8; BLOCK_SIZE])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// A seekable, read-only source of fixed-size blocks.
///
/// Implementations are logically immutable for the lifetime of a mounted
/// filesystem: the core assumes no external writer concurrently modifies
/// the backing storage. Reads must be serialized internally by the
/// implementation (a seek followed by a read is not atomic on a shared
/// handle) — callers may invoke `read`/`read_block` from multiple threads.
pub trait BlockSource {
    /// Reads `buffer.len()` bytes starting at byte `offset`.
    ///
    /// Fails with [`IoError::SeekPastEnd`] or [`IoError::ShortRead`] if the
    /// requested range runs past the end of the device.
    fn read(&self, offset: u64, buffer: &mut [u8]) -> Result<()>;

    /// Writes `buffer` at byte `offset`.
    ///
    /// Read-only backends always fail with [`IoError::ReadOnly`].
    fn write(&self, offset: u64, buffer: &[u8]) -> Result<()>;

    /// Reads the 512-byte block at logical block number `lbn`.
    fn read_block(&self, lbn: u32) -> Result<Block> {
        log::trace!("read_block: lbn {lbn:#x} (offset {:#x})", lbn as u64 * BLOCK_SIZE as u64);
        let mut block = Block::zeroed();
        self.read(lbn as u64 * BLOCK_SIZE as u64, &mut block.0)?;
        Ok(block)
    }
}
