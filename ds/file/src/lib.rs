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

//! A [`BlockSource`] backed by a local, read-only file.

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::Path;

use log::{debug, error};
use odsfs_ds::BlockSource;
use odsfs_err::{Error, IoError, Result};

pub struct FileBlockSource {
    file: File,
    len: u64,
}

impl FileBlockSource {
    /// Opens `path` as a read-only volume image.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            error!("failed to open {}: {err}", path.display());
            Error::from(err)
        })?;
        let len = file.metadata()?.len();
        debug!("opened {} ({len} bytes)", path.display());
        Ok(Self { file, len })
    }

    /// Size of the backing file in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl BlockSource for FileBlockSource {
    fn read(&self, offset: u64, buffer: &mut [u8]) -> Result<()> {
        let end = offset
            .checked_add(buffer.len() as u64)
            .ok_or(Error::Io(IoError::SeekPastEnd { offset, size: self.len }))?;
        if end > self.len {
            return Err(Error::Io(IoError::SeekPastEnd { offset, size: self.len }));
        }

        self.file.read_exact_at(buffer, offset).map_err(|_| {
            Error::Io(IoError::ShortRead { offset, wanted: buffer.len(), got: 0 })
        })?;
        Ok(())
    }

    fn write(&self, _offset: u64, _buffer: &[u8]) -> Result<()> {
        Err(Error::Io(IoError::ReadOnly))
    }
}
