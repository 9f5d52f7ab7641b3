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

//! File handles: header decoding, VBN reads and directory traversal.

use std::sync::Arc;

use odsfs_ds::{Block, BlockSource};
use odsfs_err::{Error, Result};

use crate::dir::{parse_dir_block, DirEntry};
use crate::extent::ExtentMap;
use crate::structures::{FileHeader, Fid};

/// State shared by every [`File`] opened from the same [`crate::Filesystem`]:
/// the backing disk, the index file's own extent map, and the offset a
/// FID's `file_num` is added to in order to find that file's header VBN.
///
/// Held behind an `Arc` so that opening a file is a cheap clone of this
/// context rather than a borrow of the owning `Filesystem`.
pub(crate) struct IndexContext<DS: BlockSource> {
    pub(crate) disk: Arc<DS>,
    pub(crate) index_extents: ExtentMap,
    pub(crate) index_file_starting_vbn: u32,
    pub(crate) cluster_factor: u16,
}

/// An open ODS-2 file: its header block and decoded extent map.
///
/// Cheap to clone (an `Arc` clone of its [`IndexContext`] plus a 512-byte
/// block copy), so a [`crate::Filesystem`] can cache its index file and MFD
/// handles at mount time and hand out clones rather than re-reading their
/// headers on every call.
pub struct File<DS: BlockSource> {
    index: Arc<IndexContext<DS>>,
    header_block: Block,
    extents: ExtentMap,
    fid: Fid,
}

impl<DS: BlockSource> Clone for File<DS> {
    fn clone(&self) -> Self {
        Self {
            index: Arc::clone(&self.index),
            header_block: self.header_block.clone(),
            extents: self.extents.clone(),
            fid: self.fid,
        }
    }
}

impl<DS: BlockSource> File<DS> {
    /// Opens the file identified by `fid`. Its header lives at VBN
    /// `fid.file_num() + index_file_starting_vbn` within the index file,
    /// resolved through the mounted index file's extent map.
    pub(crate) fn open(index: Arc<IndexContext<DS>>, fid: Fid) -> Result<Self> {
        let header_vbn = fid.file_num() + index.index_file_starting_vbn;
        let lbn = index.index_extents.translate(header_vbn)?;
        let header_block = index.disk.read_block(lbn)?;
        Self::from_header_block(index, fid, header_block)
    }

    /// Builds a `File` from an already-read header block: validates the
    /// embedded FID and decodes the extent map. Used by [`Self::open`] and,
    /// during mount, to build the index file's own handle from the header
    /// block read directly by LBN to bootstrap `index`.
    pub(crate) fn from_header_block(
        index: Arc<IndexContext<DS>>,
        fid: Fid,
        header_block: Block,
    ) -> Result<Self> {
        let header = FileHeader::decode(header_block.as_bytes())?;
        if header.fid != fid {
            return Err(Error::FidMismatch);
        }
        let extents = ExtentMap::from_map_area(
            header.map_area(header_block.as_bytes()),
            index.cluster_factor,
        )?;
        Ok(Self { index, header_block, extents, fid })
    }

    fn header(&self) -> Result<&FileHeader> {
        FileHeader::decode(self.header_block.as_bytes())
    }

    pub fn fid(&self) -> Fid {
        self.fid
    }

    /// The file's name, read from its file-identification area.
    pub fn name(&self) -> Result<String> {
        let header = self.header()?;
        Ok(header.ident(self.header_block.as_bytes())?.name())
    }

    pub fn is_dir(&self) -> Result<bool> {
        Ok(self.header()?.is_dir())
    }

    /// Number of blocks allocated to the file, per its extent map.
    pub fn block_count(&self) -> u32 {
        self.extents.total_blocks()
    }

    /// Exclusive upper bound of allocated VBNs, from the embedded
    /// file-record-attribute block.
    pub fn efblk(&self) -> Result<u32> {
        Ok(self.header()?.file_rec_attributes.efblk())
    }

    /// Reads the file-relative block `vbn` (1-based).
    pub fn read_vbn(&self, vbn: u32) -> Result<Block> {
        let lbn = self.extents.translate(vbn)?;
        self.index.disk.read_block(lbn)
    }

    /// Reads every directory record across all of this file's data
    /// blocks. Fails with [`Error::NotADirectory`] if this file is not a
    /// directory.
    pub fn read_dir_entries(&self) -> Result<Vec<DirEntry>> {
        if !self.is_dir()? {
            return Err(Error::NotADirectory);
        }

        let mut entries = Vec::new();
        for vbn in 1..self.efblk()? {
            let block = self.read_vbn(vbn)?;
            entries.extend(parse_dir_block(block.as_bytes())?);
        }
        Ok(entries)
    }

    /// Looks up `name` among this directory's entries and opens the file
    /// it names.
    ///
    /// When `version` is `None`, the first on-disk entry for `name` is
    /// used; ODS-2 directories list versions of a name highest-first, so
    /// this is the newest version.
    pub fn open_file_in_dir(&self, name: &str, version: Option<u16>) -> Result<File<DS>> {
        let entries = self.read_dir_entries()?;
        let mut matching = entries.iter().filter(|e| e.name == name);

        let entry = match version {
            Some(v) => matching.find(|e| e.version == v),
            None => matching.next(),
        };

        let entry = entry.ok_or(Error::NotFound)?;
        File::open(Arc::clone(&self.index), entry.fid)
    }
}
