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

//! Volume mount sequence and filesystem-level accessors.

use std::sync::Arc;

use odsfs_ds::BlockSource;
use odsfs_err::{Error, Result};

use crate::extent::ExtentMap;
use crate::file::{File, IndexContext};
use crate::structures::{Fid, FileHeader, HomeBlock, ReservedFile};

/// Fixed LBN of the home block. ODS-2 volumes may carry an alternate home
/// block for redundancy; this reader only ever consults the primary one
/// (see Non-goals).
const HOME_BLOCK_LBN: u32 = 1;

/// Decoded, owned mount-time state: the home block plus the index file and
/// master file directory, both opened and validated once at mount time and
/// handed out as clones thereafter.
struct MountState<DS: BlockSource> {
    home: HomeBlock,
    index: Arc<IndexContext<DS>>,
    index_file: File<DS>,
    mfd_file: File<DS>,
}

/// A mounted ODS-2 volume.
///
/// `Filesystem` owns the backing [`BlockSource`] and, once mounted, the
/// decoded home block alongside long-lived index file and master file
/// directory handles. Other files are represented by [`File`] handles
/// manufactured on demand via [`Filesystem::open`] or
/// [`File::open_file_in_dir`].
pub struct Filesystem<DS: BlockSource> {
    disk: Arc<DS>,
    state: Option<MountState<DS>>,
}

impl<DS: BlockSource> Filesystem<DS> {
    /// Wraps `disk` without reading anything from it. Call [`Self::mount`]
    /// before using any other method.
    pub fn new(disk: DS) -> Self {
        Self { disk: Arc::new(disk), state: None }
    }

    /// Reads the home block, bootstraps the index file from a header read
    /// directly by LBN, then opens the master file directory through the
    /// index file's extent map and rejects it if it isn't flagged as a
    /// directory.
    ///
    /// Mirrors the original mount sequence exactly: home block, index file,
    /// MFD, with the MFD's `is_dir` check as the final gate before the
    /// volume is considered mounted.
    pub fn mount(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Err(Error::AlreadyMounted);
        }

        let home_bytes = self.disk.read_block(HOME_BLOCK_LBN)?;
        let home = *HomeBlock::decode(home_bytes.as_bytes())?;

        let index_header_lbn = home.ibmaplbn.get() + home.ibmapsize.get() as u32;
        let index_header_block = self.disk.read_block(index_header_lbn)?;
        let index_fid = Fid::reserved(ReservedFile::Index, ReservedFile::Index);
        let index_header = FileHeader::decode(index_header_block.as_bytes())?;
        if index_header.fid != index_fid {
            return Err(Error::FidMismatch);
        }
        let index_extents = ExtentMap::from_map_area(
            index_header.map_area(index_header_block.as_bytes()),
            home.cluster.get(),
        )?;
        let index_file_starting_vbn =
            home.ibmapvbn.get() as u32 - 1 + home.ibmapsize.get() as u32;

        let index = Arc::new(IndexContext {
            disk: Arc::clone(&self.disk),
            index_extents,
            index_file_starting_vbn,
            cluster_factor: home.cluster.get(),
        });

        let index_file =
            File::from_header_block(Arc::clone(&index), index_fid, index_header_block)?;

        let mfd_file =
            File::open(Arc::clone(&index), Fid::reserved(ReservedFile::Mfd, ReservedFile::Mfd))?;
        if !mfd_file.is_dir()? {
            return Err(Error::NotADirectory);
        }

        self.state = Some(MountState { home, index, index_file, mfd_file });
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.state.is_some()
    }

    fn state(&self) -> Result<&MountState<DS>> {
        self.state.as_ref().ok_or(Error::NotMounted)
    }

    pub fn disk(&self) -> &DS {
        &self.disk
    }

    pub fn cluster_factor(&self) -> u16 {
        self.state.as_ref().map(|s| s.home.cluster.get()).unwrap_or(1)
    }

    /// Absolute LBN of the index file's own file header, computed from the
    /// home block rather than looked up through any extent map.
    pub fn index_file_header_lbn(&self) -> Result<u32> {
        let state = self.state()?;
        Ok(state.home.ibmaplbn.get() + state.home.ibmapsize.get() as u32)
    }

    /// The index file (`INDEXF.SYS`), opened and validated at mount time.
    pub fn open_index_file(&self) -> Result<File<DS>> {
        Ok(self.state()?.index_file.clone())
    }

    /// Opens any file by FID, via the index file's extent map.
    pub fn open(&self, fid: Fid) -> Result<File<DS>> {
        File::open(Arc::clone(&self.state()?.index), fid)
    }

    /// The master file directory (`000000.DIR`), the volume's root
    /// directory, opened and confirmed to be a directory at mount time.
    pub fn open_root_dir(&self) -> Result<File<DS>> {
        Ok(self.state()?.mfd_file.clone())
    }
}
