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

//! Read-only ODS-2 (VAX/VMS Files-11) volume decoding.
//!
//! Mount a [`Filesystem`] over any [`odsfs_ds::BlockSource`], then walk it
//! starting from [`Filesystem::open_root_dir`].

mod dir;
mod extent;
mod file;
mod filesystem;
mod structures;

#[cfg(test)]
mod test_support;

pub use dir::DirEntry;
pub use extent::{Extent, ExtentMap};
pub use file::File;
pub use filesystem::Filesystem;
pub use structures::{
    pdp11_swap32, DirHeader, DirVersionFid, FileCharacteristics, FileHeader, FileIdent,
    FileRecordAttribute, Fid, HomeBlock, ReservedFile, DIR_END_OF_RECORDS,
};
