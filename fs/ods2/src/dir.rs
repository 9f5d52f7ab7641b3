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

//! Directory block parsing.
//!
//! A directory file's data blocks are a sequence of variable-length
//! records: a [`DirHeader`], followed by `name_byte_count` raw name bytes
//! (not trimmed — whitespace in a directory entry's name is significant,
//! unlike [`crate::structures::FileIdent::name`]), followed by one or more
//! `(version, fid)` pairs. The block ends at the first record whose
//! `record_byte_count` is [`DIR_END_OF_RECORDS`].

use odsfs_err::{DecodeError, DecodeErrorKind, Error, Result};
use zerocopy::FromBytes;

use crate::structures::{DirHeader, DirVersionFid, Fid, DIR_END_OF_RECORDS};

/// One `(name, version)` entry in a directory, with the FID it resolves
/// to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub version: u16,
    pub fid: Fid,
}

/// Parses every record in a single directory data block.
///
/// A directory record lists one or more versions of the same name; each
/// version becomes its own [`DirEntry`].
pub fn parse_dir_block(block: &[u8]) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    while offset + 2 <= block.len() {
        let record_byte_count = u16::from_le_bytes([block[offset], block[offset + 1]]);
        if record_byte_count == DIR_END_OF_RECORDS {
            break;
        }

        let (header, _) = DirHeader::ref_from_prefix(&block[offset..]).map_err(|_| {
            Error::Decode(DecodeError::new(DecodeErrorKind::ShortBuffer, offset))
        })?;

        let header_size = std::mem::size_of::<DirHeader>();
        let name_start = offset + header_size;
        let name_len = header.name_byte_count as usize;
        let name_end = name_start
            .checked_add(name_len)
            .ok_or(Error::Decode(DecodeError::new(DecodeErrorKind::OutOfBounds, offset)))?;
        if name_end > block.len() {
            return Err(Error::Decode(DecodeError::new(DecodeErrorKind::OutOfBounds, name_start)));
        }
        let name = String::from_utf8_lossy(&block[name_start..name_end]).into_owned();

        // Version/fid pairs are word-aligned after the name.
        let mut version_start = name_end;
        if version_start % 2 != 0 {
            version_start += 1;
        }

        let record_end = offset
            .checked_add(header.record_byte_count.get() as usize + 2)
            .ok_or(Error::Decode(DecodeError::new(DecodeErrorKind::OutOfBounds, offset)))?;
        if record_end > block.len() {
            return Err(Error::Decode(DecodeError::new(DecodeErrorKind::OutOfBounds, offset)));
        }

        let version_fid_size = std::mem::size_of::<DirVersionFid>();
        let mut cursor = version_start;
        while cursor + version_fid_size <= record_end {
            let (version_fid, _) =
                DirVersionFid::ref_from_prefix(&block[cursor..]).map_err(|_| {
                    Error::Decode(DecodeError::new(DecodeErrorKind::ShortBuffer, cursor))
                })?;
            entries.push(DirEntry {
                name: name.clone(),
                version: version_fid.version.get(),
                fid: version_fid.fid,
            });
            cursor += version_fid_size;
        }

        offset = record_end;
    }

    Ok(entries)
}
