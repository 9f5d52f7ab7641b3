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

//! On-disk record layouts for ODS-2, decoded with `zerocopy` over
//! `#[repr(C)]` structs of explicit little-endian integer types. Every
//! structure's size is pinned with `const_assert_eq!` the way the original
//! C++ used `static_assert(sizeof(...) == N)`.

use std::fmt;

use odsfs_err::{DecodeError, DecodeErrorKind, Error, Result};
use static_assertions::const_assert_eq;
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Swaps the two 16-bit halves of a 32-bit value.
///
/// `hiblk`/`efblk` in [`FileRecordAttribute`] are stored in this PDP-11
/// word order rather than plain little-endian. Its own inverse.
pub fn pdp11_swap32(v: u32) -> u32 {
    ((v >> 16) & 0xffff) | ((v << 16) & 0xffff0000)
}

/// Reserved file numbers with dedicated meanings (ODS-2 §2.1).
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedFile {
    Index = 1,
    Bitmap = 2,
    BadBlock = 3,
    Mfd = 4,
    CoreImage = 5,
    VolSet = 6,
    StandardContinuation = 7,
    BackupJournal = 8,
    PendingBadBlock = 9,
}

/// A 6-byte file identifier: `{file_num: 24-bit, sequence_num: 16-bit,
/// rv_num: 8-bit}`, stored as a 16-bit low part, a 16-bit sequence number,
/// an 8-bit revision number and an 8-bit high part of the file number.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct Fid {
    low_num: U16,
    sequence_num: U16,
    rv_num: u8,
    high_num: u8,
}

const_assert_eq!(size_of::<Fid>(), 6);

impl Fid {
    pub fn new(file_num: u32, sequence_num: u16, rv_num: u8) -> Self {
        Self {
            low_num: U16::new((file_num & 0xffff) as u16),
            sequence_num: U16::new(sequence_num),
            rv_num,
            high_num: ((file_num >> 16) & 0xff) as u8,
        }
    }

    /// The FID conventionally used to identify a reserved file, e.g.
    /// `Fid::reserved(ReservedFile::Mfd, ReservedFile::Mfd)`.
    pub fn reserved(file: ReservedFile, sequence: ReservedFile) -> Self {
        Self::new(file as u32, sequence as u32 as u16, 0)
    }

    pub fn file_num(&self) -> u32 {
        self.low_num.get() as u32 | ((self.high_num as u32) << 16)
    }

    pub fn sequence_num(&self) -> u16 {
        self.sequence_num.get()
    }

    pub fn rv_num(&self) -> u8 {
        self.rv_num
    }
}

impl fmt::Debug for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fid({})", self)
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.file_num(), self.sequence_num(), self.rv_num)
    }
}

impl PartialEq for Fid {
    fn eq(&self, other: &Self) -> bool {
        self.low_num == other.low_num
            && self.sequence_num == other.sequence_num
            && self.rv_num == other.rv_num
            && self.high_num == other.high_num
    }
}

impl Eq for Fid {}

bitflags::bitflags! {
    /// File characteristics bit-flags from [`FileHeader::filechar`].
    ///
    /// Only [`FileCharacteristics::DIRECTORY`] is consulted by this reader;
    /// the rest are decoded for observability (see REDESIGN FLAGS).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileCharacteristics: u32 {
        const NOBACKUP = 1 << 1;
        const WRITEBACK = 1 << 2;
        const READCHECK = 1 << 3;
        const WRITECHECK = 1 << 4;
        const CONTIGB = 1 << 5;
        const LOCKED = 1 << 6;
        const CONTIG = 1 << 7;
        const BADACL = 1 << 11;
        const SPOOL = 1 << 12;
        const DIRECTORY = 1 << 13;
        const BADBLOCK = 1 << 14;
        const MARKDEL = 1 << 15;
        const NOCHARGE = 1 << 16;
        const ERASE = 1 << 17;
    }
}

/// The volume's superblock equivalent, always at LBN 1 (primary; no
/// alternate-home-block scanning — see Non-goals).
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct HomeBlock {
    /// This LBN.
    pub homelbn: U32,
    /// Alternate home LBN.
    pub alhomelbn: U32,
    /// Backup index LBN.
    pub altidxlbn: U32,
    pub struclev: U16,
    /// Cluster factor: allocation granularity in blocks.
    pub cluster: U16,
    pub homevbn: U16,
    pub alhomevbn: U16,
    pub altidxvbn: U16,
    /// VBN of the index file bitmap, inside the index file.
    pub ibmapvbn: U16,
    /// LBN of the index file bitmap.
    pub ibmaplbn: U32,
    pub maxfiles: U32,
    /// Size of the index file bitmap, in blocks.
    pub ibmapsize: U16,
    pub resfiles: U16,
    pub devtype: U16,
    pub rvn: U16,
    pub setcount: U16,
    pub volchar: U16,
    pub volowner: U32,
    pub protect: U16,
    pub fileprot: U16,
    pub checksum1: U16,
    pub credate: zerocopy::little_endian::U64,
    pub window: u8,
    pub lru_lim: u8,
    pub extend: U16,
    pub retainmin: zerocopy::little_endian::U64,
    pub retainmax: zerocopy::little_endian::U64,
    pub revdate: zerocopy::little_endian::U64,
    pub min_class: [u8; 20],
    pub max_class: [u8; 20],
    pub(crate) pad: [u8; 328],
    pub serialnum: U32,
    pub strucname: [u8; 12],
    pub volname: [u8; 12],
    pub ownername: [u8; 12],
    pub format: [u8; 12],
    pub checksum2: U16,
}

const_assert_eq!(size_of::<HomeBlock>(), 512);

impl fmt::Debug for HomeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HomeBlock")
            .field("homelbn", &self.homelbn.get())
            .field("cluster", &self.cluster.get())
            .field("ibmapvbn", &self.ibmapvbn.get())
            .field("ibmaplbn", &self.ibmaplbn.get())
            .field("ibmapsize", &self.ibmapsize.get())
            .field("maxfiles", &self.maxfiles.get())
            .finish_non_exhaustive()
    }
}

impl HomeBlock {
    pub fn decode(bytes: &[u8]) -> Result<&HomeBlock> {
        HomeBlock::ref_from_bytes(bytes).map_err(|_| {
            Error::Decode(DecodeError::new(DecodeErrorKind::SizeMismatch, 0))
        })
    }
}

/// The embedded file-record-attribute block inside [`FileHeader`].
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FileRecordAttribute {
    pub rtype: u8,
    pub rattrib: u8,
    /// Record size.
    pub rsize: U16,
    /// Highest VBN allocated, PDP-11 word order.
    pub(crate) hiblk_raw: U32,
    /// VBN of the end of the file, PDP-11 word order.
    pub(crate) efblk_raw: U32,
    /// First free byte.
    pub ffbyte: U16,
    /// File bucket size.
    pub bktsize: u8,
    /// Fixed control area size.
    pub vfcsize: u8,
    pub maxrec: U16,
    pub defext: U16,
    pub gbc: U16,
    pub(crate) pad: [u8; 8],
    /// Directory default version limit.
    pub versions: U16,
}

const_assert_eq!(size_of::<FileRecordAttribute>(), 32);

impl FileRecordAttribute {
    /// Highest VBN allocated.
    pub fn hiblk(&self) -> u32 {
        pdp11_swap32(self.hiblk_raw.get())
    }

    /// Exclusive upper bound of allocated VBNs.
    pub fn efblk(&self) -> u32 {
        pdp11_swap32(self.efblk_raw.get())
    }
}

impl fmt::Debug for FileRecordAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRecordAttribute")
            .field("hiblk", &self.hiblk())
            .field("efblk", &self.efblk())
            .field("maxrec", &self.maxrec.get())
            .finish_non_exhaustive()
    }
}

/// The 80-byte header at the start of a file-header block.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Debug)]
pub struct FileHeader {
    /// Offset (in 16-bit words) of the file-identification area.
    pub id_offset: u8,
    /// Offset (in 16-bit words) of the extent map area.
    pub map_area_offset: u8,
    pub acl_offset: u8,
    pub rsvd_offset: u8,
    pub seg_num: U16,
    pub struclev: U16,
    pub fid: Fid,
    pub ext_fid: Fid,
    pub file_rec_attributes: FileRecordAttribute,
    pub filechar: U32,
    pub recprot: U16,
    /// Number of 16-bit words in use in the extent map area.
    pub map_inuse: u8,
    pub acc_mode: u8,
    pub fileowner: U32,
    pub fileprot: U16,
    pub backlink: Fid,
    pub journal: U16,
    pub(crate) pad: U16,
    pub highwater: U32,
}

const_assert_eq!(size_of::<FileHeader>(), 80);

impl FileHeader {
    pub fn decode(block: &[u8]) -> Result<&FileHeader> {
        let (header, _) = FileHeader::ref_from_prefix(block).map_err(|_| {
            Error::Decode(DecodeError::new(DecodeErrorKind::ShortBuffer, 0))
        })?;
        header.validate(block.len())?;
        Ok(header)
    }

    /// Checks that the id and map areas this header points into lie fully
    /// inside the block it was decoded from (invariant iv/v in the data
    /// model).
    fn validate(&self, block_len: usize) -> Result<()> {
        let id_start = self.id_offset as usize * 2;
        if id_start + FILE_IDENT_SIZE > block_len {
            return Err(Error::Decode(DecodeError::new(DecodeErrorKind::OutOfBounds, id_start)));
        }
        let map_start = self.map_area_offset as usize * 2;
        let map_len = self.map_inuse as usize * 2;
        if map_start + map_len > block_len {
            return Err(Error::Decode(DecodeError::new(DecodeErrorKind::OutOfBounds, map_start)));
        }
        Ok(())
    }

    pub fn characteristics(&self) -> FileCharacteristics {
        FileCharacteristics::from_bits_truncate(self.filechar.get())
    }

    pub fn is_dir(&self) -> bool {
        self.characteristics().contains(FileCharacteristics::DIRECTORY)
    }

    pub fn map_area<'b>(&self, block: &'b [u8]) -> &'b [u8] {
        let start = self.map_area_offset as usize * 2;
        let len = self.map_inuse as usize * 2;
        &block[start..start + len]
    }

    pub fn ident<'b>(&self, block: &'b [u8]) -> Result<&'b FileIdent> {
        let start = self.id_offset as usize * 2;
        FileIdent::ref_from_bytes(&block[start..start + FILE_IDENT_SIZE]).map_err(|_| {
            Error::Decode(DecodeError::new(DecodeErrorKind::SizeMismatch, start))
        })
    }
}

/// The 120-byte file-identification area: a name and its version/date
/// stamps.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FileIdent {
    pub(crate) filename: [u8; 20],
    pub revision: U16,
    pub credate: zerocopy::little_endian::U64,
    pub revdate: zerocopy::little_endian::U64,
    pub expdate: zerocopy::little_endian::U64,
    pub bakdate: zerocopy::little_endian::U64,
    pub(crate) filenamext: [u8; 66],
}

const FILE_IDENT_SIZE: usize = 120;
const_assert_eq!(size_of::<FileIdent>(), FILE_IDENT_SIZE);

impl FileIdent {
    /// The printable file name: `filename` concatenated with
    /// `filenamext`, space-padded on the right, trimmed.
    pub fn name(&self) -> String {
        let mut buf = Vec::with_capacity(self.filename.len() + self.filenamext.len());
        buf.extend_from_slice(&self.filename);
        buf.extend_from_slice(&self.filenamext);
        let s = String::from_utf8_lossy(&buf);
        s.trim_end().to_string()
    }
}

impl fmt::Debug for FileIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileIdent").field("name", &self.name()).finish()
    }
}

/// Header of a directory record, immediately followed by
/// `name_byte_count` name bytes and then one or more
/// [`DirVersionFid`] entries.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Debug)]
pub struct DirHeader {
    pub record_byte_count: U16,
    pub version_limit: U16,
    pub flags: u8,
    pub name_byte_count: u8,
}

const_assert_eq!(size_of::<DirHeader>(), 6);

/// Sentinel value of [`DirHeader::record_byte_count`] marking the end of
/// records within a directory block.
pub const DIR_END_OF_RECORDS: u16 = 0xFFFF;

/// One `(version, fid)` pair trailing a directory record.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Debug)]
pub struct DirVersionFid {
    pub version: U16,
    pub fid: Fid,
}

const_assert_eq!(size_of::<DirVersionFid>(), 8);
