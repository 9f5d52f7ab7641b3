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

//! A synthetic ODS-2 volume image for exercising mount and traversal
//! without a real VMS disk image on hand.

use tempfile::NamedTempFile;
use zerocopy::little_endian::{U16, U32};
use zerocopy::IntoBytes;

use crate::structures::{pdp11_swap32, Fid, FileHeader, FileIdent, FileRecordAttribute, HomeBlock};

const BLOCK_SIZE: usize = 512;

const HOME_LBN: u32 = 1;
const BITMAP_LBN: u32 = 2;
const BITMAP_SIZE: u32 = 1;
const IBMAPVBN: u32 = 1;
/// Offset added to a FID's `file_num` to get its header VBN in the index
/// file: `ibmapvbn - 1 + ibmapsize`.
const INDEX_FILE_STARTING_VBN: u32 = IBMAPVBN - 1 + BITMAP_SIZE;
/// LBN of the index file's own header, and the first LBN of its data area.
const INDEX_HEADER_LBN: u32 = BITMAP_LBN + BITMAP_SIZE; // 3
const INDEX_DATA_BLOCKS: u32 = 12;
const MFD_DATA_LBN: u32 = 20;

/// Word offset of the identification area inside a file header block.
const ID_OFFSET_WORDS: u8 = (std::mem::size_of::<FileHeader>() / 2) as u8;
/// Word offset of the extent map area inside a file header block.
const MAP_OFFSET_WORDS: u8 =
    ((std::mem::size_of::<FileHeader>() + std::mem::size_of::<FileIdent>()) / 2) as u8;

fn file_record_attribute(efblk: u32) -> FileRecordAttribute {
    FileRecordAttribute {
        rtype: 0,
        rattrib: 0,
        rsize: U16::new(0),
        hiblk_raw: U32::new(0),
        efblk_raw: U32::new(pdp11_swap32(efblk)),
        ffbyte: U16::new(0),
        bktsize: 0,
        vfcsize: 0,
        maxrec: U16::new(0),
        defext: U16::new(0),
        gbc: U16::new(0),
        pad: [0; 8],
        versions: U16::new(0),
    }
}

fn blank_ident(name: &str) -> FileIdent {
    let mut filename = [b' '; 20];
    let bytes = name.as_bytes();
    let split = bytes.len().min(20);
    filename[..split].copy_from_slice(&bytes[..split]);
    let mut filenamext = [b' '; 66];
    if bytes.len() > 20 {
        let rest = &bytes[20..];
        let rest_len = rest.len().min(66);
        filenamext[..rest_len].copy_from_slice(&rest[..rest_len]);
    }
    FileIdent {
        filename,
        revision: U16::new(1),
        credate: Default::default(),
        revdate: Default::default(),
        expdate: Default::default(),
        bakdate: Default::default(),
        filenamext,
    }
}

/// Builds one 512-byte file header block: a [`FileHeader`] at offset 0, a
/// [`FileIdent`] right after it, and the extent map bytes right after that.
fn build_header_block(
    fid: Fid,
    name: &str,
    is_directory: bool,
    map_bytes: &[u8],
    efblk: u32,
) -> [u8; BLOCK_SIZE] {
    let filechar = if is_directory {
        crate::structures::FileCharacteristics::DIRECTORY.bits()
    } else {
        0
    };

    let header = FileHeader {
        id_offset: ID_OFFSET_WORDS,
        map_area_offset: MAP_OFFSET_WORDS,
        acl_offset: 0,
        rsvd_offset: 0,
        seg_num: U16::new(0),
        struclev: U16::new(0x0202),
        fid,
        ext_fid: Fid::new(0, 0, 0),
        file_rec_attributes: file_record_attribute(efblk),
        filechar: U32::new(filechar),
        recprot: U16::new(0),
        map_inuse: (map_bytes.len() / 2) as u8,
        acc_mode: 0,
        fileowner: U32::new(0),
        fileprot: U16::new(0),
        backlink: Fid::new(0, 0, 0),
        journal: U16::new(0),
        pad: U16::new(0),
        highwater: U32::new(0),
    };
    let ident = blank_ident(name);

    let mut block = [0u8; BLOCK_SIZE];
    block[..std::mem::size_of::<FileHeader>()].copy_from_slice(header.as_bytes());
    let id_start = ID_OFFSET_WORDS as usize * 2;
    block[id_start..id_start + std::mem::size_of::<FileIdent>()].copy_from_slice(ident.as_bytes());
    let map_start = MAP_OFFSET_WORDS as usize * 2;
    block[map_start..map_start + map_bytes.len()].copy_from_slice(map_bytes);
    block
}

/// Extent map bytes for a single format-2 entry: `count` blocks starting
/// at `lbn`. Format 2 is three 16-bit words: `w0 = (2<<14)|(count-1)`,
/// `w1` = low 16 bits of `lbn`, `w2` = high 16 bits of `lbn`.
fn single_extent_format2(lbn: u32, count: u32) -> Vec<u8> {
    let count_m1 = count - 1;
    let w0: u16 = (0b10 << 14) | (count_m1 as u16 & 0x3fff);
    let w1 = (lbn & 0xffff) as u16;
    let w2 = (lbn >> 16) as u16;
    [w0, w1, w2].iter().flat_map(|w| w.to_le_bytes()).collect()
}

fn build_home_block() -> [u8; BLOCK_SIZE] {
    let home = HomeBlock {
        homelbn: U32::new(HOME_LBN),
        alhomelbn: U32::new(0),
        altidxlbn: U32::new(0),
        struclev: U16::new(0x0201),
        cluster: U16::new(1),
        homevbn: U16::new(1),
        alhomevbn: U16::new(0),
        altidxvbn: U16::new(0),
        ibmapvbn: U16::new(1),
        ibmaplbn: U32::new(BITMAP_LBN),
        maxfiles: U32::new(100),
        ibmapsize: U16::new(BITMAP_SIZE as u16),
        resfiles: U16::new(5),
        devtype: U16::new(0),
        rvn: U16::new(1),
        setcount: U16::new(1),
        volchar: U16::new(0),
        volowner: U32::new(0),
        protect: U16::new(0),
        fileprot: U16::new(0),
        checksum1: U16::new(0),
        credate: Default::default(),
        window: 7,
        lru_lim: 0,
        extend: U16::new(0),
        retainmin: Default::default(),
        retainmax: Default::default(),
        revdate: Default::default(),
        min_class: [0; 20],
        max_class: [0; 20],
        pad: [0; 328],
        serialnum: U32::new(0),
        strucname: *b"TEST        ",
        volname: *b"TESTVOL     ",
        ownername: [0; 12],
        format: *b"DECFILE11B  ",
        checksum2: U16::new(0),
    };
    let mut block = [0u8; BLOCK_SIZE];
    block.copy_from_slice(home.as_bytes());
    block
}

/// Writes a minimal but structurally valid volume to a temp file:
///
/// - home block at LBN 1, cluster factor 1, `ibmapvbn`/`ibmapsize` both 1
///   (so `index_file_starting_vbn == 1`)
/// - index file header at LBN 3, mapping a 12-block data area starting at
///   LBN 3 (so a FID's header lives at LBN `3 + file_num`)
/// - the master file directory (FID 4,4,0) at index-file VBN 5, with its
///   one data block (LBN 20) containing `000000.DIR` (self-reference) and
///   `HELLO.TXT`
/// - `HELLO.TXT` at index-file VBN 11, a plain file with no data extents
///
/// Returns the image path and the `NamedTempFile` keeping it alive.
pub fn build_test_volume() -> (std::path::PathBuf, NamedTempFile) {
    build_test_volume_inner(true)
}

/// Same layout as [`build_test_volume`], except the master file directory's
/// `filechar` is built without [`crate::structures::FileCharacteristics::DIRECTORY`]
/// set, so `mount`'s `is_dir` check on the MFD fails.
pub fn build_test_volume_mfd_not_directory() -> (std::path::PathBuf, NamedTempFile) {
    build_test_volume_inner(false)
}

fn build_test_volume_inner(mfd_is_directory: bool) -> (std::path::PathBuf, NamedTempFile) {
    let highest_lbn = MFD_DATA_LBN;
    let mut image = vec![0u8; (highest_lbn as usize + 1) * BLOCK_SIZE];

    let write_block = |image: &mut [u8], lbn: u32, block: &[u8; BLOCK_SIZE]| {
        let start = lbn as usize * BLOCK_SIZE;
        image[start..start + BLOCK_SIZE].copy_from_slice(block);
    };

    write_block(&mut image, HOME_LBN, &build_home_block());

    let index_fid = Fid::reserved(
        crate::structures::ReservedFile::Index,
        crate::structures::ReservedFile::Index,
    );
    let index_map = single_extent_format2(INDEX_HEADER_LBN, INDEX_DATA_BLOCKS);
    let index_header_block = build_header_block(index_fid, "INDEXF.SYS", false, &index_map, 0);
    write_block(&mut image, INDEX_HEADER_LBN, &index_header_block);

    let mfd_fid = Fid::new(4, 4, 0);
    let mfd_map = single_extent_format2(MFD_DATA_LBN, 1);
    let mfd_header_block =
        build_header_block(mfd_fid, "000000.DIR", mfd_is_directory, &mfd_map, 2);
    let mfd_header_vbn = mfd_fid.file_num() + INDEX_FILE_STARTING_VBN;
    let mfd_header_lbn = INDEX_HEADER_LBN + (mfd_header_vbn - 1);
    write_block(&mut image, mfd_header_lbn, &mfd_header_block);

    let hello_fid = Fid::new(10, 1, 0);
    let hello_header_block = build_header_block(hello_fid, "HELLO.TXT", false, &[], 0);
    let hello_header_vbn = hello_fid.file_num() + INDEX_FILE_STARTING_VBN;
    let hello_header_lbn = INDEX_HEADER_LBN + (hello_header_vbn - 1);
    write_block(&mut image, hello_header_lbn, &hello_header_block);

    let mut dir_block = [0u8; BLOCK_SIZE];
    let entries = build_dir_block(&[("000000.DIR", 1, mfd_fid), ("HELLO.TXT", 1, hello_fid)]);
    dir_block[..entries.len()].copy_from_slice(&entries);
    write_block(&mut image, MFD_DATA_LBN, &dir_block);

    let mut file = NamedTempFile::new().unwrap();
    use std::io::Write;
    file.write_all(&image).unwrap();
    file.flush().unwrap();
    let path = file.path().to_path_buf();
    (path, file)
}

fn build_dir_block(entries: &[(&str, u16, Fid)]) -> Vec<u8> {
    use crate::structures::{DirHeader, DirVersionFid, DIR_END_OF_RECORDS};

    let mut buf = Vec::new();
    for (name, version, fid) in entries {
        let mut name_padded = name.as_bytes().to_vec();
        if name_padded.len() % 2 != 0 {
            name_padded.push(0);
        }
        let header_size = std::mem::size_of::<DirHeader>();
        let version_fid_size = std::mem::size_of::<DirVersionFid>();
        let body_len = header_size + name_padded.len() + version_fid_size - 2;

        let header = DirHeader {
            record_byte_count: U16::new(body_len as u16),
            version_limit: U16::new(1),
            flags: 0,
            name_byte_count: name.len() as u8,
        };
        let version_fid = DirVersionFid { version: U16::new(*version), fid: *fid };

        buf.extend_from_slice(header.as_bytes());
        buf.extend_from_slice(&name_padded);
        buf.extend_from_slice(version_fid.as_bytes());
    }
    buf.extend_from_slice(&DIR_END_OF_RECORDS.to_le_bytes());
    buf
}
