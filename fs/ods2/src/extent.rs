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

//! Extent map decoding: VBN-to-LBN translation.
//!
//! A file header's map area is a sequence of 16-bit words, grouped into
//! variable-length entries. The top two bits of an entry's first word
//! select its format (0..3), which fixes the entry's width in words and
//! how `block_count`/`lbn` are packed into it. This mirrors
//! `ParseFileHeader`'s decode loop word-for-word.

use odsfs_err::{DecodeError, DecodeErrorKind, Error, Result};

/// One contiguous run of blocks: VBNs `[vbn, vbn + block_count)` map to
/// LBNs `[lbn, lbn + block_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub vbn: u32,
    pub lbn: u32,
    pub block_count: u32,
}

/// The full VBN-to-LBN mapping for one file, decoded from its header's map
/// area.
#[derive(Debug, Clone, Default)]
pub struct ExtentMap {
    extents: Vec<Extent>,
}

impl ExtentMap {
    /// Parses a map area into its extents.
    ///
    /// `cluster_factor` is the volume's allocation granularity (from the
    /// home block); each extent's block count must be a multiple of it.
    /// Format-0 entries carry no block range — the original leaves them
    /// unhandled (and loops forever doing so); here they are skipped,
    /// advancing past their single word without appending an extent or
    /// advancing the running VBN.
    pub fn from_map_area(map_area: &[u8], cluster_factor: u16) -> Result<Self> {
        let words = to_words(map_area)?;
        let mut extents = Vec::new();
        let mut vbn: u32 = 1;
        let mut i = 0usize;

        while i < words.len() {
            let w0 = words[i] as u32;
            let format = (w0 >> 14) & 0x3;

            let word_offset = i * 2;
            let entry_words = format as usize + 1;
            if i + entry_words > words.len() {
                return Err(Error::Decode(DecodeError::new(
                    DecodeErrorKind::ShortBuffer,
                    word_offset,
                )));
            }

            if format == 0 {
                i += 1;
                continue;
            }

            let (block_count_raw, lbn) = match format {
                1 => {
                    let w1 = words[i + 1] as u32;
                    (w0 & 0xff, ((w0 << 8) & 0x3f_0000) | w1)
                }
                2 => {
                    let w1 = words[i + 1] as u32;
                    let w2 = words[i + 2] as u32;
                    (w0 & 0x3fff, (w2 << 16) | w1)
                }
                3 => {
                    let w1 = words[i + 1] as u32;
                    let w2 = words[i + 2] as u32;
                    let w3 = words[i + 3] as u32;
                    (((w0 & 0x3fff) << 16) | w1, (w3 << 16) | w2)
                }
                _ => unreachable!("2-bit field"),
            };
            let block_count = block_count_raw + 1;

            if cluster_factor != 0 && block_count % cluster_factor as u32 != 0 {
                return Err(Error::Decode(DecodeError::new(
                    DecodeErrorKind::BadFormat,
                    word_offset,
                )));
            }

            extents.push(Extent { vbn, lbn, block_count });
            vbn += block_count;
            i += entry_words;
        }

        Ok(Self { extents })
    }

    /// Translates a file-relative VBN (1-based) to a volume-absolute LBN
    /// (0-based).
    pub fn translate(&self, vbn: u32) -> Result<u32> {
        if vbn == 0 {
            return Err(Error::VbnNotMapped);
        }
        for extent in &self.extents {
            if vbn >= extent.vbn && vbn < extent.vbn + extent.block_count {
                return Ok(extent.lbn + (vbn - extent.vbn));
            }
        }
        Err(Error::VbnNotMapped)
    }

    pub fn total_blocks(&self) -> u32 {
        self.extents.iter().map(|e| e.block_count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extent> {
        self.extents.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }
}

fn to_words(map_area: &[u8]) -> Result<Vec<u16>> {
    if map_area.len() % 2 != 0 {
        return Err(Error::Decode(DecodeError::new(DecodeErrorKind::ShortBuffer, map_area.len())));
    }
    Ok(map_area.chunks_exact(2).map(|w| u16::from_le_bytes([w[0], w[1]])).collect())
}
