// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bag-of-cells (BOC) deserialization.
//!
//! Supports the generic `b5ee9c72` container and the two legacy indexed variants
//! (`68ff65f3`, `acc3a728`). Cells must be stored in topological order (every reference
//! points to a later cell), which also rules out reference cycles. Exotic cells are read as
//! plain data; hashes and depths stored alongside cells are skipped.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::cell::{Cell, CellError, MAX_REFS};

const BOC_GENERIC: u32 = 0xB5EE_9C72;
const BOC_INDEXED: u32 = 0x68FF_65F3;
const BOC_INDEXED_CRC32C: u32 = 0xACC3_A728;

/// A BOC decode error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BocError {
    /// Input ended unexpectedly.
    UnexpectedEof,
    /// The magic prefix is not a known BOC magic.
    BadMagic {
        /// The first four bytes, big-endian.
        magic: u32,
    },
    /// A size field in the header is out of range.
    BadHeader,
    /// The container declares no root cells.
    NoRoots,
    /// A cell descriptor is invalid.
    BadCell {
        /// Index of the offending cell.
        index: usize,
    },
    /// A cell refers to itself, an earlier cell, or a missing cell.
    BadReference {
        /// Index of the referring cell.
        from: usize,
        /// Referenced index.
        to: usize,
    },
    /// The CRC32-C trailer does not match the payload.
    ChecksumMismatch,
    /// A cell could not be assembled.
    Cell(CellError),
}

impl fmt::Display for BocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::BadMagic { magic } => write!(f, "bad BOC magic 0x{magic:08x}"),
            Self::BadHeader => write!(f, "invalid BOC header"),
            Self::NoRoots => write!(f, "BOC has no root cells"),
            Self::BadCell { index } => write!(f, "invalid cell descriptor at index {index}"),
            Self::BadReference { from, to } => {
                write!(f, "cell {from} has invalid reference to cell {to}")
            }
            Self::ChecksumMismatch => write!(f, "CRC32-C checksum mismatch"),
            Self::Cell(e) => write!(f, "{e}"),
        }
    }
}

impl core::error::Error for BocError {}

impl From<CellError> for BocError {
    fn from(e: CellError) -> Self {
        Self::Cell(e)
    }
}

/// Big-endian byte reader with bounds checks.
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], BocError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(BocError::UnexpectedEof)?;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(BocError::UnexpectedEof)?;
        self.offset = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, BocError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a big-endian unsigned integer of `len` bytes (`len <= 8`).
    fn read_uint(&mut self, len: usize) -> Result<u64, BocError> {
        Ok(self
            .take(len)?
            .iter()
            .fold(0_u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    fn read_usize(&mut self, len: usize) -> Result<usize, BocError> {
        usize::try_from(self.read_uint(len)?).map_err(|_| BocError::BadHeader)
    }
}

struct Header {
    ref_size: usize,
    cells: usize,
    roots: Vec<usize>,
    cells_size: usize,
    has_crc32c: bool,
}

fn read_header(r: &mut Reader<'_>) -> Result<Header, BocError> {
    let magic = r.read_uint(4)? as u32;
    let (has_idx, has_crc32c, ref_size) = match magic {
        BOC_GENERIC => {
            let flags = r.read_u8()?;
            (flags & 0x80 != 0, flags & 0x40 != 0, usize::from(flags & 0x07))
        }
        BOC_INDEXED => (true, false, usize::from(r.read_u8()?)),
        BOC_INDEXED_CRC32C => (true, true, usize::from(r.read_u8()?)),
        _ => return Err(BocError::BadMagic { magic }),
    };
    let off_size = usize::from(r.read_u8()?);
    if !(1..=4).contains(&ref_size) || !(1..=8).contains(&off_size) {
        return Err(BocError::BadHeader);
    }

    let cells = r.read_usize(ref_size)?;
    let root_count = r.read_usize(ref_size)?;
    let _absent = r.read_usize(ref_size)?;
    let cells_size = r.read_usize(off_size)?;
    if root_count == 0 {
        return Err(BocError::NoRoots);
    }
    if root_count > cells {
        return Err(BocError::BadHeader);
    }

    let roots = if magic == BOC_GENERIC {
        let mut roots = Vec::with_capacity(root_count);
        for _ in 0..root_count {
            let root = r.read_usize(ref_size)?;
            if root >= cells {
                return Err(BocError::BadHeader);
            }
            roots.push(root);
        }
        roots
    } else {
        // Legacy containers always root at cell 0.
        alloc::vec![0]
    };

    if has_idx {
        let index_len = cells.checked_mul(off_size).ok_or(BocError::BadHeader)?;
        r.take(index_len)?;
    }

    Ok(Header {
        ref_size,
        cells,
        roots,
        cells_size,
        has_crc32c,
    })
}

struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<usize>,
}

fn read_cell(r: &mut Reader<'_>, index: usize, ref_size: usize) -> Result<RawCell, BocError> {
    let d1 = r.read_u8()?;
    let d2 = r.read_u8()?;
    let ref_count = usize::from(d1 & 0x07);
    if ref_count > MAX_REFS {
        return Err(BocError::BadCell { index });
    }
    if d1 & 0x10 != 0 {
        // Stored hashes and depths: one (hash, depth) pair per significant level.
        let level_mask = d1 >> 5;
        let pairs = level_mask.count_ones() as usize + 1;
        r.take(pairs * (32 + 2))?;
    }

    let data_len = usize::from(d2).div_ceil(2);
    let data = r.take(data_len)?.to_vec();
    let bit_len = if d2 % 2 == 0 {
        data_len * 8
    } else {
        // The last byte carries a completion tag.
        let last = data.last().copied().unwrap_or(0);
        if last == 0 {
            return Err(BocError::BadCell { index });
        }
        data_len * 8 - last.trailing_zeros() as usize - 1
    };

    let mut refs = Vec::with_capacity(ref_count);
    for _ in 0..ref_count {
        refs.push(r.read_usize(ref_size)?);
    }
    Ok(RawCell {
        data,
        bit_len,
        refs,
    })
}

/// Parses a serialized bag of cells and returns its root cells in declaration order.
pub fn parse_boc(bytes: &[u8]) -> Result<Vec<Arc<Cell>>, BocError> {
    let mut r = Reader::new(bytes);
    let header = read_header(&mut r)?;

    let data_start = r.offset;
    let mut raw = Vec::with_capacity(header.cells.min(bytes.len()));
    for index in 0..header.cells {
        raw.push(read_cell(&mut r, index, header.ref_size)?);
    }
    if r.offset - data_start != header.cells_size {
        return Err(BocError::BadHeader);
    }

    if header.has_crc32c {
        let payload_end = r.offset;
        let stored = r.take(4)?;
        let stored = u32::from_le_bytes([stored[0], stored[1], stored[2], stored[3]]);
        if crc32c(&bytes[..payload_end]) != stored {
            return Err(BocError::ChecksumMismatch);
        }
    }

    // References always point forward, so building back to front sees every child first.
    let mut built: Vec<Option<Arc<Cell>>> = alloc::vec![None; header.cells];
    for (index, cell) in raw.into_iter().enumerate().rev() {
        let mut refs = Vec::with_capacity(cell.refs.len());
        for to in cell.refs {
            let child = (to > index)
                .then(|| built.get(to).cloned().flatten())
                .flatten()
                .ok_or(BocError::BadReference { from: index, to })?;
            refs.push(child);
        }
        built[index] = Some(Arc::new(Cell::from_parts(cell.data, cell.bit_len, refs)?));
    }

    header
        .roots
        .iter()
        .map(|&root| built[root].clone().ok_or(BocError::NoRoots))
        .collect()
}

/// Parses a bag of cells and returns its first root.
pub fn parse_boc_root(bytes: &[u8]) -> Result<Arc<Cell>, BocError> {
    parse_boc(bytes)?
        .into_iter()
        .next()
        .ok_or(BocError::NoRoots)
}

/// CRC32-C (Castagnoli), reflected polynomial `0x82F63B78`.
fn crc32c(bytes: &[u8]) -> u32 {
    let mut crc = !0_u32;
    for &b in bytes {
        crc ^= u32::from(b);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0x82F6_3B78 & mask);
        }
    }
    !crc
}
