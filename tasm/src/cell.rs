// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cells: the storage unit of the TVM binary format.
//!
//! A [`Cell`] holds up to [`MAX_BITS`] data bits and up to [`MAX_REFS`] child references.
//! [`CellSlice`] is a bounds-checked cursor over a cell (big-endian bit order), and
//! [`CellBuilder`] is the append-only writer used to assemble fresh cells, e.g. when a trimmed
//! or repacked range has to be decoded on its own.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use num_bigint::BigUint;

/// Maximum number of data bits in a cell.
pub const MAX_BITS: usize = 1023;

/// Maximum number of child references in a cell.
pub const MAX_REFS: usize = 4;

/// A cell read/write error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellError {
    /// Fewer data bits remained than a read required.
    BitUnderflow {
        /// Bits requested.
        wanted: usize,
        /// Bits remaining.
        left: usize,
    },
    /// No child reference remained for a reference read.
    RefUnderflow,
    /// Appending would exceed [`MAX_BITS`].
    BitOverflow {
        /// Bit length the cell would have had.
        len: usize,
    },
    /// Appending would exceed [`MAX_REFS`].
    RefOverflow,
    /// A fixed-width integer read was wider than 64 bits.
    WidthTooLarge {
        /// Requested width.
        bits: usize,
    },
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BitUnderflow { wanted, left } => {
                write!(f, "cell underflow: wanted {wanted} bits, {left} left")
            }
            Self::RefUnderflow => write!(f, "cell underflow: no references left"),
            Self::BitOverflow { len } => {
                write!(f, "cell overflow: {len} bits exceeds {MAX_BITS}")
            }
            Self::RefOverflow => write!(f, "cell overflow: more than {MAX_REFS} references"),
            Self::WidthTooLarge { bits } => write!(f, "integer width {bits} exceeds 64 bits"),
        }
    }
}

impl core::error::Error for CellError {}

/// An ordinary cell: a bit string plus child references.
///
/// Bits past `bit_len` in the backing bytes are always zero, so structural equality matches
/// bit-string equality.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl Cell {
    /// Returns a cell with no bits and no references.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assembles a cell from raw parts.
    ///
    /// `data` must hold at least `bit_len` bits; anything after them is cleared.
    pub(crate) fn from_parts(
        mut data: Vec<u8>,
        bit_len: usize,
        refs: Vec<Arc<Cell>>,
    ) -> Result<Self, CellError> {
        if bit_len > MAX_BITS {
            return Err(CellError::BitOverflow { len: bit_len });
        }
        if refs.len() > MAX_REFS {
            return Err(CellError::RefOverflow);
        }
        let bytes = bit_len.div_ceil(8);
        if data.len() < bytes {
            return Err(CellError::BitUnderflow {
                wanted: bit_len,
                left: data.len() * 8,
            });
        }
        data.truncate(bytes);
        let tail = bit_len % 8;
        if tail != 0 {
            if let Some(last) = data.last_mut() {
                *last &= 0xFF << (8 - tail);
            }
        }
        Ok(Self {
            data,
            bit_len,
            refs,
        })
    }

    /// Number of data bits.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Backing bytes, big-endian, zero-padded after the last data bit.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Child references in order.
    #[must_use]
    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Returns a cursor positioned at the first bit and first reference.
    #[must_use]
    pub fn parse(&self) -> CellSlice<'_> {
        CellSlice {
            cell: self,
            bit_pos: 0,
            bit_end: self.bit_len,
            ref_pos: 0,
            ref_end: self.refs.len(),
        }
    }

    fn bit(&self, index: usize) -> bool {
        (self.data[index / 8] >> (7 - index % 8)) & 1 == 1
    }
}

/// Fift-style text: `x{HEX}`, with a trailing `_` when the last nibble carries a completion tag,
/// followed by `(..)` listing the referenced cells in the same form.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{{")?;
        let nibbles = self.bit_len.div_ceil(4);
        for n in 0..nibbles {
            let mut v = 0_u8;
            for i in n * 4..n * 4 + 4 {
                let bit = if i < self.bit_len {
                    self.bit(i)
                } else {
                    i == self.bit_len
                };
                v = (v << 1) | u8::from(bit);
            }
            write!(f, "{v:X}")?;
        }
        if self.bit_len % 4 != 0 {
            write!(f, "_")?;
        }
        write!(f, "}}")?;
        if !self.refs.is_empty() {
            write!(f, "(")?;
            for (i, r) in self.refs.iter().enumerate() {
                if i != 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{r}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// A read cursor over a window of a [`Cell`].
#[derive(Clone, Debug)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    bit_end: usize,
    ref_pos: usize,
    ref_end: usize,
}

impl<'a> CellSlice<'a> {
    /// Unread data bits.
    #[must_use]
    pub fn bits_left(&self) -> usize {
        self.bit_end - self.bit_pos
    }

    /// Unread child references.
    #[must_use]
    pub fn refs_left(&self) -> usize {
        self.ref_end - self.ref_pos
    }

    /// Returns the unread bit at `offset` from the cursor without consuming anything.
    pub fn peek_bit(&self, offset: usize) -> Result<bool, CellError> {
        self.ensure_bits(offset + 1)?;
        Ok(self.cell.bit(self.bit_pos + offset))
    }

    fn ensure_bits(&self, wanted: usize) -> Result<(), CellError> {
        let left = self.bits_left();
        if wanted > left {
            return Err(CellError::BitUnderflow { wanted, left });
        }
        Ok(())
    }

    /// Reads a single bit.
    pub fn load_bit(&mut self) -> Result<bool, CellError> {
        let bit = self.peek_bit(0)?;
        self.bit_pos += 1;
        Ok(bit)
    }

    /// Reads `bits` bits as an unsigned integer without consuming them.
    pub fn preload_uint(&self, bits: usize) -> Result<u64, CellError> {
        if bits > 64 {
            return Err(CellError::WidthTooLarge { bits });
        }
        self.ensure_bits(bits)?;
        let mut v = 0_u64;
        for i in 0..bits {
            v = (v << 1) | u64::from(self.cell.bit(self.bit_pos + i));
        }
        Ok(v)
    }

    /// Reads `bits` bits as an unsigned integer.
    pub fn load_uint(&mut self, bits: usize) -> Result<u64, CellError> {
        let v = self.preload_uint(bits)?;
        self.bit_pos += bits;
        Ok(v)
    }

    /// Reads `bits` bits as a two's complement signed integer.
    pub fn load_int(&mut self, bits: usize) -> Result<i64, CellError> {
        let raw = self.load_uint(bits)?;
        if bits == 0 {
            return Ok(0);
        }
        let shift = 64 - bits;
        Ok(((raw << shift) as i64) >> shift)
    }

    /// Reads `bits` bits as an unsigned integer of arbitrary width.
    pub fn load_big_uint(&mut self, bits: usize) -> Result<BigUint, CellError> {
        self.ensure_bits(bits)?;
        let mut bytes = Vec::with_capacity(bits.div_ceil(8));
        let head = bits % 8;
        if head != 0 {
            bytes.push(self.load_uint(head)? as u8);
        }
        for _ in 0..bits / 8 {
            bytes.push(self.load_uint(8)? as u8);
        }
        Ok(BigUint::from_bytes_be(&bytes))
    }

    /// Skips `bits` bits.
    pub fn skip_bits(&mut self, bits: usize) -> Result<(), CellError> {
        self.ensure_bits(bits)?;
        self.bit_pos += bits;
        Ok(())
    }

    /// Consumes `bits` bits and returns them as a slice with no references.
    pub fn load_bits(&mut self, bits: usize) -> Result<CellSlice<'a>, CellError> {
        self.ensure_bits(bits)?;
        let out = CellSlice {
            cell: self.cell,
            bit_pos: self.bit_pos,
            bit_end: self.bit_pos + bits,
            ref_pos: 0,
            ref_end: 0,
        };
        self.bit_pos += bits;
        Ok(out)
    }

    /// Consumes the next child reference.
    pub fn load_ref(&mut self) -> Result<&'a Arc<Cell>, CellError> {
        if self.ref_pos == self.ref_end {
            return Err(CellError::RefUnderflow);
        }
        let cell: &'a Cell = self.cell;
        let r = &cell.refs[self.ref_pos];
        self.ref_pos += 1;
        Ok(r)
    }

    /// Copies the unread bits and references into a standalone cell.
    pub fn to_cell(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new();
        b.store_slice(self)?;
        Ok(b.build())
    }
}

/// An append-only cell writer.
#[derive(Clone, Debug, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bits written so far.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Appends a single bit.
    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        if self.bit_len == MAX_BITS {
            return Err(CellError::BitOverflow {
                len: self.bit_len + 1,
            });
        }
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let last = self.data.len() - 1;
            self.data[last] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(self)
    }

    /// Appends the low `bits` bits of `value`, most significant first.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 64 {
            return Err(CellError::WidthTooLarge { bits });
        }
        self.ensure_room(bits)?;
        for i in (0..bits).rev() {
            self.store_bit((value >> i) & 1 == 1)?;
        }
        Ok(self)
    }

    /// Appends whole bytes.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        self.ensure_room(bytes.len() * 8)?;
        for &b in bytes {
            self.store_uint(u64::from(b), 8)?;
        }
        Ok(self)
    }

    /// Appends the unread bits and references of `slice`.
    pub fn store_slice(&mut self, slice: &CellSlice<'_>) -> Result<&mut Self, CellError> {
        self.ensure_room(slice.bits_left())?;
        if self.refs.len() + slice.refs_left() > MAX_REFS {
            return Err(CellError::RefOverflow);
        }
        let mut s = slice.clone();
        while s.bits_left() > 0 {
            self.store_bit(s.load_bit()?)?;
        }
        while s.refs_left() > 0 {
            self.store_ref(Arc::clone(s.load_ref()?))?;
        }
        Ok(self)
    }

    /// Appends a child reference.
    pub fn store_ref(&mut self, cell: Arc<Cell>) -> Result<&mut Self, CellError> {
        if self.refs.len() == MAX_REFS {
            return Err(CellError::RefOverflow);
        }
        self.refs.push(cell);
        Ok(self)
    }

    fn ensure_room(&self, bits: usize) -> Result<(), CellError> {
        let len = self.bit_len + bits;
        if len > MAX_BITS {
            return Err(CellError::BitOverflow { len });
        }
        Ok(())
    }

    /// Finishes the cell.
    #[must_use]
    pub fn build(self) -> Cell {
        Cell {
            data: self.data,
            bit_len: self.bit_len,
            refs: self.refs,
        }
    }
}
