// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opcode lookup table.
//!
//! Opcodes are variable-length prefixes, so every instruction is described by a range of
//! 24-bit left-aligned values. [`OpcodeIndex`] sorts those ranges, fills the gaps with
//! unassigned entries, and resolves a preloaded 24-bit value by bisection.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::specification::InstructionDef;

/// Width of the opcode window, in bits.
pub const MAX_OPCODE_BITS: u32 = 24;

/// Exclusive upper bound of the opcode space.
pub const OPCODE_SPACE: u32 = 1 << MAX_OPCODE_BITS;

/// A malformed opcode range in the specification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexError {
    /// `min >= max`.
    InvertedRange {
        /// Instruction name.
        name: String,
        /// Range start.
        min: u32,
        /// Range end.
        max: u32,
    },
    /// `max` exceeds [`OPCODE_SPACE`].
    OutOfBounds {
        /// Instruction name.
        name: String,
        /// Range end.
        max: u32,
    },
    /// Two ranges overlap.
    Overlap {
        /// Instruction whose range starts inside the previous one.
        name: String,
        /// Its range start.
        min: u32,
        /// Instruction whose range it overlaps.
        previous: String,
        /// End of the previous range.
        previous_max: u32,
    },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvertedRange { name, min, max } => {
                write!(f, "{name}: empty opcode range [0x{min:06x}, 0x{max:06x})")
            }
            Self::OutOfBounds { name, max } => write!(
                f,
                "{name}: opcode range end 0x{max:x} exceeds 0x{OPCODE_SPACE:06x}"
            ),
            Self::Overlap {
                name,
                min,
                previous,
                previous_max,
            } => write!(
                f,
                "{name}: opcode range starting at 0x{min:06x} overlaps {previous} (ends at 0x{previous_max:06x})"
            ),
        }
    }
}

impl core::error::Error for IndexError {}

/// One range of the opcode space.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry<'s> {
    /// Inclusive start.
    pub min: u32,
    /// Exclusive end.
    pub max: u32,
    /// Instruction owning the range, or `None` for an unassigned range.
    pub instruction: Option<&'s InstructionDef>,
}

impl IndexEntry<'_> {
    /// Returns `true` if `opcode` falls into this entry.
    #[must_use]
    pub fn contains(&self, opcode: u32) -> bool {
        self.min <= opcode && opcode < self.max
    }
}

/// Sorted, gap-free partition of `[0, 2^24)` into instruction ranges.
#[derive(Clone, Debug)]
pub struct OpcodeIndex<'s> {
    entries: Vec<IndexEntry<'s>>,
}

impl<'s> OpcodeIndex<'s> {
    /// Builds the index, rejecting inverted, out-of-bound, or overlapping ranges.
    pub fn build(instructions: &'s [InstructionDef]) -> Result<Self, IndexError> {
        let mut defs: Vec<&'s InstructionDef> = instructions.iter().collect();
        defs.sort_by(|a, b| {
            a.layout
                .min
                .cmp(&b.layout.min)
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut entries = Vec::with_capacity(defs.len() * 2 + 1);
        let mut upto = 0_u32;
        let mut previous: Option<&'s InstructionDef> = None;
        for def in defs {
            let (min, max) = (def.layout.min, def.layout.max);
            if min >= max {
                return Err(IndexError::InvertedRange {
                    name: def.name.clone(),
                    min,
                    max,
                });
            }
            if max > OPCODE_SPACE {
                return Err(IndexError::OutOfBounds {
                    name: def.name.clone(),
                    max,
                });
            }
            if min < upto {
                return Err(IndexError::Overlap {
                    name: def.name.clone(),
                    min,
                    previous: previous.map(|p| p.name.clone()).unwrap_or_default(),
                    previous_max: upto,
                });
            }
            if upto < min {
                entries.push(IndexEntry {
                    min: upto,
                    max: min,
                    instruction: None,
                });
            }
            entries.push(IndexEntry {
                min,
                max,
                instruction: Some(def),
            });
            upto = max;
            previous = Some(def);
        }
        if upto < OPCODE_SPACE {
            entries.push(IndexEntry {
                min: upto,
                max: OPCODE_SPACE,
                instruction: None,
            });
        }
        Ok(Self { entries })
    }

    /// All entries in ascending order.
    #[must_use]
    pub fn entries(&self) -> &[IndexEntry<'s>] {
        &self.entries
    }

    /// Returns the entry containing `opcode` (a 24-bit left-aligned value).
    ///
    /// Values at or above `2^24` resolve to the last entry.
    #[must_use]
    pub fn resolve(&self, opcode: u32) -> &IndexEntry<'s> {
        // Entries start at 0 and are contiguous, so the partition point is never 0.
        let ix = self.entries.partition_point(|e| e.min <= opcode);
        &self.entries[ix - 1]
    }
}
