// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing hooks for decompilation.
//!
//! Tracing is optional and `no_std` friendly. The decoder only emits events requested by a
//! [`TraceMask`]; pass a mask and a [`TraceSink`] to [`Decompiler::decompile_traced`].

#[cfg(doc)]
use crate::decompile::Decompiler;

/// A set of trace events requested by a [`TraceSink`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TraceMask(u32);

impl core::ops::BitOr for TraceMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for TraceMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl TraceMask {
    /// No tracing.
    pub const NONE: Self = Self(0);
    /// Trace cell boundaries.
    ///
    /// Enables:
    /// - [`TraceSink::cell_enter`]
    /// - [`TraceSink::cell_exit`]
    pub const CELL: Self = Self(1 << 0);
    /// Trace each decoded instruction.
    ///
    /// Enables:
    /// - [`TraceSink::instr`]
    pub const INSTR: Self = Self(1 << 1);
    /// Trace dictionary entries.
    ///
    /// Enables:
    /// - [`TraceSink::dict_entry`]
    pub const DICT: Self = Self(1 << 2);
    /// Every event.
    pub const ALL: Self = Self(Self::CELL.0 | Self::INSTR.0 | Self::DICT.0);

    /// Returns `true` if this mask includes all bits in `other`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// A trace sink that receives decoder events.
pub trait TraceSink {
    /// Returns the set of events the sink wants.
    fn mask(&self) -> TraceMask {
        TraceMask::NONE
    }

    /// Called before the instructions of a cell are decoded.
    ///
    /// - `depth`: nesting depth of the cell (the root is 1)
    /// - `bits`: data bits in the cell
    /// - `refs`: child references in the cell
    fn cell_enter(&mut self, _depth: usize, _bits: usize, _refs: usize) {}

    /// Called after a cell and everything below it has been decoded.
    ///
    /// - `depth`: nesting depth of the cell
    /// - `instructions`: instructions produced for this cell, `ref` pseudo-instructions included
    fn cell_exit(&mut self, _depth: usize, _instructions: usize) {}

    /// Called for each decoded instruction, after its arguments.
    ///
    /// - `depth`: nesting depth of the enclosing cell
    /// - `opcode`: the 24-bit left-aligned value the instruction was resolved from
    /// - `name`: instruction name from the specification
    fn instr(&mut self, _depth: usize, _opcode: u32, _name: &str) {}

    /// Called for each dictionary entry before its code is decoded.
    ///
    /// - `depth`: nesting depth of the cell holding the dictpush instruction
    /// - `key_bits`: dictionary key width
    /// - `id`: method id
    fn dict_entry(&mut self, _depth: usize, _key_bits: usize, _id: u64) {}
}
