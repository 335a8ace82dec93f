// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Code cell decoder.
//!
//! [`Decompiler`] turns a code cell into a [`DecodedCode`] tree. Each instruction is located by
//! preloading (up to) 24 bits, left-aligning them, and resolving the value in the
//! [`OpcodeIndex`]; its arguments are then read according to the instruction's schema.
//!
//! Once a cell's bits are exhausted, each remaining child reference is decoded as code and
//! appended as a `ref` pseudo-instruction. Any failure aborts the whole decode.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::cell::{Cell, CellError, CellSlice};
use crate::decoded::{Argument, DecodedCode, DecodedDictionary, DecodedInstruction};
use crate::dict::DictError;
use crate::opcode_index::{IndexError, MAX_OPCODE_BITS, OpcodeIndex};
use crate::specification::{InstructionDef, Specification};
use crate::trace::{TraceMask, TraceSink};

/// Decoding limits.
///
/// Cell trees can be arbitrarily deep (a chain of `ref` cells) and large (shared sub-cells are
/// decoded once per occurrence), so both are bounded. Decoding recurses once per nested cell;
/// the default depth fits a thread with the standard 2 MiB stack in debug builds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting depth of decoded cells. The root cell is at depth 1.
    pub max_depth: usize,
    /// Maximum number of decoded instructions, `ref` pseudo-instructions included.
    pub max_nodes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 128,
            max_nodes: 1_000_000,
        }
    }
}

/// A decoding failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecompileError {
    /// The preloaded opcode value fell into an unassigned range.
    UnknownOpcode {
        /// The 24-bit left-aligned opcode value.
        opcode: u32,
        /// Data bits that were left in the cell.
        bits_left: usize,
    },
    /// The opcode bits of a resolved instruction could not be consumed.
    Opcode {
        /// Instruction name.
        instruction: String,
        /// Underlying cell error.
        error: CellError,
    },
    /// An argument field could not be read.
    Field {
        /// Instruction name.
        instruction: String,
        /// Field position in the argument schema.
        field: usize,
        /// Field kind.
        kind: &'static str,
        /// Underlying cell error.
        error: CellError,
    },
    /// An argument value (after applying a delta) did not fit its type.
    FieldOverflow {
        /// Instruction name.
        instruction: String,
        /// Field position in the argument schema.
        field: usize,
        /// Field kind.
        kind: &'static str,
    },
    /// A method dictionary was malformed.
    Dictionary {
        /// Instruction name, if decoded as part of an instruction.
        instruction: Option<String>,
        /// Underlying dictionary error.
        error: DictError,
    },
    /// A cell outside of any instruction context could not be read.
    Cell(CellError),
    /// [`Limits::max_depth`] was exceeded.
    DepthExceeded {
        /// The configured limit.
        limit: usize,
    },
    /// [`Limits::max_nodes`] was exceeded.
    NodeLimitExceeded {
        /// The configured limit.
        limit: usize,
    },
}

impl fmt::Display for DecompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode { opcode, bits_left } => write!(
                f,
                "unknown opcode 0x{opcode:06x} ({bits_left} bits left in cell)"
            ),
            Self::Opcode { instruction, error } => {
                write!(f, "{instruction}: truncated opcode: {error}")
            }
            Self::Field {
                instruction,
                field,
                kind,
                error,
            } => write!(f, "{instruction}: argument #{field} ({kind}): {error}"),
            Self::FieldOverflow {
                instruction,
                field,
                kind,
            } => write!(f, "{instruction}: argument #{field} ({kind}) overflows"),
            Self::Dictionary {
                instruction: Some(instruction),
                error,
            } => write!(f, "{instruction}: bad dictionary: {error}"),
            Self::Dictionary {
                instruction: None,
                error,
            } => write!(f, "bad dictionary: {error}"),
            Self::Cell(e) => write!(f, "{e}"),
            Self::DepthExceeded { limit } => write!(f, "cell depth limit ({limit}) exceeded"),
            Self::NodeLimitExceeded { limit } => {
                write!(f, "instruction limit ({limit}) exceeded")
            }
        }
    }
}

impl core::error::Error for DecompileError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Opcode { error, .. } | Self::Field { error, .. } | Self::Cell(error) => {
                Some(error)
            }
            Self::Dictionary { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<CellError> for DecompileError {
    fn from(e: CellError) -> Self {
        Self::Cell(e)
    }
}

/// A specification-driven code cell decoder.
///
/// The decoder borrows the [`Specification`] it was built from; decoded instructions refer to
/// their definitions and names without copying.
#[derive(Clone, Debug)]
pub struct Decompiler<'s> {
    index: OpcodeIndex<'s>,
    limits: Limits,
}

impl<'s> Decompiler<'s> {
    /// Builds a decoder with default [`Limits`].
    pub fn new(spec: &'s Specification) -> Result<Self, IndexError> {
        Self::with_limits(spec, Limits::default())
    }

    /// Builds a decoder with the given limits.
    pub fn with_limits(spec: &'s Specification, limits: Limits) -> Result<Self, IndexError> {
        Ok(Self::from_index(OpcodeIndex::build(&spec.instructions)?, limits))
    }

    /// Wraps an already built index.
    #[must_use]
    pub fn from_index(index: OpcodeIndex<'s>, limits: Limits) -> Self {
        Self { index, limits }
    }

    /// The opcode index.
    #[must_use]
    pub fn index(&self) -> &OpcodeIndex<'s> {
        &self.index
    }

    /// The decoding limits.
    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Decodes `cell` (and everything it references) as code.
    pub fn decompile(&self, cell: &Cell) -> Result<DecodedCode<'s>, DecompileError> {
        self.decompile_traced(cell, TraceMask::NONE, None)
    }

    /// Like [`Decompiler::decompile`], reporting the events in `mask` to `sink`.
    pub fn decompile_traced(
        &self,
        cell: &Cell,
        mask: TraceMask,
        sink: Option<&mut dyn TraceSink>,
    ) -> Result<DecodedCode<'s>, DecompileError> {
        Session::new(self, mask, sink).decode_code(cell)
    }

    /// Decodes the single instruction at the cursor, advancing past it.
    ///
    /// The cursor must have at least one unread data bit.
    pub fn decode_one(
        &self,
        slice: &mut CellSlice<'_>,
    ) -> Result<DecodedInstruction<'s>, DecompileError> {
        Session::new(self, TraceMask::NONE, None).decode_one(slice)
    }

    /// Reads the arguments of `def` at the cursor, which must sit just past its opcode.
    pub fn decode_args(
        &self,
        def: &'s InstructionDef,
        slice: &mut CellSlice<'_>,
    ) -> Result<Vec<Argument<'s>>, DecompileError> {
        Session::new(self, TraceMask::NONE, None).decode_args(def, slice)
    }

    /// Reads a 10-bit key width and the referenced method dictionary at the cursor.
    ///
    /// Returns the key width and the decoded methods.
    pub fn decode_dictionary(
        &self,
        slice: &mut CellSlice<'_>,
    ) -> Result<(u64, DecodedDictionary<'s>), DecompileError> {
        let key_bits = slice.load_uint(10)?;
        let root = slice.load_ref()?;
        let dict =
            Session::new(self, TraceMask::NONE, None).decode_dictionary(root, key_bits, None)?;
        Ok((key_bits, dict))
    }
}

/// Per-decode state: nesting depth, node budget, and the trace sink.
pub(crate) struct Session<'d, 's, 't> {
    decompiler: &'d Decompiler<'s>,
    depth: usize,
    nodes: usize,
    mask: TraceMask,
    sink: Option<&'t mut dyn TraceSink>,
}

impl<'d, 's, 't> Session<'d, 's, 't> {
    fn new(
        decompiler: &'d Decompiler<'s>,
        mask: TraceMask,
        sink: Option<&'t mut dyn TraceSink>,
    ) -> Self {
        Self {
            decompiler,
            depth: 0,
            nodes: 0,
            mask: if sink.is_some() { mask } else { TraceMask::NONE },
            sink,
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the sink if it asked for `event`.
    pub(crate) fn sink_for(&mut self, event: TraceMask) -> Option<&mut (dyn TraceSink + 't)> {
        if self.mask.contains(event) {
            self.sink.as_deref_mut()
        } else {
            None
        }
    }

    /// Nodes that may still be decoded.
    pub(crate) fn remaining_nodes(&self) -> usize {
        self.decompiler.limits.max_nodes.saturating_sub(self.nodes)
    }

    pub(crate) fn node_limit_exceeded(&self) -> DecompileError {
        DecompileError::NodeLimitExceeded {
            limit: self.decompiler.limits.max_nodes,
        }
    }

    pub(crate) fn count_node(&mut self) -> Result<(), DecompileError> {
        if self.remaining_nodes() == 0 {
            return Err(self.node_limit_exceeded());
        }
        self.nodes += 1;
        Ok(())
    }

    /// Decodes every instruction in `cell`, then its trailing references.
    pub(crate) fn decode_code(&mut self, cell: &Cell) -> Result<DecodedCode<'s>, DecompileError> {
        let limit = self.decompiler.limits.max_depth;
        if self.depth >= limit {
            return Err(DecompileError::DepthExceeded { limit });
        }
        self.depth += 1;
        let depth = self.depth;
        if let Some(sink) = self.sink_for(TraceMask::CELL) {
            sink.cell_enter(depth, cell.bit_len(), cell.refs().len());
        }

        let mut slice = cell.parse();
        let mut instructions = Vec::new();
        while slice.bits_left() > 0 {
            instructions.push(self.decode_one(&mut slice)?);
        }
        while slice.refs_left() > 0 {
            let child = slice.load_ref()?;
            self.count_node()?;
            let code = self.decode_code(child)?;
            instructions.push(DecodedInstruction::reference(code));
        }

        if let Some(sink) = self.sink_for(TraceMask::CELL) {
            sink.cell_exit(depth, instructions.len());
        }
        self.depth -= 1;
        Ok(DecodedCode { instructions })
    }

    pub(crate) fn decode_one(
        &mut self,
        slice: &mut CellSlice<'_>,
    ) -> Result<DecodedInstruction<'s>, DecompileError> {
        let bits_left = slice.bits_left();
        if bits_left == 0 {
            return Err(CellError::BitUnderflow {
                wanted: 1,
                left: 0,
            }
            .into());
        }
        let window = bits_left.min(MAX_OPCODE_BITS as usize);
        let opcode = (slice.preload_uint(window)? as u32) << (MAX_OPCODE_BITS as usize - window);

        let Some(def) = self.decompiler.index.resolve(opcode).instruction else {
            return Err(DecompileError::UnknownOpcode { opcode, bits_left });
        };
        slice
            .skip_bits(def.layout.check_len as usize)
            .map_err(|error| DecompileError::Opcode {
                instruction: def.name.clone(),
                error,
            })?;
        let args = self.decode_args(def, slice)?;
        self.count_node()?;

        let depth = self.depth;
        if let Some(sink) = self.sink_for(TraceMask::INSTR) {
            sink.instr(depth, opcode, &def.name);
        }
        Ok(DecodedInstruction {
            name: &def.name,
            definition: Some(def),
            args,
        })
    }
}
