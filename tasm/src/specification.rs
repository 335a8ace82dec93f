// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory instruction specification.
//!
//! This is the subset of `tvm-specification.json` the decoder needs: each instruction's name,
//! opcode range, check length, and argument schema. Every other field of the document
//! (descriptions, signatures, gas, Fift aliases, ...) is ignored when deserializing.
//!
//! Argument descriptors are closed enums tagged by the document's `$` key, so a descriptor
//! kind the decoder does not know is rejected when the document is loaded rather than while
//! decoding.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde::Deserialize;

/// A parsed instruction specification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Specification {
    /// Specification version string, if present.
    #[serde(default)]
    pub version: Option<String>,
    /// Instruction definitions, in no particular order.
    pub instructions: Vec<InstructionDef>,
}

/// Failure to load a specification document.
#[derive(Debug)]
pub struct SpecificationError(serde_json::Error);

impl fmt::Display for SpecificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid specification: {}", self.0)
    }
}

impl core::error::Error for SpecificationError {}

impl Specification {
    /// Parses a specification from its JSON document.
    pub fn from_json(json: &str) -> Result<Self, SpecificationError> {
        serde_json::from_str(json).map_err(SpecificationError)
    }

    /// Parses a specification from JSON bytes.
    pub fn from_json_slice(json: &[u8]) -> Result<Self, SpecificationError> {
        serde_json::from_slice(json).map_err(SpecificationError)
    }

    /// Looks up an instruction definition by name.
    #[must_use]
    pub fn instruction(&self, name: &str) -> Option<&InstructionDef> {
        self.instructions.iter().find(|i| i.name == name)
    }
}

/// A single instruction definition.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct InstructionDef {
    /// Unique instruction name, e.g. `PUSHINT_8` or `2DUP`.
    pub name: String,
    /// Encoding layout.
    pub layout: Layout,
}

/// Opcode range and argument layout of an instruction.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Layout {
    /// Inclusive lower bound of the 24-bit left-aligned opcode range.
    pub min: u32,
    /// Exclusive upper bound of the 24-bit left-aligned opcode range.
    pub max: u32,
    /// Opcode bits consumed before arguments start.
    #[serde(rename = "checkLen")]
    pub check_len: u32,
    /// Argument schema.
    pub args: ArgSchema,
}

/// How an instruction's arguments are laid out after its opcode.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "$", rename_all = "camelCase")]
pub enum ArgSchema {
    /// An ordered list of field descriptors.
    SimpleArgs {
        /// Fields in encoding order.
        #[serde(default)]
        children: Vec<Field>,
    },
    /// A 10-bit key width followed by a referenced method dictionary.
    Dictpush,
    /// Two 4-bit stack register indices (`XCHG s(i), s(j)`).
    XchgArgs,
}

/// A single argument field descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "$", rename_all = "camelCase")]
pub enum Field {
    /// Unsigned integer of `len` bits.
    Uint {
        /// Width in bits.
        len: u32,
    },
    /// Signed integer of `len` bits.
    Int {
        /// Width in bits.
        len: u32,
    },
    /// A nested field with a constant added to its value.
    Delta {
        /// Added constant.
        delta: i64,
        /// The nested field.
        arg: DeltaTarget,
    },
    /// Stack register index of `len` bits.
    Stack {
        /// Width in bits.
        #[serde(default = "default_register_len")]
        len: u32,
    },
    /// Control register index (4 bits).
    Control,
    /// Small signed integer in a biased 4-bit field.
    TinyInt,
    /// Length-prefixed big integer.
    LargeInt,
    /// The constant `-1`; no bits.
    MinusOne,
    /// The stack register `s1`; no bits.
    S1,
    /// 8-bit unsigned value.
    Hash,
    /// 3-bit field encoding a preload width (`(x + 1) * 32`).
    PlduzArg,
    /// 12-bit `RUNVM` flags.
    RunvmArg,
    /// 8-bit codepage selector (`-16..240`).
    SetcpArg,
    /// Code in the next child reference.
    RefCodeSlice,
    /// Inline code: byte count, then that many bytes of code.
    InlineCodeSlice {
        /// Byte count field.
        bits: CountField,
    },
    /// Code with references: reference count, byte count, then data and references.
    CodeSlice {
        /// Reference count field.
        refs: CountField,
        /// Byte count field.
        bits: CountField,
    },
    /// Data slice ending in a completion tag.
    Slice {
        /// Reference count field.
        refs: CountField,
        /// Byte count field.
        bits: CountField,
        /// Extra bits after the counted bytes.
        #[serde(default)]
        pad: u32,
    },
    /// A referenced cell kept verbatim.
    ExoticCell,
    /// Debug string: 4-bit length, then `(len + 1)` bytes.
    Debugstr,
}

fn default_register_len() -> u32 {
    4
}

/// Field kinds that may sit under a [`Field::Delta`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "$", rename_all = "camelCase")]
pub enum DeltaTarget {
    /// Unsigned integer of `len` bits.
    Uint {
        /// Width in bits.
        len: u32,
    },
    /// Signed integer of `len` bits.
    Int {
        /// Width in bits.
        len: u32,
    },
    /// Stack register index of `len` bits, read as signed.
    Stack {
        /// Width in bits.
        #[serde(default = "default_register_len")]
        len: u32,
    },
}

/// A count prefix inside slice-like fields.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "$", rename_all = "camelCase")]
pub enum CountField {
    /// Unsigned count of `len` bits (`len == 0` means the count is always zero).
    Uint {
        /// Width in bits.
        len: u32,
    },
    /// A nested count with a constant added.
    Delta {
        /// Added constant.
        delta: i64,
        /// The nested count.
        arg: Box<CountField>,
    },
}

impl Field {
    /// Short kind name, matching the document's `$` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Uint { .. } => "uint",
            Self::Int { .. } => "int",
            Self::Delta { .. } => "delta",
            Self::Stack { .. } => "stack",
            Self::Control => "control",
            Self::TinyInt => "tinyInt",
            Self::LargeInt => "largeInt",
            Self::MinusOne => "minusOne",
            Self::S1 => "s1",
            Self::Hash => "hash",
            Self::PlduzArg => "plduzArg",
            Self::RunvmArg => "runvmArg",
            Self::SetcpArg => "setcpArg",
            Self::RefCodeSlice => "refCodeSlice",
            Self::InlineCodeSlice { .. } => "inlineCodeSlice",
            Self::CodeSlice { .. } => "codeSlice",
            Self::Slice { .. } => "slice",
            Self::ExoticCell => "exoticCell",
            Self::Debugstr => "debugstr",
        }
    }
}
