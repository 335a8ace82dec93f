// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decoded instruction trees.

use alloc::vec::Vec;

use num_bigint::BigUint;

use crate::cell::Cell;
use crate::specification::InstructionDef;

/// Name of the pseudo-instruction wrapping code reached through a trailing cell reference.
pub const REF_PSEUDO_NAME: &str = "ref";

/// A stack register reference `s<i>`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StackRegister(pub i64);

/// A control register reference `c<i>`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ControlRegister(pub u64);

/// A decoded argument value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Argument<'s> {
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    Uint(u64),
    /// An integer wider than 64 bits.
    BigInt(BigUint),
    /// A stack register.
    Stack(StackRegister),
    /// A control register.
    Control(ControlRegister),
    /// A data slice, re-materialized as a standalone cell.
    Slice(Cell),
    /// Embedded code.
    Code(DecodedCode<'s>),
    /// A method dictionary.
    Dictionary(DecodedDictionary<'s>),
}

/// A single decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedInstruction<'s> {
    /// Instruction name as written in the specification (or [`REF_PSEUDO_NAME`]).
    pub name: &'s str,
    /// Definition this instruction was decoded with; `None` for `ref` pseudo-instructions.
    pub definition: Option<&'s InstructionDef>,
    /// Arguments in schema order.
    pub args: Vec<Argument<'s>>,
}

impl<'s> DecodedInstruction<'s> {
    /// Wraps code found behind a trailing child reference.
    #[must_use]
    pub fn reference(code: DecodedCode<'s>) -> Self {
        Self {
            name: REF_PSEUDO_NAME,
            definition: None,
            args: alloc::vec![Argument::Code(code)],
        }
    }

    /// Returns `true` for `ref` pseudo-instructions.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.definition.is_none() && self.name == REF_PSEUDO_NAME
    }
}

/// A decoded instruction sequence.
///
/// Instructions encoded in a cell's bits come first, followed by one `ref` pseudo-instruction
/// per child reference of that cell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedCode<'s> {
    /// Instructions in order.
    pub instructions: Vec<DecodedInstruction<'s>>,
}

/// A decoded method dictionary (jump table).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedDictionary<'s> {
    /// Entries in ascending method id order.
    pub methods: Vec<DecodedMethod<'s>>,
}

/// A single dictionary entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedMethod<'s> {
    /// Method id (the dictionary key).
    pub id: u64,
    /// Method body.
    pub code: DecodedCode<'s>,
}
