// Copyright 2026 the Tasm Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Argument decoding.
//!
//! Each field descriptor consumes a fixed or self-described number of bits (and possibly child
//! references) from the cursor and yields one [`Argument`]. Code-carrying fields re-materialize
//! their range as a standalone cell and decode it recursively through the same session.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::cell::{Cell, CellBuilder, CellError, CellSlice};
use crate::decoded::{Argument, ControlRegister, StackRegister};
use crate::decompile::{DecompileError, Session};
use crate::specification::{ArgSchema, CountField, DeltaTarget, Field, InstructionDef};

/// A field failure before it is attributed to an instruction.
enum FieldError {
    Cell(CellError),
    Overflow,
    /// Failure inside nested code; already attributed.
    Nested(DecompileError),
}

impl From<CellError> for FieldError {
    fn from(e: CellError) -> Self {
        Self::Cell(e)
    }
}

impl From<DecompileError> for FieldError {
    fn from(e: DecompileError) -> Self {
        Self::Nested(e)
    }
}

impl FieldError {
    fn attribute(self, instruction: &str, field: usize, kind: &'static str) -> DecompileError {
        match self {
            Self::Cell(error) => DecompileError::Field {
                instruction: String::from(instruction),
                field,
                kind,
                error,
            },
            Self::Overflow => DecompileError::FieldOverflow {
                instruction: String::from(instruction),
                field,
                kind,
            },
            Self::Nested(e) => e,
        }
    }
}

impl<'s> Session<'_, 's, '_> {
    pub(crate) fn decode_args(
        &mut self,
        def: &'s InstructionDef,
        slice: &mut CellSlice<'_>,
    ) -> Result<Vec<Argument<'s>>, DecompileError> {
        match &def.layout.args {
            ArgSchema::SimpleArgs { children } => {
                let mut args = Vec::with_capacity(children.len());
                for (ix, field) in children.iter().enumerate() {
                    let arg = self
                        .decode_field(field, slice)
                        .map_err(|e| e.attribute(&def.name, ix, field.kind()))?;
                    args.push(arg);
                }
                Ok(args)
            }
            ArgSchema::XchgArgs => {
                let mut register = |ix| {
                    slice
                        .load_uint(4)
                        .map(|i| Argument::Stack(StackRegister(i as i64)))
                        .map_err(|e| FieldError::from(e).attribute(&def.name, ix, "stack"))
                };
                Ok(vec![register(0)?, register(1)?])
            }
            ArgSchema::Dictpush => {
                let key_bits = slice
                    .load_uint(10)
                    .map_err(|e| FieldError::from(e).attribute(&def.name, 0, "dictpush"))?;
                let root = slice
                    .load_ref()
                    .map_err(|e| FieldError::from(e).attribute(&def.name, 1, "dictpush"))?;
                let dict = self.decode_dictionary(root, key_bits, Some(def.name.as_str()))?;
                Ok(vec![Argument::Uint(key_bits), Argument::Dictionary(dict)])
            }
        }
    }

    fn decode_field(
        &mut self,
        field: &Field,
        s: &mut CellSlice<'_>,
    ) -> Result<Argument<'s>, FieldError> {
        // Only the code cell is held across the recursive call.
        match read_field(field, s)? {
            FieldValue::Literal(arg) => Ok(arg),
            FieldValue::Code(cell) => Ok(Argument::Code(self.decode_code(&cell)?)),
        }
    }
}

/// A field as read from the cursor, before any nested code is decoded.
enum FieldValue<'c> {
    Literal(Argument<'static>),
    Code(Cow<'c, Cell>),
}

/// Reads `field` at the cursor. Kept out of line so its frame is gone before code fields
/// recurse.
#[inline(never)]
fn read_field<'c>(field: &Field, s: &mut CellSlice<'c>) -> Result<FieldValue<'c>, FieldError> {
    let literal = match field {
        Field::Uint { len } => Argument::Uint(s.load_uint(*len as usize)?),
        Field::Int { len } => Argument::Int(s.load_int(*len as usize)?),
        Field::Delta { delta, arg } => decode_delta(*delta, arg, s)?,
        Field::Stack { len } => {
            let i = s.load_uint(*len as usize)?;
            Argument::Stack(StackRegister(
                i64::try_from(i).map_err(|_| FieldError::Overflow)?,
            ))
        }
        Field::Control => Argument::Control(ControlRegister(s.load_uint(4)?)),
        Field::TinyInt => {
            let y = s.load_uint(4)? as i64;
            Argument::Int(((y + 5) & 15) - 5)
        }
        Field::LargeInt => {
            let y = s.load_uint(5)?;
            let bytes = (y & 31) as usize + 2;
            Argument::BigInt(s.load_big_uint(3 + bytes * 8)?)
        }
        Field::MinusOne => Argument::Int(-1),
        Field::S1 => Argument::Stack(StackRegister(1)),
        Field::Hash => Argument::Uint(s.load_uint(8)?),
        Field::PlduzArg => Argument::Uint(((s.load_uint(3)? & 7) + 1) << 5),
        Field::RunvmArg => Argument::Uint(s.load_uint(12)?),
        Field::SetcpArg => {
            let x = s.load_uint(8)? as i64;
            Argument::Int(((x + 16) & 255) - 16)
        }
        Field::RefCodeSlice => {
            let cell: &'c Arc<Cell> = s.load_ref()?;
            return Ok(FieldValue::Code(Cow::Borrowed(&**cell)));
        }
        Field::InlineCodeSlice { bits } => {
            let bytes = read_count(bits, s)?;
            let code = s.load_bits(byte_bits(bytes)?)?.to_cell()?;
            return Ok(FieldValue::Code(Cow::Owned(code)));
        }
        Field::CodeSlice { refs, bits } => {
            let refs = read_count(refs, s)?;
            let bytes = read_count(bits, s)?;
            let data = s.load_bits(byte_bits(bytes)?)?;
            return Ok(FieldValue::Code(Cow::Owned(repack(&data, refs, s)?)));
        }
        Field::Slice { refs, bits, pad } => {
            Argument::Slice(load_tagged_slice(refs, bits, *pad, s)?)
        }
        Field::ExoticCell => Argument::Slice(Cell::clone(s.load_ref()?)),
        Field::Debugstr => {
            let y = s.load_uint(4)? as usize;
            Argument::Slice(s.load_bits((y + 1) * 8)?.to_cell()?)
        }
    };
    Ok(FieldValue::Literal(literal))
}

fn decode_delta(
    delta: i64,
    target: &DeltaTarget,
    s: &mut CellSlice<'_>,
) -> Result<Argument<'static>, FieldError> {
    Ok(match target {
        DeltaTarget::Uint { len } => Argument::Uint(
            s.load_uint(*len as usize)?
                .checked_add_signed(delta)
                .ok_or(FieldError::Overflow)?,
        ),
        DeltaTarget::Int { len } => Argument::Int(
            s.load_int(*len as usize)?
                .checked_add(delta)
                .ok_or(FieldError::Overflow)?,
        ),
        DeltaTarget::Stack { len } => Argument::Stack(StackRegister(
            s.load_int(*len as usize)?
                .checked_add(delta)
                .ok_or(FieldError::Overflow)?,
        )),
    })
}

/// Reads a (possibly delta-adjusted) count prefix.
fn read_count(field: &CountField, s: &mut CellSlice<'_>) -> Result<usize, FieldError> {
    match field {
        CountField::Uint { len } => {
            usize::try_from(s.load_uint(*len as usize)?).map_err(|_| FieldError::Overflow)
        }
        CountField::Delta { delta, arg } => {
            let base = read_count(arg, s)?;
            let delta = isize::try_from(*delta).map_err(|_| FieldError::Overflow)?;
            base.checked_add_signed(delta).ok_or(FieldError::Overflow)
        }
    }
}

fn byte_bits(bytes: usize) -> Result<usize, FieldError> {
    bytes.checked_mul(8).ok_or(FieldError::Overflow)
}

/// Builds a cell from `data` followed by the next `refs` references of `s`.
fn repack(data: &CellSlice<'_>, refs: usize, s: &mut CellSlice<'_>) -> Result<Cell, CellError> {
    let mut b = CellBuilder::new();
    b.store_slice(data)?;
    for _ in 0..refs {
        b.store_ref(Arc::clone(s.load_ref()?))?;
    }
    Ok(b.build())
}

/// Reads a slice whose data ends in a completion tag: the last `1` bit of the raw range.
///
/// Bits before the tag are the payload; the tag and any zero padding after it are dropped.
/// A range without a `1` bit yields an empty payload.
fn load_tagged_slice(
    refs: &CountField,
    bits: &CountField,
    pad: u32,
    s: &mut CellSlice<'_>,
) -> Result<Cell, FieldError> {
    let refs = read_count(refs, s)?;
    let bytes = read_count(bits, s)?;
    let raw_len = byte_bits(bytes)?
        .checked_add(pad as usize)
        .ok_or(FieldError::Overflow)?;
    let mut raw = s.load_bits(raw_len)?;
    let payload_len = (0..raw_len)
        .rev()
        .find(|&i| matches!(raw.peek_bit(i), Ok(true)))
        .unwrap_or(0);
    let payload = raw.load_bits(payload_len)?;
    Ok(repack(&payload, refs, s)?)
}
